//! Test utilities for format round-trip testing

use crate::ArchiveFormat;
use std::fmt::Debug;

/// Build `original`, parse it back and compare
pub fn test_round_trip<T>(original: &T) -> Result<(), Box<dyn std::error::Error>>
where
    T: ArchiveFormat + PartialEq + Debug,
{
    let data = original.build()?;
    let parsed = T::parse(&data)?;

    if original != &parsed {
        return Err(format!(
            "Round-trip verification failed:\nOriginal: {:?}\nParsed: {:?}",
            original, parsed
        )
        .into());
    }

    Ok(())
}

/// Check that parsing `invalid_data` fails
pub fn test_invalid_data_rejected<T>(invalid_data: &[u8]) -> Result<(), Box<dyn std::error::Error>>
where
    T: ArchiveFormat,
{
    match T::parse(invalid_data) {
        Ok(_) => Err("Expected parsing to fail for invalid data, but it succeeded".into()),
        Err(_) => Ok(()),
    }
}

/// Helper to assert round-trip works for a format
#[macro_export]
macro_rules! assert_round_trip {
    ($value:expr) => {
        $crate::test_utils::test_round_trip(&$value).expect("Round-trip should succeed")
    };
}

/// Helper to assert invalid data is rejected
#[macro_export]
macro_rules! assert_invalid_data_rejected {
    ($type:ty, $data:expr) => {
        $crate::test_utils::test_invalid_data_rejected::<$type>($data)
            .expect("Invalid data should be rejected")
    };
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::asar::ArchiveHeader;

    #[test]
    fn test_invalid_headers_rejected() {
        assert_invalid_data_rejected!(ArchiveHeader, &[]);
        assert_invalid_data_rejected!(ArchiveHeader, &[4, 0, 0, 0, 8, 0, 0, 0]);

        let mut bad_json = Vec::new();
        for field in [4u32, 12, 8, 3] {
            bad_json.extend_from_slice(&field.to_le_bytes());
        }
        bad_json.extend_from_slice(b"{\"f\0");
        assert_invalid_data_rejected!(ArchiveHeader, &bad_json);
    }
}
