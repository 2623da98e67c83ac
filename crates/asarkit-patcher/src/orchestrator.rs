//! Patch orchestration.
//!
//! One run takes an archive and its launcher executable through these steps:
//!
//! 1. Skip everything if the sidecar digest matches the current archive
//! 2. Stream the patched archive to `<archive>.new` and check the patched
//!    entry against its new integrity record
//! 3. Copy the executable to `<executable>.new` and swap its header digest
//! 4. Back up both files
//! 5. Rename both staged files over the originals
//! 6. Record the new archive digest in the sidecar
//!
//! A failure before step 5 discards the staged files and leaves the
//! originals untouched. Backups are only written once staging succeeded, so
//! a run that fails early keeps the backups of an earlier run. A failure
//! from step 5 on restores both originals from their backups.

use crate::config::PatcherConfig;
use crate::error::{PatchError, PatchResult};
use crate::fs::FileOps;
use asarkit_crypto::ContentHash;
use asarkit_formats::asar::{self, Mutation, MutationRecord, PatchOutcome};
use asarkit_formats::binary_patch;
use std::ffi::OsString;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Suffix of the files written before they replace the originals
pub const STAGED_SUFFIX: &str = ".new";

/// Suffix of the file recording the digest of a patched archive
pub const SIDECAR_SUFFIX: &str = ".patched.sha256";

/// Every path a run reads or writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPaths {
    /// Archive being patched
    pub archive: PathBuf,
    /// Executable embedding the archive's header digest
    pub executable: PathBuf,
    /// Patched archive before it replaces the original
    pub archive_staged: PathBuf,
    /// Patched executable before it replaces the original
    pub executable_staged: PathBuf,
    /// Copy of the archive taken before anything is replaced
    pub archive_backup: PathBuf,
    /// Copy of the executable taken before anything is replaced
    pub executable_backup: PathBuf,
    /// Digest of the archive as this tool last left it
    pub sidecar: PathBuf,
}

impl PatchPaths {
    /// Derive staging, backup and sidecar paths next to the inputs
    pub fn new(archive: &Path, executable: &Path, backup_suffix: &str) -> Self {
        Self {
            archive: archive.to_path_buf(),
            executable: executable.to_path_buf(),
            archive_staged: with_suffix(archive, STAGED_SUFFIX),
            executable_staged: with_suffix(executable, STAGED_SUFFIX),
            archive_backup: with_suffix(archive, backup_suffix),
            executable_backup: with_suffix(executable, backup_suffix),
            sidecar: with_suffix(archive, SIDECAR_SUFFIX),
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Summary of a completed patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    /// Entry that changed and by how much
    pub record: MutationRecord,
    /// Header digest the executable embedded before the run
    pub old_header_digest: ContentHash,
    /// Header digest the executable embeds now
    pub new_header_digest: ContentHash,
    /// Number of digest copies replaced in the executable
    pub executable_occurrences: usize,
    /// Digest of the whole patched archive, as stored in the sidecar
    pub archive_digest: ContentHash,
}

/// Result of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Both files were patched and replaced
    Patched(PatchReport),
    /// The sidecar shows the archive is already patched; nothing was touched
    AlreadyPatched {
        /// Current digest of the archive
        archive_digest: ContentHash,
    },
}

struct Staged {
    outcome: PatchOutcome,
    executable_occurrences: usize,
}

/// Runs one mutation against an archive and its executable
#[derive(Debug)]
pub struct Orchestrator<F: FileOps> {
    fs: F,
    paths: PatchPaths,
    mutation: Mutation,
}

impl<F: FileOps> Orchestrator<F> {
    /// Create an orchestrator over explicit paths
    pub fn new(fs: F, paths: PatchPaths, mutation: Mutation) -> Self {
        Self {
            fs,
            paths,
            mutation,
        }
    }

    /// Create an orchestrator from a validated configuration
    pub fn from_config(fs: F, config: &PatcherConfig) -> Self {
        let paths = PatchPaths::new(&config.archive, &config.executable, &config.backup_suffix);
        Self::new(fs, paths, config.mutation())
    }

    /// Paths this orchestrator works with
    pub fn paths(&self) -> &PatchPaths {
        &self.paths
    }

    /// Mutation this orchestrator applies
    pub fn mutation(&self) -> &Mutation {
        &self.mutation
    }

    /// Digest of the archive if the sidecar shows it is already patched
    ///
    /// A missing or unreadable sidecar, or one recording a different digest,
    /// means the archive still needs patching.
    pub fn already_patched(&self) -> PatchResult<Option<ContentHash>> {
        if !self.fs.exists(&self.paths.sidecar) {
            return Ok(None);
        }

        let contents = self.fs.read_whole_file(&self.paths.sidecar)?;
        let recorded = std::str::from_utf8(&contents)
            .ok()
            .map(|text| ContentHash::from_hex(text.trim()));
        let Some(Ok(recorded)) = recorded else {
            warn!(
                sidecar = %self.paths.sidecar.display(),
                "ignoring unreadable sidecar digest"
            );
            return Ok(None);
        };

        let current = self.fs.compute_file_digest(&self.paths.archive)?;
        if current == recorded {
            Ok(Some(current))
        } else {
            warn!(
                recorded = %recorded,
                current = %current,
                "archive changed since it was last patched"
            );
            Ok(None)
        }
    }

    /// Patch the archive and executable
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any step. When the error is raised
    /// after the originals were replaced and they cannot be restored, the
    /// error is [`PatchError::RollbackFailed`].
    pub fn run(&self) -> PatchResult<RunOutcome> {
        if let Some(archive_digest) = self.already_patched()? {
            info!(
                archive = %self.paths.archive.display(),
                digest = %archive_digest,
                "archive already patched, nothing to do"
            );
            return Ok(RunOutcome::AlreadyPatched { archive_digest });
        }

        let staged = match self.stage().and_then(|staged| self.backup().map(|_| staged)) {
            Ok(staged) => staged,
            Err(err) => {
                warn!(error = %err, "patch failed, discarding staged files");
                self.discard_staged();
                return Err(err);
            }
        };

        let archive_digest = match self.commit() {
            Ok(digest) => digest,
            Err(err) => return Err(self.roll_back(err)),
        };

        let report = PatchReport {
            record: staged.outcome.record,
            old_header_digest: staged.outcome.old_header_digest,
            new_header_digest: staged.outcome.new_header_digest,
            executable_occurrences: staged.executable_occurrences,
            archive_digest,
        };
        info!(
            entry = %report.record.path(),
            size_delta = report.record.size_delta(),
            old_header_digest = %report.old_header_digest,
            new_header_digest = %report.new_header_digest,
            executable_occurrences = report.executable_occurrences,
            "patch complete"
        );
        Ok(RunOutcome::Patched(report))
    }

    fn backup(&self) -> PatchResult<()> {
        let paths = &self.paths;
        self.fs.copy_file(&paths.archive, &paths.archive_backup)?;
        self.fs.copy_file(&paths.executable, &paths.executable_backup)?;
        info!(
            archive = %paths.archive_backup.display(),
            executable = %paths.executable_backup.display(),
            "backed up originals"
        );
        Ok(())
    }

    fn stage(&self) -> PatchResult<Staged> {
        let paths = &self.paths;
        let outcome = asar::patch_archive_file(&paths.archive, &paths.archive_staged, &self.mutation)?;
        self.verify_staged_archive()?;

        self.fs.copy_file(&paths.executable, &paths.executable_staged)?;
        let mut image = self.fs.read_whole_file(&paths.executable_staged)?;
        let executable_occurrences = binary_patch::patch_digest(
            &mut image,
            &outcome.old_header_digest.to_hex(),
            &outcome.new_header_digest.to_hex(),
        )?;
        self.fs.write_whole_file(&paths.executable_staged, &image)?;

        Ok(Staged {
            outcome,
            executable_occurrences,
        })
    }

    fn verify_staged_archive(&self) -> PatchResult<()> {
        let path = &self.paths.archive_staged;
        let file = File::open(path).map_err(|e| PatchError::file_op("open", path, e))?;
        let checked = asar::verify_entry(&mut BufReader::new(file), &self.mutation.target_path)?;
        if !checked {
            warn!(
                entry = %self.mutation.path(),
                "patched entry has no integrity record to check"
            );
        }
        Ok(())
    }

    fn commit(&self) -> PatchResult<ContentHash> {
        let paths = &self.paths;
        self.fs.rename(&paths.archive_staged, &paths.archive)?;
        self.fs.rename(&paths.executable_staged, &paths.executable)?;

        let digest = self.fs.compute_file_digest(&paths.archive)?;
        self.fs
            .write_whole_file(&paths.sidecar, format!("{digest}\n").as_bytes())?;
        Ok(digest)
    }

    fn roll_back(&self, cause: PatchError) -> PatchError {
        let paths = &self.paths;
        warn!(error = %cause, "patch failed after replacing originals, restoring backups");

        let restored = self
            .fs
            .copy_file(&paths.archive_backup, &paths.archive)
            .and_then(|_| self.fs.copy_file(&paths.executable_backup, &paths.executable));
        self.discard_staged();

        match restored {
            Ok(_) => cause,
            Err(restore) => {
                error!(
                    error = %restore,
                    archive_backup = %paths.archive_backup.display(),
                    executable_backup = %paths.executable_backup.display(),
                    "could not restore originals"
                );
                PatchError::RollbackFailed {
                    cause: Box::new(cause),
                    restore: Box::new(restore),
                }
            }
        }
    }

    fn discard_staged(&self) {
        for path in [&self.paths.archive_staged, &self.paths.executable_staged] {
            if self.fs.exists(path)
                && let Err(err) = self.fs.remove(path)
            {
                warn!(path = %path.display(), error = %err, "could not remove staged file");
            }
        }
    }
}
