//! In-place conversion of one file through a scratch file and two renames.
//!
//! The original is never written to. Converted bytes go to `F.tsc`; only once
//! that file is complete and synced is `F` renamed to `F.bak` and `F.tsc`
//! renamed to `F`. Any failure before the first rename leaves `F` untouched
//! and removes the scratch file. A failure at either rename leaves every file
//! where it is and names them in the error.

use crate::rule::ConversionRule;
use crate::transducer::{TransduceError, transduce};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const BACKUP_SUFFIX: &str = ".bak";
pub const SCRATCH_SUFFIX: &str = ".tsc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Converted { backup: PathBuf },
    Unchanged,
    SkippedBackup,
}

#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error("conversion failed because scratch file {} already exists", .scratch.display())]
    ScratchExists { scratch: PathBuf },

    #[error("conversion failed when creating scratch file {}: {source}", .scratch.display())]
    CreateScratch {
        scratch: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("conversion failed when opening original file: {source}")]
    OpenOriginal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("conversion failed when reading original file: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("conversion failed when writing scratch file {}: {source}", .scratch.display())]
    Write {
        scratch: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("conversion failed when closing scratch file {}: {source}", .scratch.display())]
    CloseScratch {
        scratch: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("conversion failed when copying permissions to {}: {source}", .scratch.display())]
    Permissions {
        scratch: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "still the original file because {} already exists, but its converted file is {}",
        .backup.display(),
        .scratch.display()
    )]
    BackupExists { backup: PathBuf, scratch: PathBuf },

    #[error(
        "still the original file due to renaming failure ({source}), but its converted file is {}",
        .scratch.display()
    )]
    BackupRename {
        backup: PathBuf,
        scratch: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "now renamed as {}, whose converted file is {} ({source})",
        .backup.display(),
        .scratch.display()
    )]
    Promote {
        backup: PathBuf,
        scratch: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where converted bytes are staged before promotion.
pub trait ScratchStore {
    type Writer: Write;

    /// Creates the scratch file, failing with `AlreadyExists` if anything is
    /// already at `path`.
    fn create(&self, path: &Path) -> io::Result<Self::Writer>;

    /// Flushes and durably closes the scratch file.
    fn close(&self, writer: Self::Writer) -> io::Result<()>;

    /// Gives the closed scratch file the original's permission bits.
    fn set_permissions(&self, path: &Path, permissions: fs::Permissions) -> io::Result<()> {
        fs::set_permissions(path, permissions)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiskScratch;

impl ScratchStore for DiskScratch {
    type Writer = BufWriter<File>;

    fn create(&self, path: &Path) -> io::Result<Self::Writer> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        Ok(BufWriter::new(file))
    }

    fn close(&self, writer: Self::Writer) -> io::Result<()> {
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}

/// Deletes the scratch file on drop unless disarmed.
struct ScratchGuard {
    path: PathBuf,
    armed: bool,
}

impl ScratchGuard {
    fn new(path: PathBuf) -> Self {
        ScratchGuard { path, armed: false }
    }

    fn arm(&mut self) {
        self.armed = true;
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(scratch = %self.path.display(), "removed scratch file"),
            Err(e) => warn!(
                scratch = %self.path.display(),
                error = %e,
                "failed to remove scratch file"
            ),
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

pub fn backup_path(path: &Path) -> PathBuf {
    with_suffix(path, BACKUP_SUFFIX)
}

pub fn scratch_path(path: &Path) -> PathBuf {
    with_suffix(path, SCRATCH_SUFFIX)
}

pub fn has_backup_suffix(path: &Path) -> bool {
    path.as_os_str()
        .to_string_lossy()
        .ends_with(BACKUP_SUFFIX)
}

pub fn convert_file(path: &Path, rule: ConversionRule) -> Result<FileOutcome, ConvertError> {
    convert_file_with(path, rule, &DiskScratch)
}

pub fn convert_file_with<S: ScratchStore>(
    path: &Path,
    rule: ConversionRule,
    store: &S,
) -> Result<FileOutcome, ConvertError> {
    if has_backup_suffix(path) {
        debug!(path = %path.display(), "skipping file with backup suffix");
        return Ok(FileOutcome::SkippedBackup);
    }

    let backup = backup_path(path);
    let scratch = scratch_path(path);

    // Declared before the writer so the writer is closed before any removal.
    let mut guard = ScratchGuard::new(scratch.clone());
    let mut writer = store.create(&scratch).map_err(|source| {
        if source.kind() == ErrorKind::AlreadyExists {
            ConvertError::ScratchExists {
                scratch: scratch.clone(),
            }
        } else {
            ConvertError::CreateScratch {
                scratch: scratch.clone(),
                source,
            }
        }
    })?;
    guard.arm();
    debug!(scratch = %scratch.display(), "created scratch file");

    let original = File::open(path).map_err(|source| ConvertError::OpenOriginal {
        path: path.to_path_buf(),
        source,
    })?;
    let permissions = original
        .metadata()
        .map_err(|source| ConvertError::OpenOriginal {
            path: path.to_path_buf(),
            source,
        })?
        .permissions();

    let changed = transduce(&original, &mut writer, rule).map_err(|e| match e {
        TransduceError::Read(source) => ConvertError::Read {
            path: path.to_path_buf(),
            source,
        },
        TransduceError::Write(source) => ConvertError::Write {
            scratch: scratch.clone(),
            source,
        },
    })?;
    drop(original);

    if !changed {
        debug!(path = %path.display(), rule = %rule, "already compliant");
        return Ok(FileOutcome::Unchanged);
    }

    store
        .close(writer)
        .map_err(|source| ConvertError::CloseScratch {
            scratch: scratch.clone(),
            source,
        })?;
    store
        .set_permissions(&scratch, permissions)
        .map_err(|source| ConvertError::Permissions {
            scratch: scratch.clone(),
            source,
        })?;
    debug!(scratch = %scratch.display(), "scratch file closed");

    // From here on the scratch file holds the only converted copy.
    guard.disarm();

    if fs::symlink_metadata(&backup).is_ok() {
        return Err(ConvertError::BackupExists { backup, scratch });
    }

    if let Err(source) = fs::rename(path, &backup) {
        return Err(ConvertError::BackupRename {
            backup,
            scratch,
            source,
        });
    }
    debug!(path = %path.display(), backup = %backup.display(), "original moved to backup");

    if let Err(source) = fs::rename(&scratch, path) {
        return Err(ConvertError::Promote {
            backup,
            scratch,
            source,
        });
    }
    debug!(path = %path.display(), "converted file promoted");

    Ok(FileOutcome::Converted { backup })
}
