pub mod file_finder;
pub mod replacer;
pub mod rule;
pub mod transducer;

pub use file_finder::{
    CliArgs, Command, CompletionArgs, GuardError, MAX_RECURSION_DEPTH, PatternError,
    TabspaceArgs, check_pattern, check_working_dir, find_matches,
};
pub use replacer::{
    ConvertError, DiskScratch, FileOutcome, ScratchStore, backup_path, convert_file,
    convert_file_with, has_backup_suffix, scratch_path,
};
pub use rule::ConversionRule;
pub use transducer::{TransduceError, Transducer, TransducerState, normalize, transduce};

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl CoreError {
    /// Process exit status for a run aborted by this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CoreError::Pattern(_) => 2,
            CoreError::Io(_) | CoreError::Anyhow(_) => 3,
            CoreError::Guard(_) => 4,
        }
    }
}

/// Current directory, provided it is deep enough to run in.
pub fn working_dir() -> Result<PathBuf, CoreError> {
    let dir = std::env::current_dir()?;
    check_working_dir(&dir)?;
    Ok(dir)
}
