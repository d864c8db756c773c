//! Program persistence, consumed by the application and never called
//! from the audio thread.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use synth_core::program::Program;

use crate::format;

/// Errors returned by a [`ProgramStorage`] implementation.
#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Parse(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "program storage I/O error: {}", e),
            Self::Parse(msg) => write!(f, "program storage parse error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// A capability the embedder passes to the application: load and save
/// numbered programs. Never invoked from the audio render thread;
/// program load/save is an explicit out-of-band request.
pub trait ProgramStorage {
    fn load(&self, program_number: u32) -> Result<Program, StorageError>;
    fn save(&self, program_number: u32, program: &Program) -> Result<(), StorageError>;
}

/// A `ProgramStorage` backed by one text file per program number in a
/// directory.
pub struct FilesystemProgramStorage {
    directory: PathBuf,
}

impl FilesystemProgramStorage {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into() }
    }

    fn path_for(&self, program_number: u32) -> PathBuf {
        self.directory.join(format!("program_{:04}.txt", program_number))
    }
}

impl ProgramStorage for FilesystemProgramStorage {
    fn load(&self, program_number: u32) -> Result<Program, StorageError> {
        let path = self.path_for(program_number);
        let text = fs::read_to_string(&path).map_err(|e| {
            log::warn!("failed to load program {} from {}: {}", program_number, path.display(), e);
            StorageError::Io(e)
        })?;
        Ok(format::deserialize(&text))
    }

    fn save(&self, program_number: u32, program: &Program) -> Result<(), StorageError> {
        let path = self.path_for(program_number);
        let text = format::serialize(program);
        fs::write(&path, text).map_err(|e| {
            log::error!("failed to save program {} to {}: {}", program_number, path.display(), e);
            StorageError::Io(e)
        })
    }
}

/// Helper used by tests to point a `FilesystemProgramStorage` at a
/// scratch directory that already exists.
#[cfg(test)]
fn ensure_dir(path: &Path) {
    fs::create_dir_all(path).unwrap();
}
