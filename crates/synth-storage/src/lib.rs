//! Program persistence for the synth engine: a human-readable
//! `key=value` text format and a filesystem-backed store.
//!
//! Kept as a separate crate from `synth-core` because persistence is
//! an external collaborator reached through a narrow interface, not
//! part of the real-time core.

pub mod format;
pub mod storage;

pub use storage::{FilesystemProgramStorage, ProgramStorage, StorageError};
