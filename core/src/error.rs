//! Error types for the core crate
//!
//! This module provides the consolidated error type for the core crate and the
//! load error raised while resolving and reading fixture directories.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::reader::ReadError;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Identifier was blank or otherwise unusable
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Table rows do not line up with the table columns
    #[error("Invalid table: {0}")]
    InvalidTable(String),

    /// Data set construction error
    #[error("Invalid data set: {0}")]
    InvalidDataSet(String),

    /// Request could not be turned into a fixture phase
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Fixture directory could not be resolved or loaded
    #[error(transparent)]
    Load(#[from] LoadError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for the core crate
pub type Result<T> = std::result::Result<T, CoreError>;

/// Failure to resolve or load a fixture directory.
///
/// Every variant names the path (or paths) involved so a failing test phase can
/// point at the resource it could not use.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Neither an explicit location nor a convention path was supplied
    #[error("No fixture location given and no test identity to derive one from")]
    NoLocation,

    /// Explicit location uses a scheme that is not understood
    #[error("Unsupported fixture location '{location}'")]
    UnsupportedLocation {
        /// Location as written by the caller
        location: String,
    },

    /// None of the candidate directories exist
    #[error("Fixture directory not found, tried: {}", display_paths(.attempted))]
    DirectoryNotFound {
        /// Every path that was tried, in resolution order
        attempted: Vec<PathBuf>,
    },

    /// Resolved path exists but is a file
    #[error("Fixture location {} is not a directory", .path.display())]
    NotADirectory {
        /// Offending path
        path: PathBuf,
    },

    /// Directory holds no file with a registered reader
    #[error("Fixture directory {} contains no loadable files", .path.display())]
    NoLoadableFiles {
        /// Directory that was scanned
        path: PathBuf,
    },

    /// Two files map to the same table name
    #[error("Fixture directory {} defines table '{table}' more than once", .path.display())]
    DuplicateTable {
        /// Directory that was scanned
        path: PathBuf,
        /// Table name derived from more than one file
        table: String,
    },

    /// Enumerating or opening a path failed
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: io::Error,
    },

    /// A reader rejected a file
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        /// File being read
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: ReadError,
    },

    /// File content could not be turned into a table
    #[error("Invalid fixture data in {}: {reason}", .path.display())]
    InvalidData {
        /// File being read
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },
}

impl LoadError {
    /// Wrap an IO error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        LoadError::Io {
            path: path.into(),
            source,
        }
    }

    /// Paths this error refers to, in the order they were tried
    pub fn paths(&self) -> Vec<PathBuf> {
        match self {
            LoadError::NoLocation | LoadError::UnsupportedLocation { .. } => Vec::new(),
            LoadError::DirectoryNotFound { attempted } => attempted.clone(),
            LoadError::NotADirectory { path }
            | LoadError::NoLoadableFiles { path }
            | LoadError::DuplicateTable { path, .. }
            | LoadError::Io { path, .. }
            | LoadError::Read { path, .. }
            | LoadError::InvalidData { path, .. } => vec![path.clone()],
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convert a displayable error to an InvalidIdentifier
pub fn to_identifier_error<E: std::fmt::Display>(err: E) -> CoreError {
    CoreError::InvalidIdentifier(err.to_string())
}

/// Convert a displayable error to an InvalidTable
pub fn to_table_error<E: std::fmt::Display>(err: E) -> CoreError {
    CoreError::InvalidTable(err.to_string())
}

/// Convert a displayable error to a ConfigError
pub fn to_config_error<E: std::fmt::Display>(err: E) -> CoreError {
    CoreError::ConfigError(err.to_string())
}

/// Convert a displayable error to an InvalidRequest
pub fn to_request_error<E: std::fmt::Display>(err: E) -> CoreError {
    CoreError::InvalidRequest(err.to_string())
}
