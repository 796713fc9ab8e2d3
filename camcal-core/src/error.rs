// ============================================================================
// camcal-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Custom Error Types for camcal-core
//
// This module defines the error type used throughout the core library. Only
// two situations are recovered locally (a filename that does not match the
// camera pattern, and a camera whose intrinsics file already exists); every
// variant below propagates to the caller and ends the run.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Custom error type for camcal-core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Path error: {0}")]
    PathError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, io::Error),

    #[error("Command '{0}' failed with status {1}. Stderr: {2}")]
    CommandFailed(String, ExitStatus, String),

    #[error("ffprobe output parsing error: {0}")]
    FfprobeParse(String),

    #[error("Video info error: {0}")]
    VideoInfoError(String),

    #[error("Frame decode error: {0}")]
    FrameDecode(String),

    #[error("Marker detection failed: {0}")]
    Detection(String),

    #[error("Calibration failed: {0}")]
    Calibration(String),

    #[error("No usable calibration frames: {0}")]
    NoUsableFrames(String),

    #[error("No vision backend available: {0}")]
    BackendUnavailable(String),

    #[error("Failed to encode intrinsics: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Failed to read intrinsics file '{path}': {message}")]
    IntrinsicsParse { path: PathBuf, message: String },
}

/// Result type alias for camcal-core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Creates a `CommandStart` error for a process that could not be launched.
pub fn command_start_error(command: impl Into<String>, error: io::Error) -> CoreError {
    CoreError::CommandStart(command.into(), error)
}

/// Creates a `CommandFailed` error for a process that exited unsuccessfully.
pub fn command_failed_error(
    command: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed(command.into(), status, stderr.into())
}
