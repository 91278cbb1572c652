//! Errors surfaced by the front end and their exit codes.

use std::io;
use std::path::PathBuf;

use matching::{DeltaError, ScriptError};
use signature::{ConfigError, SignatureError, StreamStateError};
use thiserror::Error;

/// Usage errors, invalid configuration and malformed deltas.
pub const EXIT_USAGE: i32 = 1;
/// An operand cannot be used as a stream in the requested way.
pub const EXIT_STREAM_STATE: i32 = 2;
/// Reading or writing a stream failed.
pub const EXIT_IO: i32 = 3;
/// The operation was cancelled.
pub const EXIT_CANCELLED: i32 = 130;

/// Failure of a CLI invocation.
#[derive(Debug, Error)]
pub enum CliError {
    /// The command line could not be parsed.
    #[error("{0}")]
    Usage(String),
    /// An option value was rejected.
    #[error("invalid {option} '{value}': {reason}")]
    InvalidValue {
        /// The option, including leading dashes.
        option: String,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// Block or buffer sizing was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// An operand could not be used as a stream.
    #[error(transparent)]
    StreamState(#[from] StreamStateError),
    /// Building the signature map failed.
    #[error(transparent)]
    Signature(#[from] SignatureError),
    /// Scanning the target failed.
    #[error(transparent)]
    Delta(#[from] DeltaError),
    /// The delta file was malformed.
    #[error("invalid delta: {0}")]
    Script(#[from] ScriptError),
    /// Reading or writing a file failed.
    #[error("{}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Writing to standard output failed.
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
    /// Rendering JSON failed.
    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Returns the process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::InvalidValue { .. } | Self::Config(_) | Self::Json(_) => {
                EXIT_USAGE
            }
            Self::StreamState(_) => EXIT_STREAM_STATE,
            Self::Io { .. } | Self::Output(_) => EXIT_IO,
            Self::Signature(error) => match error {
                SignatureError::Config(_)
                | SignatureError::NonContiguousBlock { .. }
                | SignatureError::BlockLength { .. } => EXIT_USAGE,
                SignatureError::StreamState(_) => EXIT_STREAM_STATE,
                SignatureError::Io(_) => EXIT_IO,
                SignatureError::Cancelled { .. } => EXIT_CANCELLED,
            },
            Self::Delta(error) => match error {
                DeltaError::Config(_)
                | DeltaError::PrecursorMissing
                | DeltaError::BlockSizeMismatch { .. } => EXIT_USAGE,
                DeltaError::Script(error) => script_exit_code(error),
                DeltaError::StreamState(_) => EXIT_STREAM_STATE,
                DeltaError::Io(_) => EXIT_IO,
                DeltaError::Cancelled { .. } => EXIT_CANCELLED,
            },
            Self::Script(error) => script_exit_code(error),
        }
    }
}

const fn script_exit_code(error: &ScriptError) -> i32 {
    match error {
        ScriptError::Io(_) => EXIT_IO,
        _ => EXIT_USAGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(CliError::Usage("x".into()).exit_code(), EXIT_USAGE);
        assert_eq!(
            CliError::Config(ConfigError::ZeroBlockSize).exit_code(),
            EXIT_USAGE
        );
        assert_eq!(
            CliError::StreamState(StreamStateError::NotSeekable { what: "base" }).exit_code(),
            EXIT_STREAM_STATE
        );
        assert_eq!(
            CliError::Signature(SignatureError::Io(io::Error::other("x"))).exit_code(),
            EXIT_IO
        );
        assert_eq!(
            CliError::Delta(DeltaError::Cancelled { offset: 9 }).exit_code(),
            EXIT_CANCELLED
        );
        assert_eq!(
            CliError::Delta(DeltaError::PrecursorMissing).exit_code(),
            EXIT_USAGE
        );
        assert_eq!(CliError::Script(ScriptError::Truncated).exit_code(), EXIT_USAGE);
    }
}
