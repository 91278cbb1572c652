#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` implements the command-line front end of the `blockdelta`
//! workspace. It recognises three commands:
//!
//! - `signature BASE` builds a signature map and prints a summary, or every
//!   block descriptor with `--json`.
//! - `delta BASE TARGET` scans TARGET against BASE's map and writes the
//!   binary delta encoding (or a JSON script with `--json`).
//! - `patch BASE DELTA` decodes a binary delta and rebuilds the target.
//!
//! # Design
//!
//! The crate exposes [`run`] as the primary entry point. The function accepts
//! an iterator of arguments together with handles for standard output and
//! error, so tests can drive it in-process. A [`clap`](https://docs.rs/clap/)
//! builder command performs the parse; sizes, algorithms and operands are
//! then handed to the `signature` and `matching` crates.
//!
//! # Invariants
//!
//! - `run` never panics; failures surface as non-zero exit codes.
//! - Diagnostics go to the error handle, primary output to the output handle
//!   or the `--output` file.
//! - Logging is installed once per process through `tracing-subscriber`,
//!   writing to standard error.
//!
//! # Errors
//!
//! | code | meaning                                                 |
//! |------|---------------------------------------------------------|
//! | 1    | usage error, invalid sizes or algorithms, malformed delta |
//! | 2    | an operand cannot be opened or is not seekable          |
//! | 3    | I/O failure while reading or writing                    |
//! | 130  | cancelled                                               |
//!
//! # Examples
//!
//! ```
//! let mut stdout = Vec::new();
//! let mut stderr = Vec::new();
//! let exit_code = cli::run(["blockdelta", "--version"], &mut stdout, &mut stderr);
//!
//! assert_eq!(exit_code, 0);
//! assert!(String::from_utf8(stdout).unwrap().starts_with("blockdelta "));
//! assert!(stderr.is_empty());
//! ```

use std::ffi::OsString;
use std::io::Write;

mod arguments;
mod commands;
mod error;
mod logging;

pub use error::{CliError, EXIT_CANCELLED, EXIT_IO, EXIT_STREAM_STATE, EXIT_USAGE};
pub use logging::LOG_ENV;

use arguments::{PROGRAM_NAME, parse_args};

/// Largest exit status representable by a process.
const MAX_EXIT_CODE: i32 = 255;

/// Runs the CLI using the provided argument iterator and output handles.
///
/// Returns the process exit code: `0` on success, otherwise
/// [`CliError::exit_code`] of the failure.
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Out: Write,
    Err: Write,
{
    let parsed = match parse_args(arguments) {
        Ok(parsed) => parsed,
        Err(error) => return report(&error, stderr),
    };
    logging::init_tracing(parsed.verbosity);
    match commands::execute(parsed.invocation, stdout) {
        Ok(()) => 0,
        Err(error) => report(&error, stderr),
    }
}

fn report<Err: Write>(error: &CliError, stderr: &mut Err) -> i32 {
    let _ = match error {
        CliError::Usage(text) => writeln!(stderr, "{}", text.trim_end()),
        other => writeln!(stderr, "{PROGRAM_NAME}: error: {other}"),
    };
    error.exit_code()
}

/// Converts a numeric exit code into an [`std::process::ExitCode`].
#[must_use]
pub fn exit_code_from(status: i32) -> std::process::ExitCode {
    let clamped = status.clamp(0, MAX_EXIT_CODE);
    std::process::ExitCode::from(clamped as u8)
}
