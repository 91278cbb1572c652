//! Tracing subscriber setup for the front end.

use std::io;

use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter that overrides `-v`.
pub const LOG_ENV: &str = "BLOCKDELTA_LOG";

/// Maps the number of `-v` flags to a default filter directive.
pub(crate) const fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs a stderr `fmt` subscriber once per process.
///
/// Later calls are ignored, so repeated [`run`](crate::run) invocations in one
/// process keep the first configuration.
pub(crate) fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_the_default_level() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(1), "info");
        assert_eq!(default_directive(2), "debug");
        assert_eq!(default_directive(7), "trace");
    }
}
