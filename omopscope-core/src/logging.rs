//! Logging setup for the omopscope binary.
//!
//! The library only emits `tracing` events; nothing is installed until a
//! caller asks for it.

use crate::Result;

/// Maps CLI verbosity flags to a maximum log level.
pub fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::WARN,
        (false, 1) => tracing::Level::INFO,
        (false, 2) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

/// Initializes structured logging on stderr.
///
/// `quiet` wins over any `verbose` count. Fails if a global subscriber is
/// already installed.
///
/// # Example
/// ```rust,no_run
/// use omopscope_core::logging::init_logging;
///
/// init_logging(2, false).expect("subscriber already installed");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(level_for(verbose, quiet))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| crate::error::OmopError::configuration(format!("logging: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // A subscriber can only be installed once per process, so only the
    // level mapping is checked here.
    #[test]
    fn test_verbosity_levels() {
        let cases = [
            ((true, 0), tracing::Level::ERROR),
            ((true, 5), tracing::Level::ERROR),
            ((false, 0), tracing::Level::WARN),
            ((false, 1), tracing::Level::INFO),
            ((false, 2), tracing::Level::DEBUG),
            ((false, 9), tracing::Level::TRACE),
        ];

        for ((quiet, verbose), expected) in cases {
            assert_eq!(level_for(verbose, quiet), expected, "-q={quiet} -v x{verbose}");
        }
    }
}
