//! Logging setup and configuration

use crate::types::CamrollError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter directive for a `-v` count when `RUST_LOG` is unset
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "camroll=warn",
        1 => "camroll=info",
        2 => "camroll=debug",
        _ => "trace",
    }
}

/// Setup tracing subscriber for the application
///
/// Diagnostics go to stderr so progress output and `--json` on stdout stay clean.
pub fn setup_logging(verbosity: u8) -> Result<(), CamrollError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level(verbosity)))
        .map_err(|e| CamrollError::Config(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .map_err(|e| CamrollError::Config(format!("Logging already initialised: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_by_verbosity() {
        assert_eq!(default_level(0), "camroll=warn");
        assert_eq!(default_level(2), "camroll=debug");
        assert_eq!(default_level(9), "trace");
    }

    #[test]
    fn test_default_levels_parse() {
        for verbosity in 0..4 {
            assert!(EnvFilter::try_new(default_level(verbosity)).is_ok());
        }
    }
}
