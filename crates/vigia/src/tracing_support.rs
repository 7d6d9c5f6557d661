//! Log subscriber setup for harness runs.
//!
//! Filtering comes from `VIGIA_LOG` (falling back to `RUST_LOG`, then
//! `info`). Installing twice is harmless, so every test may call
//! [`init_tracing`].

use tracing_subscriber::EnvFilter;

/// Filter directive variable
pub const LOG_ENV: &str = "VIGIA_LOG";

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the pretty subscriber; returns whether this call installed it
pub fn init_tracing() -> bool {
    init_tracing_with(LogFormat::Pretty)
}

/// Install a subscriber in `format`; returns whether this call installed it
pub fn init_tracing_with(format: LogFormat) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_test_writer();
    match format {
        LogFormat::Pretty => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        let _ = init_tracing();
        assert!(!init_tracing_with(LogFormat::Json));
        tracing::info!("still logging");
    }
}
