//! tracing-subscriber setup
//!
//! Logs go to stderr so that stdout carries nothing but the CSV output.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global subscriber
///
/// `RUST_LOG` overrides `config.level`. Returns `false` when a subscriber
/// was already installed, which makes repeated calls (tests, benches) safe.
pub fn init(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        let layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_ansi(false);
        registry.with(layer).try_init().is_ok()
    } else {
        let layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        registry.with(layer).try_init().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let config = LoggingConfig {
            level: "not a [valid filter".to_string(),
            json: false,
        };
        init(&config);
        assert!(!init(&LoggingConfig::default()));
    }
}
