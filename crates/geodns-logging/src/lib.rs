//! # geodns-logging
//!
//! Structured logging with `tracing`.
//!
//! Installs a global subscriber with an `EnvFilter` (`RUST_LOG` wins over
//! the configured level) and a stdout `fmt` layer in pretty or JSON form.

#![deny(unsafe_code)]

mod types;

pub use types::{LogFormat, LogLevel};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Build an `EnvFilter` directive from a default level plus per-module overrides.
///
/// ```text
/// filter_directive(Info, &[("geodns_server", Debug)]) == "info,geodns_server=debug"
/// ```
pub fn filter_directive(level: LogLevel, module_levels: &[(String, LogLevel)]) -> String {
    let mut directive = level.as_filter_str().to_string();
    for (module, module_level) in module_levels {
        directive.push(',');
        directive.push_str(module);
        directive.push('=');
        directive.push_str(module_level.as_filter_str());
    }
    directive
}

/// Install the global tracing subscriber.
///
/// `default_directive` applies only when `RUST_LOG` is unset or invalid.
/// Fails if a global subscriber is already installed.
pub fn init_subscriber(default_directive: &str, format: LogFormat) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_without_overrides() {
        assert_eq!(filter_directive(LogLevel::Warn, &[]), "warn");
    }

    #[test]
    fn directive_with_overrides() {
        let overrides = vec![
            ("geodns_server".to_string(), LogLevel::Debug),
            ("tower_http".to_string(), LogLevel::Trace),
        ];
        assert_eq!(
            filter_directive(LogLevel::Info, &overrides),
            "info,geodns_server=debug,tower_http=trace"
        );
    }

    #[test]
    fn directive_parses_as_env_filter() {
        let directive = filter_directive(
            LogLevel::Info,
            &[("geodns_core".to_string(), LogLevel::Error)],
        );
        assert!(EnvFilter::try_new(directive).is_ok());
    }
}
