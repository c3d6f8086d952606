//! Logging setup for the provider binary.
//!
//! All output goes to **stderr**; stdout carries only the handshake line.
//! Filtering follows `RUST_LOG`, falling back to a default directive.
//!
//! ```bash
//! # Debug logs for the provider only
//! RUST_LOG=k8s_crd_provider=debug ./k8s-crd-provider
//!
//! # Everything, including tonic and h2
//! RUST_LOG=debug ./k8s-crd-provider
//! ```

use tracing_subscriber::fmt::format::{Compact, DefaultFields, Format};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// Directive used when `RUST_LOG` is not set.
pub const DEFAULT_DIRECTIVE: &str = "info";

fn filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

fn stderr_layer(
) -> fmt::Layer<Registry, DefaultFields, Format<Compact>, fn() -> std::io::Stderr> {
    fmt::layer()
        .compact()
        .with_writer(std::io::stderr as fn() -> std::io::Stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
}

/// Install the global subscriber with the `info` default.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default(DEFAULT_DIRECTIVE);
}

/// Install the global subscriber, using `default_directive` when `RUST_LOG`
/// is unset (e.g. `"debug"` or `"warn,k8s_crd_provider=debug"`).
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_directive: &str) {
    tracing_subscriber::registry()
        .with(stderr_layer())
        .with(filter(default_directive))
        .init();
}

/// Like [`init_logging`], but returns `false` instead of panicking when a
/// subscriber is already installed.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(stderr_layer())
        .with(filter(DEFAULT_DIRECTIVE))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_parse() {
        assert!(EnvFilter::try_new(DEFAULT_DIRECTIVE).is_ok());
        assert!(EnvFilter::try_new("k8s_crd_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,k8s_crd_provider::resource=trace").is_ok());
    }

    #[test]
    fn test_try_init_twice() {
        // The first call may lose to another test in this process.
        let _ = try_init_logging();
        assert!(!try_init_logging());
    }
}
