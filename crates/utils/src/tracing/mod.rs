use sandbox_access_core::LOG_ENV_VAR;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use ::tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system.
///
/// The filter is read from `SANDBOX_ACCESS_LOG`, then `RUST_LOG`, and defaults to
/// `info`. Output is a compact formatter on stderr. Calling this a second time
/// returns an error and leaves the first subscriber installed.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new("info"))?;
    install(filter)
}

/// Initialize tracing with an explicit filter directive such as `sandbox_access=debug`
pub fn init_with_filter(
    directive: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    install(EnvFilter::try_new(directive)?)
}

fn install(filter: EnvFilter) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Create a span covering one capability operation on one resource
pub fn resource_span(operation: &'static str, resource: &str) -> Span {
    span!(Level::DEBUG, "capability", operation = operation, resource = %resource)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails_without_panicking() {
        let first = init_with_filter("debug");
        let second = init_with_filter("debug");
        // Another test may have installed a subscriber first
        assert!(first.is_err() || second.is_err());
        assert!(second.is_err());
    }

    #[test]
    fn test_invalid_directive_is_rejected() {
        assert!(init_with_filter("sandbox_access=notalevel").is_err());
    }

    #[test]
    fn test_resource_span_carries_fields() {
        let span = resource_span("recover", "/Users/x/Documents");
        let _guard = span.enter();
        debug!("inside span");
    }
}
