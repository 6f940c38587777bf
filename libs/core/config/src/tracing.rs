use crate::Environment;
use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Install color-eyre for the binary's top-level error reports.
///
/// Shows the file:line section and hides the environment section. Safe to
/// call more than once.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

fn default_filter(environment: &Environment) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if environment.structured_logs() {
            EnvFilter::new("info,tower_http=info,lettre=warn")
        } else {
            EnvFilter::new("debug,hyper=info,rustls=info")
        }
    })
}

/// Initialize tracing for the given environment.
///
/// - staging / production: flattened JSON events, no module targets
/// - development / test: pretty human-readable output
///
/// `RUST_LOG` overrides the default filter. An `ErrorLayer` is installed in
/// both modes so color-eyre reports carry span traces. Calling this twice is
/// harmless; the second call only logs at debug level.
pub fn init_tracing(environment: &Environment) {
    let filter = default_filter(environment);

    let result = if environment.structured_logs() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false)
                    .pretty(),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    match result {
        Ok(_) => info!(environment = %environment, "Tracing initialized"),
        Err(_) => debug!("Tracing already initialized, skipping re-initialization"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_development() {
        init_tracing(&Environment::Development);
    }

    #[test]
    fn test_init_tracing_multiple_calls() {
        init_tracing(&Environment::Production);
        init_tracing(&Environment::Staging);
        init_tracing(&Environment::Test);
    }

    #[test]
    fn test_init_tracing_with_rust_log_env() {
        temp_env::with_var("RUST_LOG", Some("warn"), || {
            init_tracing(&Environment::Production);
        });
    }
}
