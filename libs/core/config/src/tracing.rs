use crate::Environment;
use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Install color-eyre report hooks for binaries.
///
/// Reports show the error location but not the environment section. Safe to
/// call more than once.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Filter directives used when `RUST_LOG` is unset.
///
/// Broker and HTTP client internals are kept quiet; in production only
/// their warnings get through.
pub fn default_directives(environment: &Environment) -> &'static str {
    if environment.is_production() {
        "info,async_nats=warn,reqwest=warn,hyper=warn"
    } else {
        "debug,async_nats=info,hyper=info,reqwest=info"
    }
}

fn filter(environment: &Environment) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(environment)))
}

/// Initialize the global subscriber for a worker process.
///
/// - **Production** (`APP_ENV=production`): flattened JSON events, no targets.
/// - **Development**: pretty multi-line events.
///
/// Both variants install `tracing_error::ErrorLayer` so `eyre` reports carry
/// span traces, and honour `RUST_LOG` through `EnvFilter`. A second call is a
/// no-op.
///
/// ```ignore
/// use tracing::instrument;
/// use eyre::{Result, WrapErr};
///
/// #[instrument(skip(catalog), fields(user_id = %user_id))]
/// async fn load_user(catalog: &Catalog, user_id: i64) -> Result<User> {
///     catalog
///         .find_user(user_id)
///         .await
///         .wrap_err("Failed to load user")
/// }
/// ```
pub fn init_tracing(environment: &Environment) {
    let registry = tracing_subscriber::registry()
        .with(tracing_error::ErrorLayer::default())
        .with(filter(environment));

    let result = if environment.is_production() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false).pretty())
            .try_init()
    };

    match result {
        Ok(()) => info!(environment = ?environment, "Tracing initialized"),
        Err(_) => debug!("Tracing already initialized"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_quiet_broker_in_production() {
        let directives = default_directives(&Environment::Production);
        assert!(directives.starts_with("info"));
        assert!(directives.contains("async_nats=warn"));
        assert!(default_directives(&Environment::Development).starts_with("debug"));
    }

    #[test]
    fn test_default_directives_parse() {
        for environment in [Environment::Development, Environment::Production] {
            assert!(EnvFilter::try_new(default_directives(&environment)).is_ok());
        }
    }

    #[test]
    fn test_init_tracing_twice() {
        init_tracing(&Environment::Development);
        init_tracing(&Environment::Production);
    }

    #[test]
    fn test_init_tracing_with_rust_log() {
        temp_env::with_var("RUST_LOG", Some("recs_ml_worker=trace"), || {
            init_tracing(&Environment::Production);
        });
    }
}
