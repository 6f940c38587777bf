use axum_helpers::SharedSecret;
use core_config::{AppInfo, FromEnv, app_info, env_optional, env_or_default, server::ServerConfig};
use std::path::PathBuf;

pub use core_config::Environment;

/// Application configuration.
/// Composes shared config components from the `core_config` library.
///
/// Sender settings are deliberately absent: they are read by
/// `SenderSettings::from_env` so a bad value disables sending instead of
/// stopping the process.
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    /// `TEMPLATES_DIR`, default `templates`
    pub templates_dir: PathBuf,
    /// `API_KEY`; when unset the API is served without the shared-secret check.
    pub api_key: Option<SharedSecret>,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?; // HOST=0.0.0.0, PORT=63001 by default

        Ok(Self {
            app: app_info!(),
            environment,
            server,
            templates_dir: PathBuf::from(env_or_default("TEMPLATES_DIR", "templates")),
            api_key: env_optional("API_KEY").map(SharedSecret::new),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        temp_env::with_vars_unset(["APP_ENV", "HOST", "PORT", "TEMPLATES_DIR", "API_KEY"], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.environment, Environment::Development);
            assert_eq!(config.server.port, 63001);
            assert_eq!(config.templates_dir, PathBuf::from("templates"));
            assert!(config.api_key.is_none());
            assert_eq!(config.app.name, "mailer");
        });
    }

    #[test]
    fn test_overrides() {
        temp_env::with_vars(
            [
                ("APP_ENV", Some("Production")),
                ("PORT", Some("8080")),
                ("TEMPLATES_DIR", Some("/srv/templates")),
                ("API_KEY", Some("s3cret")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.environment, Environment::Production);
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.templates_dir, PathBuf::from("/srv/templates"));
                assert!(config.api_key.unwrap().matches("s3cret"));
            },
        );
    }

    #[test]
    fn test_blank_api_key_disables_check() {
        temp_env::with_var("API_KEY", Some("   "), || {
            assert!(Config::from_env().unwrap().api_key.is_none());
        });
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        temp_env::with_var("PORT", Some("not-a-port"), || {
            assert!(Config::from_env().is_err());
        });
    }
}
