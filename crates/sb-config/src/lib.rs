//! # sb-config
//!
//! Runtime settings: built-in defaults, then `.env`, then `SERENE_*`
//! environment variables (e.g. `SERENE_PORT=9000`, `SERENE_POST_ORDER=chronological`).

use config::{Config, Environment};
use sb_core::sync::PostOrder;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// JSON file holding the initial document tree.
    pub seed_path: String,
    pub post_order: PostOrder,
    /// Default `env_logger` filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Account registered at startup, if both are set.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Settings {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_environment(Environment::with_prefix("SERENE"))
    }

    pub fn from_environment(environment: Environment) -> anyhow::Result<Self> {
        let settings = Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8080_i64)?
            .set_default("seed_path", "data/blogs.json")?
            .set_default("post_order", "store_key")?
            .set_default("log_level", "info")?
            .add_source(environment.try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix("SERENE").source(Some(source))
    }

    #[test]
    fn defaults_apply_without_environment() {
        let settings = Settings::from_environment(env(&[])).unwrap();

        assert_eq!(settings.bind_address(), ("127.0.0.1".to_string(), 8080));
        assert_eq!(settings.seed_path, "data/blogs.json");
        assert_eq!(settings.post_order, PostOrder::StoreKey);
        assert_eq!(settings.log_level, "info");
        assert!(settings.admin_email.is_none());
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = Settings::from_environment(env(&[
            ("SERENE_PORT", "9000"),
            ("SERENE_POST_ORDER", "chronological"),
            ("SERENE_ADMIN_EMAIL", "owner@serene.spa"),
        ]))
        .unwrap();

        assert_eq!(settings.port, 9000);
        assert_eq!(settings.post_order, PostOrder::Chronological);
        assert_eq!(settings.admin_email.as_deref(), Some("owner@serene.spa"));
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(Settings::from_environment(env(&[("SERENE_PORT", "not-a-port")])).is_err());
    }
}
