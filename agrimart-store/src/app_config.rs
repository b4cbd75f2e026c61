use serde::Deserialize;
use agrimart_shared::Masked;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_complaint_window")]
    pub complaint_window_hours: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            complaint_window_hours: default_complaint_window(),
            currency: default_currency(),
        }
    }
}

fn default_complaint_window() -> i64 { 24 }
fn default_currency() -> String { "INR".to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
    /// Seeded as an admin on startup when set
    pub admin_email: Option<String>,
    /// The seeded admin's login password. Without it the admin account
    /// exists but cannot obtain a token.
    pub admin_password: Option<Masked<String>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// No URL means the in-memory store
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: None, max_connections: default_max_connections() }
    }
}

fn default_max_connections() -> u32 { 5 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `AGRIMART__DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("AGRIMART").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let cfg: Config = config::Config::builder()
            .set_override("server.port", 8080)
            .unwrap()
            .set_override("auth.jwt_secret", "secret")
            .unwrap()
            .set_override("auth.jwt_expiration_seconds", 3600)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(cfg.database.url.is_none());
        assert!(cfg.auth.admin_password.is_none());
        assert_eq!(cfg.database.max_connections, 5);
        assert_eq!(cfg.business_rules.complaint_window_hours, 24);
        assert_eq!(cfg.business_rules.currency, "INR");
    }
}
