use rail_core::Role;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout() -> u64 { 3 }

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_expiration")]
    pub jwt_expiration_seconds: u64,
    #[serde(default)]
    pub default_role: Role,
}

fn default_expiration() -> u64 { 3600 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `RAIL__AUTH__JWT_SECRET=...`
            .add_source(config::Environment::with_prefix("RAIL").separator("__"))
            .build()?;

        let config: Config = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "auth.jwt_secret must be set (RAIL__AUTH__JWT_SECRET)".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Result<Config, config::ConfigError> {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_defaults_apply() {
        let config = from_toml(
            r#"
            [server]
            port = 8080
            [database]
            url = "postgres://localhost/rail"
            [auth]
            jwt_secret = "s3cret"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.auth.jwt_expiration_seconds, 3600);
        assert_eq!(config.auth.default_role, Role::User);
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        let result = from_toml(
            r#"
            [server]
            port = 8080
            [database]
            url = "postgres://localhost/rail"
            [auth]
            jwt_secret = ""
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_default_role_is_rejected() {
        let result = from_toml(
            r#"
            [server]
            port = 8080
            [database]
            url = "postgres://localhost/rail"
            [auth]
            jwt_secret = "s3cret"
            default_role = "superuser"
            "#,
        );
        assert!(result.is_err());
    }
}
