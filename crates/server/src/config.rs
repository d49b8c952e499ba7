//! Server configuration.
//!
//! The option table is, literally, a set of environment variables — so
//! unlike the director's TOML-file config this loads straight from the
//! process environment, no config file. Loading is eager: a missing
//! required credential is a startup error, never a deferred failure the
//! first time an agent tries to act. `main` layers a couple of
//! `clap`-parsed CLI flags on top for local iteration; everything those
//! flags set has an environment-variable equivalent here.

use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEnv {
    Development,
    Production,
}

/// Complete server configuration, assembled once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// CORS origin accepted for the game socket.
    pub client_url: String,
    pub port: u16,
    /// Oracle credential. Required; absence is a startup error.
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub openai_model: String,
    pub node_env: NodeEnv,
}

impl ServerConfig {
    /// Reads the recognised options from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_url = env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let port = match env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue { name: "PORT", value: raw })?,
            Err(_) => 8080,
        };

        let openai_api_key = env::var("OPENAI_API_KEY").map_err(|_| ConfigError::MissingVar("OPENAI_API_KEY"))?;
        let openai_base_url = env::var("OPENAI_BASE_URL").ok();
        let openai_model = env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let node_env = match env::var("NODE_ENV").as_deref() {
            Ok("production") => NodeEnv::Production,
            _ => NodeEnv::Development,
        };

        Ok(Self { client_url, port, openai_api_key, openai_base_url, openai_model, node_env })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serialises env-mutating tests; `std::env` is process-global.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for key in ["CLIENT_URL", "PORT", "OPENAI_API_KEY", "OPENAI_BASE_URL", "OPENAI_MODEL", "NODE_ENV"] {
            env::remove_var(key);
        }
    }

    #[test]
    fn missing_api_key_is_a_startup_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        let result = ServerConfig::from_env();
        assert!(matches!(result, Err(ConfigError::MissingVar("OPENAI_API_KEY"))));
    }

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("OPENAI_API_KEY", "sk-test");
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.node_env, NodeEnv::Development);
        clear_all();
    }

    #[test]
    fn explicit_port_overrides_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("OPENAI_API_KEY", "sk-test");
        env::set_var("PORT", "9001");
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 9001);
        clear_all();
    }
}
