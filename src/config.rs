use std::env;
use std::net::SocketAddr;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set when {1} is set")]
    Missing(&'static str, &'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Postgres connection string. Without it the service keeps data in memory.
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Hosted auth backend. Without it accounts live in memory.
    pub backend: Option<BackendConfig>,
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid {
                    name: "DATABASE_MAX_CONNECTIONS",
                    value,
                })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let backend = match (get("BACKEND_URL"), get("BACKEND_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(BackendConfig { url, anon_key }),
            (Some(_), None) => return Err(ConfigError::Missing("BACKEND_ANON_KEY", "BACKEND_URL")),
            (None, _) => None,
        };

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned());
        let bind_addr = bind_addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid {
                name: "BIND_ADDR",
                value: bind_addr.clone(),
            })?;

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_owned())
            .split(',')
            .map(|origin| origin.trim().to_owned())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Config {
            database_url: get("DATABASE_URL"),
            max_connections,
            backend,
            bind_addr,
            cors_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_run_everything_in_memory() {
        let config = config(&[]).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.backend, None);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.bind_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.cors_origins, vec!["http://localhost:3000"]);
    }

    #[test]
    fn reads_every_setting() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/plush"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("BACKEND_URL", "https://project.example.co"),
            ("BACKEND_ANON_KEY", "anon"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("CORS_ORIGINS", "https://a.example, https://b.example,"),
        ])
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/plush"));
        assert_eq!(config.max_connections, 12);
        assert_eq!(
            config.backend,
            Some(BackendConfig {
                url: String::from("https://project.example.co"),
                anon_key: String::from("anon"),
            })
        );
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn backend_url_needs_a_key() {
        assert_eq!(
            config(&[("BACKEND_URL", "https://project.example.co")]),
            Err(ConfigError::Missing("BACKEND_ANON_KEY", "BACKEND_URL"))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            config(&[("BIND_ADDR", "localhost")]),
            Err(ConfigError::Invalid { name: "BIND_ADDR", .. })
        ));
        assert!(matches!(
            config(&[("DATABASE_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
