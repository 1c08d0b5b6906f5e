//! Configuration loading and database path resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Server configuration loaded from a TOML file
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub agent_runner_url: Option<String>,
}

fn default_port() -> u16 {
    5750
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_path: None,
            agent_runner_url: None,
        }
    }
}

impl ServerConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Load configuration from a file path, falling back to defaults when
    /// the file does not exist
    pub fn load(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}

/// Database path resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. Compiled default (fallback)
pub fn resolve_database_path(
    cli_arg: Option<&std::path::Path>,
    env_var_name: &str,
    config: &ServerConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    if let Some(ref path) = config.database_path {
        return path.clone();
    }

    PathBuf::from("arena.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let config = ServerConfig::load(std::path::Path::new("/nonexistent/arena.toml")).unwrap();
        assert_eq!(config.port, 5750);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let config = ServerConfig::from_toml(
            r#"
            port = 6000
            database_path = "/var/lib/arena/arena.db"
            agent_runner_url = "http://localhost:5760"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(
            config.database_path.as_deref(),
            Some(std::path::Path::new("/var/lib/arena/arena.db"))
        );
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(ServerConfig::from_toml("port = \"not a number").is_err());
    }

    #[test]
    fn test_cli_argument_wins() {
        let config = ServerConfig {
            database_path: Some(PathBuf::from("/from/config.db")),
            ..Default::default()
        };
        let resolved = resolve_database_path(
            Some(std::path::Path::new("/from/cli.db")),
            "ARENA_TEST_UNSET_DB",
            &config,
        );
        assert_eq!(resolved, PathBuf::from("/from/cli.db"));
    }

    #[test]
    fn test_config_file_fallback() {
        let config = ServerConfig {
            database_path: Some(PathBuf::from("/from/config.db")),
            ..Default::default()
        };
        let resolved = resolve_database_path(None, "ARENA_TEST_UNSET_DB", &config);
        assert_eq!(resolved, PathBuf::from("/from/config.db"));
    }
}
