use crate::agent::{AgentProfile, RetryPolicy};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CopydeskConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub sessions: SessionsConfig,
    pub agent: AgentConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub app_name: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    /// SurrealDB endpoint, host and port only.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionsConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub model: String,
    /// Set to the empty string to disable the fallback phase.
    pub fallback_model: Option<String>,
    pub retry_count: u32,
    pub fallback_retry_count: Option<u32>,
    pub ollama_url: String,
    pub instruction: String,
}

impl Default for CopydeskConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            sessions: SessionsConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            log_level: "info".into(),
            app_name: "copydesk".into(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "copydesk".into(),
            database: "copydesk".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        let db_path = default_copydesk_dir()
            .join("sessions.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "copywriter".into(),
            model: "llama3.1:8b".into(),
            fallback_model: Some("qwen2.5:7b".into()),
            retry_count: 3,
            fallback_retry_count: None,
            ollama_url: "http://127.0.0.1:11434".into(),
            instruction: "You are a concise marketing copywriter. Keep replies short, \
                          concrete, and on brand."
                .into(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Returns `~/.copydesk/`
pub fn default_copydesk_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".copydesk")
}

/// Returns the default config file path: `~/.copydesk/config.toml`
pub fn default_config_path() -> PathBuf {
    default_copydesk_dir().join("config.toml")
}

impl CopydeskConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            CopydeskConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (COPYDESK_HOST, COPYDESK_PORT,
    /// COPYDESK_LOG_LEVEL, COPYDESK_STORE_URL, COPYDESK_DB, COPYDESK_MODEL,
    /// COPYDESK_OLLAMA_URL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("COPYDESK_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("COPYDESK_PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %val, "ignoring unparseable COPYDESK_PORT"),
            }
        }
        if let Ok(val) = std::env::var("COPYDESK_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("COPYDESK_STORE_URL") {
            self.store.url = val;
        }
        if let Ok(val) = std::env::var("COPYDESK_DB") {
            self.sessions.db_path = val;
        }
        if let Ok(val) = std::env::var("COPYDESK_MODEL") {
            self.agent.model = val;
        }
        if let Ok(val) = std::env::var("COPYDESK_OLLAMA_URL") {
            self.agent.ollama_url = val;
        }
    }

    /// Resolve the session database path, expanding `~` if needed.
    pub fn resolved_sessions_db_path(&self) -> PathBuf {
        expand_tilde(&self.sessions.db_path)
    }

    /// The agent profile this deployment answers as.
    pub fn agent_profile(&self) -> AgentProfile {
        AgentProfile {
            name: self.agent.name.clone(),
            model: self.agent.model.clone(),
            description: "Conversational copywriting assistant".into(),
            instruction: self.agent.instruction.clone(),
        }
    }

    /// The retry schedule for validated runs.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.agent.retry_count,
            fallback_model: self
                .agent
                .fallback_model
                .clone()
                .filter(|model| !model.is_empty()),
            fallback_attempts: self.agent.fallback_retry_count,
            pause: Duration::from_secs(1),
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CopydeskConfig::default();
        assert_eq!(config.server.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.store.namespace, "copydesk");
        assert_eq!(config.agent.retry_count, 3);
        assert!(config.sessions.db_path.ends_with("sessions.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
port = 9000
log_level = "debug"

[store]
url = "10.0.0.5:8000"
database = "staging"

[agent]
model = "mistral:7b"
retry_count = 5
"#;
        let config: CopydeskConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.store.url, "10.0.0.5:8000");
        assert_eq!(config.store.database, "staging");
        assert_eq!(config.agent.model, "mistral:7b");
        assert_eq!(config.agent.retry_count, 5);
        // defaults still apply for unset fields
        assert_eq!(config.store.namespace, "copydesk");
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = CopydeskConfig::default();
        std::env::set_var("COPYDESK_STORE_URL", "10.1.1.1:8000");
        std::env::set_var("COPYDESK_MODEL", "gemma2:9b");
        std::env::set_var("COPYDESK_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        assert_eq!(config.store.url, "10.1.1.1:8000");
        assert_eq!(config.agent.model, "gemma2:9b");
        assert_eq!(config.server.log_level, "trace");

        // Clean up
        std::env::remove_var("COPYDESK_STORE_URL");
        std::env::remove_var("COPYDESK_MODEL");
        std::env::remove_var("COPYDESK_LOG_LEVEL");
    }

    #[test]
    fn empty_fallback_disables_the_phase() {
        let mut config = CopydeskConfig::default();
        config.agent.fallback_model = Some(String::new());
        assert!(config.retry_policy().fallback_model.is_none());
    }
}
