// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{Result, ServerError};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub github: GithubConfig,
    pub vault: VaultConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubConfig {
    #[serde(default)]
    pub token: Option<String>,
    pub api_base: String,
    pub request_timeout_secs: u64,
    pub download_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VaultConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl Config {
    /// Load configuration once at process start. Layers: TOML file, then
    /// VAULTHUB__-prefixed environment overrides, then the plain
    /// GITHUB_TOKEN / VAULT_PATH variables the server has always honored.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::from(Path::new("config/default.toml")));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("VAULTHUB")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        let mut config: Config = settings
            .try_deserialize()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        config.apply_env_fallbacks();
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        let mut config = Self {
            github: GithubConfig {
                token: None,
                api_base: "https://api.github.com".to_string(),
                request_timeout_secs: 20,
                download_timeout_secs: 30,
            },
            vault: VaultConfig { root: None },
        };
        config.apply_env_fallbacks();
        config
    }

    fn apply_env_fallbacks(&mut self) {
        if self.github.token.is_none() {
            self.github.token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        }
        if self.vault.root.is_none() {
            self.vault.root = std::env::var("VAULT_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.github.request_timeout_secs == 0 {
            return Err(ServerError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.github.download_timeout_secs == 0 {
            return Err(ServerError::Config(
                "download_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
