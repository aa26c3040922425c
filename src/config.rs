// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Configuration management: TOML file with an environment fallback

use crate::constants::env_config;
use crate::models::{Scope, TokenPair};
use crate::personal::AuthStyle;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OuraConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub personal_access_token: Option<String>,
    pub redirect_uri: Option<String>,
    pub scopes: Option<Vec<String>>,
    /// Only used with a personal access token
    pub auth_style: Option<AuthStyle>,
    pub request_timeout_secs: Option<u64>,
    /// Root for `/oauth/*`; the production hosts are used when unset
    pub oauth_base: Option<String>,
    pub api_base: Option<String>,
}

impl OuraConfig {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("oura-auth/config.toml"))
            .unwrap_or_else(|| "config.toml".into())
    }

    /// Read the config file, or fall back to `.env` and the process
    /// environment when the file does not exist
    pub fn load(path: Option<String>) -> Result<Self> {
        let config_path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
            let config = toml::from_str(&content).context("Failed to parse config file")?;
            debug!(path = %config_path.display(), "Loaded Oura configuration file");
            Ok(config)
        } else {
            Self::from_env()
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let request_timeout_secs: Option<u64> = lookup(env_config::REQUEST_TIMEOUT_SECS)
            .map(|v| v.parse())
            .transpose()
            .context("Invalid OURA_REQUEST_TIMEOUT_SECS value")?;

        Ok(Self {
            client_id: lookup(env_config::CLIENT_ID),
            client_secret: lookup(env_config::CLIENT_SECRET),
            access_token: lookup(env_config::ACCESS_TOKEN),
            refresh_token: lookup(env_config::REFRESH_TOKEN),
            personal_access_token: lookup(env_config::PERSONAL_ACCESS_TOKEN),
            redirect_uri: lookup(env_config::REDIRECT_URI),
            scopes: lookup(env_config::SCOPES).map(|s| parse_scopes(&s)),
            auth_style: None,
            request_timeout_secs,
            oauth_base: None,
            api_base: lookup(env_config::API_BASE),
        })
    }

    pub fn save(&self, path: Option<String>) -> Result<()> {
        let config_path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file {}", config_path.display()))?;

        info!(path = %config_path.display(), "Oura configuration saved");
        Ok(())
    }

    /// Record a freshly issued token pair
    pub fn apply_token(&mut self, token: &TokenPair) {
        self.access_token = Some(token.access_token.clone());
        if let Some(refresh_token) = &token.refresh_token {
            self.refresh_token = Some(refresh_token.clone());
        }
    }

    pub fn scope(&self) -> Scope {
        self.scopes
            .as_ref()
            .map(|s| Scope::new(s.iter().cloned()))
            .unwrap_or_default()
    }
}

fn parse_scopes(value: &str) -> Vec<String> {
    value
        .split([',', ' '])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
