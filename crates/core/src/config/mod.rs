use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub account: AccountConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Parses a JSON configuration document. Missing sections fall back to
    /// their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Account preferences applied when the service context is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub remember_me: bool,
    pub auto_login: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            remember_me: true,
            auto_login: false,
            username: None,
            password: None,
        }
    }
}

impl AccountConfig {
    /// Credentials to sign in with on startup, if auto-login is enabled and
    /// both halves are present.
    pub fn auto_login_credentials(&self) -> Option<(&str, &str)> {
        if !self.auto_login {
            return None;
        }
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }
}

/// Configuration for the log subscriber installed by the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
