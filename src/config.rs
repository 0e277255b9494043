//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/fabric-ext/fabric-ext.toml`
//! 3. Extra settings file given with `--settings`
//! 4. Environment variables: `FABRIC_EXT__*` prefix
//!
//! `--context` overrides `current_context` after all layers are applied.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::util::path::expand_env_vars;

/// A named network context: which gateway, channel and peers to talk to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Context {
    /// Base URL of the Fabric REST gateway
    pub gateway_url: String,
    /// Channel all commands operate on
    pub channel: String,
    /// Default target peers
    pub peers: Vec<String>,
    /// Organization (MSP) of the client identity
    pub organization: String,
    /// Client identity name
    pub user: String,
}

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Retry policy for submitted transactions and lifecycle calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts, including the first one
    pub attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff_ms: 500,
            backoff_factor: 2.0,
        }
    }
}

impl RetrySettings {
    /// Backoff before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.backoff_factor.max(1.0).powi(retry as i32);
        Duration::from_millis((self.initial_backoff_ms as f64 * factor) as u64)
    }
}

/// Unified configuration for fabric-ext.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Name of the active context
    pub current_context: String,
    pub contexts: BTreeMap<String, Context>,
    pub http: HttpSettings,
    pub retry: RetrySettings,
}

/// Get the XDG config directory for fabric-ext.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "fabric-ext").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("fabric-ext.toml"))
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `settings_file` - Optional extra settings file (must exist if given)
    /// * `context` - Optional override for the current context
    pub fn load(
        settings_file: Option<&Path>,
        context: Option<&str>,
    ) -> Result<Self, ApplicationError> {
        let global = global_config_path().filter(|p| p.exists());
        Self::load_from(global.as_deref(), settings_file, context)
    }

    /// Load settings from explicit files (global file first), then env vars.
    pub fn load_from(
        global_file: Option<&Path>,
        settings_file: Option<&Path>,
        context: Option<&str>,
    ) -> Result<Self, ApplicationError> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("current_context", defaults.current_context.clone())
            .map_err(config_err)?
            .set_default("http.timeout_secs", defaults.http.timeout_secs as i64)
            .map_err(config_err)?
            .set_default("retry.attempts", i64::from(defaults.retry.attempts))
            .map_err(config_err)?
            .set_default(
                "retry.initial_backoff_ms",
                defaults.retry.initial_backoff_ms as i64,
            )
            .map_err(config_err)?
            .set_default("retry.backoff_factor", defaults.retry.backoff_factor)
            .map_err(config_err)?;

        if let Some(path) = global_file {
            builder = builder.add_source(File::from(path).required(false));
        }

        if let Some(path) = settings_file {
            let expanded = PathBuf::from(expand_env_vars(&path.to_string_lossy()));
            builder = builder.add_source(File::from(expanded).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("FABRIC_EXT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;

        if let Some(name) = context {
            settings.current_context = name.to_string();
        }

        settings.expand_paths();
        Ok(settings)
    }

    /// Expand shell variables and tilde in URL fields.
    fn expand_paths(&mut self) {
        for ctx in self.contexts.values_mut() {
            ctx.gateway_url = expand_env_vars(&ctx.gateway_url);
        }
    }

    /// The active context.
    pub fn current_context(&self) -> Result<&Context, ApplicationError> {
        if self.current_context.is_empty() {
            return Err(ApplicationError::Config {
                message: "no current context set (use --context or set current_context)".into(),
            });
        }
        self.contexts
            .get(&self.current_context)
            .ok_or_else(|| ApplicationError::Config {
                message: format!("context not found: {}", self.current_context),
            })
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# fabric-ext configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/fabric-ext/fabric-ext.toml
#   Extra:  --settings <FILE>
#   Env:    FABRIC_EXT__* environment variables, e.g. FABRIC_EXT__CURRENT_CONTEXT=dev

current_context = "dev"

[contexts.dev]
gateway_url = "http://localhost:8080"
channel = "mychannel"
peers = ["peer0.org1.example.com"]
organization = "Org1MSP"
user = "Admin"

[http]
# timeout_secs = 30

[retry]
# attempts = 3
# initial_backoff_ms = 500
# backoff_factor = 2.0
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
