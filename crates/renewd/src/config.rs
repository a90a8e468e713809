//! Configuration management for renewd.
//!
//! Built once at start-up from defaults, an optional TOML file and the
//! environment, then shared read-only with every component.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Env var naming an optional config file
pub const CONFIG_PATH_ENV: &str = "RENEWD_CONFIG";

/// Env var holding the shared secret
pub const SECRET_ENV: &str = "RENEW_SECRET";

pub const PORT_ENV: &str = "PORT";
pub const INTERFACE_ENV: &str = "LINUX_INTERFACE_NAME";
pub const BIND_ENV: &str = "RENEWD_BIND";

/// Shipped secret; operators must override it
pub const DEFAULT_SECRET: &str = "DEFAULT_SECRET_CHANGE_ME";

/// Daemon configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Listen address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Shared secret checked on every /renew call
    #[serde(default = "default_secret")]
    pub secret: String,

    /// Interface reconfigured by the Linux renewal plan
    #[serde(default = "default_linux_interface")]
    pub linux_interface: String,

    /// Companion VPN client probed and restarted after renewal
    #[serde(default = "default_companion_service")]
    pub companion_service: String,

    /// Timeout for renewal and restart commands
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Timeout for probes (code page, companion presence)
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    37080
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_secret() -> String {
    DEFAULT_SECRET.to_string()
}

fn default_linux_interface() -> String {
    "eth0".to_string()
}

fn default_companion_service() -> String {
    "tailscale".to_string()
}

fn default_command_timeout() -> u64 {
    30
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            secret: default_secret(),
            linux_interface: default_linux_interface(),
            companion_service: default_companion_service(),
            command_timeout_secs: default_command_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            log_level: default_log_level(),
        }
    }
}

// Hand-written so the secret never reaches a log line through {:?}
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("bind_address", &self.bind_address)
            .field("secret", &"***")
            .field("linux_interface", &self.linux_interface)
            .field("companion_service", &self.companion_service)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .field("probe_timeout_secs", &self.probe_timeout_secs)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load config: defaults, then the optional file, then the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from_path(p)?,
            None => match std::env::var(CONFIG_PATH_ENV) {
                Ok(p) if !p.trim().is_empty() => Self::load_from_path(Path::new(p.trim()))?,
                _ => Config::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the daemon cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.secret.trim().is_empty() {
            bail!("secret must not be empty (set it in the config file or {})", SECRET_ENV);
        }
        Ok(())
    }

    /// Load config from a specific TOML file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    ///
    /// Empty values are ignored. A non-numeric PORT is an error.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get(PORT_ENV) {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("{} must be a port number, got '{}'", PORT_ENV, port))?;
        }
        if let Some(secret) = get(SECRET_ENV) {
            self.secret = secret;
        }
        if let Some(iface) = get(INTERFACE_ENV) {
            self.linux_interface = iface.trim().to_string();
        }
        if let Some(bind) = get(BIND_ENV) {
            self.bind_address = bind.trim().to_string();
        }
        Ok(())
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret == DEFAULT_SECRET
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
