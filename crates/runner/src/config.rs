//! Harness configuration via `docparity.toml`
//!
//! Every field is optional in the file. Command-line flags are layered on top
//! and the merged values become a [`RunnerConfig`], which is passed explicitly
//! into `ApiRunner::open` / `WireRunner::open`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use docparity_core::Mode;
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "docparity.toml";

/// Wire-mode settings, the `[wire]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireSection {
    /// Listen address for the protocol server
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Bound on waiting for the server's readiness signal (default: 5000)
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    /// Per-operation bound; absent means wait indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_timeout_ms: Option<u64>,
}

fn default_listen() -> String {
    "127.0.0.1:27018".to_string()
}

fn default_ready_timeout_ms() -> u64 {
    5000
}

impl Default for WireSection {
    fn default() -> Self {
        WireSection {
            listen: default_listen(),
            ready_timeout_ms: default_ready_timeout_ms(),
            op_timeout_ms: None,
        }
    }
}

/// Harness configuration loaded from `docparity.toml`.
///
/// # Example
///
/// ```toml
/// implementation = "rust"
/// database = "test"
///
/// [wire]
/// listen = "127.0.0.1:27018"
/// ready_timeout_ms = 5000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarnessConfig {
    /// Name recorded in every results file
    #[serde(default = "default_implementation")]
    pub implementation: String,
    /// Database name used by the wire client
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub wire: WireSection,
}

fn default_implementation() -> String {
    "rust".to_string()
}

fn default_database() -> String {
    "test".to_string()
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            implementation: default_implementation(),
            database: default_database(),
            wire: WireSection::default(),
        }
    }
}

impl HarnessConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# docparity harness configuration
#
# Name recorded in results files; the verifier groups runs by it.
implementation = "rust"

# Database name sent with every wire-mode request.
database = "test"

[wire]
# Address the protocol server binds. Port 0 picks a free port.
listen = "127.0.0.1:27018"

# How long to wait for the server to acknowledge it is accepting.
ready_timeout_ms = 5000

# Per-operation bound in milliseconds. Unset waits indefinitely.
# op_timeout_ms = 30000
"#
    }

    /// Read and parse config from a file path.
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path).map_err(|e| HarnessError::Io {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&content).map_err(|e| {
            HarnessError::config(format!("config file '{}': {}", path.display(), e))
        })
    }

    /// Parse config from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self, HarnessError> {
        let config: HarnessConfig = toml::from_str(content)
            .map_err(|e| HarnessError::config(format!("failed to parse: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, HarnessError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<(), HarnessError> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| HarnessError::Io {
                reason: format!(
                    "failed to write default config file '{}': {}",
                    path.display(),
                    e
                ),
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<(), HarnessError> {
        let content = toml::to_string_pretty(self).map_err(|e| HarnessError::Serialization {
            reason: format!("failed to serialize config: {}", e),
        })?;
        std::fs::write(path, content).map_err(|e| HarnessError::Io {
            reason: format!("failed to write config file '{}': {}", path.display(), e),
        })
    }

    fn validate(&self) -> Result<(), HarnessError> {
        if self.implementation.trim().is_empty() {
            return Err(HarnessError::config("implementation must not be empty"));
        }
        if self.database.trim().is_empty() {
            return Err(HarnessError::config("database must not be empty"));
        }
        if self.wire.ready_timeout_ms == 0 {
            return Err(HarnessError::config("wire.ready_timeout_ms must be positive"));
        }
        if self.wire.op_timeout_ms == Some(0) {
            return Err(HarnessError::config("wire.op_timeout_ms must be positive"));
        }
        Ok(())
    }

    /// Build a runner configuration for `mode` against `store`.
    pub fn runner_config(&self, mode: Mode, store: impl Into<PathBuf>) -> RunnerConfig {
        let mode = match mode {
            Mode::Api => ModeConfig::Api,
            Mode::Wire => ModeConfig::Wire(WireConfig {
                listen: self.wire.listen.clone(),
                ready_timeout: Duration::from_millis(self.wire.ready_timeout_ms),
                op_timeout: self.wire.op_timeout_ms.map(Duration::from_millis),
            }),
        };
        RunnerConfig {
            implementation: self.implementation.clone(),
            database: self.database.clone(),
            store: store.into(),
            mode,
        }
    }
}

/// Wire-mode runner settings
#[derive(Debug, Clone, PartialEq)]
pub struct WireConfig {
    pub listen: String,
    pub ready_timeout: Duration,
    pub op_timeout: Option<Duration>,
}

impl WireConfig {
    /// Loopback on a free port with default timeouts
    pub fn ephemeral() -> Self {
        WireConfig {
            listen: "127.0.0.1:0".to_string(),
            ready_timeout: Duration::from_millis(default_ready_timeout_ms()),
            op_timeout: None,
        }
    }

    /// Replace the port of the listen address, keeping its host.
    pub fn with_port(mut self, port: u16) -> Self {
        let host = match self.listen.rsplit_once(':') {
            Some((host, _)) => host.to_string(),
            None => self.listen.clone(),
        };
        self.listen = format!("{}:{}", host, port);
        self
    }
}

/// Access-path selection
#[derive(Debug, Clone, PartialEq)]
pub enum ModeConfig {
    Api,
    Wire(WireConfig),
}

impl ModeConfig {
    pub fn mode(&self) -> Mode {
        match self {
            ModeConfig::Api => Mode::Api,
            ModeConfig::Wire(_) => Mode::Wire,
        }
    }
}

/// Everything a runner needs to open its store
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    pub implementation: String,
    pub database: String,
    /// Store location: `:memory:` or a seed snapshot path
    pub store: PathBuf,
    pub mode: ModeConfig,
}

impl RunnerConfig {
    /// In-memory store with harness defaults
    pub fn in_memory(mode: Mode) -> Self {
        HarnessConfig::default().runner_config(mode, docparity_engine::MEMORY_LOCATION)
    }

    /// The wire settings, or a configuration error in API mode
    pub fn wire(&self) -> Result<&WireConfig, HarnessError> {
        match &self.mode {
            ModeConfig::Wire(wire) => Ok(wire),
            ModeConfig::Api => Err(HarnessError::config(
                "wire runner requires wire mode configuration",
            )),
        }
    }
}
