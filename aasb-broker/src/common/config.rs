/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */


use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The TOML configuration file did not parse.
    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),
    /// The engine configuration document did not parse.
    #[error("invalid engine configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for the AASB broker
///
/// Loaded from `config.toml` in the XDG config directory under `aasb`, or
/// built explicitly. Every field has a default, so a file only needs the keys
/// it changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AasbConfig {
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Dispatch configuration
    pub dispatch: DispatchConfig,
    /// Behavioral configuration switches
    pub behavior: BehaviorConfig,
}

/// Timeout-related configuration values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default wait for a reply in `get()`, in milliseconds
    pub reply_timeout_ms: u64,
    /// Maximum time shutdown waits for queued dispatch to finish, in milliseconds
    pub shutdown_timeout_ms: u64,
}

/// How subscriber callbacks are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Callbacks run on the publishing thread before `send()` returns.
    #[default]
    Inline,
    /// Callbacks run in publish order on one worker task.
    Queued,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMode::Inline => f.write_str("inline"),
            DispatchMode::Queued => f.write_str("queued"),
        }
    }
}

/// Dispatch configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Inline or queued delivery
    pub mode: DispatchMode,
}

/// Behavioral configuration switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// `get()` returns at once when nobody is subscribed to the call
    pub fail_fast_without_subscribers: bool,
    /// Include payloads in log output
    pub log_payloads: bool,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            reply_timeout_ms: 500,
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            fail_fast_without_subscribers: true,
            log_payloads: false,
        }
    }
}

impl AasbConfig {
    /// Default reply wait as a `Duration`
    pub const fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.reply_timeout_ms)
    }

    /// Shutdown drain limit as a `Duration`
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.shutdown_timeout_ms)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] when the text is not valid configuration.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Toml`] when it does not parse.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `aasb/config.toml` under `$XDG_CONFIG_HOME` (falling back to
    /// `~/.config`). If no file is found, returns the default configuration.
    /// If a file exists but cannot be read or parsed, logs an error and uses
    /// defaults.
    pub fn load() -> Self {
        let xdg_dirs = match xdg::BaseDirectories::with_prefix("aasb") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        match xdg_dirs.find_config_file("config.toml") {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                match Self::load_from(&path) {
                    Ok(config) => {
                        info!("Successfully loaded configuration");
                        config
                    }
                    Err(e) => {
                        error!("Failed to load configuration file {}: {}", path.display(), e);
                        Self::default()
                    }
                }
            }
            None => {
                info!("No configuration file found, using defaults");
                Self::default()
            }
        }
    }
}
