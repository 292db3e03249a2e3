//! Configuration loading.
//!
//! Settings come from an optional TOML file merged with environment
//! variables. The environment takes precedence, using the prefix
//! `SOCKET_INSTRUMENT_` and `__` as the section separator:
//!
//! ```text
//! SOCKET_INSTRUMENT_LOG_LEVEL=debug
//! SOCKET_INSTRUMENT_LISTEN__PORT=5025
//! ```
//!
//! Command-line flags are applied on top by the binary, so the order is
//! file, then environment, then flags.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use crate::error::{AppResult, EmulatorError};

/// Default configuration file looked for in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "socket-instrument.toml";

const ENV_PREFIX: &str = "SOCKET_INSTRUMENT_";

/// Top-level emulator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Logging filter, either a plain level or an `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Offset in degrees added to every positioner move command
    #[serde(default)]
    pub offset: Option<f64>,
    /// TCP listener settings
    #[serde(default)]
    pub listen: ListenSettings,
}

/// Where the emulator accepts connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenSettings {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind; when unset, each instrument family supplies its
    /// customary port
    #[serde(default)]
    pub port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            offset: None,
            listen: ListenSettings::default(),
        }
    }
}

impl Default for ListenSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
        }
    }
}

impl Settings {
    /// Load from [`DEFAULT_CONFIG_FILE`] and the environment. A missing
    /// file is not an error; the defaults then apply.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from a specific file path and the environment.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let settings = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(settings)
    }

    /// Validate settings after loading.
    pub fn validate(&self) -> AppResult<()> {
        // The level is a full EnvFilter directive, so "debug" and
        // "socket_instrument=trace" are both fine.
        if let Err(e) = EnvFilter::try_new(&self.log_level) {
            return Err(EmulatorError::Configuration(format!(
                "Invalid log_level '{}': {e}",
                self.log_level
            )));
        }

        if self.listen.port == Some(0) {
            return Err(EmulatorError::Configuration(
                "listen.port must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}
