//! Configuration loading and validation for the `evseal` binary.
//!
//! All values are read from `EVSEAL_*` environment variables at startup.

use std::fmt;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use evseal_core::{Key, KEY_LEN};
use serde::Deserialize;
use zeroize::Zeroize;

/// Validated `evseal` configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Base64 of the 32-byte secret key (`EVSEAL_KEY`). Required by every
    /// command except `keygen`.
    #[serde(default)]
    pub key: Option<String>,

    /// Tracing log level (e.g. `"warn"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log line format: `"text"` or `"json"`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "warn".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("EVSEAL"))
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        if self.log_level.trim().is_empty() {
            anyhow::bail!("EVSEAL_LOG_LEVEL must not be empty");
        }
        if !matches!(self.log_format.as_str(), "text" | "json") {
            anyhow::bail!(
                "EVSEAL_LOG_FORMAT must be \"text\" or \"json\", got {:?}",
                self.log_format
            );
        }
        Ok(())
    }

    /// Decode the configured key.
    ///
    /// # Errors
    ///
    /// Returns an error if `EVSEAL_KEY` is unset, is not base64, or does not
    /// decode to exactly [`KEY_LEN`] bytes.
    pub fn key(&self) -> Result<Key> {
        let encoded = self
            .key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .context("EVSEAL_KEY is required for this command")?;

        let mut decoded = STANDARD
            .decode(encoded)
            .context("EVSEAL_KEY is not valid base64")?;
        let bytes: Result<[u8; KEY_LEN], _> = decoded.as_slice().try_into();
        let len = decoded.len();
        decoded.zeroize();

        let bytes = bytes.map_err(|_| {
            anyhow::anyhow!("EVSEAL_KEY must decode to {KEY_LEN} bytes, got {len}")
        })?;
        Ok(Key::from(bytes))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .finish()
    }
}
