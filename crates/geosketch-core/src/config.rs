use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::table::GeometryFilter;
use crate::{GeosketchError, GeosketchResult};

/// Top-level configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeosketchConfig {
    pub share: ShareConfig,
    pub crypto: CryptoConfig,
    pub export: ExportConfig,
    pub log: LogConfig,
}

impl GeosketchConfig {
    /// Load a config file, falling back to defaults when it does not exist.
    ///
    /// The fallback is silent; callers decide whether a missing file is
    /// worth reporting.
    pub fn load(path: &Path) -> GeosketchResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| GeosketchError::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GeosketchResult<()> {
        if self.crypto.pbkdf2_iterations == 0 {
            return Err(GeosketchError::Config(
                "crypto.pbkdf2_iterations must be at least 1".into(),
            ));
        }
        if self.share.max_password_attempts == 0 {
            return Err(GeosketchError::Config(
                "share.max_password_attempts must be at least 1".into(),
            ));
        }
        if self.share.base_url.trim().is_empty() {
            return Err(GeosketchError::Config("share.base_url must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Page that share links point at; its fragment is replaced
    pub base_url: String,
    /// Password attempts allowed when opening an encrypted link
    pub max_password_attempts: u32,
}

/// Share-link key derivation settings.
///
/// The iteration count is not stored in links: every reader must use the
/// value the writer used, otherwise decryption fails as a wrong password.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// PBKDF2-HMAC-SHA256 iterations (default: 100000)
    pub pbkdf2_iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Planetary body the sketch belongs to; names exported files
    pub target: Target,
    /// Default geometry filter for exports
    pub filter: GeometryFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Earth,
    Mars,
    Moon,
}

impl Target {
    pub fn name(&self) -> &'static str {
        match self {
            Target::Earth => "earth",
            Target::Mars => "mars",
            Target::Moon => "moon",
        }
    }
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: "https://geosketch.app/earth.html".into(),
            max_password_attempts: 3,
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: 100_000,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            target: Target::Earth,
            filter: GeometryFilter::All,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}
