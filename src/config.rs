use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::otp::{Fingerprint, DEFAULT_MAX_MAX_LENGTH, DEFAULT_MIN_MAX_LENGTH};
use crate::site::SitePattern;

/// One-time passcode heuristic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpConfig {
    /// Smallest declared `maxlength` accepted as a passcode field (inclusive).
    pub min_max_length: u32,

    /// Largest declared `maxlength` accepted as a passcode field (inclusive).
    pub max_max_length: u32,

    /// Additional vendor fingerprints on top of the built-in list.
    pub extra_fingerprints: Vec<Fingerprint>,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            min_max_length: DEFAULT_MIN_MAX_LENGTH,
            max_max_length: DEFAULT_MAX_MAX_LENGTH,
            extra_fingerprints: Vec::new(),
        }
    }
}

/// Per-site preferences, keyed by a site pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitePreference {
    /// Site pattern the preference applies to (same syntax as stored entries).
    pub pattern: String,

    /// Never report candidate fields on matching pages.
    #[serde(default)]
    pub ignore: bool,

    /// Selector of a control that must be activated before the login form
    /// is visible.
    #[serde(default)]
    pub reveal_trigger: Option<String>,
}

impl SitePreference {
    pub fn ignored(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ignore: true,
            reveal_trigger: None,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// One-time passcode heuristic settings.
    pub otp: OtpConfig,

    /// Per-site preferences. The first matching entry wins.
    pub sites: Vec<SitePreference>,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.otp.min_max_length == 0 {
            anyhow::bail!("otp.min_max_length must be at least 1");
        }
        if self.otp.min_max_length > self.otp.max_max_length {
            anyhow::bail!(
                "otp.min_max_length ({}) must not exceed otp.max_max_length ({})",
                self.otp.min_max_length,
                self.otp.max_max_length
            );
        }
        for (idx, fingerprint) in self.otp.extra_fingerprints.iter().enumerate() {
            if fingerprint.needle.trim().is_empty() {
                anyhow::bail!("otp.extra_fingerprints[{idx}].needle must not be empty");
            }
        }
        for (idx, site) in self.sites.iter().enumerate() {
            SitePattern::parse(&site.pattern)
                .with_context(|| format!("Invalid sites[{idx}].pattern"))?;
        }
        Ok(())
    }

    /// First site preference whose pattern matches `page_url`.
    pub fn site_preference(&self, page_url: &str) -> Option<&SitePreference> {
        find_site_preference(&self.sites, page_url)
    }
}

/// First entry of `sites` whose pattern matches `page_url`.
pub fn find_site_preference<'a>(
    sites: &'a [SitePreference],
    page_url: &str,
) -> Option<&'a SitePreference> {
    sites
        .iter()
        .find(|site| crate::site::site_match(&site.pattern, page_url))
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./credgate.toml` if it exists in current directory
/// 2. `~/.config/credgate/credgate.toml` (XDG config directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("credgate.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("credgate").join("credgate.toml");
    }

    local_config
}
