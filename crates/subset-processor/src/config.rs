//! Configuration for the subset processor.
//!
//! Settings come from defaults, environment variables or a YAML file. A
//! process-wide copy is kept behind a lock so callers that do not pass an
//! explicit configuration still get consistent values within one call.

use std::path::Path;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use subset_common::{SubsetError, SubsetResult};

/// Default output size budget per file.
pub const DEFAULT_FILE_SIZE_LIMIT: &str = "1GB";

static GLOBAL_CONFIG: Lazy<RwLock<SubsetConfig>> =
    Lazy::new(|| RwLock::new(SubsetConfig::from_env()));

/// Configuration for the subset processor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsetConfig {
    /// Output writing options.
    pub write: WriteConfig,

    /// Selector handling options.
    pub selectors: SelectorConfig,
}

impl SubsetConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            write: WriteConfig::from_env(),
            selectors: SelectorConfig::from_env(),
        }
    }

    /// Parse configuration from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> SubsetResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| SubsetError::ConfigError(format!("invalid YAML: {}", e)))?;
        config.validate().map_err(SubsetError::ConfigError)?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> SubsetResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SubsetError::ConfigError(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.write.validate()
    }
}

/// Options that control how output chunks are sized and written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteConfig {
    /// Human readable size budget for one output file, e.g. "10KB".
    pub file_size_limit: String,

    /// Compression codec for Zarr output.
    pub zarr_compression: ZarrCompression,

    /// Compression level (1-9).
    pub zarr_compression_level: u8,

    /// Deflate level for netCDF output (0-9, 0 disables compression).
    pub netcdf_deflate_level: u8,
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            file_size_limit: DEFAULT_FILE_SIZE_LIMIT.to_string(),
            zarr_compression: ZarrCompression::BloscZstd,
            zarr_compression_level: 1,
            netcdf_deflate_level: 4,
        }
    }
}

impl WriteConfig {
    /// Load write options from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SUBSET_FILE_SIZE_LIMIT") {
            config.file_size_limit = val;
        }

        if let Ok(val) = std::env::var("ZARR_COMPRESSION") {
            config.zarr_compression = ZarrCompression::from_str(&val);
        }

        if let Ok(val) = std::env::var("ZARR_COMPRESSION_LEVEL") {
            if let Ok(level) = val.parse() {
                config.zarr_compression_level = level;
            }
        }

        if let Ok(val) = std::env::var("NETCDF_DEFLATE_LEVEL") {
            if let Ok(level) = val.parse() {
                config.netcdf_deflate_level = level;
            }
        }

        config
    }

    /// Validate the write options.
    pub fn validate(&self) -> Result<(), String> {
        match parse_size(&self.file_size_limit) {
            Ok(0) => return Err("file_size_limit must be > 0".to_string()),
            Ok(_) => {}
            Err(e) => return Err(e.to_string()),
        }

        if self.zarr_compression_level == 0 || self.zarr_compression_level > 9 {
            return Err("zarr_compression_level must be 1-9".to_string());
        }

        if self.netcdf_deflate_level > 9 {
            return Err("netcdf_deflate_level must be 0-9".to_string());
        }

        Ok(())
    }

    /// The size budget in bytes.
    pub fn file_size_limit_bytes(&self) -> SubsetResult<u64> {
        parse_size(&self.file_size_limit)
            .map_err(|e| SubsetError::invalid_parameter("file_size_limit", e.to_string()))
    }
}

/// Options that control how selectors are interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Whether a request without any selector is accepted.
    pub policy: SelectorPolicy,

    /// Treat a subset that selects nothing as an error.
    pub fail_on_empty: bool,
}

impl SelectorConfig {
    /// Load selector options from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SUBSET_SELECTOR_POLICY") {
            config.policy = SelectorPolicy::from_str(&val);
        }

        if let Ok(val) = std::env::var("SUBSET_FAIL_ON_EMPTY") {
            config.fail_on_empty = val.to_lowercase() == "true" || val == "1";
        }

        config
    }
}

/// How to treat a request that carries no time, area or level selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorPolicy {
    /// No selector means the full extent of the dataset.
    #[default]
    Relaxed,
    /// At least one selector is required.
    Strict,
}

impl SelectorPolicy {
    /// Parse from string (case-insensitive). Unknown values fall back to relaxed.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "strict" => Self::Strict,
            _ => Self::Relaxed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relaxed => "relaxed",
            Self::Strict => "strict",
        }
    }
}

/// Compression codec for Zarr files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZarrCompression {
    /// No compression.
    None,
    /// Blosc with LZ4.
    BloscLz4,
    /// Blosc with Zstd.
    #[default]
    BloscZstd,
}

impl ZarrCompression {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" => Self::None,
            "lz4" | "blosc_lz4" => Self::BloscLz4,
            _ => Self::BloscZstd,
        }
    }

    /// Get the codec name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BloscLz4 => "blosc_lz4",
            Self::BloscZstd => "blosc_zstd",
        }
    }
}

impl std::fmt::Display for ZarrCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Size strings
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SizeParseError {
    #[error("Invalid size: {0}. Expected a number followed by B, KB, MB, GB or TB")]
    InvalidFormat(String),

    #[error("Unknown size unit '{unit}' in {value}")]
    UnknownUnit { value: String, unit: String },
}

/// Parse a human readable size such as `"10KB"` or `"1.5 MB"` into bytes.
///
/// Units are powers of 1024. A bare number is a byte count.
pub fn parse_size(s: &str) -> Result<u64, SizeParseError> {
    let trimmed = s.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| SizeParseError::InvalidFormat(s.to_string()))?;

    let multiplier: u64 = match unit.trim().to_uppercase().as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1 << 10,
        "MB" | "M" => 1 << 20,
        "GB" | "G" => 1 << 30,
        "TB" | "T" => 1 << 40,
        other => {
            return Err(SizeParseError::UnknownUnit {
                value: s.to_string(),
                unit: other.to_string(),
            })
        }
    };

    Ok((value * multiplier as f64).round() as u64)
}

// ============================================================================
// Process-wide configuration
// ============================================================================

/// Snapshot of the process-wide configuration.
pub fn current_config() -> SubsetConfig {
    match GLOBAL_CONFIG.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Replace the process-wide configuration, returning the previous value.
pub fn set_config(config: SubsetConfig) -> SubsetConfig {
    let mut guard = match GLOBAL_CONFIG.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    std::mem::replace(&mut *guard, config)
}

/// Temporarily replaces the process-wide configuration.
///
/// The previous configuration is restored when the guard is dropped.
#[must_use = "the override is reverted as soon as the guard is dropped"]
pub struct ConfigOverride {
    previous: Option<SubsetConfig>,
}

impl ConfigOverride {
    /// Install `config` until the returned guard is dropped.
    pub fn new(config: SubsetConfig) -> Self {
        Self {
            previous: Some(set_config(config)),
        }
    }

    /// Override only the file size limit.
    pub fn file_size_limit(limit: impl Into<String>) -> Self {
        let mut config = current_config();
        config.write.file_size_limit = limit.into();
        Self::new(config)
    }
}

impl Drop for ConfigOverride {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            set_config(previous);
        }
    }
}
