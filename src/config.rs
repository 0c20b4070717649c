//! Server configuration module.
//!
//! Handles loading and validating `picsizer.toml`. The file is read once at
//! startup; the resulting [`Config`] is immutable and handed to the resolver
//! and the HTTP layer explicitly.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options except the format profiles are optional - defaults shown below
//!
//! [server]
//! address = "localhost"     # Interface to bind
//! port = 8080               # Port to bind
//! base_dir = "."            # Root directory of the original images
//! cache_dir = "./cache"     # Root directory of generated artifacts
//!
//! [processing]
//! max_processes = 4         # Max parallel workers for `warm` (omit for auto = CPU cores)
//! quality = 95              # JPEG encoding quality (1-100)
//!
//! [format.thumb]            # Served under /thumb/<path>
//! operation = "thumbnail"   # copy | thumbnail | resize | fit
//! width = 100
//! height = 100
//! ```
//!
//! Unknown keys are rejected to catch typos early. Operation names are
//! checked when the registry is built, so a misspelled operation fails at
//! startup rather than on the first request.

use crate::cache::is_plain_segment;
use crate::registry::{ConversionRegistry, Operation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "picsizer.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("format '{slug}': unrecognised conversion operation '{operation}'")]
    UnsupportedOperation { slug: String, operation: String },
}

/// Top-level configuration loaded from `picsizer.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Listener and directory settings.
    pub server: ServerConfig,
    /// Encoding quality and warm-up parallelism.
    pub processing: ProcessingConfig,
    /// Conversion profiles keyed by URL slug.
    pub format: BTreeMap<String, FormatConfig>,
}

/// Listener and directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// Root of the original images. Request paths are resolved below it.
    pub base_dir: PathBuf,
    /// Root of the artifact cache, laid out as `<cache_dir>/<slug>/<path>`.
    pub cache_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "localhost".to_string(),
            port: 8080,
            base_dir: PathBuf::from("."),
            cache_dir: PathBuf::from("./cache"),
        }
    }
}

impl ServerConfig {
    /// `address:port` as passed to the listener.
    pub fn listen_on(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Encoding and parallel processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel warm-up workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u8,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_processes: None,
            quality: 95,
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// A single `[format.<slug>]` entry as written in the file.
///
/// The operation stays a string here so that an unknown name can be
/// reported together with its slug; see [`ConversionRegistry::from_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatConfig {
    pub operation: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl Config {
    /// Validate config values that serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.address must not be empty".into(),
            ));
        }
        if !(1..=100).contains(&self.processing.quality) {
            return Err(ConfigError::Validation(
                "processing.quality must be 1-100".into(),
            ));
        }
        if self.server.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "server.cache_dir must not be empty".into(),
            ));
        }
        for (slug, format) in &self.format {
            if !is_plain_segment(slug) {
                return Err(ConfigError::Validation(format!(
                    "format name '{slug}' must be a single non-empty path segment"
                )));
            }
            let operation: Operation =
                format
                    .operation
                    .parse()
                    .map_err(|_| ConfigError::UnsupportedOperation {
                        slug: slug.clone(),
                        operation: format.operation.clone(),
                    })?;
            validate_dimensions(slug, operation, format.width, format.height)?;
        }
        Ok(())
    }

    /// Build the slug → profile registry from the `[format]` tables.
    pub fn registry(&self) -> Result<ConversionRegistry, ConfigError> {
        ConversionRegistry::from_config(&self.format)
    }
}

fn validate_dimensions(
    slug: &str,
    operation: Operation,
    width: u32,
    height: u32,
) -> Result<(), ConfigError> {
    match operation {
        Operation::Copy => Ok(()),
        Operation::Thumbnail | Operation::Fit if width == 0 || height == 0 => {
            Err(ConfigError::Validation(format!(
                "format '{slug}': {operation} needs non-zero width and height"
            )))
        }
        Operation::Resize if width == 0 && height == 0 => Err(ConfigError::Validation(format!(
            "format '{slug}': resize needs a non-zero width or height"
        ))),
        _ => Ok(()),
    }
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate the config file at `path`.
///
/// A missing file is an error: without format profiles the server could
/// only ever answer with placeholders.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Returns a fully-commented stock `picsizer.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# picsizer configuration
# ======================
# Everything except the [format.*] profiles is optional.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Server
# ---------------------------------------------------------------------------
[server]
# Interface and port to listen on.
address = "localhost"
port = 8080

# Root directory of the original images.
# GET /<format>/<path> reads <base_dir>/<path>.
base_dir = "."

# Root directory of generated images, laid out as <cache_dir>/<format>/<path>.
# Entries are written once and never expire; delete files to regenerate them.
cache_dir = "./cache"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers used by `picsizer warm`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# JPEG encoding quality, 1-100.
quality = 95

# ---------------------------------------------------------------------------
# Formats
# ---------------------------------------------------------------------------
# Each [format.<name>] table is served under /<name>/...
#
# operation:
#   copy      - re-encode the original unchanged (width/height ignored)
#   thumbnail - scale and center-crop to exactly width x height
#   resize    - scale to width x height; a 0 dimension keeps the aspect ratio
#   fit       - scale down to fit inside width x height, keeping the aspect ratio

[format.thumb]
operation = "thumbnail"
width = 100
height = 100

[format.small]
operation = "fit"
width = 640
height = 640

[format.original]
operation = "copy"
"##
}
