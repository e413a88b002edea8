//! Session configuration.
//!
//! Handles loading, validating, and merging `image-session.toml`. Stock
//! defaults are the base layer; a user file overrides only the keys it sets.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! # temp_dir = "/var/tmp"    # Root for spill directories (default: OS temp dir)
//! allowed_formats = ["all"]  # Or any of "jpeg", "gif", "png"
//!
//! [save]
//! jpeg_quality = 85          # Used when a save doesn't pass a quality
//!
//! [resize]
//! filter = "triangle"        # nearest | triangle | catmull-rom | gaussian | lanczos3
//! ```
//!
//! Unknown keys are rejected to catch typos early. The upload size cap is
//! fixed and not part of the configuration.

use crate::imaging::{AllowedFormats, Quality, ResizeFilter};
use crate::session::SessionOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File looked up in the working directory when `--config` isn't given.
pub const CONFIG_FILENAME: &str = "image-session.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `image-session.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Root for per-session spill directories. `None` uses the OS temp dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
    /// Upload allow-list: `["all"]` or names from `jpeg`, `gif`, `png`.
    pub allowed_formats: Vec<String>,
    pub save: SaveConfig,
    pub resize: ResizeConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            allowed_formats: vec!["all".to_string()],
            save: SaveConfig::default(),
            resize: ResizeConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.allowed_formats()?;
        if !(1..=100).contains(&self.save.jpeg_quality) {
            return Err(ConfigError::Validation(
                "save.jpeg_quality must be 1-100".into(),
            ));
        }
        if let Some(dir) = &self.temp_dir {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Validation("temp_dir must not be empty".into()));
            }
        }
        Ok(())
    }

    pub fn allowed_formats(&self) -> Result<AllowedFormats, ConfigError> {
        AllowedFormats::from_names(&self.allowed_formats)
            .map_err(|e| ConfigError::Validation(format!("allowed_formats: {e}")))
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            spill_root: self.temp_dir.clone().unwrap_or_else(std::env::temp_dir),
            filter: self.resize.filter,
            default_quality: Quality::new(self.save.jpeg_quality),
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SaveConfig {
    pub jpeg_quality: u32,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: Quality::default().value(),
        }
    }
}

/// Resampling settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub filter: ResizeFilter,
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SessionConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SessionConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SessionConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load a config file that must exist.
pub fn load_config_file(path: &Path) -> Result<SessionConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let overlay: toml::Value = toml::from_str(&content)?;
    resolve_config(stock_defaults_value()?, Some(overlay))
}

/// Load `path` if it exists, otherwise return the validated stock defaults.
pub fn load_config(path: &Path) -> Result<SessionConfig, ConfigError> {
    if path.exists() {
        load_config_file(path)
    } else {
        resolve_config(stock_defaults_value()?, None)
    }
}

/// Returns a fully-commented stock `image-session.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# image-session configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.

# Root directory for temporary spill files. Each session creates its own
# randomly named directory under it and removes it when the session ends.
# Defaults to the OS temp directory.
# temp_dir = "/var/tmp"

# Which upload types are accepted, by declared MIME type.
# Either ["all"] or any combination of "jpeg", "gif", "png".
# Uploads larger than 5242880 bytes are always rejected.
allowed_formats = ["all"]

# ---------------------------------------------------------------------------
# Saving derivatives
# ---------------------------------------------------------------------------
[save]
# JPEG quality (1-100) used when a save doesn't specify one.
jpeg_quality = 85

# ---------------------------------------------------------------------------
# Resizing
# ---------------------------------------------------------------------------
[resize]
# Resampling filter for all resize modes:
#   nearest, triangle (bilinear), catmull-rom, gaussian, lanczos3
filter = "triangle"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::ImageFormat;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = SessionConfig::default();
        assert_eq!(config.temp_dir, None);
        assert_eq!(config.allowed_formats, vec!["all"]);
        assert_eq!(config.save.jpeg_quality, 85);
        assert_eq!(config.resize.filter, ResizeFilter::Triangle);
        assert_eq!(config.allowed_formats().unwrap(), AllowedFormats::All);
    }

    #[test]
    fn parse_partial_config() {
        let config: SessionConfig = toml::from_str(
            r#"
[save]
jpeg_quality = 70
"#,
        )
        .unwrap();
        assert_eq!(config.save.jpeg_quality, 70);
        assert_eq!(config.resize.filter, ResizeFilter::Triangle);
        assert_eq!(config.allowed_formats, vec!["all"]);
    }

    #[test]
    fn session_options_follow_config() {
        let config: SessionConfig = toml::from_str(
            r#"
temp_dir = "/tmp/spills"
[save]
jpeg_quality = 60
[resize]
filter = "lanczos3"
"#,
        )
        .unwrap();
        let options = config.session_options();
        assert_eq!(options.spill_root, PathBuf::from("/tmp/spills"));
        assert_eq!(options.filter, ResizeFilter::Lanczos3);
        assert_eq!(options.default_quality, Quality::new(60));
    }

    #[test]
    fn default_spill_root_is_os_temp_dir() {
        let options = SessionConfig::default().session_options();
        assert_eq!(options.spill_root, std::env::temp_dir());
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn load_config_file_requires_the_file() {
        let tmp = TempDir::new().unwrap();
        let result = load_config_file(&tmp.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            r#"
allowed_formats = ["jpeg", "png"]
[resize]
filter = "catmull-rom"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.resize.filter, ResizeFilter::CatmullRom);
        assert_eq!(config.save.jpeg_quality, 85);
        let allowed = config.allowed_formats().unwrap();
        assert!(allowed.allows(ImageFormat::Jpeg));
        assert!(allowed.allows(ImageFormat::Png));
        assert!(!allowed.allows(ImageFormat::Gif));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn empty_allowed_formats_rejected() {
        let config = SessionConfig {
            allowed_formats: vec![],
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn unknown_allowed_format_rejected() {
        let config = SessionConfig {
            allowed_formats: vec!["jpeg".into(), "webp".into()],
            ..SessionConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("webp"));
    }

    #[test]
    fn quality_bounds() {
        for (q, ok) in [(0, false), (1, true), (100, true), (101, false)] {
            let config = SessionConfig {
                save: SaveConfig { jpeg_quality: q },
                ..SessionConfig::default()
            };
            assert_eq!(config.validate().is_ok(), ok, "quality {q}");
        }
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "allowed_formats = []\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let result: Result<SessionConfig, _> = toml::from_str("max_upload = 10\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let result: Result<SessionConfig, _> = toml::from_str("[save]\npng_level = 9\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_filter_rejected() {
        let result: Result<SessionConfig, _> = toml::from_str("[resize]\nfilter = \"bicubic\"\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("[save]\njpeg_quality = 85\n").unwrap();
        let overlay: toml::Value = toml::from_str("[save]\njpeg_quality = 50\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(
            merged["save"]["jpeg_quality"].as_integer(),
            Some(50)
        );
    }

    #[test]
    fn merge_toml_preserves_base_keys() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str("[save]\njpeg_quality = 50\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["resize"]["filter"].as_str(), Some("triangle"));
        assert_eq!(merged["allowed_formats"][0].as_str(), Some("all"));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str("allowed_formats = [\"gif\"]\n").unwrap();
        let config = resolve_config(base, Some(overlay)).unwrap();
        assert_eq!(config.allowed_formats, vec!["gif"]);
    }

    // =========================================================================
    // stock config tests
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid_toml() {
        let _: toml::Value =
            toml::from_str(stock_config_toml()).expect("stock config must be valid TOML");
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: SessionConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        assert!(val.get("save").is_some());
        assert!(val.get("resize").is_some());
        assert!(val.get("allowed_formats").is_some());
        assert!(val.get("temp_dir").is_none());
    }
}
