//! Configuration file management for the tag application.
//!
//! Reads/writes `~/.dwm-tag/config.yaml` with update rates, encoder
//! settings, and uplink behavior.

use std::path::{Path, PathBuf};

use crate::encode::Padding;
use crate::types::TagError;

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub tag: TagConfig,
    pub encoder: EncoderConfig,
    pub uplink: UplinkConfig,
}

/// Location engine settings applied at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct TagConfig {
    /// Position update rate while moving, in 100 ms units.
    pub update_rate: u16,
    /// Position update rate while stationary, in 100 ms units.
    pub stationary_rate: u16,
    pub stationary_sensitivity: StationarySensitivity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StationarySensitivity {
    Low,
    #[default]
    Normal,
    High,
}

impl StationarySensitivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationarySensitivity::Low => "low",
            StationarySensitivity::Normal => "normal",
            StationarySensitivity::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(StationarySensitivity::Low),
            "normal" => Some(StationarySensitivity::Normal),
            "high" => Some(StationarySensitivity::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    pub padding: Padding,
    /// Most samples a single location event may carry; `None` for no cap
    /// beyond available memory.
    pub max_samples: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UplinkConfig {
    /// Priority flag passed with every write.
    pub important: bool,
    /// Issue a zero-length write for a location event with no anchors.
    pub send_empty: bool,
    /// Largest payload the uplink accepts; `None` for no limit.
    pub max_frame: Option<usize>,
}

impl Default for TagConfig {
    fn default() -> Self {
        TagConfig {
            update_rate: 10,
            stationary_rate: 10,
            stationary_sensitivity: StationarySensitivity::Normal,
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            padding: Padding::Spaces,
            max_samples: None,
        }
    }
}

impl Default for UplinkConfig {
    fn default() -> Self {
        UplinkConfig {
            important: true,
            send_empty: false,
            max_frame: None,
        }
    }
}

impl Config {
    /// Reject values the tag can't run with.
    pub fn validate(&self) -> Result<(), TagError> {
        if self.tag.update_rate == 0 || self.tag.stationary_rate == 0 {
            return Err(TagError::Config("update rates must be non-zero".into()));
        }
        if self.encoder.max_samples == Some(0) {
            return Err(TagError::Config("encoder.max_samples must be non-zero".into()));
        }
        Ok(())
    }
}

/// Get the config directory path (`~/.dwm-tag/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".dwm-tag")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `path`. Returns default config if the file doesn't
/// exist or can't be read.
pub fn load_config_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_config(&text).unwrap_or_default(),
        Err(_) => Config::default(),
    }
}

/// Save config to `path`, creating parent directories.
pub fn save_config_to(config: &Config, path: &Path) -> Result<(), TagError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, serialize_config(config))?;
    Ok(())
}

/// Parse simple YAML-like config text. Unknown keys and unparsable values
/// keep their defaults.
pub fn parse_config(text: &str) -> Option<Config> {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        if let Some((key, val)) = stripped.split_once(':') {
            let key = key.trim();
            let val = val.trim();

            if !is_indented {
                current_section = if val.is_empty() {
                    Some(key.to_string())
                } else {
                    None
                };
            } else if let Some(ref section) = current_section {
                match section.as_str() {
                    "tag" => match key {
                        "update_rate" => {
                            if let Ok(v) = val.parse::<u16>() {
                                config.tag.update_rate = v;
                            }
                        }
                        "stationary_rate" => {
                            if let Ok(v) = val.parse::<u16>() {
                                config.tag.stationary_rate = v;
                            }
                        }
                        "stationary_sensitivity" => {
                            if let Some(v) = parse_string_value(val)
                                .as_deref()
                                .and_then(StationarySensitivity::parse)
                            {
                                config.tag.stationary_sensitivity = v;
                            }
                        }
                        _ => {}
                    },
                    "encoder" => match key {
                        "padding" => {
                            if let Some(v) = parse_string_value(val).as_deref().and_then(Padding::parse)
                            {
                                config.encoder.padding = v;
                            }
                        }
                        "max_samples" => {
                            if val == "null" || val == "~" {
                                config.encoder.max_samples = None;
                            } else if let Ok(v) = val.parse::<usize>() {
                                config.encoder.max_samples = Some(v);
                            }
                        }
                        _ => {}
                    },
                    "uplink" => match key {
                        "important" => {
                            if let Some(v) = parse_bool_value(val) {
                                config.uplink.important = v;
                            }
                        }
                        "send_empty" => {
                            if let Some(v) = parse_bool_value(val) {
                                config.uplink.send_empty = v;
                            }
                        }
                        "max_frame" => config.uplink.max_frame = val.parse::<usize>().ok(),
                        _ => {}
                    },
                    _ => {}
                }
            }
        }
    }

    Some(config)
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_bool_value(val: &str) -> Option<bool> {
    match val {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Serialize config to YAML-like text.
pub fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# dwm-tag configuration".to_string(), String::new()];

    lines.push("tag:".into());
    lines.push(format!("  update_rate: {}", config.tag.update_rate));
    lines.push(format!("  stationary_rate: {}", config.tag.stationary_rate));
    lines.push(format!(
        "  stationary_sensitivity: \"{}\"",
        config.tag.stationary_sensitivity.as_str()
    ));
    lines.push(String::new());

    lines.push("encoder:".into());
    lines.push(format!("  padding: \"{}\"", config.encoder.padding.as_str()));
    match config.encoder.max_samples {
        Some(v) => lines.push(format!("  max_samples: {v}")),
        None => lines.push("  max_samples: null".into()),
    }
    lines.push(String::new());

    lines.push("uplink:".into());
    lines.push(format!("  important: {}", config.uplink.important));
    lines.push(format!("  send_empty: {}", config.uplink.send_empty));
    match config.uplink.max_frame {
        Some(v) => lines.push(format!("  max_frame: {v}")),
        None => lines.push("  max_frame: null".into()),
    }

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tag.update_rate, 10);
        assert_eq!(config.tag.stationary_rate, 10);
        assert_eq!(config.encoder.padding, Padding::Spaces);
        assert!(config.encoder.max_samples.is_none());
        assert!(config.uplink.important);
        assert!(!config.uplink.send_empty);
        assert!(config.uplink.max_frame.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let text = r#"
tag:
  update_rate: 5
  stationary_rate: 50
  stationary_sensitivity: "high"

encoder:
  padding: zeros
  max_samples: 15

uplink:
  important: false
  send_empty: yes
  max_frame: 34
"#;
        let config = parse_config(text).unwrap();
        assert_eq!(config.tag.update_rate, 5);
        assert_eq!(config.tag.stationary_rate, 50);
        assert_eq!(
            config.tag.stationary_sensitivity,
            StationarySensitivity::High
        );
        assert_eq!(config.encoder.padding, Padding::Zeros);
        assert_eq!(config.encoder.max_samples, Some(15));
        assert!(!config.uplink.important);
        assert!(config.uplink.send_empty);
        assert_eq!(config.uplink.max_frame, Some(34));
    }

    #[test]
    fn test_parse_config_bad_values_keep_defaults() {
        let text = r#"
encoder:
  padding: "tabs"
  max_samples: lots

uplink:
  important: maybe
  max_frame: null
"#;
        let config = parse_config(text).unwrap();
        assert_eq!(config.encoder, EncoderConfig::default());
        assert!(config.uplink.important);
        assert!(config.uplink.max_frame.is_none());
    }

    #[test]
    fn test_validate_rejects_zero() {
        let mut config = Config::default();
        config.encoder.max_samples = Some(0);
        assert!(matches!(config.validate(), Err(TagError::Config(_))));

        let mut config = Config::default();
        config.tag.update_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip() {
        let config = Config {
            tag: TagConfig {
                update_rate: 1,
                stationary_rate: 20,
                stationary_sensitivity: StationarySensitivity::Low,
            },
            encoder: EncoderConfig {
                padding: Padding::Zeros,
                max_samples: Some(8),
            },
            uplink: UplinkConfig {
                important: false,
                send_empty: true,
                max_frame: Some(34),
            },
        };
        let text = serialize_config(&config);
        let parsed = parse_config(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_save_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let err = save_config_to(&Config::default(), &blocker.join("config.yaml")).unwrap_err();
        assert!(matches!(err, TagError::Io(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let mut config = Config::default();
        config.encoder.max_samples = Some(15);

        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_from(&path), config);
    }

    #[test]
    fn test_load_missing_file_defaults() {
        let config = load_config_from(Path::new("/nonexistent/dwm-tag/config.yaml"));
        assert_eq!(config, Config::default());
    }
}
