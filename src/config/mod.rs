//! Configuration handling for prompt-expander.
//!
//! The configuration is a JSON document holding the marker mappings and the
//! escape character. Projects keep it at `.claude/config/text-expander.json`;
//! a user-wide file in the home directory is used when no project file exists.

use crate::core::error::{Error, Result};
use crate::core::expander::{Expander, MarkerTable, MatchOrder, DEFAULT_ESCAPE_CHAR};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project configuration file, relative to the project root.
pub const CONFIG_FILE_NAME: &str = ".claude/config/text-expander.json";

/// User-wide configuration file, relative to the home directory.
pub const GLOBAL_CONFIG_FILE_NAME: &str = ".claude-helper/text-expander-config.json";

/// Prefix put in front of the expanded prompt in hook output.
pub const DEFAULT_CONTEXT_PREFIX: &str = "用户的意思是: ";

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpanderConfig {
    /// Character that escapes a marker. Must be exactly one character.
    pub escape_char: String,
    /// Tie-break policy for markers matching at the same position.
    pub order: MatchOrder,
    /// Text placed before the expanded prompt in hook output.
    pub context_prefix: String,
    /// Marker to replacement mappings, in declaration order.
    pub mappings: MarkerTable,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            escape_char: DEFAULT_ESCAPE_CHAR.to_string(),
            order: MatchOrder::default(),
            context_prefix: DEFAULT_CONTEXT_PREFIX.to_string(),
            mappings: MarkerTable::new(),
        }
    }
}

impl ExpanderConfig {
    /// Creates a configuration with the built-in starter mappings.
    #[must_use]
    pub fn with_default_mappings() -> Self {
        Self {
            mappings: default_mappings(),
            ..Self::default()
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ConfigNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                Error::io("read config", e)
            }
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::config_parse_with_source("Failed to parse JSON", e))?;

        config.validate()?;

        tracing::debug!(
            path = %path.display(),
            mappings = config.mappings.len(),
            "Loaded configuration"
        );

        Ok(config)
    }

    /// Returns `explicit` if given, otherwise the discovered config file.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::find_config_file(),
        }
    }

    /// Finds the configuration file starting from the current directory.
    pub fn find_config_file() -> Result<PathBuf> {
        let cwd = std::env::current_dir().map_err(|e| Error::io("get current dir", e))?;
        Self::find_config_file_from(&cwd)
    }

    /// Finds the configuration file by searching up the directory tree from
    /// `start`, then falling back to the user-wide file.
    pub fn find_config_file_from(start: &Path) -> Result<PathBuf> {
        let mut current = start;
        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Ok(config_path);
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        if let Some(global) = Self::global_config_path().filter(|p| p.exists()) {
            return Ok(global);
        }

        Err(Error::ConfigNotFound {
            path: start.join(CONFIG_FILE_NAME),
        })
    }

    /// Location of the user-wide configuration file.
    #[must_use]
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(GLOBAL_CONFIG_FILE_NAME))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        let escape = self.escape()?;

        for (marker, _) in self.mappings.iter() {
            validate_marker(marker, escape)?;
        }

        Ok(())
    }

    /// Returns the escape character.
    pub fn escape(&self) -> Result<char> {
        let mut chars = self.escape_char.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::config_invalid(
                "escape_char",
                format!(
                    "must be exactly one character, got {:?}",
                    self.escape_char
                ),
            )),
        }
    }

    /// Builds an expander from this configuration.
    pub fn expander(&self) -> Result<Expander> {
        let escape = self.escape()?;
        Ok(Expander::new(self.mappings.clone(), escape).with_order(self.order))
    }

    /// Adds a mapping after validating the marker.
    ///
    /// Returns the replacement it overwrote, if any.
    pub fn add_mapping(
        &mut self,
        marker: &str,
        replacement: &str,
        overwrite: bool,
    ) -> Result<Option<String>> {
        validate_marker(marker, self.escape()?)?;

        if replacement.trim().is_empty() {
            return Err(Error::config_invalid(
                format!("mappings.{marker}"),
                "replacement text cannot be empty",
            ));
        }

        if let Some(existing) = self.mappings.get(marker) {
            if !overwrite {
                return Err(Error::MappingExists {
                    marker: marker.to_string(),
                    existing: existing.to_string(),
                });
            }
        }

        self.mappings.insert(marker, replacement)
    }

    /// Removes a mapping and returns its replacement.
    pub fn remove_mapping(&mut self, marker: &str) -> Result<String> {
        self.mappings
            .remove(marker)
            .ok_or_else(|| Error::MappingNotFound {
                marker: marker.to_string(),
            })
    }

    /// Serializes to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Internal {
            message: format!("Failed to serialize config: {e}"),
        })
    }

    /// Writes the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io("create config dir", e))?;
        }

        let mut content = self.to_json_pretty()?;
        content.push('\n');

        std::fs::write(path, content).map_err(|e| Error::io("write config", e))
    }
}

/// Checks that a marker can be typed and matched.
pub fn validate_marker(marker: &str, escape: char) -> Result<()> {
    let field = || format!("mappings.{marker}");

    if marker.is_empty() {
        return Err(Error::config_invalid("mappings", "marker must not be empty"));
    }

    if marker.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::config_invalid(
            field(),
            "marker must not contain whitespace or control characters",
        ));
    }

    if marker.starts_with(escape) {
        return Err(Error::config_invalid(
            field(),
            format!("marker must not start with the escape character {escape:?}"),
        ));
    }

    Ok(())
}

/// Starter mappings written by `pxp init`.
fn default_mappings() -> MarkerTable {
    let mut table = MarkerTable::new();

    for (marker, replacement) in [
        ("-d", "详细解释这段代码的功能、实现原理和使用方法"),
        ("-v", "查看详细信息"),
        ("-h", "显示帮助信息"),
        ("-l", "列出所有项目"),
        ("-s", "显示状态信息"),
    ] {
        // Literal non-empty markers; insert cannot fail.
        if let Err(e) = table.insert(marker, replacement) {
            tracing::warn!(marker, error = %e, "Skipping default mapping");
        }
    }

    table
}
