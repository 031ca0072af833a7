//! Claude settings file integration.
//!
//! Registers the prompt hook under `hooks.UserPromptSubmit` in a project's
//! `.claude/settings.json`, leaving every other key untouched.

use crate::core::error::{Error, Result};
use crate::core::hook::USER_PROMPT_SUBMIT;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

/// Settings file location, relative to the project root.
pub const SETTINGS_FILE: &str = ".claude/settings.json";

/// Command registered by `pxp install` unless overridden.
pub const DEFAULT_HOOK_COMMAND: &str = "pxp hook";

/// A loaded settings document.
#[derive(Debug, Clone)]
pub struct ClaudeSettings {
    path: PathBuf,
    root: Map<String, Value>,
}

impl ClaudeSettings {
    /// Loads settings from `path`. A missing file yields empty settings.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            return Ok(Self::empty(path));
        }

        let content = std::fs::read_to_string(&path).map_err(|e| Error::io("read settings", e))?;
        if content.trim().is_empty() {
            return Ok(Self::empty(path));
        }

        let value: Value = serde_json::from_str(&content).map_err(|e| Error::SettingsParse {
            path: path.clone(),
            message: e.to_string(),
        })?;

        match value {
            Value::Object(root) => Ok(Self { path, root }),
            _ => Err(Error::SettingsParse {
                path,
                message: "top level is not a JSON object".to_string(),
            }),
        }
    }

    /// Creates empty settings that will be written to `path`.
    #[must_use]
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            root: Map::new(),
        }
    }

    /// Returns the settings file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if `command` is registered for prompt submission.
    #[must_use]
    pub fn has_hook(&self, command: &str) -> bool {
        self.root
            .get("hooks")
            .and_then(|hooks| hooks.get(USER_PROMPT_SUBMIT))
            .and_then(Value::as_array)
            .is_some_and(|groups| groups.iter().any(|group| group_has_command(group, command)))
    }

    /// Registers `command`. Returns false if it was already registered.
    pub fn install_hook(&mut self, command: &str) -> Result<bool> {
        if self.has_hook(command) {
            return Ok(false);
        }

        let path = self.path.clone();
        let hooks = self
            .root
            .entry("hooks")
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| Error::SettingsParse {
                path: path.clone(),
                message: "\"hooks\" is not an object".to_string(),
            })?;

        let groups = hooks
            .entry(USER_PROMPT_SUBMIT)
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
            .ok_or_else(|| Error::SettingsParse {
                path,
                message: format!("\"hooks.{USER_PROMPT_SUBMIT}\" is not an array"),
            })?;

        groups.push(json!({
            "matcher": "",
            "hooks": [{ "type": "command", "command": command }],
        }));

        Ok(true)
    }

    /// Removes every registration of `command`. Returns whether any existed.
    ///
    /// Groups and events left empty by the removal are dropped.
    pub fn uninstall_hook(&mut self, command: &str) -> bool {
        let Some(hooks) = self.root.get_mut("hooks").and_then(Value::as_object_mut) else {
            return false;
        };
        let Some(groups) = hooks.get_mut(USER_PROMPT_SUBMIT).and_then(Value::as_array_mut) else {
            return false;
        };

        let mut removed = false;
        groups.retain_mut(|group| {
            let Some(commands) = group.get_mut("hooks").and_then(Value::as_array_mut) else {
                return true;
            };
            let before = commands.len();
            commands.retain(|entry| !is_command(entry, command));
            if commands.len() == before {
                return true;
            }
            removed = true;
            !commands.is_empty()
        });

        if groups.is_empty() {
            hooks.remove(USER_PROMPT_SUBMIT);
        }
        if hooks.is_empty() {
            self.root.remove("hooks");
        }

        removed
    }

    /// Writes the settings back to disk, creating parent directories.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io("create settings dir", e))?;
        }

        let mut content =
            serde_json::to_string_pretty(&self.root).map_err(|e| Error::Internal {
                message: format!("Failed to serialize settings: {e}"),
            })?;
        content.push('\n');

        std::fs::write(&self.path, content).map_err(|e| Error::io("write settings", e))
    }
}

fn group_has_command(group: &Value, command: &str) -> bool {
    group
        .get("hooks")
        .and_then(Value::as_array)
        .is_some_and(|commands| commands.iter().any(|entry| is_command(entry, command)))
}

fn is_command(entry: &Value, command: &str) -> bool {
    entry.get("command").and_then(Value::as_str) == Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_is_empty() {
        let temp = TempDir::new().expect("temp dir");
        let settings = ClaudeSettings::load(temp.path().join("settings.json")).expect("load");
        assert!(!settings.has_hook(DEFAULT_HOOK_COMMAND));
    }

    #[test]
    fn test_install_adds_entry_once() {
        let mut settings = ClaudeSettings::empty("settings.json");
        assert!(settings.install_hook("pxp hook").expect("install"));
        assert!(!settings.install_hook("pxp hook").expect("install again"));
        assert!(settings.has_hook("pxp hook"));

        let groups = settings.root["hooks"]["UserPromptSubmit"]
            .as_array()
            .expect("array");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0]["hooks"][0]["type"], "command");
    }

    #[test]
    fn test_install_keeps_existing_keys_and_hooks() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"model":"opus","hooks":{"UserPromptSubmit":[{"matcher":"","hooks":[{"type":"command","command":"other"}]}],"Stop":[]}}"#,
        )
        .expect("write");

        let mut settings = ClaudeSettings::load(&path).expect("load");
        assert!(settings.install_hook("pxp hook").expect("install"));
        settings.save().expect("save");

        let reloaded = ClaudeSettings::load(&path).expect("reload");
        assert!(reloaded.has_hook("other"));
        assert!(reloaded.has_hook("pxp hook"));
        assert_eq!(reloaded.root["model"], "opus");
        assert!(reloaded.root["hooks"].get("Stop").is_some());

        let keys: Vec<&String> = reloaded.root.keys().collect();
        assert_eq!(keys, vec!["model", "hooks"]);
    }

    #[test]
    fn test_uninstall_drops_empty_containers() {
        let mut settings = ClaudeSettings::empty("settings.json");
        settings.install_hook("pxp hook").expect("install");
        assert!(settings.uninstall_hook("pxp hook"));
        assert!(settings.root.get("hooks").is_none());
        assert!(!settings.uninstall_hook("pxp hook"));
    }

    #[test]
    fn test_uninstall_keeps_other_commands() {
        let mut settings = ClaudeSettings::empty("settings.json");
        settings.install_hook("other").expect("install other");
        settings.install_hook("pxp hook").expect("install");
        assert!(settings.uninstall_hook("pxp hook"));
        assert!(settings.has_hook("other"));
        assert!(!settings.has_hook("pxp hook"));
    }

    #[test]
    fn test_load_rejects_non_object() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("settings.json");
        std::fs::write(&path, "[1, 2]").expect("write");
        let err = ClaudeSettings::load(&path).expect_err("not an object");
        assert!(matches!(err, Error::SettingsParse { .. }));
    }

    #[test]
    fn test_install_rejects_wrong_shape() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("settings.json");
        std::fs::write(&path, r#"{"hooks":{"UserPromptSubmit":"nope"}}"#).expect("write");
        let mut settings = ClaudeSettings::load(&path).expect("load");
        let err = settings.install_hook("pxp hook").expect_err("wrong shape");
        assert!(matches!(err, Error::SettingsParse { .. }));
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join(".claude").join("settings.json");
        let mut settings = ClaudeSettings::empty(&path);
        settings.install_hook("pxp hook").expect("install");
        settings.save().expect("save");
        assert!(path.exists());
    }
}
