//! Prompt hook protocol.
//!
//! The agent runs `pxp hook` on every submitted prompt, passing one JSON
//! event on stdin. When expansion changes the prompt, the hook prints a JSON
//! document carrying the expanded text as additional context; otherwise it
//! prints nothing and the original prompt goes through untouched.

use crate::core::error::{Error, Result};
use crate::core::expander::Expander;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hook event name this crate responds to.
pub const USER_PROMPT_SUBMIT: &str = "UserPromptSubmit";

/// Event read from stdin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HookInput {
    /// The prompt the user submitted.
    #[serde(default)]
    pub prompt: String,
    /// Name of the firing event.
    #[serde(default)]
    pub hook_event_name: Option<String>,
    /// Agent session identifier.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Working directory of the agent session.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

impl HookInput {
    /// Parses an event from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::HookInput {
            message: e.to_string(),
        })
    }

    /// Parses an event from raw bytes.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_json(&String::from_utf8_lossy(bytes))
    }
}

/// Document written to stdout when the prompt was expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    /// Event-specific payload.
    pub hook_specific_output: HookSpecificOutput,
}

/// Payload of [`HookOutput`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    /// Always [`USER_PROMPT_SUBMIT`].
    pub hook_event_name: String,
    /// Text appended to the conversation as context.
    pub additional_context: String,
}

impl HookOutput {
    /// Builds the output for an expanded prompt.
    #[must_use]
    pub fn additional_context(context: impl Into<String>) -> Self {
        Self {
            hook_specific_output: HookSpecificOutput {
                hook_event_name: USER_PROMPT_SUBMIT.to_string(),
                additional_context: context.into(),
            },
        }
    }

    /// Serializes to a single JSON line.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Internal {
            message: format!("Failed to serialize hook output: {e}"),
        })
    }
}

/// Responds to prompt events with an expander.
#[derive(Debug)]
pub struct PromptHook<'a> {
    expander: &'a Expander,
    context_prefix: &'a str,
}

impl<'a> PromptHook<'a> {
    /// Creates a hook that prefixes expanded prompts with `context_prefix`.
    #[must_use]
    pub fn new(expander: &'a Expander, context_prefix: &'a str) -> Self {
        Self {
            expander,
            context_prefix,
        }
    }

    /// Returns the output for an event, or `None` when nothing changed.
    #[must_use]
    pub fn respond(&self, input: &HookInput) -> Option<HookOutput> {
        if input.prompt.is_empty() {
            tracing::debug!("Empty prompt, nothing to expand");
            return None;
        }

        let expansion = self.expander.expand(&input.prompt);
        if !expansion.changed {
            tracing::debug!("Prompt unchanged");
            return None;
        }

        tracing::debug!(
            original_len = input.prompt.len(),
            expanded_len = expansion.text.len(),
            "Prompt expanded"
        );

        Some(HookOutput::additional_context(format!(
            "{}{}",
            self.context_prefix, expansion.text
        )))
    }
}
