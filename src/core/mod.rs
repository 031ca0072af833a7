//! Core functionality for prompt-expander.
//!
//! This module contains the main components:
//! - [`expander`]: The marker expansion engine
//! - [`hook`]: Prompt hook input and output
//! - [`settings`]: Hook registration in the agent settings file
//! - [`error`]: Error types and result handling

pub mod error;
pub mod expander;
pub mod hook;
pub mod settings;
