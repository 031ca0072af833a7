//! # prompt-expander
//!
//! Marker expansion for coding-agent prompts.
//!
//! Short markers typed into a prompt (`-d`, `--explain`) are replaced with
//! longer, configured text. A backslash in front of a marker keeps it literal,
//! and a doubled backslash stands for one literal backslash.
//!
//! ## Features
//!
//! - **Escape-aware expansion**: Odd escape runs suppress a marker, even runs
//!   collapse to half their length and still expand
//! - **Explicit ordering**: Mappings keep declaration order; overlapping
//!   markers can be resolved longest-first instead
//! - **Prompt hook**: `pxp hook` reads a `UserPromptSubmit` event and emits the
//!   expanded prompt as additional context, failing open on any error
//! - **Mapping management**: `pxp init`, `add`, `remove`, `list`, `install`
//!
//! ## Example
//!
//! ```rust
//! use prompt_expander::{Expander, MarkerTable};
//!
//! let table = MarkerTable::from_pairs([("-e", "expanded"), ("-v", "verbose")])?;
//! let expander = Expander::new(table, '\\');
//!
//! assert_eq!(expander.expand("-e and -v").text, "expanded and verbose");
//! assert_eq!(expander.expand(r"\-e and -v").text, "-e and verbose");
//! assert_eq!(expander.expand(r"\\-e").text, r"\expanded");
//! # Ok::<(), prompt_expander::Error>(())
//! ```

#![doc(html_root_url = "https://docs.rs/prompt-expander/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cli;
pub mod config;
pub mod core;

// Re-export main types for convenience
pub use config::ExpanderConfig;
pub use crate::core::error::{Error, Result};
pub use crate::core::expander::{expand, Expander, Expansion, MarkerTable, MatchOrder};
pub use crate::core::hook::{HookInput, HookOutput, PromptHook};
