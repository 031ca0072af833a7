//! Command-line interface for prompt-expander.
//!
//! This module provides the `pxp` CLI with subcommands for:
//! - `hook`: Expand a submitted prompt (the agent hook entry point)
//! - `expand`: Preview an expansion
//! - `init`: Initialize configuration
//! - `add` / `remove` / `list`: Manage mappings
//! - `validate`: Validate configuration
//! - `install` / `uninstall`: Register the hook with the agent

mod commands;

use crate::core::error::Result;
use crate::core::settings::DEFAULT_HOOK_COMMAND;
use clap::{Parser, Subcommand};
use console::style;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Marker expansion for coding-agent prompts.
#[derive(Debug, Parser)]
#[command(
    name = "pxp",
    author,
    version,
    about = "Marker expansion for coding-agent prompts",
    long_about = r#"
prompt-expander (pxp) expands short markers in the prompts you submit to a
coding agent. Type `-d` and the agent also receives the long text you mapped
to it. Escape a marker with a backslash to keep it literal:

  -d      expands
  \-d     stays "-d"
  \\-d    becomes "\" followed by the expansion

Quick start:
  pxp init      # Create .claude/config/text-expander.json
  pxp install   # Register the UserPromptSubmit hook
  pxp add -r "review this diff for bugs"

Environment variables:
  PXP_CONFIG=<path>   Use a specific configuration file
  PXP_SKIP=1          Pass prompts through without expansion
"#,
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file to use instead of discovery.
    #[arg(long, global = true, env = "PXP_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use color output.
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,
}

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Always use color.
    Always,
    /// Auto-detect color support.
    #[default]
    Auto,
    /// Never use color.
    Never,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Read a prompt event from stdin and emit expanded context.
    Hook,

    /// Expand text with the configured mappings and print the result.
    #[command(visible_alias = "e")]
    Expand {
        /// Text to expand. Read from stdin when omitted.
        #[arg(allow_hyphen_values = true)]
        text: Option<String>,

        /// Override the configured escape character.
        #[arg(long, value_name = "CHAR")]
        escape_char: Option<char>,

        /// Override the configured match order.
        #[arg(long, value_parser = ["declaration", "longest_first"])]
        order: Option<String>,
    },

    /// Create the configuration file.
    #[command(visible_alias = "i")]
    Init {
        /// Overwrite existing configuration.
        #[arg(short, long)]
        force: bool,

        /// Start without the starter mappings.
        #[arg(long)]
        empty: bool,
    },

    /// Add a mapping. Prompts for missing values.
    #[command(visible_alias = "a", after_help = MARKER_AFTER_HELP)]
    Add {
        /// Marker to expand, e.g. `-d` or `--explain`.
        #[arg(allow_hyphen_values = true)]
        marker: Option<String>,

        /// Replacement text.
        #[arg(allow_hyphen_values = true)]
        replacement: Option<String>,

        /// Overwrite an existing mapping.
        #[arg(short, long)]
        force: bool,
    },

    /// Remove a mapping.
    #[command(visible_alias = "rm", after_help = MARKER_AFTER_HELP)]
    Remove {
        /// Marker to remove.
        #[arg(allow_hyphen_values = true)]
        marker: String,
    },

    /// List configured mappings.
    #[command(visible_alias = "l")]
    List,

    /// Validate the configuration file.
    Validate,

    /// Show configuration file location and contents.
    Config {
        /// Output raw JSON.
        #[arg(long)]
        raw: bool,
    },

    /// Register the prompt hook in .claude/settings.json.
    Install {
        /// Replace an unreadable settings file (a backup is kept).
        #[arg(short, long)]
        force: bool,

        /// Command the agent should run.
        #[arg(long, default_value = DEFAULT_HOOK_COMMAND)]
        command: String,
    },

    /// Remove the prompt hook from .claude/settings.json.
    Uninstall {
        /// Command to remove.
        #[arg(long, default_value = DEFAULT_HOOK_COMMAND)]
        command: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Help footer for commands that take a marker.
const MARKER_AFTER_HELP: &str = "\
Markers that look like global flags (-v, -q, -h) go after `--`:
  pxp add -- -v \"show detailed information\"
  pxp remove -- -v";

/// Global flags users also tend to pick as markers.
const CLASHING_FLAGS: [&str; 4] = ["-v", "-q", "--verbose", "--quiet"];

/// Runs the CLI.
pub fn run() -> Result<ExitCode> {
    let args: Vec<OsString> = std::env::args_os().collect();
    let cli = Cli::parse_from(&args);

    // Set up logging
    setup_logging(cli.verbose, cli.quiet);

    // Set up color
    setup_color(cli.color);

    if matches!(
        cli.command,
        Some(Commands::Add { .. } | Commands::Remove { .. })
    ) {
        if let Some(flag) = marker_flag_clash(&args) {
            eprintln!(
                "{} '{flag}' was read as a global flag. To use it as a marker, write: pxp add -- {flag} <REPLACEMENT>",
                style("hint:").yellow()
            );
        }
    }

    let config = cli.config.as_deref();

    // Without a subcommand, behave as the hook
    match cli.command {
        Some(Commands::Hook) | None => commands::hook(config),
        Some(Commands::Expand {
            text,
            escape_char,
            order,
        }) => commands::expand(config, text, escape_char, order.as_deref()),
        Some(Commands::Init { force, empty }) => commands::init(config, force, empty),
        Some(Commands::Add {
            marker,
            replacement,
            force,
        }) => commands::add(config, marker, replacement, force),
        Some(Commands::Remove { marker }) => commands::remove(config, &marker),
        Some(Commands::List) => commands::list(config),
        Some(Commands::Validate) => commands::validate(config),
        Some(Commands::Config { raw }) => commands::config(config, raw),
        Some(Commands::Install { force, command }) => commands::install(&command, force),
        Some(Commands::Uninstall { command }) => commands::uninstall(&command),
        Some(Commands::Completions { shell }) => {
            commands::completions(shell);
            Ok(ExitCode::SUCCESS)
        },
    }
}

/// Returns a global flag given after `add`/`remove` and before `--`.
fn marker_flag_clash(args: &[OsString]) -> Option<&'static str> {
    let mut rest = args
        .iter()
        .skip(1)
        .map(|arg| arg.to_str().unwrap_or_default())
        .skip_while(|arg| !matches!(*arg, "add" | "a" | "remove" | "rm"))
        .skip(1)
        .take_while(|arg| *arg != "--");

    rest.find_map(|arg| CLASHING_FLAGS.into_iter().find(|flag| *flag == arg))
}

/// Sets up logging based on verbosity flags.
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Sets up color output.
fn setup_color(choice: ColorChoice) {
    match choice {
        ColorChoice::Always => {
            console::set_colors_enabled(true);
            console::set_colors_enabled_stderr(true);
        },
        ColorChoice::Never => {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        },
        ColorChoice::Auto => {
            // Let console crate auto-detect
        },
    }
}
