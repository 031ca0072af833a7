//! CLI command implementations.

use crate::config::{ExpanderConfig, CONFIG_FILE_NAME};
use crate::core::error::{Error, Result};
use crate::core::expander::MatchOrder;
use crate::core::hook::{HookInput, PromptHook};
use crate::core::settings::{ClaudeSettings, SETTINGS_FILE};
use console::style;
use std::io::{IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Hook error log, relative to the working directory.
const HOOK_ERROR_LOG: &str = ".claude/hook-error.log";

/// Expand a prompt event from stdin.
///
/// Never fails: any error is logged and the prompt passes through unchanged.
pub fn hook(config_path: Option<&Path>) -> Result<ExitCode> {
    if std::env::var("PXP_SKIP").ok().as_deref() == Some("1") {
        tracing::debug!("Skipping expansion (PXP_SKIP=1)");
        return Ok(ExitCode::SUCCESS);
    }

    let input = match read_hook_input() {
        Ok(input) => input,
        Err(e) => {
            pass_through(&e, None);
            return Ok(ExitCode::SUCCESS);
        },
    };

    match respond(config_path, &input) {
        Ok(Some(json)) => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{json}").and_then(|()| stdout.flush()) {
                tracing::warn!(error = %e, "Failed to write hook output");
            }
        },
        Ok(None) => {},
        Err(e) => pass_through(&e, input.cwd.as_deref()),
    }

    Ok(ExitCode::SUCCESS)
}

fn read_hook_input() -> Result<HookInput> {
    let mut bytes = Vec::new();
    std::io::stdin()
        .read_to_end(&mut bytes)
        .map_err(|e| Error::io("read hook input", e))?;

    HookInput::from_bytes(&bytes)
}

/// Expands the event and returns the JSON to print.
fn respond(config_path: Option<&Path>, input: &HookInput) -> Result<Option<String>> {
    if input.prompt.is_empty() {
        return Ok(None);
    }

    let config = match load_hook_config(config_path, input.cwd.as_deref()) {
        Ok(config) => config,
        Err(Error::ConfigNotFound { path }) => {
            tracing::debug!(path = %path.display(), "No configuration, nothing to expand");
            return Ok(None);
        },
        Err(e) => return Err(e),
    };

    let expander = config.expander()?;
    let hook = PromptHook::new(&expander, &config.context_prefix);

    hook.respond(input).map(|output| output.to_json()).transpose()
}

/// Loads the hook configuration, searching from the session directory when
/// the event carries one.
fn load_hook_config(config_path: Option<&Path>, cwd: Option<&Path>) -> Result<ExpanderConfig> {
    let path = match (config_path, cwd) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(cwd)) if cwd.is_dir() => ExpanderConfig::find_config_file_from(cwd)?,
        (None, _) => ExpanderConfig::find_config_file()?,
    };
    ExpanderConfig::load_from(&path)
}

fn pass_through(error: &Error, session_dir: Option<&Path>) {
    if error.is_user_error() {
        tracing::warn!(error = %error, "Prompt hook skipped, passing prompt through");
    } else {
        tracing::error!(error = %error, "Prompt hook failed, passing prompt through");
    }
    record_hook_error(error, &hook_error_log_path(session_dir));
}

/// Error log location for a session. Relative to the process working
/// directory when the event names no existing directory.
fn hook_error_log_path(session_dir: Option<&Path>) -> PathBuf {
    match session_dir.filter(|dir| dir.is_dir()) {
        Some(dir) => dir.join(HOOK_ERROR_LOG),
        None => PathBuf::from(HOOK_ERROR_LOG),
    }
}

/// Appends a hook failure to `log_path`, if its `.claude` directory exists.
fn record_hook_error(error: &Error, log_path: &Path) {
    if !log_path.parent().is_some_and(Path::is_dir) {
        return;
    }

    let line = format!(
        "{} prompt hook error: {error}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let written = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .and_then(|mut file| file.write_all(line.as_bytes()));

    if let Err(e) = written {
        tracing::debug!(error = %e, "Could not write hook error log");
    }
}

/// Expand text and print it.
pub fn expand(
    config_path: Option<&Path>,
    text: Option<String>,
    escape_char: Option<char>,
    order: Option<&str>,
) -> Result<ExitCode> {
    let mut config = load_config(config_path)?;

    if let Some(c) = escape_char {
        config.escape_char = c.to_string();
    }

    if let Some(o) = order {
        config.order = o
            .parse::<MatchOrder>()
            .map_err(|e| Error::config_invalid("order", e))?;
    }

    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| Error::io("read stdin", e))?;
            if buf.ends_with('\n') {
                buf.pop();
                if buf.ends_with('\r') {
                    buf.pop();
                }
            }
            buf
        },
    };

    let expansion = config.expander()?.expand(&text);

    tracing::debug!(
        changed = expansion.changed,
        order = %config.order,
        "Expanded input"
    );

    std::io::stdout()
        .write_all(format!("{}\n", expansion.text).as_bytes())
        .map_err(|e| Error::io("write output", e))?;

    Ok(ExitCode::SUCCESS)
}

/// Initialize configuration.
pub fn init(config_path: Option<&Path>, force: bool, empty: bool) -> Result<ExitCode> {
    let config_path = config_path.map_or_else(|| PathBuf::from(CONFIG_FILE_NAME), Path::to_path_buf);

    // Check if config already exists
    if config_path.exists() && !force {
        eprintln!(
            "{} Configuration already exists: {}",
            style("!").yellow(),
            config_path.display()
        );
        eprintln!("  Use --force to overwrite.");
        return Ok(ExitCode::FAILURE);
    }

    let config = if empty {
        ExpanderConfig::default()
    } else {
        ExpanderConfig::with_default_mappings()
    };

    config.save_to(&config_path)?;

    eprintln!("{} Created {}", style("✓").green(), config_path.display());
    eprintln!("  {} mapping(s) configured", config.mappings.len());

    eprintln!("\nNext steps:");
    eprintln!("  1. Add mappings: pxp add <MARKER> <REPLACEMENT>");
    eprintln!("  2. Run: pxp install");

    Ok(ExitCode::SUCCESS)
}

/// Add a mapping.
pub fn add(
    config_path: Option<&Path>,
    marker: Option<String>,
    replacement: Option<String>,
    force: bool,
) -> Result<ExitCode> {
    let path = match ExpanderConfig::resolve_path(config_path) {
        Ok(path) => path,
        Err(Error::ConfigNotFound { .. }) => PathBuf::from(CONFIG_FILE_NAME),
        Err(e) => return Err(e),
    };

    let mut config = match ExpanderConfig::load_from(&path) {
        Ok(config) => config,
        Err(Error::ConfigNotFound { .. }) => ExpanderConfig::default(),
        Err(e) => return Err(e),
    };

    let marker = match marker {
        Some(m) => m,
        None => prompt_text("Marker (e.g. -d, -v, --explain)")?,
    };
    let marker = marker.trim();

    let replacement = match replacement {
        Some(r) => r,
        None => prompt_text(&format!("Replacement text for '{marker}'"))?,
    };
    let replacement = replacement.trim();

    let mut overwrite = force;
    if !overwrite && std::io::stdin().is_terminal() {
        if let Some(existing) = config.mappings.get(marker) {
            eprintln!(
                "{} Marker '{marker}' already maps to '{existing}'",
                style("!").yellow()
            );
            overwrite = confirm("Overwrite?")?;
            if !overwrite {
                eprintln!("{} Kept existing mapping", style("•").cyan());
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    let previous = config.add_mapping(marker, replacement, overwrite)?;
    config.save_to(&path)?;

    let verb = if previous.is_some() { "Updated" } else { "Added" };
    eprintln!(
        "{} {verb} mapping: '{}' → '{}'",
        style("✓").green(),
        style(marker).cyan(),
        replacement
    );
    eprintln!("  Config file: {}", path.display());

    Ok(ExitCode::SUCCESS)
}

/// Remove a mapping.
pub fn remove(config_path: Option<&Path>, marker: &str) -> Result<ExitCode> {
    let path = ExpanderConfig::resolve_path(config_path)?;
    let mut config = ExpanderConfig::load_from(&path)?;

    config.remove_mapping(marker)?;
    config.save_to(&path)?;

    eprintln!(
        "{} Removed mapping for marker: '{}'",
        style("✓").green(),
        marker
    );

    Ok(ExitCode::SUCCESS)
}

/// List configured mappings.
pub fn list(config_path: Option<&Path>) -> Result<ExitCode> {
    let path = ExpanderConfig::resolve_path(config_path)?;
    let config = ExpanderConfig::load_from(&path)?;

    if config.mappings.is_empty() {
        eprintln!("No mappings configured.");
        eprintln!("  Run: pxp add <MARKER> <REPLACEMENT>");
        return Ok(ExitCode::SUCCESS);
    }

    eprintln!(
        "{}",
        style(format!("Mappings ({} total):", config.mappings.len())).bold()
    );
    for (marker, replacement) in config.mappings.iter() {
        eprintln!("  {} → {}", style(marker).cyan(), replacement);
    }

    eprintln!();
    eprintln!(
        "Escape character: {:?}, match order: {}",
        config.escape_char, config.order
    );
    eprintln!("Config file: {}", path.display());

    Ok(ExitCode::SUCCESS)
}

/// Validate configuration.
pub fn validate(config_path: Option<&Path>) -> Result<ExitCode> {
    match load_config(config_path) {
        Ok(config) => {
            eprintln!(
                "{} Configuration is valid ({} mapping(s))",
                style("✓").green(),
                config.mappings.len()
            );
            Ok(ExitCode::SUCCESS)
        },
        Err(Error::ConfigNotFound { path }) => {
            eprintln!(
                "{} Configuration not found: {}",
                style("!").yellow(),
                path.display()
            );
            eprintln!("  Run: pxp init");
            Ok(ExitCode::FAILURE)
        },
        Err(e) => {
            eprintln!("{} Configuration validation failed: {e}", style("✗").red());
            Ok(ExitCode::FAILURE)
        },
    }
}

/// Show configuration.
pub fn config(config_path: Option<&Path>, raw: bool) -> Result<ExitCode> {
    match ExpanderConfig::resolve_path(config_path).and_then(|path| {
        if path.exists() {
            Ok(path)
        } else {
            Err(Error::ConfigNotFound { path })
        }
    }) {
        Ok(path) => {
            eprintln!("Configuration file: {}", path.display());

            if raw {
                let content =
                    std::fs::read_to_string(&path).map_err(|e| Error::io("read config", e))?;
                eprintln!();
                std::io::stdout()
                    .write_all(content.as_bytes())
                    .map_err(|e| Error::io("write output", e))?;
            }

            Ok(ExitCode::SUCCESS)
        },
        Err(Error::ConfigNotFound { .. }) => {
            eprintln!("{} No configuration file found", style("!").yellow());
            eprintln!("  Run: pxp init");
            Ok(ExitCode::FAILURE)
        },
        Err(e) => Err(e),
    }
}

/// Register the hook in the project settings.
pub fn install(command: &str, force: bool) -> Result<ExitCode> {
    let settings_path = PathBuf::from(SETTINGS_FILE);

    let mut settings = match ClaudeSettings::load(&settings_path) {
        Ok(settings) => settings,
        Err(Error::SettingsParse { path, message }) if force => {
            let backup_path = path.with_extension("json.bak");
            std::fs::rename(&path, &backup_path).map_err(|e| Error::io("backup settings", e))?;
            eprintln!(
                "{} Unreadable settings ({message}) backed up to {}",
                style("•").cyan(),
                backup_path.display()
            );
            ClaudeSettings::empty(path)
        },
        Err(e) => return Err(e),
    };

    if !settings.install_hook(command)? {
        eprintln!(
            "{} Hook already installed in {}",
            style("✓").green(),
            settings.path().display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    settings.save()?;

    eprintln!(
        "{} Installed UserPromptSubmit hook in {}",
        style("✓").green(),
        settings.path().display()
    );
    eprintln!("  Command: {command}");

    if matches!(
        ExpanderConfig::find_config_file(),
        Err(Error::ConfigNotFound { .. })
    ) {
        eprintln!("  No mappings yet. Run: pxp init");
    }

    Ok(ExitCode::SUCCESS)
}

/// Remove the hook from the project settings.
pub fn uninstall(command: &str) -> Result<ExitCode> {
    let mut settings = ClaudeSettings::load(SETTINGS_FILE)?;

    if !settings.uninstall_hook(command) {
        eprintln!(
            "{} No hook installed in {}",
            style("•").cyan(),
            settings.path().display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    settings.save()?;

    eprintln!(
        "{} Removed UserPromptSubmit hook from {}",
        style("✓").green(),
        settings.path().display()
    );

    Ok(ExitCode::SUCCESS)
}

/// Generate shell completions.
pub fn completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    clap_complete::generate(
        shell,
        &mut super::Cli::command(),
        "pxp",
        &mut std::io::stdout(),
    );
}

/// Loads the configuration from an explicit path or by discovery.
fn load_config(config_path: Option<&Path>) -> Result<ExpanderConfig> {
    let path = ExpanderConfig::resolve_path(config_path)?;
    ExpanderConfig::load_from(&path)
}

fn prompt_text(prompt: &str) -> Result<String> {
    dialoguer::Input::<String>::new()
        .with_prompt(prompt)
        .interact_text()
        .map_err(|e| Error::Internal {
            message: format!("Failed to read input: {e}"),
        })
}

fn confirm(prompt: &str) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| Error::Internal {
            message: format!("Failed to read input: {e}"),
        })
}
