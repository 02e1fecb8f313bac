//! CLI subcommands — set an indicator, show indicator status, show config.

mod config_cmd;
mod set;
mod status;

use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;

pub(super) use kbled_lib::config::Config;
pub(super) use kbled_lib::error::Result;
pub(super) use kbled_lib::hid::{self, HidHost};
pub(super) use kbled_lib::report::DeviceReport;
pub(super) use kbled_lib::{Indicator, IndicatorRequest, LedState, RunOptions, RunOutcome};

const PADDING: usize = 2;

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w - 2);
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct StatusOutput {
    pub count: usize,
    pub keyboards: Vec<DeviceReport>,
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
}

/// Options shared by every subcommand.
pub struct GlobalArgs {
    pub verbose: bool,
    pub name: Option<String>,
    pub config: Option<PathBuf>,
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Set one indicator on every matching keyboard
    Set {
        /// Indicator to change
        #[arg(value_name = "num|caps|scroll")]
        indicator: Indicator,
        /// Desired state
        #[arg(value_name = "on|off")]
        state: LedState,
    },

    /// Show the indicator state of every matching keyboard (changes nothing)
    Status,

    /// Show current configuration and file path
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

/// Warn if `--json` was passed to a command that doesn't support it.
fn warn_json_unsupported(cmd_name: &str) {
    log::warn!("--json is not supported for `{cmd_name}` (ignored)");
}

/// Load config from `custom_path` or the default location, logging parse warnings.
pub(super) fn load_config(custom_path: Option<&Path>) -> Config {
    let (config, warnings) = match custom_path {
        Some(p) => Config::load_from(p),
        None => Config::load_with_warnings(),
    };
    for w in &warnings {
        log::warn!("{w}");
    }
    config
}

/// Merge command-line flags over the config file. `--name` replaces
/// `device_filter`; `--verbose` and `verbose` are OR-ed.
pub(super) fn resolve_options(globals: &GlobalArgs, config: &Config) -> Result<RunOptions> {
    let name_filter = match &globals.name {
        Some(pattern) => Some(kbled_lib::filter::NameFilter::new(pattern)?),
        None => config.name_filter()?,
    };
    Ok(RunOptions {
        name_filter,
        verbose: globals.verbose || config.verbose,
    })
}

/// Print the informational no-keyboard message on stderr.
pub(super) fn report_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::NoKeyboardsFound => eprintln!("Could not find any keyboard devices."),
        RunOutcome::Completed(reports) if reports.is_empty() => {
            log::info!("no keyboard matched the name filter");
        }
        RunOutcome::Completed(_) => {}
    }
}

pub fn run(cmd: Command, globals: &GlobalArgs) -> Result<()> {
    let config_path = globals.config.as_deref();
    match cmd {
        Command::Set { indicator, state } => {
            if globals.json {
                warn_json_unsupported("set");
            }
            let config = load_config(config_path);
            let options = resolve_options(globals, &config)?;
            set::cmd_set(indicator, state, &options)
        }
        Command::Status => {
            let config = load_config(config_path);
            let options = resolve_options(globals, &config)?;
            status::cmd_status(&options, globals.json)
        }
        Command::Config { init } => config_cmd::cmd_config(globals.json, init, config_path),
    }
}
