//! CLI command definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for turnstile
#[derive(Parser, Debug)]
#[command(name = "turnstile")]
#[command(author, version, about = "Single-flight chat sessions with streamed answers")]
#[command(long_about = r#"
Turnstile runs one chat turn at a time per user. Answers are streamed into
a single message that grows as the backend generates it, and a running
answer can be cancelled with /cancel.

Configuration files are loaded from (lowest to highest priority):
1. ~/.config/turnstile/config.toml   Global config
2. ./turnstile.toml                  Project-level config
3. --config <path>                   Explicit config file
4. TURNSTILE_<SECTION>__<KEY>        Environment variables

Example:
  turnstile
  turnstile --user alice --mode coder
  turnstile --no-stream -vv --log-file turnstile.log
"#)]
pub struct Cli {
    /// User id the console session runs as
    #[arg(short, long, default_value = "console")]
    pub user: String,

    /// Chat mode to switch to before the first message
    #[arg(long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Model used for users that have none stored
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Wait for whole answers instead of streaming them
    #[arg(long)]
    pub no_stream: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Write diagnostic logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Append turn events as JSON lines to this file
    #[arg(long, value_name = "PATH")]
    pub conversation_log: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}
