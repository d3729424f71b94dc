//! The `clap`-derived argument surface. Exit codes and command dispatch
//! live in `main.rs`; this module only describes the grammar.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "fuku", version, about = "Local-development process orchestrator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Suppress the log view and emit a formatted stream to stdout
    /// instead. Only meaningful when no subcommand (or `run`) is given.
    #[arg(long, global = true)]
    pub no_ui: bool,

    /// Shorthand for `run <PROFILE>`, usable with no subcommand present.
    #[arg(short = 'r', long = "run", value_name = "PROFILE")]
    pub run_flag: Option<String>,

    /// Shorthand for `logs`, usable with no subcommand present.
    #[arg(short = 'l', long = "logs")]
    pub logs_flag: bool,

    /// Profile to target, for the `--logs`/`-l` shorthand.
    #[arg(long = "profile", global = true)]
    pub profile: Option<String>,

    /// Print a CPU%/RSS line for each service once a second, alongside its
    /// log output. Off by default so plain output matches the log stream
    /// exactly.
    #[arg(long, global = true)]
    pub stats: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a profile (default profile if none given).
    #[command(alias = "r")]
    Run {
        profile: Option<String>,
        #[arg(long)]
        no_ui: bool,
        #[arg(long)]
        stats: bool,
    },

    /// Stream logs from an already-running instance's socket.
    #[command(alias = "l")]
    Logs {
        services: Vec<String>,
        #[arg(long)]
        profile: Option<String>,
    },

    /// Reap any orphaned processes left by a prior session.
    #[command(alias = "s")]
    Stop,
}
