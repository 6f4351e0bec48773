use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ccg-mcp", version, about = "Bridges code-executor, reviewer, and generalist CLIs over stdio JSON-RPC")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the stdio JSON-RPC tool-dispatch loop (§4.9).
    Serve,

    /// Config-related subcommands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Load and eagerly validate the config store, reporting actionable hints on failure.
    Validate,
}
