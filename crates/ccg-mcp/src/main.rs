use anyhow::Result;
use clap::Parser;

mod cli;
mod dispatch;
mod error_hints;
mod request_parse;

use cli::{Cli, Commands, ConfigCommands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => dispatch::run().await,
        Commands::Config { command } => match command {
            ConfigCommands::Validate => handle_config_validate(),
        },
    }
}

fn handle_config_validate() -> Result<()> {
    match ccg_config::load() {
        Ok(cfg) => {
            println!("config ok: base_url={}, model={}", cfg.base_url, cfg.model);
            Ok(())
        }
        Err(err) => {
            eprintln!("config invalid: {err}");
            if let Some(hint) = error_hints::suggest_fix(&err) {
                eprintln!("{hint}");
            }
            Err(err.into())
        }
    }
}
