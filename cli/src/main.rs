use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;

use args::{Cli, Commands};
use cli::commands::{devmap, disassemble, run};
use cli::config::{load_config, FlagOverrides};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    cli::log_panics();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Run {
            paths,
            entry,
            developer_script,
            dedicated,
            config,
        } => {
            let config = load_config(
                config.as_deref(),
                FlagOverrides {
                    developer_script: *developer_script,
                    dedicated: *dedicated,
                },
            )?;
            run::run_files(paths, entry, config)
        }
        Commands::Devmap { path } => {
            print!("{}", devmap::devmap_listing(path)?);
            Ok(())
        }
        Commands::Disassemble { path } => {
            print!("{}", disassemble::disassemble_listing(path)?);
            Ok(())
        }
    }
}
