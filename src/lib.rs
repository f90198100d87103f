pub mod cli;
pub mod coerce;
pub mod column;
pub mod columns;
pub mod config;
pub mod consolidate;
pub mod data;
pub mod error;
pub mod frame;
pub mod movement;
pub mod normalize;
pub mod preview;
pub mod remap;
pub mod sheet_io;
pub mod table;
pub mod verify;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands, InitConfigArgs},
    config::RemapConfig,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_remap", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Remap(args) => remap::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Columns(args) => columns::execute(&args),
        Commands::Verify(args) => verify::execute(&args),
        Commands::InitConfig(args) => handle_init_config(&args),
    }
}

pub(crate) fn load_config(path: Option<&Path>) -> Result<RemapConfig> {
    match path {
        Some(path) => {
            RemapConfig::load(path).with_context(|| format!("Loading configuration from {path:?}"))
        }
        None => RemapConfig::builtin(),
    }
}

fn handle_init_config(args: &InitConfigArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        bail!(
            "{:?} already exists; pass --force to overwrite it",
            args.output
        );
    }
    let config = RemapConfig::builtin()?;
    config.save(&args.output)?;
    info!(
        "Wrote configuration with {} movement(s) and {} header(s) to {:?}",
        config.movements.len(),
        config.headers.len(),
        args.output
    );
    Ok(())
}
