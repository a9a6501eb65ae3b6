mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use clinancial::{logging, Config, Ledger};

fn main() {
    if let Err(err) = run() {
        eprintln!("❌ {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = cli::Cli::parse();
    logging::init(if args.verbose { "debug" } else { "warn" });

    // --db wins over the environment
    let config = match args.db.clone() {
        Some(path) => Config::with_path(path),
        None => Config::from_env()?,
    };

    let mut ledger = Ledger::open(&config)
        .with_context(|| format!("failed to open ledger at {}", config.db_path().display()))?;

    cli::dispatch(&mut ledger, &config, args.command)
}
