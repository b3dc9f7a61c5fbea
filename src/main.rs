//! fwset - manage kernel firewall sets of blocked and allowed networks.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use fwset::cli::{Cli, Commands};
use fwset::commands;
use fwset::firewall::Modification;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    // Listings go to stdout, so logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let overrides = &cli.overrides;
    match &cli.command {
        Commands::Create => commands::create::run(&cli.config, overrides),
        Commands::Destroy => commands::destroy::run(&cli.config, overrides),
        Commands::Add { networks } => {
            commands::modify::run(Modification::Add, networks, &cli.config, overrides)
        }
        Commands::Del { networks } => {
            commands::modify::run(Modification::Remove, networks, &cli.config, overrides)
        }
        Commands::List => commands::list::run(&cli.config, overrides),
        Commands::Config => commands::config::run(&cli.config, overrides),
    }
}
