//! CASS Database Manager CLI
//!
//! Command-line interface for installing, feeding, auditing, and analyzing
//! the CASS station's SQLite database.

use anyhow::Result;
use clap::Parser;

use cass_core::default_conf_dir;
use cassctl::cli::{
    generate_completion, handle_audit, handle_check, handle_config, handle_install, handle_push,
    handle_speciate, Cli, Commands,
};
use cassctl::config::AppConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Completion needs no configuration.
    if let Commands::Completion { shell } = &cli.command {
        generate_completion(*shell);
        return Ok(());
    }

    let conf_dir = cli.conf_dir.clone().unwrap_or_else(default_conf_dir);
    let config = match AppConfig::load(&conf_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            eprintln!("Configuration directory: {}", conf_dir.display());
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Install => handle_install(&config, &cli.format),
        Commands::Check => handle_check(&config, &cli.format),
        Commands::Push { target } => handle_push(&config, target, &cli.format),
        Commands::Audit {
            source,
            report,
            audits_dir,
        } => handle_audit(&config, source, report, audits_dir, &cli.format),
        Commands::Speciate {
            start,
            end,
            interval,
            out,
        } => handle_speciate(&config, start, end, interval, out, &cli.format),
        Commands::Config { command } => handle_config(&config, command, &cli.format),
        Commands::Completion { .. } => unreachable!(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if cli.verbose {
            eprintln!("Error details: {:?}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
