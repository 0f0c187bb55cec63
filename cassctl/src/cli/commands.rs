//! CLI command and subcommand definitions

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use cass_core::Source;

/// CASS Database Manager CLI
#[derive(Parser, Debug)]
#[command(name = "cassctl")]
#[command(version, about = "CASS Database Manager CLI", long_about = None)]
pub struct Cli {
    /// Configuration directory holding data.conf, db.conf, and constants.conf
    /// (default: ~/.config/cassdb)
    #[arg(long, global = true)]
    pub conf_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty table output
    Table,
    /// JSON output
    Json,
}

impl From<&OutputFormat> for crate::format::OutputFormat {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Table => crate::format::OutputFormat::Table,
            OutputFormat::Json => crate::format::OutputFormat::Json,
        }
    }
}

/// Instrument selector for per-source commands.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SourceArg {
    Ae33,
    Tca,
}

impl From<SourceArg> for Source {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Ae33 => Source::Ae33,
            SourceArg::Tca => Source::Tca,
        }
    }
}

/// Instrument selector for `push`, which also accepts both at once.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum PushTarget {
    Ae33,
    Tca,
    All,
}

impl PushTarget {
    pub fn sources(self) -> Vec<Source> {
        match self {
            PushTarget::Ae33 => vec![Source::Ae33],
            PushTarget::Tca => vec![Source::Tca],
            PushTarget::All => Source::ALL.to_vec(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database file and verify read/write access
    Install,

    /// Check configuration, data folders, and database health
    Check,

    /// Ingest new raw files into the database
    Push {
        /// Which instrument's files to ingest
        #[arg(value_enum, default_value_t = PushTarget::All)]
        target: PushTarget,
    },

    /// Audit a table for gaps wider than its own sampling interval
    Audit {
        /// Which instrument's table to audit
        #[arg(value_enum)]
        source: SourceArg,

        /// Write the detected gaps to a CSV report
        #[arg(long)]
        report: bool,

        /// Directory for gap reports (default: ./audits)
        #[arg(long)]
        audits_dir: Option<PathBuf>,
    },

    /// Run the carbon speciation analysis over a date range
    Speciate {
        /// First day of the analysis range (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the analysis range, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Averaging interval in minutes
        #[arg(long, default_value_t = 60)]
        interval: u32,

        /// Directory for analysis runs (default: ./speciation)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show or inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the resolved configuration from all three files
    Show,
}
