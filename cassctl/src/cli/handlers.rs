//! Command execution handlers

use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use colored::*;
use tracing::info;

use cass_core::speciation::{extended_end, validate_range, Speciation, SpeciationRow};
use cass_core::{CassError, ConfFile, Source, CONSTANTS_CONF, DATA_CONF, DB_CONF};
use cass_store::{ae33, gaps, hourly, tca, Database};

use crate::config::AppConfig;
use crate::format::format_success;
use crate::report;

use super::commands::*;

/// Gap thresholds applied to the analysis window of a speciation run, in
/// minutes per source.
fn range_gap_threshold(source: Source) -> i64 {
    match source {
        Source::Ae33 => 1,
        Source::Tca => 60,
    }
}

/// Handle install command
pub fn handle_install(config: &AppConfig, _format: &OutputFormat) -> Result<()> {
    let db = Database::install(&config.db.db_path)?;
    let tables = db.tables()?;
    println!(
        "{}",
        format_success(&format!("Database ready at {}", config.db.db_path.display()))
    );
    if tables.is_empty() {
        println!("No tables yet; run `cassctl push` to ingest raw files.");
    } else {
        println!("Tables: {}", tables.join(", "));
    }
    Ok(())
}

/// Handle check command
pub fn handle_check(config: &AppConfig, format: &OutputFormat) -> Result<()> {
    let mut checks: Vec<(String, bool, String)> = Vec::new();

    for source in Source::ALL {
        match config.data.source(source) {
            Ok(src) => {
                let exists = src.data_location.is_dir();
                checks.push((
                    format!("{source} data folder"),
                    exists,
                    src.data_location.display().to_string(),
                ));
            }
            Err(e) => checks.push((format!("{source} data folder"), false, e.to_string())),
        }
    }

    let db = match Database::open_read_only(&config.db.db_path) {
        Ok(db) => {
            checks.push((
                "database".to_string(),
                true,
                config.db.db_path.display().to_string(),
            ));
            Some(db)
        }
        Err(e) => {
            checks.push(("database".to_string(), false, e.to_string()));
            None
        }
    };

    let mut stats = Vec::new();
    if let Some(db) = &db {
        let tables = db.tables()?;
        for source in Source::ALL {
            let table = config.db.table(source);
            let present = tables.iter().any(|t| t == table);
            checks.push((
                format!("table {table}"),
                present,
                if present {
                    "present".to_string()
                } else {
                    "missing".to_string()
                },
            ));
            if present {
                stats.push(db.table_stats(table, source.time_column())?);
            }
        }
    }

    let all_ok = checks.iter().all(|(_, ok, _)| *ok);
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "ok": all_ok,
                "checks": checks
                    .iter()
                    .map(|(name, ok, detail)| serde_json::json!({
                        "check": name, "ok": ok, "detail": detail,
                    }))
                    .collect::<Vec<_>>(),
                "tables": stats,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Table => {
            println!("{}", "Configuration Check:".bold());
            for (name, ok, detail) in &checks {
                let mark = if *ok {
                    "✓".green().to_string()
                } else {
                    "✗".red().to_string()
                };
                println!("{mark} {name:<20} {detail}");
            }
            if !stats.is_empty() {
                println!();
                println!(
                    "{}",
                    crate::format::format_table_stats(&stats, &format.into())?
                );
            }
        }
    }

    if !all_ok {
        bail!("one or more checks failed");
    }
    Ok(())
}

/// Handle push command
pub fn handle_push(config: &AppConfig, target: PushTarget, format: &OutputFormat) -> Result<()> {
    let db = Database::open(&config.db.db_path)?;

    for source in target.sources() {
        let src_config = config.data.source(source)?;
        let table = config.db.table(source);
        info!("pushing {source} files from {}", src_config.data_location.display());
        let report = match source {
            Source::Ae33 => ae33::push(&db, &src_config, table)?,
            Source::Tca => tca::push(&db, &src_config, table)?,
        };
        println!(
            "{}",
            crate::format::format_ingest_report(&report, &format.into())?
        );
    }
    Ok(())
}

/// Handle audit command
pub fn handle_audit(
    config: &AppConfig,
    source: SourceArg,
    write_report: bool,
    audits_dir: Option<PathBuf>,
    format: &OutputFormat,
) -> Result<()> {
    let source: Source = source.into();
    let db = Database::open_read_only(&config.db.db_path)?;
    let table = config.db.table(source);
    let audit = gaps::audit(&db, table, source.time_column())?;

    println!(
        "{}",
        crate::format::format_audit(table, &audit, &format.into())?
    );

    if write_report {
        let dir = audits_dir.unwrap_or_else(|| PathBuf::from("audits"));
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!(
            "gaps_{source}_{}.csv",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        report::write_gaps_csv(&path, &audit.gaps)?;
        println!("{}", format_success(&format!("Report written to {}", path.display())));
    }
    Ok(())
}

/// Handle speciate command
pub fn handle_speciate(
    config: &AppConfig,
    start: NaiveDate,
    end: NaiveDate,
    interval_minutes: u32,
    out: Option<PathBuf>,
    format: &OutputFormat,
) -> Result<()> {
    if !hourly::ALLOWED_INTERVALS_MIN.contains(&interval_minutes) {
        bail!(
            "interval must be one of {:?} minutes",
            hourly::ALLOWED_INTERVALS_MIN
        );
    }

    let db = Database::open_read_only(&config.db.db_path)?;

    let mut stats = Vec::new();
    for source in Source::ALL {
        stats.push(db.table_stats(config.db.table(source), source.time_column())?);
    }
    println!(
        "{}",
        crate::format::format_table_stats(&stats, &format.into())?
    );

    let (overlap_start, overlap_end) = overlap_window(&stats)?;
    validate_range(start, end, overlap_start, overlap_end)?;

    // Fetch a Time_Delta margin on both sides so the chunked scans have
    // context at the range edges; rows outside the request are trimmed after
    // the analysis.
    let time_delta = config.constants.time_delta_days;
    let fetch_start = start - chrono::Duration::days(time_delta);
    let fetch_end = extended_end(start, end, time_delta) + chrono::Duration::days(time_delta);
    info!(
        "fetching {fetch_start}..{fetch_end} at {interval_minutes} min (requested {start}..{end})"
    );

    let records = hourly::fetch(&db, &config.db, fetch_start, fetch_end, interval_minutes * 60)?;
    if records.is_empty() {
        bail!("no data in the requested range");
    }

    let output = Speciation::new(&config.constants).run(&records);
    let rows: Vec<SpeciationRow> = output
        .rows
        .into_iter()
        .filter(|r| {
            let d = r.timestamp.date();
            d >= start && d <= end
        })
        .collect();

    let run_dir = report::create_run_dir(&out.unwrap_or_else(|| PathBuf::from("speciation")))?;
    report::write_speciation_csv(&run_dir.join("speciation.csv"), &rows)?;
    report::write_constants_csv(&run_dir.join("constants.csv"), &config.constants)?;
    report::write_scan_csvs(&run_dir, "brc", &output.brc_scans)?;
    report::write_scan_csvs(&run_dir, "soc", &output.soc_scans)?;

    for source in Source::ALL {
        let gaps = gaps::gaps_in_range(
            &db,
            config.db.table(source),
            source.time_column(),
            start,
            end,
            range_gap_threshold(source),
        )?;
        report::write_gaps_csv(
            &run_dir.join(format!("{}_gaps.csv", source.key_prefix().to_lowercase())),
            &gaps,
        )?;
    }

    println!(
        "{}",
        format_success(&format!(
            "Wrote {} records to {}",
            rows.len(),
            run_dir.display()
        ))
    );
    Ok(())
}

/// Overlap window of the two tables, as whole days.
fn overlap_window(
    stats: &[cass_core::TableStats],
) -> Result<(NaiveDate, NaiveDate), anyhow::Error> {
    let mut starts = Vec::new();
    let mut ends = Vec::new();
    for s in stats {
        match (s.min_timestamp, s.max_timestamp) {
            (Some(min), Some(max)) => {
                starts.push(min.date());
                ends.push(max.date());
            }
            _ => return Err(CassError::NoOverlap.into()),
        }
    }
    let overlap_start = starts.iter().max().copied().ok_or(CassError::NoOverlap)?;
    let overlap_end = ends.iter().min().copied().ok_or(CassError::NoOverlap)?;
    if overlap_end < overlap_start {
        return Err(CassError::NoOverlap.into());
    }
    Ok((overlap_start, overlap_end))
}

/// Handle config commands
pub fn handle_config(
    config: &AppConfig,
    command: ConfigCommands,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            for name in [DATA_CONF, DB_CONF, CONSTANTS_CONF] {
                let conf = ConfFile::load(config.conf_dir.join(name))?;
                let entries: Vec<(String, String)> = conf
                    .entries()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                println!(
                    "{}",
                    crate::format::format_config_entries(name, &entries, &format.into())?
                );
            }
        }
    }
    Ok(())
}

/// Generate shell completion script
pub fn generate_completion(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
