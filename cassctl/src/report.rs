//! CSV report writers
//!
//! Gap audits and speciation runs are exported as CSV so they open directly
//! in spreadsheet tools. A speciation run gets its own timestamped directory
//! containing the derived columns, the constants used, the per-chunk R²
//! scans, and gap reports for the analyzed window.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use cass_core::speciation::{RSquaredScan, SpeciationRow};
use cass_core::{Gap, SpeciationConstants};

/// Column order of `speciation.csv`.
const SPECIATION_HEADER: [&str; 31] = [
    "DateTime", "B_abs1", "B_abs2", "B_abs3", "B_abs4", "B_abs5", "B_abs6", "B_abs7", "TCconc",
    "CO2", "EC", "OC", "AE33_BC6", "B_abs6_val", "B_abs_ff", "B_abs_bb", "BC_ff", "BC_bb",
    "B_abs_BC", "B_abs_BrC", "BrC", "BrC_abs_sec", "SOC", "POC", "BrC_abs_prim", "POA", "SOA",
    "POA_BrC", "SOA_BrC", "POA_WTC", "SOA_WTC",
];

/// NaN marks a column no qualifying chunk could compute; exported as NA so
/// spreadsheet tools treat it as missing rather than text.
fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        "NA".to_string()
    } else {
        v.to_string()
    }
}

/// Create a fresh timestamped run directory under `base`.
pub fn create_run_dir(base: &Path) -> Result<PathBuf> {
    let dir = base.join(format!("run_{}", Local::now().format("%Y%m%d_%H%M%S")));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create run directory {}", dir.display()))?;
    Ok(dir)
}

/// Write detected gaps to a CSV file.
pub fn write_gaps_csv(path: &Path, gaps: &[Gap]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("cannot write {}", path.display()))?;
    writer.write_record(["Gap_Start", "Gap_End", "Gap_Minutes"])?;
    for gap in gaps {
        writer.write_record([
            gap.gap_start.to_string(),
            gap.gap_end.to_string(),
            format!("{:.2}", gap.gap_minutes),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the derived speciation columns.
pub fn write_speciation_csv(path: &Path, rows: &[SpeciationRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("cannot write {}", path.display()))?;
    writer.write_record(SPECIATION_HEADER)?;
    for row in rows {
        let mut record = Vec::with_capacity(SPECIATION_HEADER.len());
        record.push(row.timestamp.to_string());
        for b in row.b_abs {
            record.push(fmt_value(b));
        }
        for v in [
            row.tc_conc,
            row.co2,
            row.ec,
            row.oc,
            row.ae33_bc6,
            row.b_abs6_val,
            row.b_abs_ff,
            row.b_abs_bb,
            row.bc_ff,
            row.bc_bb,
            row.b_abs_bc,
            row.b_abs_brc,
            row.brc,
            row.brc_abs_sec,
            row.soc,
            row.poc,
            row.brc_abs_prim,
            row.poa,
            row.soa,
            row.poa_brc,
            row.soa_brc,
            row.poa_wtc,
            row.soa_wtc,
        ] {
            record.push(fmt_value(v));
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the constants the run was computed with, in their configured form.
pub fn write_constants_csv(path: &Path, constants: &SpeciationConstants) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("cannot write {}", path.display()))?;
    writer.write_record(["Constant", "Value"])?;
    for (key, value) in constants.report_entries() {
        writer.write_record([key, value.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write one CSV per chunk scan plus a minima summary, under
/// `dir/rsquared/`. `prefix` distinguishes the BrC and SOC scans.
pub fn write_scan_csvs(dir: &Path, prefix: &str, scans: &[RSquaredScan]) -> Result<()> {
    if scans.is_empty() {
        return Ok(());
    }
    let scan_dir = dir.join("rsquared");
    std::fs::create_dir_all(&scan_dir)
        .with_context(|| format!("cannot create {}", scan_dir.display()))?;

    for scan in scans {
        let name = format!(
            "{prefix}_{}_{}.csv",
            scan.chunk_start.format("%Y%m%d"),
            scan.chunk_end.format("%Y%m%d")
        );
        let path = scan_dir.join(name);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("cannot write {}", path.display()))?;
        writer.write_record(["Step", "R_squared"])?;
        for point in &scan.points {
            writer.write_record([point.step.to_string(), point.r_squared.to_string()])?;
        }
        writer.flush()?;
    }

    let summary = scan_dir.join(format!("{prefix}_minima.csv"));
    let mut writer = csv::Writer::from_path(&summary)
        .with_context(|| format!("cannot write {}", summary.display()))?;
    writer.write_record(["Chunk_Start", "Chunk_End", "Min_Step", "Min_R_squared"])?;
    for scan in scans {
        writer.write_record([
            scan.chunk_start.to_string(),
            scan.chunk_end.to_string(),
            scan.min_step.to_string(),
            scan.min_r_squared.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
