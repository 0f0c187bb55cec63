//! SQLite storage layer for the CASS station database
//!
//! Everything that touches the database lives here: installation and health
//! checks, the AE33 and TCA ingest pipelines, gap audits, and the bucketed
//! fetch that feeds speciation analysis.

pub mod ae33;
pub mod database;
pub mod gaps;
pub mod hourly;
pub mod ingest;
pub mod tca;

pub use database::{Database, TIMESTAMP_FORMAT};
pub use gaps::AuditResult;
pub use ingest::{FileResult, IngestReport};
