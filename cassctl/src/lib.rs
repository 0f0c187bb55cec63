//! CASS Database Manager CLI Library
//!
//! Command definitions, handlers, and report writers for `cassctl`, the
//! command-line front end to the CASS station database. The reusable pieces
//! live in `cass-core` (configuration, analysis maths) and `cass-store`
//! (SQLite access); this crate wires them to a clap interface.

// Internal CLI implementation - not part of public API
#[doc(hidden)]
pub mod cli;

/// Resolved configuration for one invocation.
pub mod config;

// Internal formatting functions - not part of public API
#[doc(hidden)]
pub mod format;

/// CSV report writers for audits and analysis runs.
pub mod report;
