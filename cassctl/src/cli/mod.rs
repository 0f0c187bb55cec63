//! CLI command definitions and handlers
//!
//! - [`commands`] - the clap command tree: `install`, `check`, `push`,
//!   `audit`, `speciate`, `config`, `completion`
//! - [`handlers`] - execution of each command against the store

mod commands;
mod handlers;

pub use commands::*;
pub use handlers::*;
