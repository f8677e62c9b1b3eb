//! Encounter Generator - client core
//!
//! Loads environments, campaigns and sessions from the Notion-backed edge
//! functions, generates encounters and keeps the open results in a tab
//! workspace.

pub mod config;
pub mod core;

#[cfg(test)]
mod tests;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
