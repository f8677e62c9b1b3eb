//! Shared test support
//!
//! - `mocks`: scripted and mockall gateways
//! - `property`: proptest invariants

pub mod mocks;
mod property;
