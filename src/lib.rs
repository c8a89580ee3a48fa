//! QUINIELA: shared-board pool daemon
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod board;
pub mod config;
pub mod engine;
pub mod results;
pub mod roster;
pub mod strategy;
pub mod types;
