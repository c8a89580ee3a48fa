//! Results sources.
//!
//! Defines the `ResultsSource` trait, which supplies the fixtures of a
//! round and their published outcomes, and the AS results page scraper.

pub mod http;

use async_trait::async_trait;

use crate::types::{Fixture, Result};

/// Abstraction over the provider of fixtures and results.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultsSource: Send + Sync {
    /// The 15 fixtures of round `id` in betting order, with whatever
    /// results are published so far. `NotAvailable` if the round does not
    /// exist upstream.
    async fn fetch_round(&self, id: u32) -> Result<Vec<Fixture>>;
}
