//! Participant roster.
//!
//! The roster is owned outside the daemon and may change between rounds,
//! so it is fetched again for every completeness check.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

use crate::types::{QuinielaError, Result};

/// Provider of the identifiers expected to fill a pick column.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RosterSource: Send + Sync {
    async fn participants(&self) -> Result<Vec<String>>;
}

/// Fixed roster taken from the configuration file.
pub struct StaticRoster {
    people: Vec<String>,
}

impl StaticRoster {
    pub fn new(people: Vec<String>) -> Self {
        Self { people }
    }
}

#[async_trait]
impl RosterSource for StaticRoster {
    async fn participants(&self) -> Result<Vec<String>> {
        Ok(self.people.clone())
    }
}

#[derive(Debug, Deserialize)]
struct RosterFile {
    people: Vec<String>,
}

/// Roster kept in a TOML file (`people = ["Ana", "Luis"]`), re-read on
/// every call so edits apply without a restart.
pub struct FileRoster {
    path: PathBuf,
}

impl FileRoster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RosterSource for FileRoster {
    async fn participants(&self) -> Result<Vec<String>> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            QuinielaError::transient("roster", format!("{}: {e}", self.path.display()))
        })?;
        let file: RosterFile = toml::from_str(&contents).map_err(|e| {
            QuinielaError::DataShape(format!("roster {}: {e}", self.path.display()))
        })?;

        let people: Vec<String> = file
            .people
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        debug!(path = %self.path.display(), count = people.len(), "Roster loaded");
        Ok(people)
    }
}
