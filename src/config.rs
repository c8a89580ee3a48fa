//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the Sheets access token) are referenced by env-var name in
//! the config and resolved at runtime via `std::env::var`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::types::{Phase, REGULAR_FIXTURES};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub daemon: DaemonConfig,
    pub board: BoardConfig,
    pub results: ResultsConfig,
    pub participants: ParticipantsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DaemonConfig {
    pub name: String,
    /// Doubles bet per round (at most 14).
    pub num_doubles: usize,
    pub period_new_secs: u64,
    pub period_completed_secs: u64,
    pub period_finished_secs: u64,
    /// Level for the crate's own logs unless `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoardBackend {
    #[default]
    Sheets,
    /// In-memory board for offline dry runs.
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BoardConfig {
    #[serde(default)]
    pub backend: BoardBackend,
    pub spreadsheet_id: String,
    /// Sheet copied for every new round.
    pub template_sheet_id: i64,
    /// Env var holding the OAuth access token.
    pub access_token_env: String,
    #[serde(default = "default_title_prefix")]
    pub title_prefix: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_title_prefix() -> String {
    "Jornada".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResultsConfig {
    #[serde(default = "default_results_url")]
    pub base_url: String,
    /// Upstream season key, e.g. `2016_2017`.
    pub season: String,
}

fn default_results_url() -> String {
    crate::results::http::DEFAULT_BASE_URL.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ParticipantsConfig {
    #[serde(default)]
    pub people: Vec<String>,
    /// When set, the roster is re-read from this TOML file instead.
    #[serde(default)]
    pub roster_file: Option<String>,
}

/// Wait between polls for each phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseIntervals {
    pub new: Duration,
    pub completed: Duration,
    pub finished: Duration,
}

impl PhaseIntervals {
    pub fn for_phase(&self, phase: Phase) -> Duration {
        match phase {
            Phase::New { .. } => self.new,
            Phase::Completed { .. } => self.completed,
            Phase::Finished { .. } => self.finished,
        }
    }
}

impl DaemonConfig {
    pub fn intervals(&self) -> PhaseIntervals {
        PhaseIntervals {
            new: Duration::from_secs(self.period_new_secs),
            completed: Duration::from_secs(self.period_completed_secs),
            finished: Duration::from_secs(self.period_finished_secs),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.daemon;
        if d.num_doubles > REGULAR_FIXTURES {
            bail!(
                "num_doubles is {}, at most {REGULAR_FIXTURES} fixtures can be doubled",
                d.num_doubles
            );
        }
        if d.period_new_secs == 0 || d.period_completed_secs == 0 || d.period_finished_secs == 0 {
            bail!("poll periods must be positive");
        }
        let p = &self.participants;
        if p.people.is_empty() && p.roster_file.is_none() {
            bail!("participants: set either `people` or `roster_file`");
        }
        Ok(())
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
