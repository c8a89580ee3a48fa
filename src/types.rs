//! Shared types for the quiniela daemon.
//!
//! These types form the data model used across all modules: outcomes
//! and fixtures, the round context threaded through the polling loop,
//! and the domain error taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Regular fixtures per round (the ones bet with 1/X/2).
pub const REGULAR_FIXTURES: usize = 14;

/// Regular fixtures plus the extra "pleno al 15" fixture.
pub const TOTAL_FIXTURES: usize = REGULAR_FIXTURES + 1;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result sign of a regular fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    /// Outcomes in frequency-vector order.
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

    /// Position of this outcome in a frequency vector.
    pub fn index(self) -> usize {
        match self {
            Outcome::Home => 0,
            Outcome::Draw => 1,
            Outcome::Away => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Board symbol: "1", "X" or "2".
    pub fn symbol(self) -> &'static str {
        match self {
            Outcome::Home => "1",
            Outcome::Draw => "X",
            Outcome::Away => "2",
        }
    }

    /// Swaps HOME and AWAY; DRAW maps to itself.
    pub fn toggled(self) -> Self {
        match self {
            Outcome::Home => Outcome::Away,
            Outcome::Draw => Outcome::Draw,
            Outcome::Away => Outcome::Home,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Outcome {
    type Err = QuinielaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "1" => Ok(Outcome::Home),
            "X" => Ok(Outcome::Draw),
            "2" => Ok(Outcome::Away),
            other => Err(QuinielaError::DataShape(format!(
                "not a result sign: {other:?}"
            ))),
        }
    }
}

/// Goal count bucket used by the extra fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalBand {
    Zero,
    One,
    Two,
    /// Three or more.
    More,
}

impl GoalBand {
    pub fn symbol(self) -> &'static str {
        match self {
            GoalBand::Zero => "0",
            GoalBand::One => "1",
            GoalBand::Two => "2",
            GoalBand::More => "M",
        }
    }
}

impl FromStr for GoalBand {
    type Err = QuinielaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "0" => Ok(GoalBand::Zero),
            "1" => Ok(GoalBand::One),
            "2" => Ok(GoalBand::Two),
            "M" => Ok(GoalBand::More),
            other => Err(QuinielaError::DataShape(format!(
                "not a goal band: {other:?}"
            ))),
        }
    }
}

/// Score pair of the extra fixture, e.g. `1-M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraScore {
    pub home: GoalBand,
    pub away: GoalBand,
}

impl fmt::Display for ExtraScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.home.symbol(), self.away.symbol())
    }
}

/// Accepts both `h-a` and the upstream `h--a` spelling.
impl FromStr for ExtraScore {
    type Err = QuinielaError;

    fn from_str(s: &str) -> Result<Self> {
        let (home, away) = s
            .split_once("--")
            .or_else(|| s.split_once('-'))
            .ok_or_else(|| QuinielaError::DataShape(format!("not a score pair: {s:?}")))?;
        Ok(ExtraScore {
            home: home.parse()?,
            away: away.parse()?,
        })
    }
}

/// Published state of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchResult {
    #[default]
    Pending,
    Sign(Outcome),
    Score(ExtraScore),
}

impl MatchResult {
    pub fn is_pending(&self) -> bool {
        matches!(self, MatchResult::Pending)
    }

    /// Cell text written to the results column (blank while pending).
    pub fn symbol(&self) -> String {
        match self {
            MatchResult::Pending => String::new(),
            MatchResult::Sign(o) => o.symbol().to_string(),
            MatchResult::Score(s) => s.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// One match within a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub home: String,
    pub away: String,
    pub result: MatchResult,
}

impl Fixture {
    pub fn new(home: impl Into<String>, away: impl Into<String>) -> Self {
        Self {
            home: home.into(),
            away: away.into(),
            result: MatchResult::Pending,
        }
    }
}

impl fmt::Display for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.home, self.away)?;
        if !self.result.is_pending() {
            write!(f, " [{}]", self.result.symbol())?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Round lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle phase of the current round.
///
/// `just_entered` is true until the phase's entry action has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    New { just_entered: bool },
    Completed { just_entered: bool },
    Finished { just_entered: bool },
}

impl Phase {
    pub fn just_entered(&self) -> bool {
        match *self {
            Phase::New { just_entered }
            | Phase::Completed { just_entered }
            | Phase::Finished { just_entered } => just_entered,
        }
    }

    /// Same phase with its entry action marked as done.
    pub fn settled(self) -> Self {
        match self {
            Phase::New { .. } => Phase::New { just_entered: false },
            Phase::Completed { .. } => Phase::Completed { just_entered: false },
            Phase::Finished { .. } => Phase::Finished { just_entered: false },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::New { .. } => "NEW",
            Phase::Completed { .. } => "COMPLETED",
            Phase::Finished { .. } => "FINISHED",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.just_entered() {
            write!(f, "{} (entry)", self.name())
        } else {
            f.write_str(self.name())
        }
    }
}

/// The round being worked on, threaded through every poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundContext {
    pub id: u32,
    pub title: String,
    pub phase: Phase,
    /// Bare-number sheet that announced this round, until deleted.
    pub placeholder: Option<i64>,
    pub phase_since: DateTime<Utc>,
}

impl RoundContext {
    pub fn new(id: u32, title: String, phase: Phase) -> Self {
        Self {
            id,
            title,
            phase,
            placeholder: None,
            phase_since: Utc::now(),
        }
    }

    /// Move to `phase`, resetting the phase timestamp.
    pub fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.phase_since = Utc::now();
    }
}

/// Title of a round sheet, e.g. `Jornada 12`.
pub fn round_title(prefix: &str, id: u32) -> String {
    format!("{prefix} {id}")
}

/// Round number of a `"<prefix> N"` title.
pub fn parse_round_title(prefix: &str, title: &str) -> Option<u32> {
    let rest = title.trim().strip_prefix(prefix)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    parse_bare_round(rest)
}

/// Round number of a sheet titled only by a positive number.
pub fn parse_bare_round(title: &str) -> Option<u32> {
    let t = title.trim();
    if t.is_empty() || !t.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    t.parse().ok().filter(|id| *id > 0)
}

/// A sheet of the shared board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetInfo {
    pub sheet_id: i64,
    pub title: String,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain error taxonomy. The polling loop decides retry vs. halt from
/// the variant.
#[derive(Debug, thiserror::Error)]
pub enum QuinielaError {
    #[error("Transient I/O failure ({source_name}): {message}")]
    TransientIo { source_name: String, message: String },

    #[error("Board data error: {0}")]
    DataShape(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Round {0} not available upstream")]
    NotAvailable(u32),

    #[error("Empty input")]
    EmptyInput,
}

impl QuinielaError {
    pub fn transient(source_name: &str, message: impl fmt::Display) -> Self {
        QuinielaError::TransientIo {
            source_name: source_name.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether the next scheduled poll may succeed without operator action.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            QuinielaError::TransientIo { .. } | QuinielaError::NotAvailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, QuinielaError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
