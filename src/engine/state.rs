//! Round lifecycle state machine.
//!
//! A round moves NEW -> COMPLETED -> FINISHED and the next round starts
//! over at NEW. Each phase has an entry action, run once when the phase
//! is entered, and a steady check run on every later poll until its exit
//! condition holds. The phase only advances after the action or check
//! succeeded, so a failed poll is simply retried.

use std::sync::Arc;
use tracing::{debug, info};

use crate::board::rounds::BornRound;
use crate::board::RoundBoard;
use crate::results::ResultsSource;
use crate::roster::RosterSource;
use crate::strategy::DoubleSelector;
use crate::types::{Phase, QuinielaError, Result, RoundContext};

/// What the polling loop should do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The phase changed or an entry action ran; poll again right away.
    Continue,
    /// Nothing to do until the board or the results change.
    Wait,
}

/// Guards and actions of the round lifecycle.
pub struct RoundState {
    rounds: RoundBoard,
    results: Arc<dyn ResultsSource>,
    roster: Arc<dyn RosterSource>,
    num_doubles: usize,
}

impl RoundState {
    pub fn new(
        rounds: RoundBoard,
        results: Arc<dyn ResultsSource>,
        roster: Arc<dyn RosterSource>,
        num_doubles: usize,
    ) -> Self {
        Self {
            rounds,
            results,
            roster,
            num_doubles,
        }
    }

    /// Work out where the board currently stands.
    pub async fn bootstrap(&self) -> Result<RoundContext> {
        if let Some(born) = self.rounds.check_born_round().await? {
            info!(round = born.id, placeholder = %born.placeholder.title, "New round announced");
            return Ok(self.born_context(born));
        }

        let (id, sheet) = self
            .rounds
            .last_round()
            .await?
            .ok_or_else(|| QuinielaError::NotFound("no round sheet on the board".into()))?;
        let title = sheet.title;

        let phase = if !self.cols_filled(&title).await? {
            Phase::New { just_entered: false }
        } else if !self.rounds.round_finished(&title).await? {
            let doubles_done = self.rounds.doubles_filled(&title, self.num_doubles).await?;
            Phase::Completed {
                just_entered: !doubles_done,
            }
        } else {
            Phase::Finished { just_entered: false }
        };

        info!(round = id, title = %title, phase = %phase, "Resuming round");
        Ok(RoundContext::new(id, title, phase))
    }

    /// Run one step for the current phase.
    pub async fn poll(&self, ctx: &mut RoundContext) -> Result<PollOutcome> {
        debug!(round = ctx.id, title = %ctx.title, phase = %ctx.phase, "Poll");
        match ctx.phase {
            Phase::New { just_entered: true } => {
                self.enter_new(ctx).await?;
                ctx.phase = ctx.phase.settled();
                Ok(PollOutcome::Continue)
            }
            Phase::New { just_entered: false } => {
                if self.cols_filled(&ctx.title).await? {
                    self.transition(ctx, Phase::Completed { just_entered: true });
                    Ok(PollOutcome::Continue)
                } else {
                    Ok(PollOutcome::Wait)
                }
            }
            Phase::Completed { just_entered: true } => {
                self.enter_completed(ctx).await?;
                ctx.phase = ctx.phase.settled();
                Ok(PollOutcome::Continue)
            }
            Phase::Completed { just_entered: false } => {
                if self.rounds.round_finished(&ctx.title).await? {
                    self.transition(ctx, Phase::Finished { just_entered: true });
                    return Ok(PollOutcome::Continue);
                }
                let fixtures = self.results.fetch_round(ctx.id).await?;
                self.rounds.fill_results(&ctx.title, &fixtures).await?;
                debug!(
                    round = ctx.id,
                    published = fixtures.iter().filter(|f| !f.result.is_pending()).count(),
                    "Results updated"
                );
                Ok(PollOutcome::Wait)
            }
            Phase::Finished { just_entered: true } => {
                info!(round = ctx.id, title = %ctx.title, "Round finished");
                ctx.phase = ctx.phase.settled();
                Ok(PollOutcome::Continue)
            }
            Phase::Finished { just_entered: false } => {
                match self.rounds.check_born_round().await? {
                    Some(born) if born.id > ctx.id => {
                        info!(round = born.id, previous = ctx.id, "New round detected");
                        *ctx = self.born_context(born);
                        Ok(PollOutcome::Continue)
                    }
                    Some(born) => Err(QuinielaError::DataShape(format!(
                        "sheet {:?} announces round {}, current round is {}",
                        born.placeholder.title, born.id, ctx.id
                    ))),
                    None => Ok(PollOutcome::Wait),
                }
            }
        }
    }

    // -- Entry actions ---------------------------------------------------

    /// Replace the placeholder with a round sheet holding the fixtures.
    async fn enter_new(&self, ctx: &mut RoundContext) -> Result<()> {
        if let Some(placeholder) = ctx.placeholder {
            self.rounds.delete_sheet(placeholder).await?;
            ctx.placeholder = None;
        }

        let sheet_id = self.rounds.open_round_sheet(ctx.id).await?;
        let fixtures = self.results.fetch_round(ctx.id).await?;
        self.rounds.fill_matches(&ctx.title, &fixtures).await?;

        info!(round = ctx.id, title = %ctx.title, sheet_id, "Round set up");
        Ok(())
    }

    /// Choose the doubles and write them in a single board write.
    async fn enter_completed(&self, ctx: &RoundContext) -> Result<()> {
        let participants = self.roster.participants().await?;
        let freqs = self.rounds.read_frequencies(&ctx.title).await?;
        let modes = self.rounds.read_modes(&ctx.title).await?;

        let selection =
            DoubleSelector::new(self.num_doubles, participants.len()).select(&freqs, &modes)?;
        self.rounds.fill_doubles(&ctx.title, &selection).await?;

        let chosen: Vec<String> = selection
            .chosen()
            .map(|(i, o)| format!("{}:{o}", i + 1))
            .collect();
        info!(round = ctx.id, doubles = %chosen.join(" "), "Doubles written");
        Ok(())
    }

    // -- Helpers ---------------------------------------------------------

    async fn cols_filled(&self, title: &str) -> Result<bool> {
        let roster = self.roster.participants().await?;
        self.rounds.cols_filled(title, &roster).await
    }

    fn born_context(&self, born: BornRound) -> RoundContext {
        let mut ctx = RoundContext::new(
            born.id,
            self.rounds.title_for(born.id),
            Phase::New { just_entered: true },
        );
        ctx.placeholder = Some(born.placeholder.sheet_id);
        ctx
    }

    fn transition(&self, ctx: &mut RoundContext, next: Phase) {
        let waited = chrono::Utc::now() - ctx.phase_since;
        info!(
            round = ctx.id,
            from = ctx.phase.name(),
            to = next.name(),
            minutes_in_phase = waited.num_minutes(),
            "Phase transition"
        );
        ctx.enter(next);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
