//! Polling loop.
//!
//! Drives the round state machine forever: one step at a time, an
//! immediate re-poll after a step that moved the phase, and a sleep of the
//! phase's interval otherwise. Failed steps are logged and retried after
//! the same interval. Steps always run to completion; the shutdown token
//! is checked between steps and interrupts sleeps.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::state::{PollOutcome, RoundState};
use crate::config::PhaseIntervals;
use crate::types::{QuinielaError, Result, RoundContext};

pub struct PollingLoop {
    state: RoundState,
    intervals: PhaseIntervals,
    shutdown: CancellationToken,
}

impl PollingLoop {
    pub fn new(state: RoundState, intervals: PhaseIntervals, shutdown: CancellationToken) -> Self {
        Self {
            state,
            intervals,
            shutdown,
        }
    }

    /// Run until the shutdown token is cancelled. Only startup errors
    /// other than transient I/O are returned.
    pub async fn run(self) -> Result<()> {
        let Some(mut ctx) = self.bootstrap().await? else {
            info!("Shutdown before the first round was resolved");
            return Ok(());
        };

        let mut polls: u64 = 0;
        while !self.shutdown.is_cancelled() {
            polls += 1;
            let wait = match self.state.poll(&mut ctx).await {
                Ok(PollOutcome::Continue) => None,
                Ok(PollOutcome::Wait) => Some(self.intervals.for_phase(ctx.phase)),
                Err(e) => {
                    log_step_error(&ctx, &e);
                    Some(self.intervals.for_phase(ctx.phase))
                }
            };

            if let Some(wait) = wait {
                debug!(
                    poll = polls,
                    round = ctx.id,
                    phase = %ctx.phase,
                    wait_secs = wait.as_secs(),
                    "Waiting"
                );
                if !self.sleep(wait).await {
                    break;
                }
            }
        }

        info!(polls, round = ctx.id, phase = %ctx.phase, "Polling loop stopped");
        Ok(())
    }

    /// Resolve the starting round, retrying transient failures.
    async fn bootstrap(&self) -> Result<Option<RoundContext>> {
        loop {
            match self.state.bootstrap().await {
                Ok(ctx) => {
                    info!(round = ctx.id, title = %ctx.title, phase = %ctx.phase, "Bootstrapped");
                    return Ok(Some(ctx));
                }
                Err(e) if e.is_transient() => {
                    warn!(error = %e, "Bootstrap failed, retrying");
                    if !self.sleep(self.intervals.new).await {
                        return Ok(None);
                    }
                }
                Err(e) => {
                    error!(error = %e, "Bootstrap failed");
                    return Err(e);
                }
            }
        }
    }

    /// Sleep for `wait`; false if shutdown was requested meanwhile.
    async fn sleep(&self, wait: Duration) -> bool {
        tokio::select! {
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(wait) => true,
        }
    }
}

fn log_step_error(ctx: &RoundContext, e: &QuinielaError) {
    if e.is_transient() {
        warn!(round = ctx.id, phase = %ctx.phase, error = %e, "Poll failed, retrying next interval");
    } else {
        error!(
            round = ctx.id,
            phase = %ctx.phase,
            error = %e,
            "Poll failed, board needs attention"
        );
    }
}
