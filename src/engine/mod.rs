//! Round engine: the lifecycle state machine and the loop that polls it.

pub mod daemon;
pub mod state;

pub use daemon::PollingLoop;
pub use state::{PollOutcome, RoundState};
