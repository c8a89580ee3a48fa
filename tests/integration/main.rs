//! Integration tests: a round driven end to end over the in-memory board.

mod fake_results;
mod lifecycle;
