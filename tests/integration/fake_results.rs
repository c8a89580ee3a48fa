//! Fake results source for integration testing.
//!
//! Holds the fixtures of every known round in memory. Results are
//! published from test code; unknown rounds answer `NotAvailable`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use quiniela::results::ResultsSource;
use quiniela::types::*;

pub struct FakeResults {
    rounds: Mutex<HashMap<u32, Vec<Fixture>>>,
    calls: Mutex<usize>,
    /// If set, every fetch returns this as a transient error.
    force_error: Mutex<Option<String>>,
}

impl FakeResults {
    pub fn new() -> Self {
        Self {
            rounds: Mutex::new(HashMap::new()),
            calls: Mutex::new(0),
            force_error: Mutex::new(None),
        }
    }

    /// Register round `id` with 15 pending fixtures.
    pub fn add_round(&self, id: u32) {
        let fixtures = (0..TOTAL_FIXTURES)
            .map(|i| Fixture::new(format!("Local {id}-{i}"), format!("Visitante {id}-{i}")))
            .collect();
        self.rounds.lock().unwrap().insert(id, fixtures);
    }

    /// Publish the first `count` results of round `id`.
    pub fn publish(&self, id: u32, count: usize) {
        let mut rounds = self.rounds.lock().unwrap();
        let fixtures = rounds.get_mut(&id).expect("round registered");
        for (i, f) in fixtures.iter_mut().enumerate().take(count) {
            f.result = if i < REGULAR_FIXTURES {
                MatchResult::Sign(Outcome::from_index(i % 3).unwrap())
            } else {
                MatchResult::Score("2-M".parse().unwrap())
            };
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }
}

#[async_trait]
impl ResultsSource for FakeResults {
    async fn fetch_round(&self, id: u32) -> Result<Vec<Fixture>> {
        *self.calls.lock().unwrap() += 1;
        if let Some(msg) = self.force_error.lock().unwrap().as_ref() {
            return Err(QuinielaError::transient("fake", msg));
        }
        self.rounds
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(QuinielaError::NotAvailable(id))
    }
}
