//! Full round lifecycle over the in-memory board: placeholder detection,
//! round setup, pick collection, doubles, results and the next round.

use std::sync::Arc;

use quiniela::board::memory::MemoryBoard;
use quiniela::board::{column, layout, CellRange, RoundBoard};
use quiniela::engine::{PollOutcome, RoundState};
use quiniela::roster::StaticRoster;
use quiniela::types::{Phase, QuinielaError, RoundContext, TOTAL_FIXTURES};

use crate::fake_results::FakeResults;

const PEOPLE: [&str; 2] = ["Ana", "Luis"];

struct Harness {
    board: Arc<MemoryBoard>,
    results: Arc<FakeResults>,
    state: RoundState,
}

impl Harness {
    fn new(num_doubles: usize) -> Self {
        let board = Arc::new(MemoryBoard::new());
        let template = board.add_sheet("Plantilla");
        let results = Arc::new(FakeResults::new());
        let roster = StaticRoster::new(PEOPLE.iter().map(|p| p.to_string()).collect());
        let state = RoundState::new(
            RoundBoard::new(board.clone(), template, "Jornada"),
            results.clone(),
            Arc::new(roster),
            num_doubles,
        );
        Self {
            board,
            results,
            state,
        }
    }

    /// Poll until the machine asks to wait.
    async fn settle(&self, ctx: &mut RoundContext) {
        for _ in 0..10 {
            if self.state.poll(ctx).await.unwrap() == PollOutcome::Wait {
                return;
            }
        }
        panic!("machine never settled in {}", ctx.phase);
    }

    /// Fill one pick column with all 15 picks and the owner's name.
    fn fill_column(&self, title: &str, col: char, person: &str) {
        let mut values = vec![vec!["1"]; TOTAL_FIXTURES];
        values.push(vec![person]);
        let range = CellRange::new(column(col), 1, column(col), 16);
        self.board.set_cells(title, range, &values);
    }

    /// Vote counts and modes as the sheet's formulas would show them.
    fn fill_aggregates(&self, title: &str) {
        let mut freqs = vec![vec!["2", "0", "0"]; 14];
        freqs[0] = vec!["0", "1", "1"];
        freqs[1] = vec!["1", "1", "0"];
        let mut modes = vec![vec!["1"]; 14];
        modes[0] = vec!["X"];
        self.board.set_cells(title, layout::FREQUENCIES, &freqs);
        self.board.set_cells(title, layout::MODES, &modes);
    }
}

fn doubles_column(board: &MemoryBoard, title: &str) -> Vec<String> {
    board
        .cells(title, layout::DOUBLES)
        .into_iter()
        .map(|mut row| row.remove(0))
        .collect()
}

#[tokio::test]
async fn test_full_round_then_next() {
    let h = Harness::new(2);
    h.results.add_round(3);
    h.results.add_round(4);
    h.board.add_sheet("3");

    // Placeholder announces round 3.
    let mut ctx = h.state.bootstrap().await.unwrap();
    assert_eq!(ctx.id, 3);
    assert_eq!(ctx.phase, Phase::New { just_entered: true });

    h.settle(&mut ctx).await;
    assert_eq!(ctx.phase, Phase::New { just_entered: false });
    assert_eq!(h.board.titles(), vec!["Plantilla", "Jornada 3"]);
    assert_eq!(
        h.board.cells("Jornada 3", layout::MATCHES)[14],
        vec!["Local 3-14", "Visitante 3-14"]
    );

    // One participant is not enough.
    h.fill_column("Jornada 3", 'F', "Ana");
    h.settle(&mut ctx).await;
    assert_eq!(ctx.phase, Phase::New { just_entered: false });

    h.fill_aggregates("Jornada 3");
    h.fill_column("Jornada 3", 'G', "Luis");
    h.settle(&mut ctx).await;
    assert_eq!(ctx.phase, Phase::Completed { just_entered: false });

    let doubles = doubles_column(&h.board, "Jornada 3");
    assert_eq!(doubles[0], "2");
    assert_eq!(doubles[1], "1");
    assert!(doubles[2..].iter().all(String::is_empty));

    // Partial results are copied over, the round stays open.
    h.results.publish(3, 9);
    h.settle(&mut ctx).await;
    assert_eq!(ctx.phase, Phase::Completed { just_entered: false });
    let results = h.board.cells("Jornada 3", layout::RESULTS);
    assert_eq!(results[0], vec!["1"]);
    assert_eq!(results[1], vec!["X"]);
    assert_eq!(results[9], vec![""]);

    h.results.publish(3, TOTAL_FIXTURES);
    h.settle(&mut ctx).await;
    assert_eq!(h.board.cells("Jornada 3", layout::RESULTS)[14], vec!["2-M"]);
    h.settle(&mut ctx).await;
    assert_eq!(ctx.phase, Phase::Finished { just_entered: false });

    // Nothing happens until the next placeholder shows up.
    h.settle(&mut ctx).await;
    assert_eq!(ctx.id, 3);

    h.board.add_sheet("4");
    h.settle(&mut ctx).await;
    assert_eq!(ctx.id, 4);
    assert_eq!(ctx.title, "Jornada 4");
    assert_eq!(ctx.phase, Phase::New { just_entered: false });
    assert_eq!(
        h.board.titles(),
        vec!["Plantilla", "Jornada 3", "Jornada 4"]
    );
}

#[tokio::test]
async fn test_resume_after_restart() {
    let h = Harness::new(2);
    h.results.add_round(7);
    h.board.add_sheet("7");

    let mut ctx = h.state.bootstrap().await.unwrap();
    h.settle(&mut ctx).await;
    h.fill_aggregates("Jornada 7");
    h.fill_column("Jornada 7", 'F', "Ana");
    h.fill_column("Jornada 7", 'H', "Luis");

    // Restart with every pick in: doubles are still owed.
    let mut resumed = h.state.bootstrap().await.unwrap();
    assert_eq!(resumed.id, 7);
    assert_eq!(resumed.phase, Phase::Completed { just_entered: true });
    h.settle(&mut resumed).await;
    assert_eq!(
        doubles_column(&h.board, "Jornada 7")
            .iter()
            .filter(|d| !d.is_empty())
            .count(),
        2
    );

    // Restart again: doubles already written, nothing is rewritten.
    let writes = h.board.write_count();
    let again = h.state.bootstrap().await.unwrap();
    assert_eq!(again.phase, Phase::Completed { just_entered: false });
    assert_eq!(h.board.write_count(), writes);
}

#[tokio::test]
async fn test_results_outage_is_retried() {
    let h = Harness::new(1);
    h.results.add_round(5);
    h.board.add_sheet("5");

    let mut ctx = h.state.bootstrap().await.unwrap();
    h.results.set_error("upstream down");
    let err = h.state.poll(&mut ctx).await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(ctx.phase, Phase::New { just_entered: true });

    h.results.clear_error();
    h.settle(&mut ctx).await;
    assert_eq!(ctx.phase, Phase::New { just_entered: false });
    assert_eq!(h.board.titles(), vec!["Plantilla", "Jornada 5"]);
    assert!(h.results.calls() >= 2);
}

#[tokio::test]
async fn test_unknown_round_upstream() {
    let h = Harness::new(1);
    h.board.add_sheet("12");

    let mut ctx = h.state.bootstrap().await.unwrap();
    let err = h.state.poll(&mut ctx).await.unwrap_err();
    assert!(matches!(err, QuinielaError::NotAvailable(12)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_empty_board_cannot_start() {
    let h = Harness::new(1);
    let err = h.state.bootstrap().await.unwrap_err();
    assert!(matches!(err, QuinielaError::NotFound(_)));
}
