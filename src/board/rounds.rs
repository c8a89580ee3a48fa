//! Round-sheet operations on top of a `SharedBoard`.
//!
//! Knows the fixed layout of a round sheet (see `layout`) and turns raw
//! cell matrices into domain values. Every check re-reads the board;
//! nothing is cached between calls because participants edit the sheet
//! concurrently.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{layout, Orientation, SharedBoard};
use crate::strategy::DoubleSelection;
use crate::types::{
    parse_bare_round, parse_round_title, round_title, Fixture, Outcome, QuinielaError, Result,
    SheetInfo, REGULAR_FIXTURES, TOTAL_FIXTURES,
};

/// Cell `(i, j)` of a ragged matrix, blank when absent.
fn cell(matrix: &[Vec<String>], i: usize, j: usize) -> &str {
    matrix
        .get(i)
        .and_then(|line| line.get(j))
        .map(|s| s.trim())
        .unwrap_or("")
}

/// A round announced by a sheet titled with a bare number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BornRound {
    pub id: u32,
    pub placeholder: SheetInfo,
}

/// Layout-aware access to round sheets.
pub struct RoundBoard {
    board: Arc<dyn SharedBoard>,
    template_id: i64,
    title_prefix: String,
}

impl RoundBoard {
    pub fn new(board: Arc<dyn SharedBoard>, template_id: i64, title_prefix: &str) -> Self {
        Self {
            board,
            template_id,
            title_prefix: title_prefix.to_string(),
        }
    }

    pub fn title_for(&self, id: u32) -> String {
        round_title(&self.title_prefix, id)
    }

    // -- Sheet discovery -------------------------------------------------

    /// Highest-numbered sheet whose title is a bare round number.
    pub async fn check_born_round(&self) -> Result<Option<BornRound>> {
        let sheets = self.board.list_sheets().await?;
        Ok(sheets
            .into_iter()
            .filter_map(|s| parse_bare_round(&s.title).map(|id| BornRound { id, placeholder: s }))
            .max_by_key(|b| b.id))
    }

    /// Highest-numbered `"<prefix> N"` sheet.
    pub async fn last_round(&self) -> Result<Option<(u32, SheetInfo)>> {
        let sheets = self.board.list_sheets().await?;
        Ok(sheets
            .into_iter()
            .filter_map(|s| parse_round_title(&self.title_prefix, &s.title).map(|id| (id, s)))
            .max_by_key(|(id, _)| *id))
    }

    // -- Sheet lifecycle -------------------------------------------------

    /// Create the sheet for round `id` from the template. An existing sheet
    /// with the round's title is reused, so a retried entry action does not
    /// create duplicates.
    pub async fn open_round_sheet(&self, id: u32) -> Result<i64> {
        let title = self.title_for(id);
        let existing = self
            .board
            .list_sheets()
            .await?
            .into_iter()
            .find(|s| s.title == title);
        if let Some(sheet) = existing {
            info!(title = %title, sheet_id = sheet.sheet_id, "Reusing existing round sheet");
            return Ok(sheet.sheet_id);
        }

        let sheet_id = self.board.create_sheet(self.template_id).await?;
        if let Err(e) = self.board.rename_sheet(sheet_id, &title).await {
            // An unnamed copy would never be found again on retry.
            if let Err(cleanup) = self.board.delete_sheet(sheet_id).await {
                warn!(sheet_id, error = %cleanup, "Could not remove unnamed template copy");
            }
            return Err(e);
        }
        info!(title = %title, sheet_id, board = self.board.name(), "Round sheet created");
        Ok(sheet_id)
    }

    pub async fn delete_sheet(&self, sheet_id: i64) -> Result<()> {
        self.board.delete_sheet(sheet_id).await?;
        debug!(sheet_id, "Sheet deleted");
        Ok(())
    }

    // -- Fixtures and results --------------------------------------------

    /// Write home/away names of all 15 fixtures.
    pub async fn fill_matches(&self, title: &str, fixtures: &[Fixture]) -> Result<()> {
        expect_full_round(fixtures)?;
        let rows = fixtures
            .iter()
            .map(|f| vec![f.home.clone(), f.away.clone()])
            .collect();
        self.board.write_range(title, layout::MATCHES, rows).await
    }

    /// Home/away names as written on the board.
    pub async fn read_matches(&self, title: &str) -> Result<Vec<(String, String)>> {
        let rows = self
            .board
            .read_range(title, layout::MATCHES, Orientation::Rows)
            .await?;
        Ok((0..TOTAL_FIXTURES)
            .map(|i| (cell(&rows, i, 0).to_string(), cell(&rows, i, 1).to_string()))
            .collect())
    }

    /// Write the result column; pending fixtures are left blank.
    pub async fn fill_results(&self, title: &str, fixtures: &[Fixture]) -> Result<()> {
        expect_full_round(fixtures)?;
        let rows = fixtures.iter().map(|f| vec![f.result.symbol()]).collect();
        self.board.write_range(title, layout::RESULTS, rows).await
    }

    /// Whether all 15 results are on the board.
    pub async fn round_finished(&self, title: &str) -> Result<bool> {
        let rows = self
            .board
            .read_range(title, layout::RESULTS, Orientation::Rows)
            .await?;
        Ok((0..TOTAL_FIXTURES).all(|i| !cell(&rows, i, 0).is_empty()))
    }

    // -- Participants ----------------------------------------------------

    /// Whether every roster member has a pick column, identified by its
    /// 16th cell, with all 15 picks filled.
    pub async fn cols_filled(&self, title: &str, roster: &[String]) -> Result<bool> {
        if roster.is_empty() {
            return Ok(false);
        }
        let columns = self
            .board
            .read_range(title, layout::PICKS, Orientation::Columns)
            .await?;

        for person in roster {
            let person = person.trim();
            let column = (0..columns.len())
                .find(|&c| cell(&columns, c, layout::IDENTIFIER_ROW) == person);
            let Some(c) = column else {
                debug!(title, person, "No pick column yet");
                return Ok(false);
            };
            if (0..TOTAL_FIXTURES).any(|row| cell(&columns, c, row).is_empty()) {
                debug!(title, person, "Pick column incomplete");
                return Ok(false);
            }
        }
        Ok(true)
    }

    // -- Doubles ---------------------------------------------------------

    /// HOME / DRAW / AWAY vote counts of the 14 regular fixtures. Blank
    /// cells count as zero, including trailing rows the board left out.
    pub async fn read_frequencies(&self, title: &str) -> Result<Vec<Vec<i64>>> {
        let rows = self
            .board
            .read_range(title, layout::FREQUENCIES, Orientation::Rows)
            .await?;
        (0..REGULAR_FIXTURES)
            .map(|i| {
                (0..Outcome::ALL.len())
                    .map(|j| parse_count(title, i, cell(&rows, i, j)))
                    .collect()
            })
            .collect()
    }

    /// Most voted sign of each regular fixture.
    pub async fn read_modes(&self, title: &str) -> Result<Vec<Outcome>> {
        let rows = self
            .board
            .read_range(title, layout::MODES, Orientation::Rows)
            .await?;
        (0..REGULAR_FIXTURES)
            .map(|i| {
                cell(&rows, i, 0).parse().map_err(|_| {
                    QuinielaError::DataShape(format!(
                        "{title}: mode of fixture {} is {:?}",
                        i + 1,
                        cell(&rows, i, 0)
                    ))
                })
            })
            .collect()
    }

    /// Write the doubles column in a single call.
    pub async fn fill_doubles(&self, title: &str, selection: &DoubleSelection) -> Result<()> {
        let rows = selection.symbols().into_iter().map(|s| vec![s]).collect();
        self.board.write_range(title, layout::DOUBLES, rows).await
    }

    /// Whether the doubles column holds exactly `num_doubles` marks.
    pub async fn doubles_filled(&self, title: &str, num_doubles: usize) -> Result<bool> {
        let rows = self
            .board
            .read_range(title, layout::DOUBLES, Orientation::Rows)
            .await?;
        let marks = (0..REGULAR_FIXTURES)
            .filter(|&i| !cell(&rows, i, 0).is_empty())
            .count();
        Ok(marks == num_doubles)
    }
}

fn expect_full_round(fixtures: &[Fixture]) -> Result<()> {
    if fixtures.len() != TOTAL_FIXTURES {
        return Err(QuinielaError::DataShape(format!(
            "round has {} fixtures, expected {TOTAL_FIXTURES}",
            fixtures.len()
        )));
    }
    Ok(())
}

fn parse_count(title: &str, row: usize, text: &str) -> Result<i64> {
    if text.is_empty() {
        return Ok(0);
    }
    match text.parse::<i64>() {
        Ok(n) if n >= 0 => Ok(n),
        _ => Err(QuinielaError::DataShape(format!(
            "{title}: vote count {text:?} on fixture {}",
            row + 1
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
