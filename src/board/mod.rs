//! Shared board integrations.
//!
//! Defines the `SharedBoard` trait (a remote spreadsheet with one sheet
//! per round) and provides implementations for:
//! - Google Sheets (REST v4): the production board
//! - an in-memory board: tests and offline dry runs
//!
//! `rounds::RoundBoard` layers the fixed round-sheet layout on top.

pub mod memory;
pub mod rounds;
pub mod sheets;

use async_trait::async_trait;
use std::fmt;

use crate::types::{Result, SheetInfo};

pub use rounds::RoundBoard;

// ---------------------------------------------------------------------------
// Ranges
// ---------------------------------------------------------------------------

/// Zero-based index of a column letter (`'A'` is 0).
pub const fn column(letter: char) -> u32 {
    letter as u32 - 'A' as u32
}

/// Rectangular block of cells. Columns are zero-based, rows one-based,
/// both bounds inclusive, matching A1 notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub first_col: u32,
    pub first_row: u32,
    pub last_col: u32,
    pub last_row: u32,
}

impl CellRange {
    pub const fn new(first_col: u32, first_row: u32, last_col: u32, last_row: u32) -> Self {
        Self {
            first_col,
            first_row,
            last_col,
            last_row,
        }
    }

    pub fn width(&self) -> usize {
        (self.last_col - self.first_col + 1) as usize
    }

    pub fn height(&self) -> usize {
        (self.last_row - self.first_row + 1) as usize
    }
}

fn column_name(mut index: u32) -> String {
    let mut name = Vec::new();
    loop {
        name.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.iter().rev().collect()
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}{}",
            column_name(self.first_col),
            self.first_row,
            column_name(self.last_col),
            self.last_row
        )
    }
}

/// Major dimension of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Each inner vector is a row.
    Rows,
    /// Each inner vector is a column.
    Columns,
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Fixed cell layout of a round sheet.
pub mod layout {
    use super::{column, CellRange};

    /// Home and away names of all 15 fixtures.
    pub const MATCHES: CellRange = CellRange::new(column('A'), 1, column('B'), 15);
    /// Published result per fixture.
    pub const RESULTS: CellRange = CellRange::new(column('E'), 1, column('E'), 15);
    /// Participant pick columns; row 16 holds each participant's identifier.
    pub const PICKS: CellRange = CellRange::new(column('F'), 1, column('M'), 16);
    /// Position of the identifier cell inside a `PICKS` column.
    pub const IDENTIFIER_ROW: usize = 15;
    /// Most voted sign per regular fixture.
    pub const MODES: CellRange = CellRange::new(column('N'), 1, column('N'), 14);
    /// HOME / DRAW / AWAY vote counts per regular fixture.
    pub const FREQUENCIES: CellRange = CellRange::new(column('O'), 1, column('Q'), 14);
    /// Second sign of each double, blank when no double is bet.
    pub const DOUBLES: CellRange = CellRange::new(column('R'), 1, column('R'), 14);
}

// ---------------------------------------------------------------------------
// Board trait
// ---------------------------------------------------------------------------

/// Abstraction over the shared spreadsheet.
///
/// Reads may return ragged matrices: trailing blank cells and rows can be
/// omitted, callers treat missing cells as blank.
#[async_trait]
pub trait SharedBoard: Send + Sync {
    /// All sheets, in board order.
    async fn list_sheets(&self) -> Result<Vec<SheetInfo>>;

    /// Copy the template sheet, returning the new sheet's id.
    async fn create_sheet(&self, template_id: i64) -> Result<i64>;

    async fn rename_sheet(&self, sheet_id: i64, title: &str) -> Result<()>;

    async fn delete_sheet(&self, sheet_id: i64) -> Result<()>;

    async fn read_range(
        &self,
        sheet_title: &str,
        range: CellRange,
        orientation: Orientation,
    ) -> Result<Vec<Vec<String>>>;

    /// Write row-major `values` into `range`.
    async fn write_range(
        &self,
        sheet_title: &str,
        range: CellRange,
        values: Vec<Vec<String>>,
    ) -> Result<()>;

    /// Board name for logging.
    fn name(&self) -> &str;
}
