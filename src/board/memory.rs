//! In-memory shared board.
//!
//! Fully controllable from test code and usable for offline dry runs.
//! All state lives behind a mutex; no lock is held across an await.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::{CellRange, Orientation, SharedBoard};
use crate::types::{QuinielaError, Result, SheetInfo};

#[derive(Debug, Clone)]
struct MemorySheet {
    sheet_id: i64,
    title: String,
    /// (row, col) -> text; rows one-based, cols zero-based.
    cells: BTreeMap<(u32, u32), String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    sheets: Vec<MemorySheet>,
    next_id: i64,
    writes: usize,
}

impl MemoryState {
    fn sheet(&self, title: &str) -> Result<&MemorySheet> {
        self.sheets
            .iter()
            .find(|s| s.title == title)
            .ok_or_else(|| QuinielaError::DataShape(format!("no sheet titled {title:?}")))
    }

    fn sheet_mut(&mut self, title: &str) -> Result<&mut MemorySheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.title == title)
            .ok_or_else(|| QuinielaError::DataShape(format!("no sheet titled {title:?}")))
    }

    fn insert(&mut self, title: &str, cells: BTreeMap<(u32, u32), String>) -> i64 {
        self.next_id += 1;
        let sheet_id = self.next_id;
        self.sheets.push(MemorySheet {
            sheet_id,
            title: title.to_string(),
            cells,
        });
        sheet_id
    }
}

/// A shared board held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryBoard {
    state: Mutex<MemoryState>,
    /// If set, every board call fails with a transient error.
    force_error: Mutex<Option<String>>,
}

impl MemoryBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty sheet, returning its id.
    pub fn add_sheet(&self, title: &str) -> i64 {
        self.state_guard().insert(title, BTreeMap::new())
    }

    /// Titles of all sheets in board order.
    pub fn titles(&self) -> Vec<String> {
        let state = self.state_guard();
        state.sheets.iter().map(|s| s.title.clone()).collect()
    }

    /// Row-major contents of `range`, blanks included. Missing sheets read
    /// as empty.
    pub fn cells(&self, title: &str, range: CellRange) -> Vec<Vec<String>> {
        let state = self.state_guard();
        match state.sheet(title) {
            Ok(sheet) => read_rows(sheet, range),
            Err(_) => vec![vec![String::new(); range.width()]; range.height()],
        }
    }

    /// Overwrite `range` without going through the trait (test setup).
    pub fn set_cells(&self, title: &str, range: CellRange, values: &[Vec<&str>]) {
        let owned = values
            .iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect();
        let mut state = self.state_guard();
        if let Ok(sheet) = state.sheet_mut(title) {
            write_rows(sheet, range, owned);
        }
    }

    /// Number of successful `write_range` calls.
    pub fn write_count(&self) -> usize {
        self.state_guard().writes
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Setup and inspection helpers recover a poisoned lock; board calls
    /// report it as a transient failure.
    fn state_guard(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| QuinielaError::transient("memory", "board state lock poisoned"))
    }

    fn check_error(&self) -> Result<()> {
        match self
            .force_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(msg) => Err(QuinielaError::transient("memory", msg)),
            None => Ok(()),
        }
    }
}

fn read_rows(sheet: &MemorySheet, range: CellRange) -> Vec<Vec<String>> {
    (range.first_row..=range.last_row)
        .map(|row| {
            (range.first_col..=range.last_col)
                .map(|col| sheet.cells.get(&(row, col)).cloned().unwrap_or_default())
                .collect()
        })
        .collect()
}

fn write_rows(sheet: &mut MemorySheet, range: CellRange, values: Vec<Vec<String>>) {
    for (r, row) in values.into_iter().enumerate().take(range.height()) {
        for (c, value) in row.into_iter().enumerate().take(range.width()) {
            let key = (range.first_row + r as u32, range.first_col + c as u32);
            if value.is_empty() {
                sheet.cells.remove(&key);
            } else {
                sheet.cells.insert(key, value);
            }
        }
    }
}

fn transpose(rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    (0..width)
        .map(|c| rows.iter().map(|row| row[c].clone()).collect())
        .collect()
}

#[async_trait]
impl SharedBoard for MemoryBoard {
    async fn list_sheets(&self) -> Result<Vec<SheetInfo>> {
        self.check_error()?;
        let state = self.state()?;
        Ok(state
            .sheets
            .iter()
            .map(|s| SheetInfo {
                sheet_id: s.sheet_id,
                title: s.title.clone(),
            })
            .collect())
    }

    async fn create_sheet(&self, template_id: i64) -> Result<i64> {
        self.check_error()?;
        let mut state = self.state()?;
        let template = state
            .sheets
            .iter()
            .find(|s| s.sheet_id == template_id)
            .cloned()
            .ok_or_else(|| QuinielaError::DataShape(format!("no template sheet {template_id}")))?;
        let title = format!("Copy of {}", template.title);
        let sheet_id = state.insert(&title, template.cells);
        debug!(sheet_id, template_id, "Memory sheet created");
        Ok(sheet_id)
    }

    async fn rename_sheet(&self, sheet_id: i64, title: &str) -> Result<()> {
        self.check_error()?;
        let mut state = self.state()?;
        let sheet = state
            .sheets
            .iter_mut()
            .find(|s| s.sheet_id == sheet_id)
            .ok_or_else(|| QuinielaError::DataShape(format!("no sheet {sheet_id}")))?;
        sheet.title = title.to_string();
        Ok(())
    }

    async fn delete_sheet(&self, sheet_id: i64) -> Result<()> {
        self.check_error()?;
        let mut state = self.state()?;
        let before = state.sheets.len();
        state.sheets.retain(|s| s.sheet_id != sheet_id);
        if state.sheets.len() == before {
            return Err(QuinielaError::DataShape(format!("no sheet {sheet_id}")));
        }
        Ok(())
    }

    async fn read_range(
        &self,
        sheet_title: &str,
        range: CellRange,
        orientation: Orientation,
    ) -> Result<Vec<Vec<String>>> {
        self.check_error()?;
        let state = self.state()?;
        let rows = read_rows(state.sheet(sheet_title)?, range);
        Ok(match orientation {
            Orientation::Rows => rows,
            Orientation::Columns => transpose(rows),
        })
    }

    async fn write_range(
        &self,
        sheet_title: &str,
        range: CellRange,
        values: Vec<Vec<String>>,
    ) -> Result<()> {
        self.check_error()?;
        let mut state = self.state()?;
        write_rows(state.sheet_mut(sheet_title)?, range, values);
        state.writes += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{column, layout};

    #[tokio::test]
    async fn test_write_then_read() {
        let board = MemoryBoard::new();
        board.add_sheet("Jornada 1");
        let values = vec![
            vec!["Betis".to_string(), "Sevilla".to_string()],
            vec!["Celta".to_string(), "Eibar".to_string()],
        ];
        board
            .write_range("Jornada 1", layout::MATCHES, values.clone())
            .await
            .unwrap();

        let rows = board
            .read_range("Jornada 1", layout::MATCHES, Orientation::Rows)
            .await
            .unwrap();
        assert_eq!(rows.len(), 15);
        assert_eq!(rows[0..2], values[..]);
        assert!(rows[2].iter().all(String::is_empty));
        assert_eq!(board.write_count(), 1);
    }

    #[tokio::test]
    async fn test_column_orientation() {
        let board = MemoryBoard::new();
        board.add_sheet("S");
        let range = CellRange::new(column('F'), 1, column('G'), 2);
        board.set_cells("S", range, &[vec!["a", "b"], vec!["c", "d"]]);

        let cols = board.read_range("S", range, Orientation::Columns).await.unwrap();
        assert_eq!(cols, vec![vec!["a", "c"], vec!["b", "d"]]);
    }

    #[tokio::test]
    async fn test_create_rename_delete() {
        let board = MemoryBoard::new();
        let template = board.add_sheet("Plantilla");
        board.set_cells("Plantilla", layout::RESULTS, &[vec!["?"]]);

        let id = board.create_sheet(template).await.unwrap();
        assert_eq!(board.titles(), vec!["Plantilla", "Copy of Plantilla"]);
        board.rename_sheet(id, "Jornada 4").await.unwrap();
        assert_eq!(board.cells("Jornada 4", layout::RESULTS)[0][0], "?");

        board.delete_sheet(id).await.unwrap();
        assert_eq!(board.titles(), vec!["Plantilla"]);
        assert!(board.delete_sheet(id).await.is_err());
    }

    #[tokio::test]
    async fn test_forced_error_is_transient() {
        let board = MemoryBoard::new();
        board.set_error("offline");
        let err = board.list_sheets().await.unwrap_err();
        assert!(err.is_transient());
        board.clear_error();
        assert!(board.list_sheets().await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_sheet() {
        let board = MemoryBoard::new();
        let err = board
            .read_range("Nope", layout::RESULTS, Orientation::Rows)
            .await
            .unwrap_err();
        assert!(matches!(err, QuinielaError::DataShape(_)));
    }

    #[tokio::test]
    async fn test_poisoned_lock_is_reported() {
        let board = MemoryBoard::new();
        board.add_sheet("Jornada 1");
        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = board.state.lock().unwrap();
            panic!("writer died");
        }));
        assert!(poisoned.is_err());

        let err = board.list_sheets().await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(board.titles(), vec!["Jornada 1"]);
    }
}
