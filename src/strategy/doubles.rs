//! Double selection.
//!
//! Picks which regular fixtures get a second sign. A fixture's *spread*
//! is the gap between its two most voted outcomes; the smaller the
//! spread, the more contested the fixture and the earlier it is taken.
//! Randomness is only used to break ties inside the last spread group
//! when the quota does not cover the whole group.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::frequency::arg_max;
use crate::types::{Outcome, QuinielaError, Result, REGULAR_FIXTURES};

/// Frequency value that excludes a slot from the second-pick search.
const EXCLUDED: i64 = -1;

// ---------------------------------------------------------------------------
// Selection result
// ---------------------------------------------------------------------------

/// One optional mark per regular fixture, in fixture order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleSelection {
    marks: Vec<Option<Outcome>>,
}

impl DoubleSelection {
    pub fn marks(&self) -> &[Option<Outcome>] {
        &self.marks
    }

    /// Indices and second signs of the chosen fixtures.
    pub fn chosen(&self) -> impl Iterator<Item = (usize, Outcome)> + '_ {
        self.marks
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.map(|o| (i, o)))
    }

    pub fn count(&self) -> usize {
        self.marks.iter().filter(|m| m.is_some()).count()
    }

    /// Cell texts for the doubles column, blank where no double is bet.
    pub fn symbols(&self) -> Vec<String> {
        self.marks
            .iter()
            .map(|m| m.map(|o| o.symbol().to_string()).unwrap_or_default())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Chooses `num_doubles` fixtures out of the 14 regular ones.
#[derive(Debug, Clone, Copy)]
pub struct DoubleSelector {
    num_doubles: usize,
    participants: usize,
}

impl DoubleSelector {
    /// `participants` bounds the spreads considered: no fixture can be
    /// split by more votes than there are voters.
    pub fn new(num_doubles: usize, participants: usize) -> Self {
        Self {
            num_doubles,
            participants,
        }
    }

    pub fn num_doubles(&self) -> usize {
        self.num_doubles
    }

    /// Select using the thread-local RNG.
    pub fn select(&self, freqs: &[Vec<i64>], modes: &[Outcome]) -> Result<DoubleSelection> {
        self.select_with_rng(freqs, modes, &mut rand::thread_rng())
    }

    /// Select with a caller-supplied RNG (seeded in tests).
    pub fn select_with_rng<R: Rng + ?Sized>(
        &self,
        freqs: &[Vec<i64>],
        modes: &[Outcome],
        rng: &mut R,
    ) -> Result<DoubleSelection> {
        self.validate(freqs, modes)?;

        let spreads = freqs
            .iter()
            .map(|row| spread(row))
            .collect::<Result<Vec<_>>>()?;
        let groups = group_by_spread(&spreads, self.participants);
        let rows = choose_rows(&groups, self.num_doubles, rng)?;

        let mut marks = vec![None; REGULAR_FIXTURES];
        for row in rows {
            marks[row] = Some(second_pick(&freqs[row], modes[row])?);
        }

        debug!(
            num_doubles = self.num_doubles,
            participants = self.participants,
            ?spreads,
            "Doubles selected"
        );

        Ok(DoubleSelection { marks })
    }

    fn validate(&self, freqs: &[Vec<i64>], modes: &[Outcome]) -> Result<()> {
        if self.num_doubles > REGULAR_FIXTURES {
            return Err(QuinielaError::InsufficientData(format!(
                "{} doubles requested, only {REGULAR_FIXTURES} fixtures",
                self.num_doubles
            )));
        }
        if freqs.len() != REGULAR_FIXTURES {
            return Err(QuinielaError::InsufficientData(format!(
                "expected {REGULAR_FIXTURES} frequency rows, got {}",
                freqs.len()
            )));
        }
        if modes.len() != REGULAR_FIXTURES {
            return Err(QuinielaError::InsufficientData(format!(
                "expected {REGULAR_FIXTURES} modes, got {}",
                modes.len()
            )));
        }
        for (i, row) in freqs.iter().enumerate() {
            if row.len() != Outcome::ALL.len() {
                return Err(QuinielaError::InsufficientData(format!(
                    "frequency row {i} has {} values",
                    row.len()
                )));
            }
            if row.iter().any(|v| *v < 0) {
                return Err(QuinielaError::InsufficientData(format!(
                    "frequency row {i} has a negative count"
                )));
            }
        }
        Ok(())
    }
}

/// Gap between the leader and the runner-up of a frequency row.
fn spread(row: &[i64]) -> Result<i64> {
    let (lead, lead_idx) = arg_max(row)?;
    let mut rest = row.to_vec();
    rest.remove(lead_idx);
    let (runner, _) = arg_max(&rest)?;
    Ok((lead - runner).abs())
}

/// Fixture indices grouped by spread `0..=participants`, ascending.
/// Fixtures with a larger spread belong to no group.
fn group_by_spread(spreads: &[i64], participants: usize) -> Vec<Vec<usize>> {
    let mut groups = vec![Vec::new(); participants + 1];
    for (row, s) in spreads.iter().enumerate() {
        if let Some(group) = usize::try_from(*s).ok().and_then(|s| groups.get_mut(s)) {
            group.push(row);
        }
    }
    groups
}

fn choose_rows<R: Rng + ?Sized>(
    groups: &[Vec<usize>],
    quota: usize,
    rng: &mut R,
) -> Result<Vec<usize>> {
    let mut chosen = Vec::with_capacity(quota);
    for group in groups {
        let remaining = quota - chosen.len();
        if remaining == 0 {
            break;
        }
        if remaining >= group.len() {
            chosen.extend_from_slice(group);
        } else {
            chosen.extend(group.choose_multiple(rng, remaining).copied());
        }
    }

    if chosen.len() < quota {
        return Err(QuinielaError::InsufficientData(format!(
            "only {} fixtures within the participant spread range, {quota} doubles requested",
            chosen.len()
        )));
    }
    Ok(chosen)
}

/// Second sign for a chosen fixture: the slot opposite to the mode is
/// excluded and the most voted remaining outcome wins.
fn second_pick(row: &[i64], mode: Outcome) -> Result<Outcome> {
    let mut candidate = row.to_vec();
    candidate[mode.toggled().index()] = EXCLUDED;
    let (_, idx) = arg_max(&candidate)?;
    Outcome::from_index(idx)
        .ok_or_else(|| QuinielaError::InsufficientData(format!("no outcome at index {idx}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
