//! Live statistics over every proposed tile.
//!
//! Counters are updated incrementally on each [`StatsAggregator::record`] so a
//! report only has to copy and sort them. The lock is held for the increment
//! or for the copy, never for the sort.

use serde::Serialize;
use std::{
    cmp::Reverse,
    collections::HashMap,
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use crate::board::{Color, Tile};

/// Number of proposals that targeted one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellCount {
    pub row: i32,
    pub col: i32,
    pub count: u64,
}

#[derive(Debug)]
struct StatsState {
    total_tiles: u64,
    colors: HashMap<Color, u64>,
    owners: HashMap<String, u64>,
    // First-seen order; `cell_index` maps a position to its slot.
    cells: Vec<CellCount>,
    cell_index: HashMap<(i32, i32), usize>,
}

/// Accumulates counters for the lifetime of the process.
#[derive(Debug)]
pub struct StatsAggregator {
    start_time: Instant,
    state: Mutex<StatsState>,
}

/// Point-in-time copy of the counters, ordered for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub total_tiles: u64,
    pub elapsed_secs: u64,
    /// Tiles per second; `None` until a full second has elapsed.
    pub rate: Option<f64>,
    pub colors: Vec<(String, u64)>,
    pub owners: Vec<(String, u64)>,
    pub cells: Vec<CellCount>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(start_time: Instant) -> Self {
        Self {
            start_time,
            state: Mutex::new(StatsState {
                total_tiles: 0,
                colors: HashMap::new(),
                owners: HashMap::new(),
                cells: Vec::new(),
                cell_index: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StatsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, tile: &Tile) {
        let mut state = self.lock();
        state.total_tiles += 1;
        *state.colors.entry(tile.color).or_insert(0) += 1;
        *state.owners.entry(tile.owner.clone()).or_insert(0) += 1;

        let key = (tile.row, tile.col);
        let existing = state.cell_index.get(&key).copied();
        match existing {
            Some(slot) => state.cells[slot].count += 1,
            None => {
                let slot = state.cells.len();
                state.cells.push(CellCount {
                    row: tile.row,
                    col: tile.col,
                    count: 1,
                });
                state.cell_index.insert(key, slot);
            }
        }
    }

    pub fn total_tiles(&self) -> u64 {
        self.lock().total_tiles
    }

    pub fn snapshot(&self) -> StatsReport {
        self.snapshot_at(Instant::now())
    }

    /// Builds a report as of `now`.
    pub fn snapshot_at(&self, now: Instant) -> StatsReport {
        let (total_tiles, colors, owners, mut cells) = {
            let state = self.lock();
            let colors: Vec<(String, u64)> = state
                .colors
                .iter()
                .map(|(color, count)| (color.name().to_string(), *count))
                .collect();
            let owners: Vec<(String, u64)> = state
                .owners
                .iter()
                .map(|(owner, count)| (owner.clone(), *count))
                .collect();
            (state.total_tiles, colors, owners, state.cells.clone())
        };

        let elapsed_secs = now.saturating_duration_since(self.start_time).as_secs();
        let rate = (elapsed_secs > 0).then(|| total_tiles as f64 / elapsed_secs as f64);

        // Stable: equal count and row keep first-seen order.
        cells.sort_by_key(|cell| (Reverse(cell.count), cell.row));

        StatsReport {
            total_tiles,
            elapsed_secs,
            rate,
            colors: ranked(colors),
            owners: ranked(owners),
            cells,
        }
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Count descending, then name ascending.
fn ranked(mut entries: Vec<(String, u64)>) -> Vec<(String, u64)> {
    entries.sort_by(|(a_name, a_count), (b_name, b_count)| {
        b_count.cmp(a_count).then_with(|| a_name.cmp(b_name))
    });
    entries
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs = |entries: &[(String, u64)]| {
            entries
                .iter()
                .map(|(name, count)| format!("{}={}", name, count))
                .collect::<Vec<_>>()
                .join(", ")
        };

        writeln!(f, "Colors: [{}]", pairs(&self.colors))?;
        writeln!(f, "Clients: [{}]", pairs(&self.owners))?;
        match self.rate {
            Some(rate) => writeln!(f, "Average Tile Changes per Second: {:.3} tiles", rate)?,
            None => writeln!(f, "Average Tile Changes per Second: undefined")?,
        }
        let cells = self
            .cells
            .iter()
            .map(|c| format!("({},{}) Tile Changes= ({})", c.row, c.col, c.count))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "Most Contentious Indices: [{}]", cells)
    }
}
