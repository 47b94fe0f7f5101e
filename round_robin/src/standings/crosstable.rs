//! Square matrix of pairwise results among a tournament's roster.
//!
//! Row and column `i` belong to the `i`-th roster member. Cell `[i][j]` is
//! the result of player `i` against player `j`, and `[j][i]` always holds the
//! complementary result.

use serde::{Deserialize, Serialize};

use super::Points;
use crate::errors::{TournamentError, TournamentResult};
use crate::player::PlayerId;

/// Smallest roster a standings table is kept for
pub const MIN_STANDINGS_SIZE: usize = 3;

/// State of one crosstable cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    /// Diagonal
    #[serde(rename = "X")]
    Own,
    #[serde(rename = "-")]
    Unplayed,
    #[serde(rename = "1")]
    Win,
    #[serde(rename = "0")]
    Loss,
    #[serde(rename = "1/2")]
    Draw,
}

impl Cell {
    pub fn symbol(&self) -> &'static str {
        match self {
            Cell::Own => "X",
            Cell::Unplayed => "-",
            Cell::Win => "1",
            Cell::Loss => "0",
            Cell::Draw => "1/2",
        }
    }

    /// Points this cell is worth to the row player
    pub fn points(&self) -> Points {
        match self {
            Cell::Win => Points::ONE,
            Cell::Draw => Points::HALF,
            Cell::Own | Cell::Unplayed | Cell::Loss => Points::ZERO,
        }
    }

    /// Cell the opponent holds for the same game
    pub fn complement(&self) -> Cell {
        match self {
            Cell::Win => Cell::Loss,
            Cell::Loss => Cell::Win,
            other => *other,
        }
    }

    pub fn is_played(&self) -> bool {
        matches!(self, Cell::Win | Cell::Loss | Cell::Draw)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Result of a game between the first and second participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    FirstWins,
    SecondWins,
    Draw,
}

impl Outcome {
    /// Cells for `(first, second)`
    pub fn cells(&self) -> (Cell, Cell) {
        match self {
            Outcome::FirstWins => (Cell::Win, Cell::Loss),
            Outcome::SecondWins => (Cell::Loss, Cell::Win),
            Outcome::Draw => (Cell::Draw, Cell::Draw),
        }
    }

    /// Ledger deltas for `(first, second)`
    pub fn points(&self) -> (Points, Points) {
        let (first, second) = self.cells();
        (first.points(), second.points())
    }
}

/// Pairwise result grid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Cell>>", into = "Vec<Vec<Cell>>")]
pub struct Crosstable {
    cells: Vec<Vec<Cell>>,
}

/// Grid plus roster labels, in roster order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrosstableSnapshot {
    pub labels: Vec<PlayerId>,
    pub grid: Vec<Vec<Cell>>,
}

impl Crosstable {
    /// `size`×`size` grid with the diagonal marked and every game unplayed
    pub fn initialize(size: usize) -> Self {
        let cells = (0..size)
            .map(|row| {
                (0..size)
                    .map(|col| if row == col { Cell::Own } else { Cell::Unplayed })
                    .collect()
            })
            .collect();
        Self { cells }
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<Cell> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Append a row and column for a new last player
    pub fn insert_player(&mut self) {
        for row in &mut self.cells {
            row.push(Cell::Unplayed);
        }
        let size = self.cells.len() + 1;
        let mut row = vec![Cell::Unplayed; size];
        row[size - 1] = Cell::Own;
        self.cells.push(row);
    }

    /// Delete row and column `index`, keeping at least [`MIN_STANDINGS_SIZE`] players
    pub fn remove_player(&mut self, index: usize) -> TournamentResult<()> {
        self.check_index(index)?;
        let remaining = self.size() - 1;
        if remaining < MIN_STANDINGS_SIZE {
            return Err(TournamentError::BelowMinimumRoster {
                minimum: MIN_STANDINGS_SIZE,
                remaining,
            });
        }
        self.drop_index(index);
        Ok(())
    }

    /// Delete row and column `index` without the minimum-size check
    ///
    /// Only valid before any result exists.
    pub fn discard_player(&mut self, index: usize) -> TournamentResult<()> {
        self.check_index(index)?;
        self.drop_index(index);
        Ok(())
    }

    fn drop_index(&mut self, index: usize) {
        self.cells.remove(index);
        for row in &mut self.cells {
            row.remove(index);
        }
    }

    fn check_index(&self, index: usize) -> TournamentResult<()> {
        if index >= self.size() {
            return Err(TournamentError::UnknownParticipant {
                index,
                size: self.size(),
            });
        }
        Ok(())
    }

    /// Check that a result between `first` and `second` could be recorded
    pub fn validate_record(&self, first: usize, second: usize) -> TournamentResult<()> {
        self.check_index(first)?;
        self.check_index(second)?;
        if first == second {
            return Err(TournamentError::SelfPlay);
        }
        if self.cells[first][second].is_played() || self.cells[second][first].is_played() {
            return Err(TournamentError::AlreadyRecorded { first, second });
        }
        Ok(())
    }

    /// Record a game result; the grid is untouched on error
    pub fn record(&mut self, first: usize, second: usize, outcome: Outcome) -> TournamentResult<()> {
        self.validate_record(first, second)?;
        let (a, b) = outcome.cells();
        self.cells[first][second] = a;
        self.cells[second][first] = b;
        Ok(())
    }

    /// Game points of the player at `index`
    pub fn points(&self, index: usize) -> Points {
        self.cells
            .get(index)
            .map(|row| row.iter().map(Cell::points).sum())
            .unwrap_or_default()
    }

    /// Number of games the player at `index` has completed
    pub fn games_played(&self, index: usize) -> usize {
        self.cells
            .get(index)
            .map(|row| row.iter().filter(|c| c.is_played()).count())
            .unwrap_or_default()
    }

    /// Whether the grid is square with a marked diagonal and complementary cells
    pub fn is_consistent(&self) -> bool {
        check_grid(&self.cells).is_ok()
    }

    pub fn snapshot(&self, labels: &[PlayerId]) -> CrosstableSnapshot {
        CrosstableSnapshot {
            labels: labels.to_vec(),
            grid: self.cells.clone(),
        }
    }
}

fn check_grid(cells: &[Vec<Cell>]) -> Result<(), String> {
    let size = cells.len();
    if let Some((i, row)) = cells.iter().enumerate().find(|(_, row)| row.len() != size) {
        return Err(format!("row {i} has {} cells, expected {size}", row.len()));
    }
    for (i, row) in cells.iter().enumerate() {
        for (j, cell) in row.iter().enumerate() {
            if i == j {
                if *cell != Cell::Own {
                    return Err(format!("diagonal cell {i} is {cell}"));
                }
            } else if *cell == Cell::Own || cells[j][i] != cell.complement() {
                return Err(format!("cells [{i}][{j}] and [{j}][{i}] disagree"));
            }
        }
    }
    Ok(())
}

impl TryFrom<Vec<Vec<Cell>>> for Crosstable {
    type Error = String;

    fn try_from(cells: Vec<Vec<Cell>>) -> Result<Self, Self::Error> {
        check_grid(&cells)?;
        Ok(Self { cells })
    }
}

impl From<Crosstable> for Vec<Vec<Cell>> {
    fn from(table: Crosstable) -> Self {
        table.cells
    }
}
