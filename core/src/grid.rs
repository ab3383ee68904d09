use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::GridError;

/// The four possible move directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All four directions in declaration order.
    ///
    /// This order is also the tie-break order of
    /// [`Grid::best_direction_by_empty_tiles`].
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];
}

/// The board state of one game.
///
/// The board is a `size x size` matrix stored as a flat row-major `Vec<u32>`.
/// Empty cells are 0, tiles contain their value (2, 4, 8, ...); every
/// non-zero cell is a power of 2. The grid owns a seedable RNG so that
/// tile spawning is deterministic per seed.
#[derive(Clone)]
pub struct Grid {
    size: usize,
    goal: u32,
    cells: Vec<u32>,
    rng: SmallRng,
}

/// Smallest goal the engine accepts (exclusive) and largest (inclusive).
const GOAL_MIN_EXCLUSIVE: u32 = 8;
const GOAL_MAX: u32 = 16384;

impl Grid {
    /// Create a fresh board with two spawned tiles.
    ///
    /// `size` must be at least 2; `goal` must be a power of 2 with
    /// `8 < goal <= 16384`. The `seed` drives all tile spawning.
    pub fn new(size: usize, goal: u32, seed: u64) -> Result<Grid, GridError> {
        validate_size(size)?;
        validate_goal(goal)?;
        let mut grid = Grid {
            size,
            goal,
            cells: vec![0; size * size],
            rng: SmallRng::seed_from_u64(seed),
        };
        // size >= 2 guarantees at least 4 empty cells here
        grid.spawn_tile()?;
        grid.spawn_tile()?;
        Ok(grid)
    }

    /// Reconstruct a board from stored parts, validating every invariant.
    ///
    /// Used by storage collaborators when resuming a saved game. `cells` is
    /// row-major and must hold exactly `size * size` values, each either 0
    /// or a power of 2 >= 2.
    pub fn from_parts(
        size: usize,
        goal: u32,
        cells: Vec<u32>,
        seed: u64,
    ) -> Result<Grid, GridError> {
        validate_size(size)?;
        validate_goal(goal)?;
        if cells.len() != size * size {
            return Err(GridError::InvalidCellCount {
                size,
                expected: size * size,
                actual: cells.len(),
            });
        }
        for (index, &value) in cells.iter().enumerate() {
            if value != 0 && (value < 2 || !value.is_power_of_two()) {
                return Err(GridError::InvalidCell { index, value });
            }
        }
        Ok(Grid {
            size,
            goal,
            cells,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /// The board edge length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The tile value the player is aiming for.
    pub fn goal(&self) -> u32 {
        self.goal
    }

    /// The cell matrix in row-major order.
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    /// Put a new tile in a random empty cell.
    ///
    /// The cell is chosen uniformly among all empty cells; the value is 2
    /// with probability 0.7 and 4 with probability 0.3. Callers must check
    /// `empty_count() > 0` first; a full board is a contract violation.
    pub fn spawn_tile(&mut self) -> Result<(), GridError> {
        let empty_cells: Vec<usize> = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == 0)
            .map(|(i, _)| i)
            .collect();

        if empty_cells.is_empty() {
            return Err(GridError::NoEmptyCell);
        }

        let idx = empty_cells[self.rng.gen_range(0..empty_cells.len())];
        self.cells[idx] = if self.rng.gen::<f64>() < 0.7 { 2 } else { 4 };
        Ok(())
    }

    /// Slide and merge every line toward `direction`.
    ///
    /// Returns whether the board changed. Each row (Left/Right) or column
    /// (Up/Down) is transformed independently: non-zero values are compacted
    /// toward the destination edge, then a single merge scan runs from that
    /// edge outward. A tile merges at most once per move. No tile is spawned
    /// here; that is the session's call to make.
    pub fn apply_move(&mut self, direction: Direction) -> bool {
        let n = self.size;
        let mut line = vec![0u32; n];
        let mut moved = false;

        for lane in 0..n {
            for pos in 0..n {
                line[pos] = self.cells[self.cell_index(direction, lane, pos)];
            }
            if slide_line(&mut line) {
                moved = true;
                for pos in 0..n {
                    let idx = self.cell_index(direction, lane, pos);
                    self.cells[idx] = line[pos];
                }
            }
        }

        moved
    }

    /// True when no move in any direction would change the board.
    ///
    /// Computed from structure alone: a board with an empty cell, or with two
    /// orthogonally adjacent equal tiles, always has a legal move.
    pub fn is_terminal(&self) -> bool {
        let n = self.size;
        for row in 0..n {
            for col in 0..n {
                let value = self.cells[row * n + col];
                if value == 0 {
                    return false;
                }
                if row + 1 < n && value == self.cells[(row + 1) * n + col] {
                    return false;
                }
                if col + 1 < n && value == self.cells[row * n + col + 1] {
                    return false;
                }
            }
        }
        true
    }

    /// The maximum tile value on the board.
    pub fn max_tile(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// The sum of all tiles on the board.
    pub fn score(&self) -> u64 {
        self.cells.iter().map(|&v| u64::from(v)).sum()
    }

    /// The number of empty cells on the board.
    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v == 0).count()
    }

    /// Pick the direction whose move leaves the most empty cells.
    ///
    /// Single-ply lookahead: each direction is trial-applied to an isolated
    /// copy of the board; directions that change nothing are excluded. Ties
    /// keep the earliest direction in [`Direction::ALL`] order. Fails with
    /// `NoLegalMove` when the board is terminal.
    pub fn best_direction_by_empty_tiles(&self) -> Result<Direction, GridError> {
        let mut best: Option<(Direction, usize)> = None;

        for direction in Direction::ALL {
            let mut scratch = self.clone();
            if !scratch.apply_move(direction) {
                continue;
            }
            let empties = scratch.empty_count();
            match best {
                Some((_, best_empties)) if empties <= best_empties => {}
                _ => best = Some((direction, empties)),
            }
        }

        best.map(|(direction, _)| direction)
            .ok_or(GridError::NoLegalMove)
    }

    // -------------------------------------------------------------------------
    // Private methods
    // -------------------------------------------------------------------------

    /// Map (lane, position-from-destination-edge) to a flat cell index.
    ///
    /// Position 0 is the edge tiles slide toward, so all four directions run
    /// through the same line transform.
    fn cell_index(&self, direction: Direction, lane: usize, pos: usize) -> usize {
        let n = self.size;
        match direction {
            Direction::Up => pos * n + lane,
            Direction::Down => (n - 1 - pos) * n + lane,
            Direction::Left => lane * n + pos,
            Direction::Right => lane * n + (n - 1 - pos),
        }
    }

    #[cfg(test)]
    pub(crate) fn set_cells_for_test(&mut self, cells: &[u32]) {
        assert_eq!(cells.len(), self.size * self.size);
        self.cells.copy_from_slice(cells);
    }
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Grid {{ size: {}, goal: {}, score: {} }}",
            self.size,
            self.goal,
            self.score()
        )?;
        for row in 0..self.size {
            for col in 0..self.size {
                let val = self.cells[row * self.size + col];
                if val == 0 {
                    write!(f, "    .")?;
                } else {
                    write!(f, "{:5}", val)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Compact then merge one line toward index 0. Returns whether it changed.
fn slide_line(line: &mut [u32]) -> bool {
    let compacted = compact_line(line);
    let merged = merge_line(line);
    compacted || merged
}

/// Slide all non-zero values toward index 0, preserving their order.
fn compact_line(line: &mut [u32]) -> bool {
    let mut write = 0;
    let mut changed = false;
    for read in 0..line.len() {
        if line[read] != 0 {
            if write != read {
                line[write] = line[read];
                line[read] = 0;
                changed = true;
            }
            write += 1;
        }
    }
    changed
}

/// Merge adjacent equal tiles in a compacted line, scanning from index 0.
///
/// On a merge the nearer tile doubles, everything past the pair shifts one
/// step toward index 0, and the scan continues past the merge point, so the
/// doubled tile is never compared again in the same pass.
fn merge_line(line: &mut [u32]) -> bool {
    let n = line.len();
    let mut changed = false;
    let mut i = 1;
    while i < n {
        if line[i] != 0 && line[i] == line[i - 1] {
            line[i - 1] *= 2;
            for k in i..n - 1 {
                line[k] = line[k + 1];
            }
            line[n - 1] = 0;
            changed = true;
        }
        i += 1;
    }
    changed
}

fn validate_size(size: usize) -> Result<(), GridError> {
    if size < 2 {
        return Err(GridError::InvalidSize(size));
    }
    Ok(())
}

fn validate_goal(goal: u32) -> Result<(), GridError> {
    if !goal.is_power_of_two() || goal <= GOAL_MIN_EXCLUSIVE || goal > GOAL_MAX {
        return Err(GridError::InvalidGoal(goal));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
