use thiserror::Error;

/// Errors raised by the grid engine.
///
/// Construction errors (`InvalidSize`, `InvalidGoal`, `InvalidCell`) surface
/// immediately to the caller; nothing is clamped or repaired. `NoEmptyCell`
/// and `NoLegalMove` signal a caller ordering bug: check `empty_count` /
/// `is_terminal` before invoking the engine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    #[error("board size must be at least 2, got {0}")]
    InvalidSize(usize),
    #[error("goal must be a power of 2 greater than 8 and at most 16384, got {0}")]
    InvalidGoal(u32),
    #[error("cell {index} holds {value}, which is not 0 or a power of 2 >= 2")]
    InvalidCell { index: usize, value: u32 },
    #[error("a size-{size} board needs {expected} cells, got {actual}")]
    InvalidCellCount {
        size: usize,
        expected: usize,
        actual: usize,
    },
    #[error("cannot spawn a tile on a full board")]
    NoEmptyCell,
    #[error("no direction changes the board")]
    NoLegalMove,
}
