use crate::error::GridError;
use crate::grid::{Direction, Grid};

/// Result of applying one move through a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveResult {
    /// Whether the board changed (and a new tile was spawned).
    pub moved: bool,
    /// Whether the maximum tile has reached the configured goal.
    pub goal_reached: bool,
    /// Whether the game is over (no legal moves remaining).
    pub terminal: bool,
}

/// One game of 2048: a grid plus the move/spawn protocol a shell needs.
///
/// The session hides the engine's scan mechanics: a shell hands it a
/// direction and gets back the updated status flags. Exactly one grid is
/// owned at a time; loading a save replaces it wholesale.
#[derive(Debug)]
pub struct Session {
    grid: Grid,
}

impl Session {
    /// Start a new game with a fresh board.
    ///
    /// Propagates `InvalidSize`/`InvalidGoal` from the grid engine.
    pub fn new(size: usize, goal: u32, seed: u64) -> Result<Session, GridError> {
        Ok(Session {
            grid: Grid::new(size, goal, seed)?,
        })
    }

    /// Apply a player move, spawning a tile if the board changed.
    ///
    /// No tile spawns when the move changed nothing, or when no empty cell
    /// remains after the move.
    pub fn apply_player_move(&mut self, direction: Direction) -> MoveResult {
        let moved = self.grid.apply_move(direction);
        if moved && self.grid.empty_count() > 0 {
            // emptiness was just checked, so the spawn cannot fail
            let _ = self.grid.spawn_tile();
        }
        self.status(moved)
    }

    /// Apply one greedy computer move.
    ///
    /// The direction leaving the most empty cells is chosen; on a terminal
    /// board this is a no-op reporting `moved = false`.
    pub fn apply_computer_move(&mut self) -> MoveResult {
        match self.grid.best_direction_by_empty_tiles() {
            Ok(direction) => self.apply_player_move(direction),
            Err(_) => self.status(false),
        }
    }

    /// Swap in a different board, e.g. one loaded from storage.
    ///
    /// The grid carries its own size and goal; `Grid::from_parts` has already
    /// validated them, so the session takes it as-is.
    pub fn replace_grid(&mut self, grid: Grid) {
        self.grid = grid;
    }

    /// The board this session is playing.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The sum of all tiles on the board.
    pub fn score(&self) -> u64 {
        self.grid.score()
    }

    /// The maximum tile value on the board.
    pub fn max_tile(&self) -> u32 {
        self.grid.max_tile()
    }

    /// The tile value the player is aiming for.
    pub fn goal(&self) -> u32 {
        self.grid.goal()
    }

    /// Whether the goal tile has been reached.
    pub fn goal_reached(&self) -> bool {
        self.grid.max_tile() >= self.grid.goal()
    }

    /// Whether no legal move remains.
    pub fn is_terminal(&self) -> bool {
        self.grid.is_terminal()
    }

    fn status(&self, moved: bool) -> MoveResult {
        MoveResult {
            moved,
            goal_reached: self.goal_reached(),
            terminal: self.grid.is_terminal(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_board(size: usize, goal: u32, cells: Vec<u32>) -> Session {
        let mut session = Session::new(size, goal, 0).unwrap();
        session.replace_grid(Grid::from_parts(size, goal, cells, 0).unwrap());
        session
    }

    #[test]
    fn test_new_propagates_grid_errors() {
        assert_eq!(Session::new(1, 2048, 0).unwrap_err(), GridError::InvalidSize(1));
        assert_eq!(Session::new(4, 12, 0).unwrap_err(), GridError::InvalidGoal(12));
    }

    #[test]
    fn test_player_move_spawns_after_change() {
        let mut session = session_with_board(
            4,
            2048,
            vec![0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        );
        let result = session.apply_player_move(Direction::Left);
        assert!(result.moved);
        // the slid tile plus one spawned tile
        assert_eq!(session.grid().empty_count(), 14);
    }

    #[test]
    fn test_player_move_no_change_no_spawn() {
        let cells = vec![2, 0, 0, 0, 4, 0, 0, 0, 8, 0, 0, 0, 16, 0, 0, 0];
        let mut session = session_with_board(4, 2048, cells.clone());
        let result = session.apply_player_move(Direction::Left);
        assert!(!result.moved);
        assert!(!result.terminal);
        assert_eq!(session.grid().cells(), cells.as_slice());
    }

    #[test]
    fn test_no_spawn_when_board_fills_up() {
        // 2x2 board: Left merges the top row, the spawn takes the freed cell,
        // and the board is full again without a second spawn.
        let mut session = session_with_board(2, 16, vec![2, 2, 4, 8]);
        let result = session.apply_player_move(Direction::Left);
        assert!(result.moved);
        assert_eq!(session.grid().empty_count(), 0);
        assert_eq!(session.grid().cells()[0], 4);
    }

    #[test]
    fn test_goal_reached_flag() {
        let mut session = session_with_board(
            4,
            16,
            vec![8, 8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        );
        assert!(!session.goal_reached());
        let result = session.apply_player_move(Direction::Left);
        assert!(result.moved);
        assert!(result.goal_reached);
        assert_eq!(session.max_tile(), 16);
    }

    #[test]
    fn test_goal_is_a_win_condition_not_game_ending() {
        let mut session = session_with_board(
            4,
            16,
            vec![8, 8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        );
        let result = session.apply_player_move(Direction::Left);
        assert!(result.goal_reached);
        assert!(!result.terminal);
        // play continues past the goal
        let result = session.apply_player_move(Direction::Down);
        assert!(result.moved);
    }

    #[test]
    fn test_computer_move_is_noop_on_terminal_board() {
        let cells = vec![2, 4, 2, 4, 4, 2, 4, 2, 2, 4, 2, 4, 4, 2, 4, 2];
        let mut session = session_with_board(4, 2048, cells.clone());
        let result = session.apply_computer_move();
        assert!(!result.moved);
        assert!(result.terminal);
        assert_eq!(session.grid().cells(), cells.as_slice());
    }

    #[test]
    fn test_computer_move_picks_greedy_direction() {
        let mut session = session_with_board(
            4,
            2048,
            vec![2, 4, 0, 0, 2, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        );
        let result = session.apply_computer_move();
        assert!(result.moved);
        // Up merges both columns: two tiles remain plus one spawned
        assert_eq!(session.grid().empty_count(), 13);
    }

    #[test]
    fn test_computer_plays_until_terminal() {
        let mut session = Session::new(3, 16, 7).unwrap();
        let mut steps = 0;
        while !session.is_terminal() {
            let result = session.apply_computer_move();
            assert!(result.moved);
            steps += 1;
            assert!(steps < 10_000, "computer play did not terminate");
        }
        let result = session.apply_computer_move();
        assert!(!result.moved);
        assert!(result.terminal);
    }

    #[test]
    fn test_replace_grid_swaps_size_and_goal() {
        let mut session = Session::new(4, 2048, 0).unwrap();
        let loaded = Grid::from_parts(3, 64, vec![2, 0, 0, 0, 4, 0, 0, 0, 8], 1).unwrap();
        session.replace_grid(loaded);
        assert_eq!(session.grid().size(), 3);
        assert_eq!(session.goal(), 64);
        assert_eq!(session.score(), 14);
    }
}
