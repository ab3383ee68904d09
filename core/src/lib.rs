//! # twenty48 Core Engine
//!
//! A pure Rust implementation of a configurable 2048: the board size and the
//! winning tile are chosen at construction time. Randomness is deterministic
//! and seedable for reproducible games. No I/O lives in this crate; console
//! shells, storage, and leaderboards are external collaborators.
//!
//! ## Example
//!
//! ```rust
//! use twenty48_core::{Direction, Session};
//!
//! let mut session = Session::new(4, 2048, 42).unwrap();
//! let result = session.apply_player_move(Direction::Left);
//! println!("Score: {}, Changed: {}", session.score(), result.moved);
//! ```

mod error;
mod grid;
mod session;

pub use error::GridError;
pub use grid::{Direction, Grid};
pub use session::{MoveResult, Session};
