//! Connect-4 rules: board representation, move validation and application,
//! win and draw detection. Pure in-memory state with no I/O.

mod board;
mod game;

pub use board::{Board, COLS, ROWS};
pub use game::{Connect4, GameState, MoveError, PlayedMove};
pub use shared::domain::{Cell, GameStatus, Player, Position};
