use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::{Cell, GameStatus, Player, Position};

use crate::board::{Board, COLS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("Game is already finished")]
    GameFinished,
    #[error("Column must be between 0 and {}", COLS - 1)]
    ColumnOutOfRange,
    #[error("Column is full")]
    ColumnFull,
}

/// A piece that has been placed on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedMove {
    pub player: Player,
    pub column: usize,
    pub row: usize,
    pub played_at: DateTime<Utc>,
}

/// Snapshot of everything a client needs to render a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub current_player: Player,
    pub status: GameStatus,
    pub winner: Option<Player>,
    pub last_move: Option<PlayedMove>,
    pub winning_positions: Option<Vec<Position>>,
}

impl GameState {
    pub fn initial() -> Self {
        GameState {
            board: Board::new(),
            current_player: Player::Red, // Red starts
            status: GameStatus::InProgress,
            winner: None,
            last_move: None,
            winning_positions: None,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Rules engine for a single game.
#[derive(Debug, Clone, Default)]
pub struct Connect4 {
    state: GameState,
}

impl Connect4 {
    pub fn new() -> Self {
        Self {
            state: GameState::initial(),
        }
    }

    /// Copy of the full game state, detached from the engine.
    pub fn state(&self) -> GameState {
        self.state.clone()
    }

    pub fn board(&self) -> &Board {
        &self.state.board
    }

    pub fn current_player(&self) -> Player {
        self.state.current_player
    }

    pub fn status(&self) -> GameStatus {
        self.state.status
    }

    pub fn winner(&self) -> Option<Player> {
        self.state.winner
    }

    pub fn last_move(&self) -> Option<&PlayedMove> {
        self.state.last_move.as_ref()
    }

    pub fn winning_positions(&self) -> Option<&[Position]> {
        self.state.winning_positions.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.state.status != GameStatus::InProgress
    }

    pub fn piece_at(&self, row: usize, col: usize) -> Option<Cell> {
        self.state.board.get(row, col)
    }

    /// Columns that can still take a piece, ascending.
    pub fn available_moves(&self) -> Vec<usize> {
        self.state.board.available_columns()
    }

    /// Check a move without touching state. On success returns the column as a
    /// board index.
    ///
    /// Checks run in a fixed order so the reported reason is deterministic:
    /// finished game, then column range, then full column.
    pub fn validate_move(&self, column: i64) -> Result<usize, MoveError> {
        if self.is_finished() {
            return Err(MoveError::GameFinished);
        }

        let col = usize::try_from(column)
            .ok()
            .filter(|&col| col < COLS)
            .ok_or(MoveError::ColumnOutOfRange)?;

        if self.state.board.is_column_full(col) {
            return Err(MoveError::ColumnFull);
        }

        Ok(col)
    }

    /// Drop the current player's piece into `column`, stamped with the current
    /// time.
    ///
    /// An invalid move leaves the engine untouched. A valid one either ends the
    /// game (win or draw) or hands the turn to the other player.
    pub fn apply_move(&mut self, column: i64) -> Result<PlayedMove, MoveError> {
        self.apply_move_at(column, Utc::now())
    }

    /// Same as [`Connect4::apply_move`] with an explicit timestamp, used when a
    /// move already has a recorded time.
    pub fn apply_move_at(
        &mut self,
        column: i64,
        played_at: DateTime<Utc>,
    ) -> Result<PlayedMove, MoveError> {
        let col = self.validate_move(column)?;
        let player = self.state.current_player;
        let row = self
            .state
            .board
            .drop_piece(col, player)
            .ok_or(MoveError::ColumnFull)?;

        let played = PlayedMove {
            player,
            column: col,
            row,
            played_at,
        };
        self.state.last_move = Some(played);

        if let Some(line) = self.state.board.winning_line(row, col) {
            self.state.status = GameStatus::Won;
            self.state.winner = Some(player);
            self.state.winning_positions = Some(line);
        } else if self.state.board.is_top_row_full() {
            self.state.status = GameStatus::Draw;
        } else {
            self.state.current_player = player.other();
        }

        Ok(played)
    }

    pub fn reset(&mut self) {
        self.state = GameState::initial();
    }
}

impl fmt::Display for Connect4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.state.board, f)
    }
}

#[cfg(test)]
#[path = "tests/game_tests.rs"]
mod tests;
