use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine::{Connect4, GameState, MoveError, PlayedMove};
use shared::{
    domain::{GameId, MoveRecord, Player},
    protocol::GameSummary,
};
use tracing::{debug, info, warn};

/// Append-only per-game move storage.
#[async_trait]
pub trait MoveLog: Send + Sync {
    /// Appends a move played at `played_at` and returns its sequence number
    /// (max + 1, starting at 1). Fails when `game_id` does not reference an
    /// existing game.
    async fn append_move(
        &self,
        game_id: GameId,
        column: usize,
        player: Player,
        played_at: DateTime<Utc>,
    ) -> Result<u32>;
    /// Moves for a game in ascending sequence order.
    async fn list_moves(&self, game_id: GameId) -> Result<Vec<MoveRecord>>;
    async fn delete_moves(&self, game_id: GameId) -> Result<u64>;
}

/// Game records plus their move logs.
#[async_trait]
pub trait GameStore: MoveLog {
    async fn create_game(&self) -> Result<GameId>;
    /// Inserts a game and its full move sequence atomically.
    async fn insert_game_with_moves(&self, moves: &[PlayedMove]) -> Result<GameId>;
    async fn game_exists(&self, game_id: GameId) -> Result<bool>;
    /// Removes the game and its moves. Returns false if nothing was deleted.
    async fn delete_game(&self, game_id: GameId) -> Result<bool>;
    /// Summaries ordered by most recently updated first.
    async fn list_games(&self) -> Result<Vec<GameSummary>>;
}

#[derive(Debug, thiserror::Error)]
pub enum PlayError {
    #[error(transparent)]
    Rejected(#[from] MoveError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl PlayError {
    pub fn rejection(&self) -> Option<MoveError> {
        match self {
            PlayError::Rejected(reason) => Some(*reason),
            PlayError::Store(_) => None,
        }
    }
}

/// Why a stored move could not be replayed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    #[error("expected sequence number {expected}, found {found}")]
    OutOfSequence { expected: u32, found: u32 },
    #[error("move recorded for {found:?} but {expected:?} was to move")]
    WrongPlayer { expected: Player, found: Player },
    #[error(transparent)]
    Rejected(#[from] MoveError),
}

/// A game in play, optionally bound to a persisted id.
///
/// Unsaved games only live in memory. Once bound, every move accepted through
/// [`Game::play`] is appended to the store before it is applied.
pub struct Game<S> {
    store: S,
    id: Option<GameId>,
    engine: Connect4,
    history: Vec<PlayedMove>,
}

impl<S: MoveLog> Game<S> {
    fn unsaved(store: S) -> Self {
        Self {
            store,
            id: None,
            engine: Connect4::new(),
            history: Vec::new(),
        }
    }

    fn bound(store: S, id: GameId) -> Self {
        Self {
            id: Some(id),
            ..Self::unsaved(store)
        }
    }

    pub fn id(&self) -> Option<GameId> {
        self.id
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    pub fn engine(&self) -> &Connect4 {
        &self.engine
    }

    pub fn state(&self) -> GameState {
        self.engine.state()
    }

    /// Moves applied to this instance, oldest first.
    pub fn moves(&self) -> &[PlayedMove] {
        &self.history
    }

    pub fn validate_move(&self, column: i64) -> Result<usize, MoveError> {
        self.engine.validate_move(column)
    }

    /// Apply a move and, for a saved game, append it to the move log.
    ///
    /// The append happens before the board changes, so a storage failure
    /// leaves the in-memory game as it was.
    pub async fn play(&mut self, column: i64) -> Result<PlayedMove, PlayError> {
        let col = self.engine.validate_move(column)?;
        let player = self.engine.current_player();
        let played_at = Utc::now();

        if let Some(game_id) = self.id {
            let sequence = self
                .store
                .append_move(game_id, col, player, played_at)
                .await?;
            debug!(%game_id, sequence, column = col, player = player.name(), "move appended");
        }

        let played = self.engine.apply_move_at(column, played_at)?;
        self.history.push(played);
        Ok(played)
    }

    /// Apply a stored move without writing anything back. The move keeps its
    /// recorded timestamp.
    pub fn replay_move(&mut self, record: &MoveRecord) -> Result<PlayedMove, ReplayError> {
        let expected = self.history.len() as u32 + 1;
        if record.sequence_number != expected {
            return Err(ReplayError::OutOfSequence {
                expected,
                found: record.sequence_number,
            });
        }

        let to_move = self.engine.current_player();
        if !self.engine.is_finished() && record.player != to_move {
            return Err(ReplayError::WrongPlayer {
                expected: to_move,
                found: record.player,
            });
        }

        let column = i64::try_from(record.column).map_err(|_| MoveError::ColumnOutOfRange)?;
        let played = self.engine.apply_move_at(column, record.created_at)?;
        self.history.push(played);
        Ok(played)
    }

    /// Start over with an empty board.
    ///
    /// The persisted log is left alone and the game is detached from it, so
    /// later moves cannot be appended after the old sequence.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.history.clear();
        if let Some(game_id) = self.id.take() {
            info!(%game_id, "game reset and detached from its move log");
        }
    }

    /// Persisted move log for this game; empty for unsaved games.
    pub async fn move_history(&self) -> Result<Vec<MoveRecord>> {
        match self.id {
            Some(game_id) => self.store.list_moves(game_id).await,
            None => Ok(Vec::new()),
        }
    }
}

impl<S> fmt::Display for Game<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.engine, f)
    }
}

#[derive(Clone)]
pub struct GameRegistry<S> {
    store: S,
}

impl<S: GameStore + Clone> GameRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fresh game that exists only in memory until [`GameRegistry::save`].
    pub fn new_game(&self) -> Game<S> {
        Game::unsaved(self.store.clone())
    }

    /// Fresh game persisted immediately with no moves.
    pub async fn create(&self) -> Result<Game<S>> {
        let game_id = self.store.create_game().await?;
        info!(%game_id, "game created");
        Ok(Game::bound(self.store.clone(), game_id))
    }

    /// Persist an unsaved game together with the moves it has played so far,
    /// in the order they were played. Saved games keep their id.
    pub async fn save(&self, game: &mut Game<S>) -> Result<GameId> {
        if let Some(game_id) = game.id {
            return Ok(game_id);
        }

        let game_id = self.store.insert_game_with_moves(&game.history).await?;
        game.id = Some(game_id);
        info!(%game_id, moves = game.history.len(), "game saved");
        Ok(game_id)
    }

    /// Rebuild a game by replaying its move log. `None` when the game does not
    /// exist or its log no longer replays cleanly.
    pub async fn load(&self, game_id: GameId) -> Result<Option<Game<S>>> {
        if !self.store.game_exists(game_id).await? {
            return Ok(None);
        }

        let records = self.store.list_moves(game_id).await?;
        let mut game = Game::bound(self.store.clone(), game_id);
        for record in &records {
            if let Err(error) = game.replay_move(record) {
                warn!(
                    %game_id,
                    sequence = record.sequence_number,
                    %error,
                    "stored move log failed to replay"
                );
                return Ok(None);
            }
        }

        debug!(%game_id, moves = records.len(), "game loaded");
        Ok(Some(game))
    }

    pub async fn list(&self) -> Result<Vec<GameSummary>> {
        self.store.list_games().await
    }

    pub async fn delete(&self, game_id: GameId) -> Result<bool> {
        let deleted = self.store.delete_game(game_id).await?;
        if deleted {
            info!(%game_id, "game deleted");
        }
        Ok(deleted)
    }

    /// Stored move log, `None` for unknown games.
    pub async fn history(&self, game_id: GameId) -> Result<Option<Vec<MoveRecord>>> {
        if !self.store.game_exists(game_id).await? {
            return Ok(None);
        }
        Ok(Some(self.store.list_moves(game_id).await?))
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
