use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{GameId, MoveRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub id: GameId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub moves_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitMoveRequest {
    #[serde(alias = "move")]
    pub column: serde_json::Number,
}

impl SubmitMoveRequest {
    /// Requested column as an integer. Fractional or out-of-`i64` numbers map
    /// to -1 so they are rejected as out of range.
    pub fn column_index(&self) -> i64 {
        self.column.as_i64().unwrap_or(-1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveHistoryResponse {
    pub game_id: GameId,
    pub moves: Vec<MoveRecord>,
}
