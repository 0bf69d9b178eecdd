use engine::GameState;
use registry::{GameRegistry, PlayError};
use serde::Serialize;
use shared::{
    domain::GameId,
    error::{ApiError, ErrorCode},
    protocol::{GameSummary, MoveHistoryResponse},
};
use storage::Storage;
use tracing::{debug, info};

#[derive(Clone)]
pub struct ApiContext {
    pub registry: GameRegistry<Storage>,
}

impl ApiContext {
    pub fn new(storage: Storage) -> Self {
        Self {
            registry: GameRegistry::new(storage),
        }
    }

    pub fn storage(&self) -> &Storage {
        self.registry.store()
    }
}

/// A game's id next to its serialized state.
#[derive(Debug, Clone, Serialize)]
pub struct GameView {
    pub id: GameId,
    #[serde(flatten)]
    pub state: GameState,
}

pub async fn create_game(ctx: &ApiContext) -> Result<GameView, ApiError> {
    let game = ctx.registry.create().await.map_err(internal)?;
    let id = game
        .id()
        .ok_or_else(|| ApiError::new(ErrorCode::Internal, "created game has no id"))?;
    Ok(GameView {
        id,
        state: game.state(),
    })
}

pub async fn fetch_game(ctx: &ApiContext, game_id: GameId) -> Result<GameView, ApiError> {
    let game = ctx
        .registry
        .load(game_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| game_not_found(game_id))?;
    Ok(GameView {
        id: game_id,
        state: game.state(),
    })
}

pub async fn submit_move(
    ctx: &ApiContext,
    game_id: GameId,
    column: i64,
) -> Result<GameView, ApiError> {
    let mut game = ctx
        .registry
        .load(game_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| game_not_found(game_id))?;

    match game.play(column).await {
        Ok(played) => {
            debug!(%game_id, column = played.column, row = played.row, "move accepted");
        }
        Err(PlayError::Rejected(reason)) => {
            debug!(%game_id, column, %reason, "move rejected");
            return Err(ApiError::validation(reason.to_string()));
        }
        Err(PlayError::Store(err)) => return Err(internal(err)),
    }

    let state = game.state();
    if let Some(winner) = state.winner {
        info!(%game_id, winner = winner.name(), "game won");
    }
    Ok(GameView { id: game_id, state })
}

pub async fn list_games(ctx: &ApiContext) -> Result<Vec<GameSummary>, ApiError> {
    ctx.registry.list().await.map_err(internal)
}

pub async fn delete_game(ctx: &ApiContext, game_id: GameId) -> Result<(), ApiError> {
    if ctx.registry.delete(game_id).await.map_err(internal)? {
        Ok(())
    } else {
        Err(game_not_found(game_id))
    }
}

pub async fn move_history(
    ctx: &ApiContext,
    game_id: GameId,
) -> Result<MoveHistoryResponse, ApiError> {
    let moves = ctx
        .registry
        .history(game_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| game_not_found(game_id))?;
    Ok(MoveHistoryResponse { game_id, moves })
}

fn game_not_found(game_id: GameId) -> ApiError {
    ApiError::not_found(format!("game {game_id} not found"))
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}
