use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use server_api::{
    create_game, delete_game, fetch_game, list_games, move_history, submit_move, ApiContext,
    GameView,
};
use shared::{
    domain::GameId,
    error::{ApiError, ErrorCode},
    protocol::{GameSummary, MoveHistoryResponse, SubmitMoveRequest},
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

mod config;

use config::{load_settings, normalize_database_url};

const MAX_BODY_BYTES: usize = 16 * 1024;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

type HttpError = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = load_settings();
    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();

    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext::new(storage),
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, %database_url, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/games", get(http_list_games).post(http_create_game))
        .route(
            "/api/games/:game_id",
            get(http_fetch_game).delete(http_delete_game),
        )
        .route(
            "/api/games/:game_id/moves",
            get(http_move_history).post(http_submit_move),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn http_error(err: ApiError) -> HttpError {
    if matches!(err.code, ErrorCode::Internal) {
        error!(message = %err.message, "request failed");
    }
    (status_for(err.code), Json(err))
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, HttpError> {
    state.api.storage().health_check().await.map_err(|e| {
        http_error(ApiError::new(ErrorCode::Internal, e.to_string()))
    })?;
    Ok("ok")
}

async fn http_list_games(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GameSummary>>, HttpError> {
    let games = list_games(&state.api).await.map_err(http_error)?;
    Ok(Json(games))
}

async fn http_create_game(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<GameView>), HttpError> {
    let view = create_game(&state.api).await.map_err(http_error)?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn http_fetch_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<i64>,
) -> Result<Json<GameView>, HttpError> {
    let view = fetch_game(&state.api, GameId(game_id))
        .await
        .map_err(http_error)?;
    Ok(Json(view))
}

async fn http_delete_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    delete_game(&state.api, GameId(game_id))
        .await
        .map_err(http_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn http_submit_move(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<i64>,
    Json(req): Json<SubmitMoveRequest>,
) -> Result<Json<GameView>, HttpError> {
    let view = submit_move(&state.api, GameId(game_id), req.column_index())
        .await
        .map_err(http_error)?;
    Ok(Json(view))
}

async fn http_move_history(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<i64>,
) -> Result<Json<MoveHistoryResponse>, HttpError> {
    let history = move_history(&state.api, GameId(game_id))
        .await
        .map_err(http_error)?;
    Ok(Json(history))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
