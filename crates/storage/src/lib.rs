use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine::PlayedMove;
use registry::{GameStore, MoveLog};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite, Transaction,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    domain::{GameId, MoveRecord, Player},
    protocol::GameSummary,
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }
}

async fn insert_move(
    tx: &mut Transaction<'_, Sqlite>,
    game_id: GameId,
    sequence_number: i64,
    player: Player,
    column: usize,
    created_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO moves (game_id, player, "column", sequence_number, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(game_id.0)
    .bind(player_code(player))
    .bind(i64::try_from(column)?)
    .bind(sequence_number)
    .bind(created_at)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("failed to insert move {sequence_number} for game {game_id}"))?;
    Ok(())
}

fn player_code(player: Player) -> i64 {
    match player {
        Player::Red => 1,
        Player::Yellow => 2,
    }
}

fn player_from_code(code: i64) -> Result<Player> {
    match code {
        1 => Ok(Player::Red),
        2 => Ok(Player::Yellow),
        other => Err(anyhow!("unknown player code {other}")),
    }
}

fn move_from_row(row: &SqliteRow) -> Result<MoveRecord> {
    Ok(MoveRecord {
        sequence_number: u32::try_from(row.try_get::<i64, _>(0)?)?,
        player: player_from_code(row.try_get::<i64, _>(1)?)?,
        column: usize::try_from(row.try_get::<i64, _>(2)?)?,
        created_at: row.try_get::<DateTime<Utc>, _>(3)?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[async_trait]
impl MoveLog for Storage {
    async fn append_move(
        &self,
        game_id: GameId,
        column: usize,
        player: Player,
        played_at: DateTime<Utc>,
    ) -> Result<u32> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM games WHERE id = ?")
            .bind(game_id.0)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(anyhow!("game {game_id} not found"));
        }

        let sequence_number: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sequence_number), 0) + 1 FROM moves WHERE game_id = ?",
        )
        .bind(game_id.0)
        .fetch_one(&mut *tx)
        .await?;

        insert_move(&mut tx, game_id, sequence_number, player, column, played_at).await?;

        sqlx::query("UPDATE games SET updated_at = ? WHERE id = ?")
            .bind(played_at)
            .bind(game_id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(u32::try_from(sequence_number)?)
    }

    async fn list_moves(&self, game_id: GameId) -> Result<Vec<MoveRecord>> {
        let rows = sqlx::query(
            r#"SELECT sequence_number, player, "column", created_at
               FROM moves
               WHERE game_id = ?
               ORDER BY sequence_number ASC"#,
        )
        .bind(game_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(move_from_row).collect()
    }

    async fn delete_moves(&self, game_id: GameId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM moves WHERE game_id = ?")
            .bind(game_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl GameStore for Storage {
    async fn create_game(&self) -> Result<GameId> {
        self.insert_game_with_moves(&[]).await
    }

    async fn insert_game_with_moves(&self, moves: &[PlayedMove]) -> Result<GameId> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let rec = sqlx::query("INSERT INTO games (created_at, updated_at) VALUES (?, ?) RETURNING id")
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
        let game_id = GameId(rec.try_get::<i64, _>(0)?);

        for (sequence_number, played) in (1_i64..).zip(moves) {
            insert_move(
                &mut tx,
                game_id,
                sequence_number,
                played.player,
                played.column,
                played.played_at,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(game_id)
    }

    async fn game_exists(&self, game_id: GameId) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM games WHERE id = ?")
            .bind(game_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn delete_game(&self, game_id: GameId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM moves WHERE game_id = ?")
            .bind(game_id.0)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM games WHERE id = ?")
            .bind(game_id.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn list_games(&self) -> Result<Vec<GameSummary>> {
        let rows = sqlx::query(
            "SELECT g.id, g.created_at, g.updated_at, COUNT(m.id) AS moves_count
             FROM games g
             LEFT JOIN moves m ON m.game_id = g.id
             GROUP BY g.id, g.created_at, g.updated_at
             ORDER BY g.updated_at DESC, g.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| -> Result<GameSummary> {
                Ok(GameSummary {
                    id: GameId(r.try_get::<i64, _>(0)?),
                    created_at: r.try_get::<DateTime<Utc>, _>(1)?,
                    updated_at: r.try_get::<DateTime<Utc>, _>(2)?,
                    moves_count: u32::try_from(r.try_get::<i64, _>(3)?)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
