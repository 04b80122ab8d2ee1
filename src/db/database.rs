//! SQLite connection management and schema setup.

use std::path::Path;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;

use crate::error::Result;

/// Open (creating if missing) the database at `path` and ensure the schema
/// exists. The parent directory is created as needed.
pub async fn init_database(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| crate::AgoraError::Config(format!("cannot create {parent:?}: {e}")))?;
    }

    tracing::info!("Opening database at {}", path.display());

    let options = SqliteConnectOptions::new()
        .create_if_missing(true)
        .filename(path);
    let pool = SqlitePool::connect_with(options).await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// In-memory database for tests.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePool::connect("sqlite::memory:").await?;
    init_schema(&pool).await?;
    Ok(pool)
}

async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS debates (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            topic TEXT NOT NULL,
            format TEXT NOT NULL,
            participants TEXT NOT NULL,
            user_participating INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS debate_turns (
            id TEXT PRIMARY KEY,
            debate_id TEXT NOT NULL REFERENCES debates(id),
            character_id TEXT,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            turn_number INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Turn numbers are assigned inside the insert itself; this index makes a
    // lost race a constraint violation instead of a duplicate number.
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_turns_debate_number
         ON debate_turns(debate_id, turn_number)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_turns_debate ON debate_turns(debate_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS character_memory (
            debate_id TEXT NOT NULL REFERENCES debates(id),
            character_id TEXT NOT NULL,
            working_memory TEXT NOT NULL,
            episodic_summary TEXT NOT NULL DEFAULT '',
            updated_at TEXT NOT NULL,
            PRIMARY KEY (debate_id, character_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
