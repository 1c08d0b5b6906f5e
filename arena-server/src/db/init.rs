//! Database initialization
//!
//! Creates the database file and schema on first run so the service starts
//! cleanly on an empty data directory.

use arena_common::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Initialize an in-memory database (tests)
pub async fn init_memory_database() -> Result<SqlitePool> {
    // A single connection keeps every query on the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables (idempotent)
async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_matches_table(pool).await?;
    create_match_comments_table(pool).await?;
    create_match_reactions_table(pool).await?;
    Ok(())
}

async fn create_matches_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            guid TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            agent1_guid TEXT NOT NULL,
            agent2_guid TEXT NOT NULL,
            judge_guid TEXT NOT NULL,
            papers TEXT NOT NULL,
            category TEXT NOT NULL,
            subcategory TEXT NOT NULL,
            year INTEGER NOT NULL,
            outcome TEXT,
            created_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_match_comments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS match_comments (
            match_guid TEXT NOT NULL,
            seq INTEGER NOT NULL,
            author TEXT,
            body TEXT NOT NULL,
            tags TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (match_guid, seq)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_match_reactions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS match_reactions (
            match_guid TEXT NOT NULL,
            user_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (match_guid, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_database_schema() {
        let pool = init_memory_database().await.unwrap();

        // Schema creation is idempotent
        create_schema(&pool).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM matches")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn test_file_database_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arena.db");
        let pool = init_database(&path).await.unwrap();
        drop(pool);
        assert!(path.exists());
    }
}
