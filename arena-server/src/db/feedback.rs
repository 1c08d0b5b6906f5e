//! Comment and reaction row queries

use arena_common::model::{Comment, ReactionKind};
use arena_common::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Append a comment row
pub async fn insert_comment(pool: &SqlitePool, comment: &Comment) -> Result<()> {
    let tags = serde_json::to_string(&comment.tags)
        .map_err(|e| Error::Internal(format!("Failed to encode tags: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO match_comments (match_guid, seq, author, body, tags, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.match_id.to_string())
    .bind(comment.seq as i64)
    .bind(comment.author.as_deref())
    .bind(&comment.text)
    .bind(tags)
    .bind(comment.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all comments for a match in sequence order
pub async fn load_comments(pool: &SqlitePool, match_id: Uuid) -> Result<Vec<Comment>> {
    let rows: Vec<(i64, Option<String>, String, String, String)> = sqlx::query_as(
        r#"
        SELECT seq, author, body, tags, created_at
        FROM match_comments
        WHERE match_guid = ?
        ORDER BY seq
        "#,
    )
    .bind(match_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(seq, author, body, tags, created_at)| {
            Ok(Comment {
                seq: seq as u64,
                match_id,
                author,
                text: body,
                tags: serde_json::from_str(&tags)
                    .map_err(|e| Error::Internal(format!("Invalid tags column: {}", e)))?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| Error::Internal(format!("Invalid timestamp column: {}", e)))?,
            })
        })
        .collect()
}

/// Insert or update a user's reaction row
pub async fn upsert_reaction(
    pool: &SqlitePool,
    match_id: Uuid,
    user_id: &str,
    kind: ReactionKind,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO match_reactions (match_guid, user_id, kind, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (match_guid, user_id)
        DO UPDATE SET kind = excluded.kind, updated_at = excluded.updated_at
        "#,
    )
    .bind(match_id.to_string())
    .bind(user_id)
    .bind(kind.to_string())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove a user's reaction row (toggle back to none)
pub async fn delete_reaction(pool: &SqlitePool, match_id: Uuid, user_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM match_reactions WHERE match_guid = ? AND user_id = ?")
        .bind(match_id.to_string())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Load all reaction rows for a match
pub async fn load_reactions(
    pool: &SqlitePool,
    match_id: Uuid,
) -> Result<Vec<(String, ReactionKind)>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT user_id, kind FROM match_reactions WHERE match_guid = ?",
    )
    .bind(match_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(user_id, kind)| Ok((user_id, kind.parse::<ReactionKind>()?)))
        .collect()
}
