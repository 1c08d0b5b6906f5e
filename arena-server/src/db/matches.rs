//! Match record queries

use arena_common::model::{CatalogScope, Match, MatchOutcome, MatchStatus};
use arena_common::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Insert or replace a match record
///
/// Called on every status transition; the in-memory record is the source
/// of truth and this mirrors it.
pub async fn upsert_match(pool: &SqlitePool, record: &Match) -> Result<()> {
    let papers = serde_json::to_string(&record.papers)
        .map_err(|e| Error::Internal(format!("Failed to encode papers: {}", e)))?;
    let outcome = record
        .outcome
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to encode outcome: {}", e)))?;

    sqlx::query(
        r#"
        INSERT OR REPLACE INTO matches
        (guid, status, agent1_guid, agent2_guid, judge_guid, papers,
         category, subcategory, year, outcome, created_at, completed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(record.status.to_string())
    .bind(record.agent1_id.to_string())
    .bind(record.agent2_id.to_string())
    .bind(record.judge_id.to_string())
    .bind(papers)
    .bind(&record.scope.category)
    .bind(&record.scope.subcategory)
    .bind(record.scope.year)
    .bind(outcome)
    .bind(record.created_at.to_rfc3339())
    .bind(record.completed_at.map(|t| t.to_rfc3339()))
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all match records
pub async fn load_matches(pool: &SqlitePool) -> Result<Vec<Match>> {
    type Row = (
        String,
        String,
        String,
        String,
        String,
        String,
        String,
        String,
        i64,
        Option<String>,
        String,
        Option<String>,
    );

    let rows: Vec<Row> = sqlx::query_as(
        r#"
        SELECT guid, status, agent1_guid, agent2_guid, judge_guid, papers,
               category, subcategory, year, outcome, created_at, completed_at
        FROM matches
        ORDER BY created_at
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_match).collect()
}

fn row_to_match(row: (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    i64,
    Option<String>,
    String,
    Option<String>,
)) -> Result<Match> {
    let (
        guid,
        status,
        agent1,
        agent2,
        judge,
        papers,
        category,
        subcategory,
        year,
        outcome,
        created_at,
        completed_at,
    ) = row;

    let outcome: Option<MatchOutcome> = outcome
        .map(|text| serde_json::from_str(&text))
        .transpose()
        .map_err(|e| Error::Internal(format!("Invalid outcome column: {}", e)))?;

    Ok(Match {
        id: parse_uuid(&guid)?,
        status: status.parse::<MatchStatus>()?,
        agent1_id: parse_uuid(&agent1)?,
        agent2_id: parse_uuid(&agent2)?,
        judge_id: parse_uuid(&judge)?,
        papers: serde_json::from_str(&papers)
            .map_err(|e| Error::Internal(format!("Invalid papers column: {}", e)))?,
        scope: CatalogScope {
            category,
            subcategory,
            year: year as i32,
        },
        outcome,
        created_at: parse_timestamp(&created_at)?,
        completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn parse_uuid(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).map_err(|e| Error::Internal(format!("Invalid UUID column: {}", e)))
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid timestamp column: {}", e)))
}
