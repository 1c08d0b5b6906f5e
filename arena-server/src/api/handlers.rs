//! HTTP request handlers
//!
//! Each handler validates input, calls one engine operation, and (for
//! mutations) publishes the resulting delta on the channel.

use arena_common::model::{
    Comment, Match, MatchSpec, MatchStatus, RankingEntry, ReactionKind,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{error_response, identity, ErrorBody};
use crate::state::AppState;

type HandlerError = (StatusCode, Json<ErrorBody>);

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub kind: ReactionKind,
}

#[derive(Debug, Serialize)]
pub struct ReactionResponse {
    pub likes: u64,
    pub dislikes: u64,
    pub user_reaction: Option<ReactionKind>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub anonymous: bool,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub likes: u64,
    pub dislikes: u64,
    pub comments: Vec<Comment>,
    pub total_comments: usize,
}

#[derive(Debug, Deserialize)]
pub struct ListMatchesQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MatchListResponse {
    pub matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
pub struct RankingsQuery {
    pub category: String,
    pub subcategory: String,
    pub year: i32,
}

#[derive(Debug, Serialize)]
pub struct RankingsResponse {
    pub rankings: Vec<RankingEntry>,
    pub total: usize,
    pub category: String,
    pub subcategory: String,
    pub year: i32,
}

// ============================================================================
// Match Lifecycle
// ============================================================================

/// POST /matches - create a match and start running it
pub async fn create_match(
    State(state): State<AppState>,
    Json(spec): Json<MatchSpec>,
) -> Result<(StatusCode, Json<Match>), HandlerError> {
    let record = state
        .orchestrator
        .clone()
        .create(spec)
        .await
        .map_err(|e| error_response(&e))?;

    // Feedback can attach as soon as the match exists
    state.feedback.register(record.id).await;

    info!("Match {} created via API", record.id);
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /matches/:match_id - fetch one match record
pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> Result<Json<Match>, HandlerError> {
    let record = state
        .orchestrator
        .get(match_id)
        .await
        .map_err(|e| error_response(&e))?;
    Ok(Json(record))
}

/// GET /matches - list matches, optionally filtered by status
pub async fn list_matches(
    State(state): State<AppState>,
    Query(query): Query<ListMatchesQuery>,
) -> Result<Json<MatchListResponse>, HandlerError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<MatchStatus>)
        .transpose()
        .map_err(|e| error_response(&e))?;

    let matches = state.orchestrator.list(status).await;
    Ok(Json(MatchListResponse { matches }))
}

// ============================================================================
// Feedback
// ============================================================================

/// POST /matches/:match_id/reactions - toggle a like/dislike
pub async fn submit_reaction(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<ReactionRequest>,
) -> Result<Json<ReactionResponse>, HandlerError> {
    // Reactions are per-user toggles, so identity is always required
    let user_id = identity::require_identity(&headers).map_err(|e| error_response(&e))?;

    let reaction = state
        .feedback
        .react(match_id, &user_id, request.kind)
        .await
        .map_err(|e| error_response(&e))?;

    state
        .channel
        .publish_counts(match_id, reaction.counts.likes, reaction.counts.dislikes);

    Ok(Json(ReactionResponse {
        likes: reaction.counts.likes,
        dislikes: reaction.counts.dislikes,
        user_reaction: reaction.user_reaction,
    }))
}

/// POST /matches/:match_id/comments - append a comment
pub async fn submit_comment(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), HandlerError> {
    let identity = identity::identity_from_headers(&headers);

    let comment = state
        .feedback
        .comment(
            match_id,
            identity.as_deref(),
            &request.text,
            request.tags,
            request.anonymous,
        )
        .await
        .map_err(|e| error_response(&e))?;

    state.channel.publish_comment(match_id, comment.clone());

    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /matches/:match_id/feedback - feedback snapshot with paginated comments
pub async fn get_feedback(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Query(query): Query<FeedbackQuery>,
) -> Result<Json<FeedbackResponse>, HandlerError> {
    let snapshot = state
        .feedback
        .snapshot(match_id)
        .await
        .map_err(|e| error_response(&e))?;

    let total_comments = snapshot.comments.len();
    let offset = query.offset.unwrap_or(0).min(total_comments);
    let limit = query.limit.unwrap_or(total_comments);
    let comments = snapshot
        .comments
        .into_iter()
        .skip(offset)
        .take(limit)
        .collect();

    Ok(Json(FeedbackResponse {
        likes: snapshot.likes,
        dislikes: snapshot.dislikes,
        comments,
        total_comments,
    }))
}

// ============================================================================
// Rankings
// ============================================================================

/// GET /rankings - ordered ranking entries for one catalog scope
pub async fn get_rankings(
    State(state): State<AppState>,
    Query(query): Query<RankingsQuery>,
) -> Result<Json<RankingsResponse>, HandlerError> {
    let scope = arena_common::model::CatalogScope {
        category: query.category.clone(),
        subcategory: query.subcategory.clone(),
        year: query.year,
    };
    let rankings = state.ranking.rankings(&scope).await;

    Ok(Json(RankingsResponse {
        total: rankings.len(),
        rankings,
        category: query.category,
        subcategory: query.subcategory,
        year: query.year,
    }))
}
