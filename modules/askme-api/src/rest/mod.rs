pub mod posts;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::warn;

use askme_common::{AskmeError, FeedPage, Tag};
use askme_core::FeedQuery;

use crate::auth::CurrentUser;
use crate::AppState;

// --- Errors ---

/// Maps the service error taxonomy onto HTTP statuses with a JSON body.
#[derive(Debug)]
pub struct ApiError(pub AskmeError);

impl From<AskmeError> for ApiError {
    fn from(err: AskmeError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AskmeError::NotFound(_) => StatusCode::NOT_FOUND,
            AskmeError::AlreadyExists(_) => StatusCode::CONFLICT,
            AskmeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AskmeError::Store(_) | AskmeError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = if status.is_server_error() {
            warn!(error = %self.0, "Request failed");
            "internal error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

// --- Query structs ---

#[derive(Deserialize)]
pub struct FeedParams {
    limit: Option<i64>,
    cursor: Option<String>,
    category: Option<String>,
    depth: Option<String>,
}

#[derive(Deserialize)]
pub struct TagsParams {
    limit: Option<i64>,
    offset: Option<i64>,
    q: Option<String>,
}

// --- Handlers ---

pub async fn api_feed(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(params): Query<FeedParams>,
) -> ApiResult<FeedPage> {
    let query = FeedQuery {
        user_id,
        limit: params.limit,
        cursor: params.cursor,
        category: params.category,
        depth: params.depth,
    };
    Ok(Json(state.feed.get_feed(query).await?))
}

pub async fn api_tags(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TagsParams>,
) -> ApiResult<Vec<Tag>> {
    let tags = match params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => state.tags.search_tags(q, params.limit).await?,
        None => state.tags.list_tags(params.limit, params.offset).await?,
    };
    Ok(Json(tags))
}

pub async fn api_tag_detail(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Tag> {
    Ok(Json(state.tags.get_tag(&key).await?))
}
