use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use askme_core::posts::{
    CreatePostRequest, CreatePostResponse, GetPostResponse, RespondToPostRequest,
    RespondToPostResponse, VoteRequest, VoteResponse,
};

use super::{ApiError, ApiResult};
use crate::auth::CurrentUser;
use crate::AppState;

type Created<T> = Result<(StatusCode, Json<T>), ApiError>;

/// The author is always the caller; any `authorId` in the body is replaced.
pub async fn api_create_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(mut req): Json<CreatePostRequest>,
) -> Created<CreatePostResponse> {
    req.author_id = user_id;
    let created = state.posts.create_post(req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn api_create_poll(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(mut req): Json<CreatePostRequest>,
) -> Created<CreatePostResponse> {
    req.author_id = user_id;
    let created = state.posts.create_poll(req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn api_get_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> ApiResult<GetPostResponse> {
    Ok(Json(state.posts.get_post(&post_id).await?))
}

/// The voter is always the caller.
pub async fn api_vote(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(post_id): Path<String>,
    Json(mut req): Json<VoteRequest>,
) -> ApiResult<VoteResponse> {
    req.user_id = user_id;
    Ok(Json(state.posts.vote(&post_id, req).await?))
}

pub async fn api_respond(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(post_id): Path<String>,
    Json(mut req): Json<RespondToPostRequest>,
) -> Created<RespondToPostResponse> {
    req.user_id = user_id;
    let responded = state.posts.respond_to_post(&post_id, req).await?;
    Ok((StatusCode::CREATED, Json(responded)))
}
