use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use askme_core::traits::{FeedStore, PostStore, TagStore};
use askme_core::{FeedRanker, PostService, TagResolver};
use askme_graph::{FeedGraph, GraphClient, PostGraph, TagGraph};

pub mod auth;
pub mod rest;

pub struct AppState {
    pub tags: TagResolver,
    pub feed: FeedRanker,
    pub posts: PostService,
}

impl AppState {
    pub fn new(
        tag_store: Arc<dyn TagStore>,
        feed_store: Arc<dyn FeedStore>,
        post_store: Arc<dyn PostStore>,
    ) -> Self {
        let tags = TagResolver::new(tag_store);
        Self {
            feed: FeedRanker::new(feed_store),
            posts: PostService::new(post_store, tags.clone()),
            tags,
        }
    }

    pub fn from_graph(client: GraphClient) -> Self {
        Self::new(
            Arc::new(TagGraph::new(client.clone())),
            Arc::new(FeedGraph::new(client.clone())),
            Arc::new(PostGraph::new(client)),
        )
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Feed
        .route("/me/feed", get(rest::api_feed))
        // Tags
        .route("/tags", get(rest::api_tags))
        .route("/tags/{key}", get(rest::api_tag_detail))
        // Posts
        .route("/posts", post(rest::posts::api_create_post))
        .route("/posts/poll", post(rest::posts::api_create_poll))
        .route("/posts/{id}", get(rest::posts::api_get_post))
        .route("/posts/{id}/vote", post(rest::posts::api_vote))
        .route("/posts/{id}/respond", post(rest::posts::api_respond))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Feeds are per-viewer; never cache them
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Logging layer: method + path only (no query params, no user id)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
