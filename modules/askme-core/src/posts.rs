//! Post creation with AI tagging, reading posts, poll votes and responses.
//!
//! Responses are what the feed ranker learns from: every `RESPONDED` edge
//! written here feeds the responder's behavioral signal.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;
use futures::try_join;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use askme_common::{
    now_millis, AiRawData, AskmeError, Post, PostCategory, PostDepth, PostType,
};

use crate::tags::TagResolver;
use crate::traits::PostStore;

/// Origin recorded on tag edges produced by the classifier.
pub const AI_TAG_SOURCE: &str = "ai";

const MIN_POLL_OPTIONS: usize = 2;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(default)]
    pub author_id: String,
    pub text: String,
    #[serde(default)]
    pub poll_options: Vec<String>,
    #[serde(default)]
    pub ai_raw: AiRawData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostResponse {
    pub id: String,
    pub category: PostCategory,
    pub depth: PostDepth,
    pub tags: Vec<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondToPostRequest {
    #[serde(default)]
    pub user_id: String,
    pub text: String,
    /// Chat the response was delivered through, if one exists yet.
    #[serde(default)]
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondToPostResponse {
    pub post_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    pub created_at: i64,
}

/// A post together with the keys of its tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPostResponse {
    #[serde(flatten)]
    pub post: Post,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[serde(default)]
    pub user_id: String,
    pub option: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub post_id: String,
    pub option: String,
    /// Current tally including this vote. Every poll option is present.
    pub votes: BTreeMap<String, i64>,
}

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostStore>,
    tags: TagResolver,
}

impl PostService {
    pub fn new(store: Arc<dyn PostStore>, tags: TagResolver) -> Self {
        Self { store, tags }
    }

    pub async fn create_post(&self, req: CreatePostRequest) -> Result<CreatePostResponse, AskmeError> {
        self.create(req, PostType::Text).await
    }

    pub async fn create_poll(&self, req: CreatePostRequest) -> Result<CreatePostResponse, AskmeError> {
        let options = req
            .poll_options
            .iter()
            .filter(|o| !o.trim().is_empty())
            .count();
        if options < MIN_POLL_OPTIONS {
            return Err(AskmeError::InvalidInput(format!(
                "poll needs at least {MIN_POLL_OPTIONS} options, got {options}"
            )));
        }
        self.create(req, PostType::Poll).await
    }

    async fn create(
        &self,
        req: CreatePostRequest,
        post_type: PostType,
    ) -> Result<CreatePostResponse, AskmeError> {
        if req.author_id.trim().is_empty() {
            return Err(AskmeError::InvalidInput("authorId is required".into()));
        }
        if req.text.trim().is_empty() {
            return Err(AskmeError::InvalidInput("text is required".into()));
        }

        let ai = req.ai_raw;
        let post = Post {
            id: Uuid::new_v4().to_string(),
            author_id: req.author_id,
            post_type,
            text: req.text,
            poll_options: match post_type {
                PostType::Poll => req
                    .poll_options
                    .into_iter()
                    .filter(|o| !o.trim().is_empty())
                    .collect(),
                PostType::Text => Vec::new(),
            },
            category: PostCategory::normalize(&ai.category),
            intent: ai.intent,
            depth: PostDepth::normalize(&ai.depth),
            created_at: now_millis(),
        };

        let id = self.store.create_post(&post).await?;

        let (_, tags) = try_join!(
            async {
                self.store
                    .create_created_edge(&post.author_id, &id, post.created_at)
                    .await
                    .map_err(AskmeError::from)
            },
            self.attach_tags(&id, &ai.tags, ai.confidence),
        )?;

        info!(
            post_id = id.as_str(),
            author_id = post.author_id.as_str(),
            post_type = %post_type,
            category = %post.category,
            tags = tags.len(),
            "Post created"
        );

        Ok(CreatePostResponse {
            id,
            category: post.category,
            depth: post.depth,
            tags,
            created_at: post.created_at,
        })
    }

    async fn attach_tags(
        &self,
        post_id: &str,
        raw_tags: &[String],
        confidence: f64,
    ) -> Result<Vec<String>, AskmeError> {
        let keys = self.tags.resolve_batch(raw_tags).await?;
        try_join_all(keys.iter().map(|key| {
            self.store
                .create_post_has_tag_edge(post_id, key, confidence, AI_TAG_SOURCE)
        }))
        .await?;
        Ok(keys)
    }

    pub async fn get_post(&self, post_id: &str) -> Result<GetPostResponse, AskmeError> {
        let (post, tags) = try_join!(
            self.store.get_post(post_id),
            self.store.post_tags(post_id),
        )?;
        let post = post.ok_or_else(|| AskmeError::NotFound(format!("post {post_id}")))?;
        Ok(GetPostResponse { post, tags })
    }

    /// Record one vote per user on a poll and return the updated tally.
    pub async fn vote(&self, post_id: &str, req: VoteRequest) -> Result<VoteResponse, AskmeError> {
        if req.user_id.trim().is_empty() {
            return Err(AskmeError::InvalidInput("userId is required".into()));
        }

        let (post, already) = try_join!(
            self.store.get_post(post_id),
            self.store.has_user_voted(&req.user_id, post_id),
        )?;
        let post = post.ok_or_else(|| AskmeError::NotFound(format!("post {post_id}")))?;
        if post.post_type != PostType::Poll {
            return Err(AskmeError::InvalidInput(format!("post {post_id} is not a poll")));
        }
        if !post.poll_options.iter().any(|o| *o == req.option) {
            return Err(AskmeError::InvalidInput(format!(
                "invalid poll option {:?}",
                req.option
            )));
        }
        if already {
            return Err(AskmeError::AlreadyExists(format!(
                "user {} already voted on post {post_id}",
                req.user_id
            )));
        }

        self.store
            .create_voted_edge(&req.user_id, post_id, &req.option, now_millis())
            .await?;

        let mut votes: BTreeMap<String, i64> =
            post.poll_options.iter().map(|o| (o.clone(), 0)).collect();
        for (option, n) in self.store.vote_counts(post_id).await? {
            if let Some(count) = votes.get_mut(&option) {
                *count = n;
            }
        }

        info!(
            post_id,
            user_id = req.user_id.as_str(),
            option = req.option.as_str(),
            "Voted on poll"
        );

        Ok(VoteResponse {
            post_id: post_id.to_string(),
            option: req.option,
            votes,
        })
    }

    pub async fn respond_to_post(
        &self,
        post_id: &str,
        req: RespondToPostRequest,
    ) -> Result<RespondToPostResponse, AskmeError> {
        if req.user_id.trim().is_empty() {
            return Err(AskmeError::InvalidInput("userId is required".into()));
        }
        if req.text.trim().is_empty() {
            return Err(AskmeError::InvalidInput("text is required".into()));
        }

        let (post, already) = try_join!(
            self.store.get_post(post_id),
            self.store.has_user_responded(&req.user_id, post_id),
        )?;
        if post.is_none() {
            return Err(AskmeError::NotFound(format!("post {post_id}")));
        }
        if already {
            return Err(AskmeError::AlreadyExists(format!(
                "user {} already responded to post {post_id}",
                req.user_id
            )));
        }

        let created_at = now_millis();
        let chat_id = req.chat_id.filter(|c| !c.is_empty());
        self.store
            .create_responded_edge(
                &req.user_id,
                post_id,
                chat_id.as_deref().unwrap_or_default(),
                created_at,
            )
            .await?;

        info!(
            post_id,
            user_id = req.user_id.as_str(),
            chat_id = chat_id.as_deref().unwrap_or(""),
            "Responded to post"
        );

        Ok(RespondToPostResponse {
            post_id: post_id.to_string(),
            chat_id,
            created_at,
        })
    }
}
