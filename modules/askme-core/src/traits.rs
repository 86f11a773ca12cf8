// Trait abstractions over the graph store.
//
// TagStore:  canonical tag lookups and writes (tag resolver only).
// FeedStore: read-only behavioral signal, candidate and chat-context queries.
// PostStore: post documents and their edges.
//
// Each is implemented by the matching askme-graph type and by
// testing::MockGraph, so services run in tests without Neo4j.

use async_trait::async_trait;

use askme_common::{CandidatePost, Chat, Message, Post, PostCategory, PostDepth, Tag};
use askme_graph::{FeedGraph, PostGraph, StoreError, TagGraph};

// ---------------------------------------------------------------------------
// TagStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TagStore: Send + Sync {
    /// Tag whose aliases contain `text` or whose label equals it, ignoring case.
    async fn find_tag_by_alias_or_label(&self, text: &str) -> Result<Option<Tag>, StoreError>;

    async fn find_tag_by_key(&self, key: &str) -> Result<Option<Tag>, StoreError>;

    /// Must fail with `StoreError::DuplicateKey` when the key is already taken.
    async fn create_tag(&self, tag: &Tag) -> Result<String, StoreError>;

    async fn increment_tag_usage(&self, key: &str) -> Result<(), StoreError>;

    async fn list_tags(&self, limit: u32, offset: u32) -> Result<Vec<Tag>, StoreError>;

    async fn search_tags(&self, text: &str, limit: u32) -> Result<Vec<Tag>, StoreError>;
}

#[async_trait]
impl TagStore for TagGraph {
    async fn find_tag_by_alias_or_label(&self, text: &str) -> Result<Option<Tag>, StoreError> {
        self.find_by_alias_or_label(text).await
    }

    async fn find_tag_by_key(&self, key: &str) -> Result<Option<Tag>, StoreError> {
        self.find_by_key(key).await
    }

    async fn create_tag(&self, tag: &Tag) -> Result<String, StoreError> {
        self.create(tag).await
    }

    async fn increment_tag_usage(&self, key: &str) -> Result<(), StoreError> {
        self.increment_usage(key).await
    }

    async fn list_tags(&self, limit: u32, offset: u32) -> Result<Vec<Tag>, StoreError> {
        self.list_by_usage(limit, offset).await
    }

    async fn search_tags(&self, text: &str, limit: u32) -> Result<Vec<Tag>, StoreError> {
        self.search(text, limit).await
    }
}

// ---------------------------------------------------------------------------
// FeedStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FeedStore: Send + Sync {
    // --- Behavioral signal ---

    async fn responded_posts_for_user(&self, user_id: &str) -> Result<Vec<String>, StoreError>;

    async fn tags_for_posts(&self, post_ids: &[String]) -> Result<Vec<String>, StoreError>;

    /// Most frequent first.
    async fn category_frequency(
        &self,
        user_id: &str,
    ) -> Result<Vec<(PostCategory, i64)>, StoreError>;

    /// Most frequent first.
    async fn intent_frequency(&self, user_id: &str) -> Result<Vec<(String, i64)>, StoreError>;

    // --- Candidates ---

    async fn candidate_posts(
        &self,
        category: Option<PostCategory>,
        depth: Option<PostDepth>,
    ) -> Result<Vec<CandidatePost>, StoreError>;

    // --- Chat context ---

    async fn existing_chat(&self, post_id: &str, user_id: &str)
        -> Result<Option<Chat>, StoreError>;

    async fn last_message(&self, chat_id: &str) -> Result<Option<Message>, StoreError>;

    async fn unread_count(&self, chat_id: &str, user_id: &str) -> Result<i64, StoreError>;

    async fn user_reaction(
        &self,
        user_id: &str,
        message_id: &str,
    ) -> Result<Option<String>, StoreError>;
}

#[async_trait]
impl FeedStore for FeedGraph {
    async fn responded_posts_for_user(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        self.responded_posts(user_id).await
    }

    async fn tags_for_posts(&self, post_ids: &[String]) -> Result<Vec<String>, StoreError> {
        FeedGraph::tags_for_posts(self, post_ids).await
    }

    async fn category_frequency(
        &self,
        user_id: &str,
    ) -> Result<Vec<(PostCategory, i64)>, StoreError> {
        FeedGraph::category_frequency(self, user_id).await
    }

    async fn intent_frequency(&self, user_id: &str) -> Result<Vec<(String, i64)>, StoreError> {
        FeedGraph::intent_frequency(self, user_id).await
    }

    async fn candidate_posts(
        &self,
        category: Option<PostCategory>,
        depth: Option<PostDepth>,
    ) -> Result<Vec<CandidatePost>, StoreError> {
        FeedGraph::candidate_posts(self, category, depth).await
    }

    async fn existing_chat(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> Result<Option<Chat>, StoreError> {
        FeedGraph::existing_chat(self, post_id, user_id).await
    }

    async fn last_message(&self, chat_id: &str) -> Result<Option<Message>, StoreError> {
        FeedGraph::last_message(self, chat_id).await
    }

    async fn unread_count(&self, chat_id: &str, user_id: &str) -> Result<i64, StoreError> {
        FeedGraph::unread_count(self, chat_id, user_id).await
    }

    async fn user_reaction(
        &self,
        user_id: &str,
        message_id: &str,
    ) -> Result<Option<String>, StoreError> {
        FeedGraph::user_reaction(self, user_id, message_id).await
    }
}

// ---------------------------------------------------------------------------
// PostStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError>;

    async fn create_post(&self, post: &Post) -> Result<String, StoreError>;

    async fn create_created_edge(
        &self,
        user_id: &str,
        post_id: &str,
        created_at: i64,
    ) -> Result<(), StoreError>;

    async fn create_post_has_tag_edge(
        &self,
        post_id: &str,
        tag_key: &str,
        confidence: f64,
        source: &str,
    ) -> Result<(), StoreError>;

    async fn has_user_responded(&self, user_id: &str, post_id: &str) -> Result<bool, StoreError>;

    async fn create_responded_edge(
        &self,
        user_id: &str,
        post_id: &str,
        chat_id: &str,
        created_at: i64,
    ) -> Result<(), StoreError>;

    async fn post_tags(&self, post_id: &str) -> Result<Vec<String>, StoreError>;

    async fn has_user_voted(&self, user_id: &str, post_id: &str) -> Result<bool, StoreError>;

    async fn create_voted_edge(
        &self,
        user_id: &str,
        post_id: &str,
        option: &str,
        created_at: i64,
    ) -> Result<(), StoreError>;

    /// `(option, votes)` for every option with at least one vote.
    async fn vote_counts(&self, post_id: &str) -> Result<Vec<(String, i64)>, StoreError>;
}

#[async_trait]
impl PostStore for PostGraph {
    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        self.get(id).await
    }

    async fn create_post(&self, post: &Post) -> Result<String, StoreError> {
        self.create(post).await
    }

    async fn create_created_edge(
        &self,
        user_id: &str,
        post_id: &str,
        created_at: i64,
    ) -> Result<(), StoreError> {
        PostGraph::create_created_edge(self, user_id, post_id, created_at).await
    }

    async fn create_post_has_tag_edge(
        &self,
        post_id: &str,
        tag_key: &str,
        confidence: f64,
        source: &str,
    ) -> Result<(), StoreError> {
        self.create_has_tag_edge(post_id, tag_key, confidence, source)
            .await
    }

    async fn has_user_responded(&self, user_id: &str, post_id: &str) -> Result<bool, StoreError> {
        self.has_responded(user_id, post_id).await
    }

    async fn create_responded_edge(
        &self,
        user_id: &str,
        post_id: &str,
        chat_id: &str,
        created_at: i64,
    ) -> Result<(), StoreError> {
        PostGraph::create_responded_edge(self, user_id, post_id, chat_id, created_at).await
    }

    async fn post_tags(&self, post_id: &str) -> Result<Vec<String>, StoreError> {
        self.tags(post_id).await
    }

    async fn has_user_voted(&self, user_id: &str, post_id: &str) -> Result<bool, StoreError> {
        self.has_voted(user_id, post_id).await
    }

    async fn create_voted_edge(
        &self,
        user_id: &str,
        post_id: &str,
        option: &str,
        created_at: i64,
    ) -> Result<(), StoreError> {
        PostGraph::create_voted_edge(self, user_id, post_id, option, created_at).await
    }

    async fn vote_counts(&self, post_id: &str) -> Result<Vec<(String, i64)>, StoreError> {
        PostGraph::vote_counts(self, post_id).await
    }
}
