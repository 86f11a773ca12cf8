// Test mocks for the askme services.
//
// MockGraph implements TagStore, FeedStore and PostStore over one shared
// in-memory graph, so a TagResolver, FeedRanker and PostService built on the
// same Arc<MockGraph> see each other's writes.
//
// Every call yields to the scheduler before touching state. Concurrent
// resolutions therefore interleave the way they do against a real database,
// and the unique-key check on tags is what keeps them consistent.
//
// Plus fixture helpers for constructing posts, chats and messages.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use askme_common::{
    AuthorSummary, CandidatePost, Chat, ChatType, Message, MessageStatus, Post, PostCategory,
    PostDepth, PostType, Tag,
};
use askme_graph::StoreError;

use crate::traits::{FeedStore, PostStore, TagStore};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A text post with neutral depth and no intent.
pub fn test_post(id: &str, author_id: &str, category: PostCategory, created_at: i64) -> Post {
    Post {
        id: id.to_string(),
        author_id: author_id.to_string(),
        post_type: PostType::Text,
        text: format!("post {id}"),
        poll_options: vec![],
        category,
        intent: String::new(),
        depth: PostDepth::Neutral,
        created_at,
    }
}

/// A poll post offering `options`.
pub fn test_poll(id: &str, author_id: &str, options: &[&str], created_at: i64) -> Post {
    Post {
        post_type: PostType::Poll,
        poll_options: options.iter().map(|o| o.to_string()).collect(),
        ..test_post(id, author_id, PostCategory::Opinion, created_at)
    }
}

pub fn test_chat(id: &str, post_id: &str, created_at: i64) -> Chat {
    Chat {
        id: id.to_string(),
        post_id: post_id.to_string(),
        chat_type: ChatType::Direct,
        created_at,
    }
}

pub fn test_message(
    id: &str,
    chat_id: &str,
    sender_id: &str,
    status: MessageStatus,
    created_at: i64,
) -> Message {
    Message {
        id: id.to_string(),
        chat_id: chat_id.to_string(),
        sender_id: sender_id.to_string(),
        text: format!("message {id}"),
        status,
        created_at,
    }
}

// ---------------------------------------------------------------------------
// MockGraph
// ---------------------------------------------------------------------------

/// `post_has_tag` edge as stored by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct TagEdge {
    pub post_id: String,
    pub tag_key: String,
    pub confidence: f64,
    pub source: String,
}

/// `responded` edge as stored by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEdge {
    pub user_id: String,
    pub post_id: String,
    pub chat_id: String,
    pub created_at: i64,
}

#[derive(Default)]
struct MockGraphInner {
    users: HashMap<String, AuthorSummary>,
    /// Insertion order doubles as candidate order.
    posts: Vec<Post>,
    tags: HashMap<String, Tag>,
    tag_edges: Vec<TagEdge>,
    created: Vec<(String, String)>,
    responses: Vec<ResponseEdge>,
    /// (user, post, option)
    votes: Vec<(String, String, String)>,
    chats: HashMap<String, Chat>,
    participants: HashSet<(String, String)>,
    messages: Vec<Message>,
    reactions: HashMap<(String, String), String>,
    /// operation name -> failure message
    failing: HashMap<String, String>,
    calls: HashMap<String, usize>,
}

/// Stateful in-memory graph. Thread-safe via interior Mutex.
#[derive(Default)]
pub struct MockGraph {
    inner: Mutex<MockGraphInner>,
}

impl MockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockGraphInner> {
        self.inner.lock().unwrap()
    }

    /// Count the call and fail it if `fail_on` registered the operation.
    async fn enter(&self, op: &str) -> Result<MutexGuard<'_, MockGraphInner>, StoreError> {
        tokio::task::yield_now().await;
        let mut inner = self.lock();
        *inner.calls.entry(op.to_string()).or_default() += 1;
        if let Some(msg) = inner.failing.get(op) {
            return Err(StoreError::Unavailable(format!("{op}: {msg}")));
        }
        Ok(inner)
    }

    // --- Seeding (builder style) ---

    pub fn with_user(self, id: &str, username: &str) -> Self {
        self.lock().users.insert(
            id.to_string(),
            AuthorSummary {
                id: id.to_string(),
                username: username.to_string(),
                avatar_url: None,
            },
        );
        self
    }

    /// Insert a post with its `created` edge from `post.author_id`.
    pub fn with_post(self, post: Post) -> Self {
        {
            let mut inner = self.lock();
            inner
                .created
                .push((post.author_id.clone(), post.id.clone()));
            inner.posts.push(post);
        }
        self
    }

    pub fn with_tag(self, tag: Tag) -> Self {
        self.lock().tags.insert(tag.key.clone(), tag);
        self
    }

    pub fn with_post_tag(self, post_id: &str, tag_key: &str) -> Self {
        self.lock().tag_edges.push(TagEdge {
            post_id: post_id.to_string(),
            tag_key: tag_key.to_string(),
            confidence: 1.0,
            source: "seed".to_string(),
        });
        self
    }

    pub fn with_response(self, user_id: &str, post_id: &str) -> Self {
        self.lock().responses.push(ResponseEdge {
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            chat_id: String::new(),
            created_at: 0,
        });
        self
    }

    pub fn with_vote(self, user_id: &str, post_id: &str, option: &str) -> Self {
        self.lock().votes.push((
            user_id.to_string(),
            post_id.to_string(),
            option.to_string(),
        ));
        self
    }

    /// Insert a chat and make each of `participants` a member.
    pub fn with_chat(self, chat: Chat, participants: &[&str]) -> Self {
        {
            let mut inner = self.lock();
            for user in participants {
                inner
                    .participants
                    .insert((user.to_string(), chat.id.clone()));
            }
            inner.chats.insert(chat.id.clone(), chat);
        }
        self
    }

    pub fn with_message(self, message: Message) -> Self {
        self.lock().messages.push(message);
        self
    }

    pub fn with_reaction(self, user_id: &str, message_id: &str, emoji: &str) -> Self {
        self.lock().reactions.insert(
            (user_id.to_string(), message_id.to_string()),
            emoji.to_string(),
        );
        self
    }

    // --- Failure injection ---

    /// Make every later call to `op` (a trait method name) fail.
    pub fn fail_on(&self, op: &str) {
        self.lock()
            .failing
            .insert(op.to_string(), "injected failure".to_string());
    }

    // --- Inspection ---

    pub fn calls(&self, op: &str) -> usize {
        self.lock().calls.get(op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    pub fn tag(&self, key: &str) -> Option<Tag> {
        self.lock().tags.get(key).cloned()
    }

    pub fn tag_count(&self) -> usize {
        self.lock().tags.len()
    }

    pub fn post(&self, id: &str) -> Option<Post> {
        self.lock().posts.iter().find(|p| p.id == id).cloned()
    }

    pub fn tag_edges(&self, post_id: &str) -> Vec<TagEdge> {
        self.lock()
            .tag_edges
            .iter()
            .filter(|e| e.post_id == post_id)
            .cloned()
            .collect()
    }

    /// Options voted on `post_id`, one entry per vote.
    pub fn votes(&self, post_id: &str) -> Vec<String> {
        self.lock()
            .votes
            .iter()
            .filter(|(_, p, _)| p == post_id)
            .map(|(_, _, o)| o.clone())
            .collect()
    }

    pub fn has_created_edge(&self, user_id: &str, post_id: &str) -> bool {
        self.lock()
            .created
            .iter()
            .any(|(u, p)| u == user_id && p == post_id)
    }

    pub fn responses(&self) -> Vec<ResponseEdge> {
        self.lock().responses.clone()
    }
}

fn frequency<I: IntoIterator<Item = String>>(values: I) -> Vec<(String, i64)> {
    let mut counts: HashMap<String, i64> = HashMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    let mut out: Vec<(String, i64)> = counts.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

fn responded_posts<'a>(inner: &'a MockGraphInner, user_id: &str) -> Vec<&'a Post> {
    let ids: HashSet<&str> = inner
        .responses
        .iter()
        .filter(|r| r.user_id == user_id)
        .map(|r| r.post_id.as_str())
        .collect();
    inner
        .posts
        .iter()
        .filter(|p| ids.contains(p.id.as_str()))
        .collect()
}

#[async_trait]
impl TagStore for MockGraph {
    async fn find_tag_by_alias_or_label(&self, text: &str) -> Result<Option<Tag>, StoreError> {
        let inner = self.enter("find_tag_by_alias_or_label").await?;
        let mut hits: Vec<&Tag> = inner
            .tags
            .values()
            .filter(|t| t.matches_alias_or_label(text))
            .collect();
        hits.sort_by_key(|t| t.created_at);
        Ok(hits.first().map(|t| (*t).clone()))
    }

    async fn find_tag_by_key(&self, key: &str) -> Result<Option<Tag>, StoreError> {
        let inner = self.enter("find_tag_by_key").await?;
        Ok(inner.tags.get(key).cloned())
    }

    async fn create_tag(&self, tag: &Tag) -> Result<String, StoreError> {
        let mut inner = self.enter("create_tag").await?;
        if inner.tags.contains_key(&tag.key) {
            return Err(StoreError::DuplicateKey(tag.key.clone()));
        }
        inner.tags.insert(tag.key.clone(), tag.clone());
        Ok(tag.key.clone())
    }

    async fn increment_tag_usage(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.enter("increment_tag_usage").await?;
        if let Some(tag) = inner.tags.get_mut(key) {
            tag.usage_count += 1;
        }
        Ok(())
    }

    async fn list_tags(&self, limit: u32, offset: u32) -> Result<Vec<Tag>, StoreError> {
        let inner = self.enter("list_tags").await?;
        let mut tags: Vec<Tag> = inner.tags.values().cloned().collect();
        tags.sort_by(|a, b| b.usage_count.cmp(&a.usage_count).then_with(|| a.key.cmp(&b.key)));
        Ok(tags
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn search_tags(&self, text: &str, limit: u32) -> Result<Vec<Tag>, StoreError> {
        let inner = self.enter("search_tags").await?;
        let needle = text.to_lowercase();
        let mut tags: Vec<Tag> = inner
            .tags
            .values()
            .filter(|t| {
                t.label.to_lowercase().contains(&needle)
                    || t.aliases.iter().any(|a| a.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        tags.sort_by(|a, b| b.usage_count.cmp(&a.usage_count).then_with(|| a.key.cmp(&b.key)));
        tags.truncate(limit as usize);
        Ok(tags)
    }
}

#[async_trait]
impl FeedStore for MockGraph {
    async fn responded_posts_for_user(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.enter("responded_posts_for_user").await?;
        Ok(responded_posts(&inner, user_id)
            .into_iter()
            .map(|p| p.id.clone())
            .collect())
    }

    async fn tags_for_posts(&self, post_ids: &[String]) -> Result<Vec<String>, StoreError> {
        let inner = self.enter("tags_for_posts").await?;
        let mut seen = HashSet::new();
        Ok(inner
            .tag_edges
            .iter()
            .filter(|e| post_ids.contains(&e.post_id))
            .map(|e| e.tag_key.clone())
            .filter(|k| seen.insert(k.clone()))
            .collect())
    }

    async fn category_frequency(
        &self,
        user_id: &str,
    ) -> Result<Vec<(PostCategory, i64)>, StoreError> {
        let inner = self.enter("category_frequency").await?;
        let counts = frequency(
            responded_posts(&inner, user_id)
                .into_iter()
                .map(|p| p.category.as_str().to_string()),
        );
        Ok(counts
            .into_iter()
            .map(|(c, n)| (PostCategory::normalize(&c), n))
            .collect())
    }

    async fn intent_frequency(&self, user_id: &str) -> Result<Vec<(String, i64)>, StoreError> {
        let inner = self.enter("intent_frequency").await?;
        Ok(frequency(
            responded_posts(&inner, user_id)
                .into_iter()
                .filter(|p| !p.intent.is_empty())
                .map(|p| p.intent.clone()),
        ))
    }

    async fn candidate_posts(
        &self,
        category: Option<PostCategory>,
        depth: Option<PostDepth>,
    ) -> Result<Vec<CandidatePost>, StoreError> {
        let inner = self.enter("candidate_posts").await?;
        Ok(inner
            .posts
            .iter()
            .filter(|p| category.map_or(true, |c| p.category == c))
            .filter(|p| depth.map_or(true, |d| p.depth == d))
            .map(|p| {
                let author = inner
                    .created
                    .iter()
                    .find(|(_, post_id)| *post_id == p.id)
                    .and_then(|(user_id, _)| inner.users.get(user_id))
                    .cloned();
                let mut seen = HashSet::new();
                let tags = inner
                    .tag_edges
                    .iter()
                    .filter(|e| e.post_id == p.id)
                    .map(|e| e.tag_key.clone())
                    .filter(|k| seen.insert(k.clone()))
                    .collect();
                CandidatePost {
                    post: p.clone(),
                    tags,
                    author,
                }
            })
            .collect())
    }

    async fn existing_chat(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> Result<Option<Chat>, StoreError> {
        let inner = self.enter("existing_chat").await?;
        Ok(inner
            .chats
            .values()
            .filter(|c| c.post_id == post_id)
            .filter(|c| {
                inner
                    .participants
                    .contains(&(user_id.to_string(), c.id.clone()))
            })
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn last_message(&self, chat_id: &str) -> Result<Option<Message>, StoreError> {
        let inner = self.enter("last_message").await?;
        Ok(inner
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .max_by_key(|m| m.created_at)
            .cloned())
    }

    async fn unread_count(&self, chat_id: &str, user_id: &str) -> Result<i64, StoreError> {
        let inner = self.enter("unread_count").await?;
        Ok(inner
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .filter(|m| m.sender_id != user_id && m.status != MessageStatus::Seen)
            .count() as i64)
    }

    async fn user_reaction(
        &self,
        user_id: &str,
        message_id: &str,
    ) -> Result<Option<String>, StoreError> {
        let inner = self.enter("user_reaction").await?;
        Ok(inner
            .reactions
            .get(&(user_id.to_string(), message_id.to_string()))
            .cloned())
    }
}

#[async_trait]
impl PostStore for MockGraph {
    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        let inner = self.enter("get_post").await?;
        Ok(inner.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn create_post(&self, post: &Post) -> Result<String, StoreError> {
        let mut inner = self.enter("create_post").await?;
        if inner.posts.iter().any(|p| p.id == post.id) {
            return Err(StoreError::DuplicateKey(post.id.clone()));
        }
        inner.posts.push(post.clone());
        Ok(post.id.clone())
    }

    async fn create_created_edge(
        &self,
        user_id: &str,
        post_id: &str,
        _created_at: i64,
    ) -> Result<(), StoreError> {
        let mut inner = self.enter("create_created_edge").await?;
        inner
            .created
            .push((user_id.to_string(), post_id.to_string()));
        Ok(())
    }

    async fn create_post_has_tag_edge(
        &self,
        post_id: &str,
        tag_key: &str,
        confidence: f64,
        source: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.enter("create_post_has_tag_edge").await?;
        inner.tag_edges.push(TagEdge {
            post_id: post_id.to_string(),
            tag_key: tag_key.to_string(),
            confidence,
            source: source.to_string(),
        });
        Ok(())
    }

    async fn has_user_responded(&self, user_id: &str, post_id: &str) -> Result<bool, StoreError> {
        let inner = self.enter("has_user_responded").await?;
        Ok(inner
            .responses
            .iter()
            .any(|r| r.user_id == user_id && r.post_id == post_id))
    }

    async fn create_responded_edge(
        &self,
        user_id: &str,
        post_id: &str,
        chat_id: &str,
        created_at: i64,
    ) -> Result<(), StoreError> {
        let mut inner = self.enter("create_responded_edge").await?;
        inner.responses.push(ResponseEdge {
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            chat_id: chat_id.to_string(),
            created_at,
        });
        Ok(())
    }

    async fn post_tags(&self, post_id: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.enter("post_tags").await?;
        let mut keys: Vec<String> = inner
            .tag_edges
            .iter()
            .filter(|e| e.post_id == post_id)
            .map(|e| e.tag_key.clone())
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn has_user_voted(&self, user_id: &str, post_id: &str) -> Result<bool, StoreError> {
        let inner = self.enter("has_user_voted").await?;
        Ok(inner
            .votes
            .iter()
            .any(|(u, p, _)| u == user_id && p == post_id))
    }

    async fn create_voted_edge(
        &self,
        user_id: &str,
        post_id: &str,
        option: &str,
        _created_at: i64,
    ) -> Result<(), StoreError> {
        let mut inner = self.enter("create_voted_edge").await?;
        inner.votes.push((
            user_id.to_string(),
            post_id.to_string(),
            option.to_string(),
        ));
        Ok(())
    }

    async fn vote_counts(&self, post_id: &str) -> Result<Vec<(String, i64)>, StoreError> {
        let inner = self.enter("vote_counts").await?;
        let mut counts: HashMap<String, i64> = HashMap::new();
        for (_, p, option) in &inner.votes {
            if p == post_id {
                *counts.entry(option.clone()).or_default() += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }
}
