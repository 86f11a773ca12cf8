use neo4rs::{query, Row};

use askme_common::{
    AuthorSummary, CandidatePost, Chat, ChatType, Message, MessageStatus, PostCategory, PostDepth,
};

use crate::posts::row_to_post;
use crate::{GraphClient, StoreError};

/// Read-only queries behind the feed. Never writes.
#[derive(Clone)]
pub struct FeedGraph {
    client: GraphClient,
}

impl FeedGraph {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    // --- Behavioral signal ---

    /// Ids of every post the user has responded to.
    pub async fn responded_posts(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let q = query(
            "MATCH (:User {id: $user_id})-[:RESPONDED]->(p:Post)
             RETURN DISTINCT p.id AS id",
        )
        .param("user_id", user_id);
        self.fetch_strings(q, "id").await
    }

    /// Distinct tag keys attached to any of the given posts.
    pub async fn tags_for_posts(&self, post_ids: &[String]) -> Result<Vec<String>, StoreError> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let q = query(
            "UNWIND $post_ids AS pid
             MATCH (:Post {id: pid})-[:HAS_TAG]->(t:Tag)
             RETURN DISTINCT t.key AS key",
        )
        .param("post_ids", post_ids.to_vec());
        self.fetch_strings(q, "key").await
    }

    /// Categories of responded posts with counts, most frequent first.
    pub async fn category_frequency(
        &self,
        user_id: &str,
    ) -> Result<Vec<(PostCategory, i64)>, StoreError> {
        let rows = self.responded_frequency(user_id, "category").await?;
        Ok(rows
            .into_iter()
            .map(|(value, count)| (PostCategory::normalize(&value), count))
            .collect())
    }

    /// Intents of responded posts with counts, most frequent first.
    pub async fn intent_frequency(&self, user_id: &str) -> Result<Vec<(String, i64)>, StoreError> {
        self.responded_frequency(user_id, "intent").await
    }

    async fn responded_frequency(
        &self,
        user_id: &str,
        property: &str,
    ) -> Result<Vec<(String, i64)>, StoreError> {
        let cypher = format!(
            "MATCH (:User {{id: $user_id}})-[:RESPONDED]->(p:Post)
             WHERE p.{property} IS NOT NULL AND p.{property} <> ''
             RETURN p.{property} AS value, count(*) AS cnt
             ORDER BY cnt DESC, value ASC"
        );
        let q = query(&cypher).param("user_id", user_id);

        let mut out = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            let value: String = row.get("value").unwrap_or_default();
            let cnt: i64 = row.get("cnt").unwrap_or(0);
            out.push((value, cnt));
        }
        Ok(out)
    }

    // --- Candidates ---

    /// Every post matching the optional filters, with tags and author joined.
    pub async fn candidate_posts(
        &self,
        category: Option<PostCategory>,
        depth: Option<PostDepth>,
    ) -> Result<Vec<CandidatePost>, StoreError> {
        let q = query(
            "MATCH (p:Post)
             WHERE ($category = '' OR p.category = $category)
               AND ($depth = '' OR p.depth = $depth)
             OPTIONAL MATCH (author:User)-[:CREATED]->(p)
             OPTIONAL MATCH (p)-[:HAS_TAG]->(t:Tag)
             RETURN p.id AS id, p.author_id AS author_id, p.post_type AS post_type,
                    p.text AS text, p.poll_options AS poll_options, p.category AS category,
                    p.intent AS intent, p.depth AS depth, p.created_at AS created_at,
                    author.id AS author_user_id, author.username AS author_username,
                    author.avatar_url AS author_avatar_url,
                    collect(DISTINCT t.key) AS tags",
        )
        .param("category", category.map(|c| c.as_str()).unwrap_or(""))
        .param("depth", depth.map(|d| d.as_str()).unwrap_or(""));

        let mut candidates = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            let post = row_to_post(&row)?;
            let author = row
                .get::<String>("author_user_id")
                .ok()
                .map(|id| AuthorSummary {
                    id,
                    username: row.get("author_username").unwrap_or_default(),
                    avatar_url: row.get::<String>("author_avatar_url").ok(),
                });
            candidates.push(CandidatePost {
                post,
                tags: row.get::<Vec<String>>("tags").unwrap_or_default(),
                author,
            });
        }
        Ok(candidates)
    }

    // --- Chat context ---

    /// The chat about `post_id` that `user_id` participates in, if any.
    pub async fn existing_chat(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> Result<Option<Chat>, StoreError> {
        let q = query(
            "MATCH (:User {id: $user_id})-[:PARTICIPATES_IN]->(c:Chat {post_id: $post_id})
             RETURN c.id AS id, c.post_id AS post_id, c.chat_type AS chat_type,
                    c.created_at AS created_at
             ORDER BY c.created_at DESC
             LIMIT 1",
        )
        .param("post_id", post_id)
        .param("user_id", user_id);

        let mut stream = self.client.graph.execute(q).await?;
        let Some(row) = stream.next().await? else {
            return Ok(None);
        };
        Ok(Some(Chat {
            id: required(&row, "id")?,
            post_id: row.get("post_id").unwrap_or_default(),
            chat_type: ChatType::normalize(&row.get::<String>("chat_type").unwrap_or_default()),
            created_at: row.get("created_at").unwrap_or(0),
        }))
    }

    pub async fn last_message(&self, chat_id: &str) -> Result<Option<Message>, StoreError> {
        let q = query(
            "MATCH (m:Message {chat_id: $chat_id})
             RETURN m.id AS id, m.chat_id AS chat_id, m.sender_id AS sender_id,
                    m.text AS text, m.status AS status, m.created_at AS created_at
             ORDER BY m.created_at DESC
             LIMIT 1",
        )
        .param("chat_id", chat_id);

        let mut stream = self.client.graph.execute(q).await?;
        let Some(row) = stream.next().await? else {
            return Ok(None);
        };
        Ok(Some(Message {
            id: required(&row, "id")?,
            chat_id: row.get("chat_id").unwrap_or_default(),
            sender_id: row.get("sender_id").unwrap_or_default(),
            text: row.get("text").unwrap_or_default(),
            status: MessageStatus::normalize(&row.get::<String>("status").unwrap_or_default()),
            created_at: row.get("created_at").unwrap_or(0),
        }))
    }

    /// Messages in the chat sent by someone else and not yet seen.
    pub async fn unread_count(&self, chat_id: &str, user_id: &str) -> Result<i64, StoreError> {
        let q = query(
            "MATCH (m:Message {chat_id: $chat_id})
             WHERE m.sender_id <> $user_id AND coalesce(m.status, '') <> 'seen'
             RETURN count(m) AS unread",
        )
        .param("chat_id", chat_id)
        .param("user_id", user_id);

        let mut stream = self.client.graph.execute(q).await?;
        match stream.next().await? {
            Some(row) => Ok(row.get("unread").unwrap_or(0)),
            None => Ok(0),
        }
    }

    pub async fn user_reaction(
        &self,
        user_id: &str,
        message_id: &str,
    ) -> Result<Option<String>, StoreError> {
        let q = query(
            "MATCH (:User {id: $user_id})-[r:REACTED]->(:Message {id: $message_id})
             RETURN r.emoji AS emoji
             LIMIT 1",
        )
        .param("user_id", user_id)
        .param("message_id", message_id);

        let mut stream = self.client.graph.execute(q).await?;
        match stream.next().await? {
            Some(row) => Ok(row.get::<String>("emoji").ok()),
            None => Ok(None),
        }
    }

    async fn fetch_strings(&self, q: neo4rs::Query, column: &str) -> Result<Vec<String>, StoreError> {
        let mut out = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            if let Ok(value) = row.get::<String>(column) {
                out.push(value);
            }
        }
        Ok(out)
    }
}

pub(crate) fn required(row: &Row, column: &str) -> Result<String, StoreError> {
    row.get::<String>(column)
        .map_err(|e| StoreError::Decode(format!("{column}: {e}")))
}
