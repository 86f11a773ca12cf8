use neo4rs::{query, Row};
use tracing::debug;

use askme_common::{Post, PostCategory, PostDepth, PostType};

use crate::feed::required;
use crate::{GraphClient, StoreError};

/// Post documents and the edges hanging off them.
#[derive(Clone)]
pub struct PostGraph {
    client: GraphClient,
}

impl PostGraph {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Post>, StoreError> {
        let q = query(
            "MATCH (p:Post {id: $id})
             RETURN p.id AS id, p.author_id AS author_id, p.post_type AS post_type,
                    p.text AS text, p.poll_options AS poll_options, p.category AS category,
                    p.intent AS intent, p.depth AS depth, p.created_at AS created_at",
        )
        .param("id", id);

        let mut stream = self.client.graph.execute(q).await?;
        match stream.next().await? {
            Some(row) => Ok(Some(row_to_post(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn create(&self, post: &Post) -> Result<String, StoreError> {
        let q = query(
            "CREATE (p:Post {
                id: $id,
                author_id: $author_id,
                post_type: $post_type,
                text: $text,
                poll_options: $poll_options,
                category: $category,
                intent: $intent,
                depth: $depth,
                created_at: $created_at
            })",
        )
        .param("id", post.id.as_str())
        .param("author_id", post.author_id.as_str())
        .param("post_type", post.post_type.as_str())
        .param("text", post.text.as_str())
        .param("poll_options", post.poll_options.clone())
        .param("category", post.category.as_str())
        .param("intent", post.intent.as_str())
        .param("depth", post.depth.as_str())
        .param("created_at", post.created_at);

        self.client
            .graph
            .run(q)
            .await
            .map_err(|e| StoreError::from_write(e, &post.id))?;
        debug!(post_id = post.id.as_str(), "Created post");
        Ok(post.id.clone())
    }

    /// (User)-[:CREATED]->(Post). Creates the user node if missing.
    pub async fn create_created_edge(
        &self,
        user_id: &str,
        post_id: &str,
        created_at: i64,
    ) -> Result<(), StoreError> {
        let q = query(
            "MERGE (u:User {id: $user_id})
             WITH u
             MATCH (p:Post {id: $post_id})
             MERGE (u)-[r:CREATED]->(p)
             ON CREATE SET r.created_at = $created_at",
        )
        .param("user_id", user_id)
        .param("post_id", post_id)
        .param("created_at", created_at);
        self.client.graph.run(q).await?;
        Ok(())
    }

    /// (Post)-[:HAS_TAG {confidence, source}]->(Tag)
    pub async fn create_has_tag_edge(
        &self,
        post_id: &str,
        tag_key: &str,
        confidence: f64,
        source: &str,
    ) -> Result<(), StoreError> {
        let q = query(
            "MATCH (p:Post {id: $post_id})
             MATCH (t:Tag {key: $tag_key})
             MERGE (p)-[r:HAS_TAG]->(t)
             SET r.confidence = $confidence, r.source = $source",
        )
        .param("post_id", post_id)
        .param("tag_key", tag_key)
        .param("confidence", confidence)
        .param("source", source);
        self.client.graph.run(q).await?;
        Ok(())
    }

    pub async fn has_responded(&self, user_id: &str, post_id: &str) -> Result<bool, StoreError> {
        let q = query(
            "MATCH (:User {id: $user_id})-[r:RESPONDED]->(:Post {id: $post_id})
             RETURN count(r) AS n",
        )
        .param("user_id", user_id)
        .param("post_id", post_id);

        let mut stream = self.client.graph.execute(q).await?;
        match stream.next().await? {
            Some(row) => Ok(row.get::<i64>("n").unwrap_or(0) > 0),
            None => Ok(false),
        }
    }

    /// (User)-[:RESPONDED {chat_id, created_at}]->(Post). Creates the user node if missing.
    pub async fn create_responded_edge(
        &self,
        user_id: &str,
        post_id: &str,
        chat_id: &str,
        created_at: i64,
    ) -> Result<(), StoreError> {
        let q = query(
            "MERGE (u:User {id: $user_id})
             WITH u
             MATCH (p:Post {id: $post_id})
             CREATE (u)-[:RESPONDED {chat_id: $chat_id, created_at: $created_at}]->(p)",
        )
        .param("user_id", user_id)
        .param("post_id", post_id)
        .param("chat_id", chat_id)
        .param("created_at", created_at);
        self.client.graph.run(q).await?;
        Ok(())
    }

    /// Keys of the tags attached to a post, in key order.
    pub async fn tags(&self, post_id: &str) -> Result<Vec<String>, StoreError> {
        let q = query(
            "MATCH (:Post {id: $post_id})-[:HAS_TAG]->(t:Tag)
             RETURN t.key AS key
             ORDER BY key",
        )
        .param("post_id", post_id);

        let mut stream = self.client.graph.execute(q).await?;
        let mut keys = Vec::new();
        while let Some(row) = stream.next().await? {
            keys.push(required(&row, "key")?);
        }
        Ok(keys)
    }

    pub async fn has_voted(&self, user_id: &str, post_id: &str) -> Result<bool, StoreError> {
        let q = query(
            "MATCH (:User {id: $user_id})-[v:VOTED]->(:Post {id: $post_id})
             RETURN count(v) AS n",
        )
        .param("user_id", user_id)
        .param("post_id", post_id);

        let mut stream = self.client.graph.execute(q).await?;
        match stream.next().await? {
            Some(row) => Ok(row.get::<i64>("n").unwrap_or(0) > 0),
            None => Ok(false),
        }
    }

    /// (User)-[:VOTED {option, created_at}]->(Post). Creates the user node if missing.
    pub async fn create_voted_edge(
        &self,
        user_id: &str,
        post_id: &str,
        option: &str,
        created_at: i64,
    ) -> Result<(), StoreError> {
        let q = query(
            "MERGE (u:User {id: $user_id})
             WITH u
             MATCH (p:Post {id: $post_id})
             CREATE (u)-[:VOTED {option: $option, created_at: $created_at}]->(p)",
        )
        .param("user_id", user_id)
        .param("post_id", post_id)
        .param("option", option)
        .param("created_at", created_at);
        self.client.graph.run(q).await?;
        Ok(())
    }

    /// Votes per option. Options nobody picked are absent.
    pub async fn vote_counts(&self, post_id: &str) -> Result<Vec<(String, i64)>, StoreError> {
        let q = query(
            "MATCH (:User)-[v:VOTED]->(:Post {id: $post_id})
             RETURN v.option AS option, count(*) AS n",
        )
        .param("post_id", post_id);

        let mut stream = self.client.graph.execute(q).await?;
        let mut counts = Vec::new();
        while let Some(row) = stream.next().await? {
            counts.push((required(&row, "option")?, row.get::<i64>("n").unwrap_or(0)));
        }
        Ok(counts)
    }
}

pub(crate) fn row_to_post(row: &Row) -> Result<Post, StoreError> {
    Ok(Post {
        id: required(row, "id")?,
        author_id: row.get("author_id").unwrap_or_default(),
        post_type: PostType::normalize(&row.get::<String>("post_type").unwrap_or_default()),
        text: row.get("text").unwrap_or_default(),
        poll_options: row.get::<Vec<String>>("poll_options").unwrap_or_default(),
        category: PostCategory::normalize(&row.get::<String>("category").unwrap_or_default()),
        intent: row.get("intent").unwrap_or_default(),
        depth: PostDepth::normalize(&row.get::<String>("depth").unwrap_or_default()),
        created_at: row.get("created_at").unwrap_or(0),
    })
}
