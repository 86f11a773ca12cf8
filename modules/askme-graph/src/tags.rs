use neo4rs::{query, Row};
use tracing::debug;

use askme_common::Tag;

use crate::{GraphClient, StoreError};

const TAG_RETURN: &str = "RETURN t.key AS key, t.label AS label, t.aliases AS aliases,
        t.usage_count AS usage_count, t.created_at AS created_at";

/// Canonical tag storage. Only the tag resolver writes through this.
#[derive(Clone)]
pub struct TagGraph {
    client: GraphClient,
}

impl TagGraph {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Find a tag whose aliases contain `text` or whose label equals it, ignoring case.
    pub async fn find_by_alias_or_label(&self, text: &str) -> Result<Option<Tag>, StoreError> {
        let cypher = format!(
            "MATCH (t:Tag)
             WHERE toLower(t.label) = toLower($text)
                OR any(a IN coalesce(t.aliases, []) WHERE toLower(a) = toLower($text))
             {TAG_RETURN}
             ORDER BY t.created_at ASC
             LIMIT 1"
        );
        let q = query(&cypher).param("text", text);
        self.fetch_one(q).await
    }

    pub async fn find_by_key(&self, key: &str) -> Result<Option<Tag>, StoreError> {
        let cypher = format!("MATCH (t:Tag {{key: $key}}) {TAG_RETURN}");
        let q = query(&cypher).param("key", key);
        self.fetch_one(q).await
    }

    /// Create a tag. Fails with `StoreError::DuplicateKey` when the key is taken.
    pub async fn create(&self, tag: &Tag) -> Result<String, StoreError> {
        let q = query(
            "CREATE (t:Tag {
                key: $key,
                label: $label,
                aliases: $aliases,
                usage_count: $usage_count,
                created_at: $created_at
            }) RETURN t.key AS key",
        )
        .param("key", tag.key.as_str())
        .param("label", tag.label.as_str())
        .param("aliases", tag.aliases.clone())
        .param("usage_count", tag.usage_count)
        .param("created_at", tag.created_at);

        let mut stream = self
            .client
            .graph
            .execute(q)
            .await
            .map_err(|e| StoreError::from_write(e, &tag.key))?;
        while stream
            .next()
            .await
            .map_err(|e| StoreError::from_write(e, &tag.key))?
            .is_some()
        {}

        debug!(key = tag.key.as_str(), "Created tag");
        Ok(tag.key.clone())
    }

    pub async fn increment_usage(&self, key: &str) -> Result<(), StoreError> {
        let q = query(
            "MATCH (t:Tag {key: $key})
             SET t.usage_count = coalesce(t.usage_count, 0) + 1",
        )
        .param("key", key);
        self.client.graph.run(q).await?;
        Ok(())
    }

    /// Tags ordered by usage, most used first.
    pub async fn list_by_usage(&self, limit: u32, offset: u32) -> Result<Vec<Tag>, StoreError> {
        let cypher = format!(
            "MATCH (t:Tag)
             {TAG_RETURN}
             ORDER BY t.usage_count DESC, t.key ASC
             SKIP $offset
             LIMIT $limit"
        );
        let q = query(&cypher)
            .param("offset", offset as i64)
            .param("limit", limit as i64);
        self.fetch_all(q).await
    }

    /// Substring search over labels and aliases, most used first.
    pub async fn search(&self, text: &str, limit: u32) -> Result<Vec<Tag>, StoreError> {
        let cypher = format!(
            "MATCH (t:Tag)
             WHERE toLower(t.label) CONTAINS toLower($text)
                OR any(a IN coalesce(t.aliases, []) WHERE toLower(a) CONTAINS toLower($text))
             {TAG_RETURN}
             ORDER BY t.usage_count DESC, t.key ASC
             LIMIT $limit"
        );
        let q = query(&cypher)
            .param("text", text)
            .param("limit", limit as i64);
        self.fetch_all(q).await
    }

    async fn fetch_one(&self, q: neo4rs::Query) -> Result<Option<Tag>, StoreError> {
        let mut stream = self.client.graph.execute(q).await?;
        match stream.next().await? {
            Some(row) => Ok(Some(row_to_tag(&row)?)),
            None => Ok(None),
        }
    }

    async fn fetch_all(&self, q: neo4rs::Query) -> Result<Vec<Tag>, StoreError> {
        let mut tags = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            tags.push(row_to_tag(&row)?);
        }
        Ok(tags)
    }
}

fn row_to_tag(row: &Row) -> Result<Tag, StoreError> {
    let key: String = row
        .get("key")
        .map_err(|e| StoreError::Decode(format!("tag key: {e}")))?;
    Ok(Tag {
        label: row.get("label").unwrap_or_default(),
        aliases: row.get::<Vec<String>>("aliases").unwrap_or_default(),
        usage_count: row.get::<i64>("usage_count").unwrap_or(0),
        created_at: row.get::<i64>("created_at").unwrap_or(0),
        key,
    })
}
