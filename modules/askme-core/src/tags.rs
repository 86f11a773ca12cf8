//! Tag resolution: free-text tag strings to canonical tag keys.
//!
//! Lookup is by alias or label. A miss creates a new canonical tag keyed by
//! [`to_tag_key`]. Concurrent resolvers are not serialized; when two of them
//! race to create the same key, the store's uniqueness constraint rejects the
//! loser, which then re-reads the winner's tag.
//!
//! Usage counts are an approximate popularity signal. Increments are spawned
//! in the background and may land after `resolve_one` returns, or not at all.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info, warn};

use askme_common::{now_millis, to_tag_key, AskmeError, Tag};
use askme_graph::StoreError;

use crate::traits::TagStore;

const LIST_DEFAULT_LIMIT: i64 = 50;
const LIST_MAX_LIMIT: i64 = 100;
const SEARCH_DEFAULT_LIMIT: i64 = 20;
const SEARCH_MAX_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct TagResolver {
    store: Arc<dyn TagStore>,
}

impl TagResolver {
    pub fn new(store: Arc<dyn TagStore>) -> Self {
        Self { store }
    }

    /// Resolve one raw tag to its canonical key, creating the tag if needed.
    pub async fn resolve_one(&self, raw: &str) -> Result<String, AskmeError> {
        let key = to_tag_key(raw);
        if key.is_empty() {
            return Err(AskmeError::InvalidInput(format!(
                "tag {raw:?} has no alphanumeric characters"
            )));
        }

        if let Some(existing) = self.store.find_tag_by_alias_or_label(raw).await? {
            self.spawn_usage_increment(existing.key.clone());
            debug!(raw, key = existing.key.as_str(), "Matched existing tag");
            return Ok(existing.key);
        }

        let tag = Tag::from_raw(raw, now_millis());
        match self.store.create_tag(&tag).await {
            Ok(created) => {
                info!(raw, key = created.as_str(), "Created canonical tag");
                Ok(created)
            }
            Err(StoreError::DuplicateKey(_)) => {
                // Lost a creation race; the winner's tag is the canonical one.
                match self.store.find_tag_by_key(&key).await? {
                    Some(winner) => {
                        debug!(raw, key = winner.key.as_str(), "Tag created concurrently, reusing");
                        Ok(winner.key)
                    }
                    None => Err(AskmeError::Store(format!(
                        "tag {key} reported as duplicate but could not be re-read"
                    ))),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a batch concurrently. Returns distinct keys in first-seen order.
    ///
    /// Fails on the first resolution error. Tags created by resolutions that
    /// already finished stay in place.
    pub async fn resolve_batch(&self, raw_tags: &[String]) -> Result<Vec<String>, AskmeError> {
        let resolvable: Vec<&str> = raw_tags
            .iter()
            .map(String::as_str)
            .filter(|raw| {
                let keep = !to_tag_key(raw).is_empty();
                if !keep {
                    debug!(raw, "Skipping tag with no alphanumeric characters");
                }
                keep
            })
            .collect();
        if resolvable.is_empty() {
            return Ok(Vec::new());
        }

        let keys = try_join_all(resolvable.iter().map(|raw| self.resolve_one(raw))).await?;

        let mut seen = HashSet::new();
        Ok(keys.into_iter().filter(|k| seen.insert(k.clone())).collect())
    }

    // --- Catalogue reads ---

    pub async fn get_tag(&self, key: &str) -> Result<Tag, AskmeError> {
        self.store
            .find_tag_by_key(key)
            .await?
            .ok_or_else(|| AskmeError::NotFound(format!("tag {key}")))
    }

    /// Most used first. `limit` defaults to 50, capped at 100.
    pub async fn list_tags(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Tag>, AskmeError> {
        let limit = clamp_limit(limit, LIST_DEFAULT_LIMIT, LIST_MAX_LIMIT);
        let offset = offset.unwrap_or(0).clamp(0, u32::MAX as i64) as u32;
        Ok(self.store.list_tags(limit, offset).await?)
    }

    /// Substring match over labels and aliases. `limit` defaults to 20.
    pub async fn search_tags(&self, text: &str, limit: Option<i64>) -> Result<Vec<Tag>, AskmeError> {
        let limit = clamp_limit(limit, SEARCH_DEFAULT_LIMIT, SEARCH_MAX_LIMIT);
        Ok(self.store.search_tags(text, limit).await?)
    }

    fn spawn_usage_increment(&self, key: String) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.increment_tag_usage(&key).await {
                warn!(key = key.as_str(), error = %e, "Failed to increment tag usage");
            }
        });
    }
}

fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> u32 {
    match limit {
        Some(l) if l > 0 => l.min(max) as u32,
        _ => default as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_when_missing_or_non_positive() {
        assert_eq!(clamp_limit(None, 50, 100), 50);
        assert_eq!(clamp_limit(Some(0), 50, 100), 50);
        assert_eq!(clamp_limit(Some(-3), 20, 100), 20);
    }

    #[test]
    fn limit_is_capped() {
        assert_eq!(clamp_limit(Some(500), 50, 100), 100);
        assert_eq!(clamp_limit(Some(7), 50, 100), 7);
    }
}
