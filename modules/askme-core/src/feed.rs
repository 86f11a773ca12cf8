//! Personalized feed ranking.
//!
//! Pipeline: gather the viewer's behavioral signal (three concurrent reads over
//! their `RESPONDED` edges) -> load candidate posts -> score -> sort -> page ->
//! attach per-viewer chat context to the surviving items.
//!
//! Nothing here writes to the store.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use futures::try_join;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

use askme_common::{
    now_millis, AskmeError, CandidatePost, FeedItem, FeedLastMessage, FeedPage, PostCategory,
    PostDepth,
};
use askme_graph::StoreError;

use crate::time_format::format_relative;
use crate::traits::FeedStore;

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 50;
pub const TOP_CATEGORIES: usize = 5;
pub const TOP_INTENTS: usize = 10;

const CATEGORY_WEIGHT: f64 = 40.0;
const TAG_WEIGHT: f64 = 20.0;
const RECENCY_WEIGHT: f64 = 0.1;
const RECENCY_CAP_DAYS: f64 = 100.0;
const MS_PER_DAY: f64 = 86_400_000.0;

/// Raw feed request as it arrives from the caller. Normalized by `get_feed`.
#[derive(Debug, Clone, TypedBuilder)]
pub struct FeedQuery {
    #[builder(setter(into))]
    pub user_id: String,
    #[builder(default, setter(strip_option))]
    pub limit: Option<i64>,
    #[builder(default, setter(strip_option, into))]
    pub cursor: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub category: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub depth: Option<String>,
}

/// What the viewer has engaged with, derived from their responses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserSignals {
    pub tags: HashSet<String>,
    /// Most frequent first, at most `TOP_CATEGORIES`.
    pub categories: Vec<PostCategory>,
    /// Most frequent first, at most `TOP_INTENTS`. Not yet used for scoring.
    pub intents: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ScoredPost {
    pub candidate: CandidatePost,
    pub score: f64,
}

#[derive(Clone)]
pub struct FeedRanker {
    store: Arc<dyn FeedStore>,
}

impl FeedRanker {
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self { store }
    }

    pub async fn get_feed(&self, query: FeedQuery) -> Result<FeedPage, AskmeError> {
        self.get_feed_at(query, now_millis()).await
    }

    /// `get_feed` with an explicit clock, in epoch milliseconds.
    pub async fn get_feed_at(&self, query: FeedQuery, now_ms: i64) -> Result<FeedPage, AskmeError> {
        let limit = clamp_limit(query.limit);
        let category = query.category.as_deref().and_then(|c| {
            let parsed = PostCategory::parse(c);
            if parsed.is_none() && !c.is_empty() {
                debug!(category = c, "Ignoring unknown category filter");
            }
            parsed
        });
        let depth = query.depth.as_deref().and_then(|d| {
            let parsed = PostDepth::parse(d);
            if parsed.is_none() && !d.is_empty() {
                debug!(depth = d, "Ignoring unknown depth filter");
            }
            parsed
        });
        if let Some(cursor) = query.cursor.as_deref() {
            // Pages are ordered by score, so a created_at cursor cannot resume them.
            debug!(cursor, "Feed cursor received but not applied to score ordering");
        }

        let signals = self.gather_signals(&query.user_id).await?;
        debug!(
            user_id = query.user_id.as_str(),
            tags = signals.tags.len(),
            categories = ?signals.categories,
            intents = ?signals.intents,
            "Gathered user signals"
        );

        let candidates = self.store.candidate_posts(category, depth).await?;
        let total = candidates.len();

        let mut ranked = rank_candidates(candidates, &signals, now_ms);
        ranked.truncate(limit as usize);

        let next_cursor = if ranked.len() == limit as usize {
            ranked.last().map(|s| s.candidate.post.created_at.to_string())
        } else {
            None
        };

        let items = try_join_all(
            ranked
                .into_iter()
                .map(|scored| self.to_feed_item(scored, &query.user_id, now_ms)),
        )
        .await?;

        info!(
            user_id = query.user_id.as_str(),
            candidates = total,
            returned = items.len(),
            has_more = next_cursor.is_some(),
            "Feed ranked"
        );

        Ok(FeedPage { items, next_cursor })
    }

    /// Tags, top categories and top intents, fetched concurrently. All or nothing.
    pub async fn gather_signals(&self, user_id: &str) -> Result<UserSignals, AskmeError> {
        let (tags, categories, intents) = try_join!(
            self.user_tags(user_id),
            self.store.category_frequency(user_id),
            self.store.intent_frequency(user_id),
        )?;

        Ok(UserSignals {
            tags,
            categories: categories
                .into_iter()
                .take(TOP_CATEGORIES)
                .map(|(c, _)| c)
                .collect(),
            intents: intents
                .into_iter()
                .take(TOP_INTENTS)
                .map(|(i, _)| i)
                .collect(),
        })
    }

    async fn user_tags(&self, user_id: &str) -> Result<HashSet<String>, StoreError> {
        let posts = self.store.responded_posts_for_user(user_id).await?;
        if posts.is_empty() {
            return Ok(HashSet::new());
        }
        Ok(self.store.tags_for_posts(&posts).await?.into_iter().collect())
    }

    async fn to_feed_item(
        &self,
        scored: ScoredPost,
        user_id: &str,
        now_ms: i64,
    ) -> Result<FeedItem, StoreError> {
        let ScoredPost { candidate, score } = scored;
        let post = candidate.post;

        let chat = self.store.existing_chat(&post.id, user_id).await?;

        let (last_message, unread_count) = match &chat {
            Some(chat) => {
                let (message, unread) = try_join!(
                    self.store.last_message(&chat.id),
                    self.store.unread_count(&chat.id, user_id),
                )?;
                let last_message = match message {
                    Some(m) => {
                        let my_reaction = self.store.user_reaction(user_id, &m.id).await?;
                        Some(FeedLastMessage {
                            formatted_time: format_relative(m.created_at, now_ms),
                            id: m.id,
                            text: m.text,
                            sender_id: m.sender_id,
                            status: m.status,
                            created_at: m.created_at,
                            my_reaction,
                        })
                    }
                    None => None,
                };
                (last_message, unread)
            }
            None => (None, 0),
        };

        Ok(FeedItem {
            id: post.id,
            post_type: post.post_type,
            text: post.text,
            poll_options: post.poll_options,
            category: post.category,
            intent: post.intent,
            depth: post.depth,
            tags: candidate.tags,
            author: candidate.author,
            chat_id: chat.map(|c| c.id),
            last_message,
            unread_count,
            score,
            created_at: post.created_at,
        })
    }
}

fn clamp_limit(limit: Option<i64>) -> u32 {
    match limit {
        Some(l) if l > 0 => l.min(MAX_LIMIT as i64) as u32,
        _ => DEFAULT_LIMIT,
    }
}

/// Relevance of one post to one viewer.
///
/// `category match * 40 + shared tags * 20 + (100 - age in days) * 0.1`, with the
/// age clamped to `[0, 100]` days so the recency term stays within `[0, 10]`.
pub fn score_post(candidate: &CandidatePost, signals: &UserSignals, now_ms: i64) -> f64 {
    let tag_match = candidate
        .tags
        .iter()
        .filter(|t| signals.tags.contains(*t))
        .count() as f64;
    let category_match = if signals.categories.contains(&candidate.post.category) {
        1.0
    } else {
        0.0
    };
    let recency_days =
        ((now_ms - candidate.post.created_at) as f64 / MS_PER_DAY).clamp(0.0, RECENCY_CAP_DAYS);

    category_match * CATEGORY_WEIGHT
        + tag_match * TAG_WEIGHT
        + (RECENCY_CAP_DAYS - recency_days) * RECENCY_WEIGHT
}

/// Score and sort: score descending, then newest first, then id for a total order.
pub fn rank_candidates(
    candidates: Vec<CandidatePost>,
    signals: &UserSignals,
    now_ms: i64,
) -> Vec<ScoredPost> {
    let mut scored: Vec<ScoredPost> = candidates
        .into_iter()
        .map(|candidate| ScoredPost {
            score: score_post(&candidate, signals, now_ms),
            candidate,
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.candidate.post.created_at.cmp(&a.candidate.post.created_at))
            .then_with(|| a.candidate.post.id.cmp(&b.candidate.post.id))
    });
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use askme_common::{Post, PostType};

    const NOW: i64 = 1_750_000_000_000;
    const DAY: i64 = 86_400_000;

    fn candidate(id: &str, category: PostCategory, tags: &[&str], age_days: i64) -> CandidatePost {
        CandidatePost {
            post: Post {
                id: id.to_string(),
                author_id: "author".to_string(),
                post_type: PostType::Text,
                text: String::new(),
                poll_options: vec![],
                category,
                intent: String::new(),
                depth: PostDepth::Neutral,
                created_at: NOW - age_days * DAY,
            },
            tags: tags.iter().map(|t| t.to_string()).collect(),
            author: None,
        }
    }

    fn signals(tags: &[&str], categories: &[PostCategory]) -> UserSignals {
        UserSignals {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            categories: categories.to_vec(),
            intents: vec![],
        }
    }

    #[test]
    fn fresh_post_without_matches_scores_recency_only() {
        let c = candidate("a", PostCategory::Fun, &[], 0);
        let score = score_post(&c, &UserSignals::default(), NOW);
        assert!((score - 10.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn score_combines_category_tags_and_recency() {
        let c = candidate("a", PostCategory::Tech, &["rust", "career-change", "go"], 10);
        let s = signals(&["rust", "go", "python"], &[PostCategory::Tech]);
        // 40 + 2 * 20 + (100 - 10) * 0.1
        let score = score_post(&c, &s, NOW);
        assert!((score - 89.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn recency_is_clamped_at_one_hundred_days() {
        let old = candidate("old", PostCategory::Fun, &[], 100);
        let ancient = candidate("ancient", PostCategory::Fun, &[], 4_000);
        let s = UserSignals::default();
        assert_eq!(score_post(&old, &s, NOW), 0.0);
        assert_eq!(score_post(&ancient, &s, NOW), 0.0);
    }

    #[test]
    fn future_posts_do_not_exceed_the_recency_ceiling() {
        let future = candidate("future", PostCategory::Fun, &[], -5);
        let score = score_post(&future, &UserSignals::default(), NOW);
        assert!((score - 10.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn category_match_outranks_otherwise_identical_post() {
        let s = signals(&[], &[PostCategory::Career]);
        let ranked = rank_candidates(
            vec![
                candidate("b", PostCategory::Health, &[], 3),
                candidate("a", PostCategory::Career, &[], 3),
            ],
            &s,
            NOW,
        );
        assert_eq!(ranked[0].candidate.post.id, "a");
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn ties_break_newest_first_then_by_id() {
        let s = UserSignals::default();
        let older = candidate("older", PostCategory::Fun, &[], 200);
        let newer = candidate("newer", PostCategory::Fun, &[], 150);
        let twin = candidate("a-twin", PostCategory::Fun, &[], 150);

        let ranked = rank_candidates(vec![older, newer, twin], &s, NOW);
        let ids: Vec<&str> = ranked.iter().map(|r| r.candidate.post.id.as_str()).collect();
        // All three score 0.0 (clamped recency); order falls back to created_at, then id.
        assert_eq!(ids, vec!["a-twin", "newer", "older"]);
    }

    #[test]
    fn limit_is_clamped_into_range() {
        assert_eq!(clamp_limit(None), 20);
        assert_eq!(clamp_limit(Some(0)), 20);
        assert_eq!(clamp_limit(Some(-10)), 20);
        assert_eq!(clamp_limit(Some(1)), 1);
        assert_eq!(clamp_limit(Some(51)), 50);
    }
}
