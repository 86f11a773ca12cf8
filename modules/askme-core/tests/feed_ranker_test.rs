//! Feed ranking against the in-memory graph.

use std::sync::Arc;

use askme_common::{AskmeError, MessageStatus, PostCategory, PostDepth};
use askme_core::testing::{test_chat, test_message, test_post, MockGraph};
use askme_core::{FeedQuery, FeedRanker};

const NOW: i64 = 1_750_000_000_000;
const HOUR: i64 = 3_600_000;
const DAY: i64 = 24 * HOUR;

fn ranker(graph: &Arc<MockGraph>) -> FeedRanker {
    FeedRanker::new(graph.clone())
}

fn ids(page: &askme_common::FeedPage) -> Vec<&str> {
    page.items.iter().map(|i| i.id.as_str()).collect()
}

/// bob has answered two career posts tagged `career-change`.
fn graph_with_history() -> MockGraph {
    MockGraph::new()
        .with_user("alice", "alice")
        .with_user("bob", "bob")
        .with_post(test_post("old-career", "alice", PostCategory::Career, NOW - 30 * DAY))
        .with_post(test_post("old-career-2", "alice", PostCategory::Career, NOW - 40 * DAY))
        .with_post_tag("old-career", "career-change")
        .with_response("bob", "old-career")
        .with_response("bob", "old-career-2")
}

#[tokio::test]
async fn top_category_match_ranks_above_identical_non_match() {
    let graph = Arc::new(
        graph_with_history()
            .with_post(test_post("health", "alice", PostCategory::Health, NOW - DAY))
            .with_post(test_post("career", "alice", PostCategory::Career, NOW - DAY)),
    );

    let page = ranker(&graph)
        .get_feed_at(FeedQuery::builder().user_id("bob").build(), NOW)
        .await
        .unwrap();

    let ids = ids(&page);
    let career = ids.iter().position(|id| *id == "career").unwrap();
    let health = ids.iter().position(|id| *id == "health").unwrap();
    assert!(career < health, "career should outrank health: {ids:?}");
    assert!(page.items[career].score > page.items[health].score);
}

#[tokio::test]
async fn shared_tags_add_to_the_score() {
    let graph = Arc::new(
        graph_with_history()
            .with_post(test_post("tagged", "alice", PostCategory::Fun, NOW - DAY))
            .with_post_tag("tagged", "career-change")
            .with_post(test_post("untagged", "alice", PostCategory::Fun, NOW - DAY)),
    );

    let page = ranker(&graph)
        .get_feed_at(
            FeedQuery::builder()
                .user_id("bob")
                .category("fun")
                .build(),
            NOW,
        )
        .await
        .unwrap();

    assert_eq!(ids(&page), vec!["tagged", "untagged"]);
    assert!((page.items[0].score - page.items[1].score - 20.0).abs() < 1e-9);
}

#[tokio::test]
async fn user_without_history_gets_recency_order() {
    let graph = Arc::new(
        MockGraph::new()
            .with_post(test_post("week", "alice", PostCategory::Tech, NOW - 7 * DAY))
            .with_post(test_post("hour", "alice", PostCategory::Career, NOW - HOUR))
            .with_post(test_post("month", "alice", PostCategory::Fun, NOW - 30 * DAY)),
    );

    let page = ranker(&graph)
        .get_feed_at(FeedQuery::builder().user_id("newcomer").build(), NOW)
        .await
        .unwrap();

    assert_eq!(ids(&page), vec!["hour", "week", "month"]);
    // No responses means no tag lookup at all.
    assert_eq!(graph.calls("tags_for_posts"), 0);
}

#[tokio::test]
async fn next_cursor_only_when_page_is_full() {
    let graph = Arc::new(
        MockGraph::new()
            .with_post(test_post("a", "alice", PostCategory::Tech, NOW - HOUR))
            .with_post(test_post("b", "alice", PostCategory::Tech, NOW - 2 * HOUR)),
    );
    let feed = ranker(&graph);

    let full = feed
        .get_feed_at(FeedQuery::builder().user_id("bob").limit(2).build(), NOW)
        .await
        .unwrap();
    assert_eq!(full.items.len(), 2);
    assert_eq!(full.next_cursor, Some((NOW - 2 * HOUR).to_string()));

    let partial = feed
        .get_feed_at(FeedQuery::builder().user_id("bob").limit(3).build(), NOW)
        .await
        .unwrap();
    assert_eq!(partial.items.len(), 2);
    assert_eq!(partial.next_cursor, None);
}

#[tokio::test]
async fn limit_is_clamped() {
    let mut graph = MockGraph::new();
    for i in 0..60 {
        graph = graph.with_post(test_post(
            &format!("p{i:02}"),
            "alice",
            PostCategory::Other,
            NOW - i * HOUR,
        ));
    }
    let graph = Arc::new(graph);
    let feed = ranker(&graph);

    let capped = feed
        .get_feed_at(FeedQuery::builder().user_id("bob").limit(500).build(), NOW)
        .await
        .unwrap();
    assert_eq!(capped.items.len(), 50);

    let defaulted = feed
        .get_feed_at(FeedQuery::builder().user_id("bob").limit(0).build(), NOW)
        .await
        .unwrap();
    assert_eq!(defaulted.items.len(), 20);
}

#[tokio::test]
async fn filters_apply_and_invalid_values_are_ignored() {
    let mut serious = test_post("serious-tech", "alice", PostCategory::Tech, NOW - HOUR);
    serious.depth = PostDepth::Serious;
    let graph = Arc::new(
        MockGraph::new()
            .with_post(serious)
            .with_post(test_post("tech", "alice", PostCategory::Tech, NOW - HOUR))
            .with_post(test_post("fun", "alice", PostCategory::Fun, NOW - HOUR)),
    );
    let feed = ranker(&graph);

    let tech = feed
        .get_feed_at(FeedQuery::builder().user_id("bob").category("tech").build(), NOW)
        .await
        .unwrap();
    assert_eq!(tech.items.len(), 2);

    let serious = feed
        .get_feed_at(
            FeedQuery::builder()
                .user_id("bob")
                .category("tech")
                .depth("serious")
                .build(),
            NOW,
        )
        .await
        .unwrap();
    assert_eq!(ids(&serious), vec!["serious-tech"]);

    let bogus = feed
        .get_feed_at(
            FeedQuery::builder()
                .user_id("bob")
                .category("astrology")
                .depth("bottomless")
                .build(),
            NOW,
        )
        .await
        .unwrap();
    assert_eq!(bogus.items.len(), 3);
}

#[tokio::test]
async fn items_carry_author_tags_and_chat_context() {
    let graph = Arc::new(
        MockGraph::new()
            .with_user("alice", "alice")
            .with_post(test_post("asked", "alice", PostCategory::Tech, NOW - DAY))
            .with_post_tag("asked", "rust")
            .with_chat(test_chat("chat-1", "asked", NOW - DAY), &["alice", "bob"])
            .with_message(test_message("m1", "chat-1", "bob", MessageStatus::Seen, NOW - 20 * HOUR))
            .with_message(test_message("m2", "chat-1", "alice", MessageStatus::Delivered, NOW - 10 * HOUR))
            .with_message(test_message("m3", "chat-1", "alice", MessageStatus::Sent, NOW - 5 * 60_000))
            .with_reaction("bob", "m3", "🔥"),
    );

    let page = ranker(&graph)
        .get_feed_at(FeedQuery::builder().user_id("bob").build(), NOW)
        .await
        .unwrap();

    let item = &page.items[0];
    assert_eq!(item.author.as_ref().unwrap().username, "alice");
    assert_eq!(item.tags, vec!["rust".to_string()]);
    assert_eq!(item.chat_id.as_deref(), Some("chat-1"));
    assert_eq!(item.unread_count, 2);

    let last = item.last_message.as_ref().unwrap();
    assert_eq!(last.id, "m3");
    assert_eq!(last.formatted_time, "5 minutes ago");
    assert_eq!(last.my_reaction.as_deref(), Some("🔥"));
}

#[tokio::test]
async fn item_without_chat_has_no_context() {
    let graph = Arc::new(
        MockGraph::new().with_post(test_post("lonely", "ghost", PostCategory::Other, NOW)),
    );

    let page = ranker(&graph)
        .get_feed_at(FeedQuery::builder().user_id("bob").build(), NOW)
        .await
        .unwrap();

    let item = &page.items[0];
    assert!(item.author.is_none());
    assert!(item.chat_id.is_none());
    assert!(item.last_message.is_none());
    assert_eq!(item.unread_count, 0);
    assert_eq!(graph.calls("last_message"), 0);
}

#[tokio::test]
async fn signal_failure_fails_the_whole_request() {
    let graph = Arc::new(graph_with_history());
    graph.fail_on("intent_frequency");

    let err = ranker(&graph)
        .get_feed_at(FeedQuery::builder().user_id("bob").build(), NOW)
        .await
        .unwrap_err();

    assert!(matches!(err, AskmeError::Store(_)), "got {err:?}");
    assert_eq!(graph.calls("candidate_posts"), 0);
}

#[tokio::test]
async fn enrichment_failure_fails_the_whole_request() {
    let graph = Arc::new(
        MockGraph::new()
            .with_post(test_post("asked", "alice", PostCategory::Tech, NOW))
            .with_chat(test_chat("chat-1", "asked", NOW), &["bob"])
            .with_message(test_message("m1", "chat-1", "alice", MessageStatus::Sent, NOW)),
    );
    graph.fail_on("unread_count");

    let err = ranker(&graph)
        .get_feed_at(FeedQuery::builder().user_id("bob").build(), NOW)
        .await
        .unwrap_err();

    assert!(matches!(err, AskmeError::Store(_)), "got {err:?}");
}

#[tokio::test]
async fn signals_take_top_categories_by_frequency() {
    let graph = Arc::new(
        graph_with_history()
            .with_post(test_post("tech", "alice", PostCategory::Tech, NOW - DAY))
            .with_response("bob", "tech"),
    );

    let signals = ranker(&graph).gather_signals("bob").await.unwrap();

    assert_eq!(signals.categories, vec![PostCategory::Career, PostCategory::Tech]);
    assert!(signals.tags.contains("career-change"));
    assert!(signals.intents.is_empty());
}

#[tokio::test]
async fn signals_keep_only_the_most_frequent_categories_and_intents() {
    let mut graph = MockGraph::new();
    let mut n = 0;
    let mut answered = |graph: MockGraph, category: PostCategory, intent: &str| {
        n += 1;
        let id = format!("p{n}");
        let mut post = test_post(&id, "alice", category, NOW - DAY);
        post.intent = intent.to_string();
        graph.with_post(post).with_response("bob", &id)
    };

    // Twelve intents answered 12, 11, ..., 1 times, all on career posts.
    for i in 0..12 {
        for _ in 0..(12 - i) {
            graph = answered(graph, PostCategory::Career, &format!("intent-{i:02}"));
        }
    }
    // Six more categories answered 6, 5, ..., 1 times, without an intent.
    let others = [
        PostCategory::Tech,
        PostCategory::Health,
        PostCategory::Finance,
        PostCategory::Fun,
        PostCategory::Opinion,
        PostCategory::Lifestyle,
    ];
    for (i, category) in others.into_iter().enumerate() {
        for _ in 0..(6 - i) {
            graph = answered(graph, category, "");
        }
    }
    let graph = Arc::new(graph);

    let signals = ranker(&graph).gather_signals("bob").await.unwrap();

    assert_eq!(
        signals.categories,
        vec![
            PostCategory::Career,
            PostCategory::Tech,
            PostCategory::Health,
            PostCategory::Finance,
            PostCategory::Fun,
        ]
    );
    let expected: Vec<String> = (0..10).map(|i| format!("intent-{i:02}")).collect();
    assert_eq!(signals.intents, expected);
}
