//! Tag resolution against the in-memory graph.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use askme_common::{AskmeError, Tag};
use askme_core::testing::MockGraph;
use askme_core::TagResolver;

fn resolver(graph: &Arc<MockGraph>) -> TagResolver {
    TagResolver::new(graph.clone())
}

fn remote_work() -> Tag {
    let mut tag = Tag::from_raw("Remote Work", 1_000);
    tag.aliases.push("wfh".to_string());
    tag
}

/// Background usage increments land eventually; poll until they do.
async fn wait_for_usage(graph: &MockGraph, key: &str, expected: i64) {
    for _ in 0..100 {
        if graph.tag(key).map(|t| t.usage_count) == Some(expected) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "usage of {key} never reached {expected}, got {:?}",
        graph.tag(key).map(|t| t.usage_count)
    );
}

#[tokio::test]
async fn unknown_tag_is_created_with_derived_key_and_label() {
    let graph = Arc::new(MockGraph::new());
    let key = resolver(&graph).resolve_one("Career Change").await.unwrap();

    assert_eq!(key, "career-change");
    let tag = graph.tag("career-change").unwrap();
    assert_eq!(tag.label, "Career Change");
    assert_eq!(tag.aliases, vec!["Career Change".to_string()]);
    assert_eq!(tag.usage_count, 1);
}

#[tokio::test]
async fn equivalent_strings_resolve_to_one_tag() {
    let graph = Arc::new(MockGraph::new());
    let tags = resolver(&graph);

    let a = tags.resolve_one("Career Change").await.unwrap();
    let b = tags.resolve_one("career change").await.unwrap();
    let c = tags.resolve_one("career_change!").await.unwrap();

    assert_eq!(a, "career-change");
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(graph.tag_count(), 1);
}

#[tokio::test]
async fn alias_hit_returns_existing_key_and_bumps_usage() {
    let graph = Arc::new(MockGraph::new().with_tag(remote_work()));

    let key = resolver(&graph).resolve_one("WFH").await.unwrap();

    assert_eq!(key, "remote-work");
    assert_eq!(graph.calls("create_tag"), 0);
    wait_for_usage(&graph, "remote-work", 2).await;
}

#[tokio::test]
async fn parallel_resolution_of_same_tag_creates_exactly_one() {
    let graph = Arc::new(MockGraph::new());
    let tags = resolver(&graph);

    let raws = ["Career Change", "career change"];
    let results = join_all((0..20).map(|i| {
        let tags = tags.clone();
        let raw = raws[i % 2];
        async move { tags.resolve_one(raw).await }
    }))
    .await;

    for result in &results {
        assert_eq!(result.as_deref().unwrap(), "career-change");
    }
    assert_eq!(graph.tag_count(), 1);
    assert!(graph.calls("create_tag") > 1, "expected the creations to race");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_tasks_on_separate_threads_converge() {
    let graph = Arc::new(MockGraph::new());
    let tags = resolver(&graph);

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let tags = tags.clone();
            let raw = if i % 2 == 0 { "Career Change" } else { "career change" };
            tokio::spawn(async move { tags.resolve_one(raw).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "career-change");
    }
    assert_eq!(graph.tag_count(), 1);
}

#[tokio::test]
async fn batch_dedupes_keys_in_first_seen_order() {
    let graph = Arc::new(MockGraph::new().with_tag(remote_work()));

    let keys = resolver(&graph)
        .resolve_batch(&["wfh".into(), "wfh".into(), "remote work".into()])
        .await
        .unwrap();

    assert_eq!(keys, vec!["remote-work".to_string()]);
    assert_eq!(graph.tag_count(), 1);
}

#[tokio::test]
async fn batch_keeps_distinct_keys_in_input_order() {
    let graph = Arc::new(MockGraph::new());

    let keys = resolver(&graph)
        .resolve_batch(&["Rust".into(), "Go".into(), "rust".into(), "Career Change".into()])
        .await
        .unwrap();

    assert_eq!(keys, vec!["rust", "go", "career-change"]);
}

#[tokio::test]
async fn empty_batch_touches_nothing() {
    let graph = Arc::new(MockGraph::new());

    let keys = resolver(&graph).resolve_batch(&[]).await.unwrap();

    assert!(keys.is_empty());
    assert_eq!(graph.total_calls(), 0);
}

#[tokio::test]
async fn symbol_only_tags_are_rejected_or_skipped() {
    let graph = Arc::new(MockGraph::new());
    let tags = resolver(&graph);

    let err = tags.resolve_one("!!!").await.unwrap_err();
    assert!(matches!(err, AskmeError::InvalidInput(_)), "got {err:?}");

    let keys = tags
        .resolve_batch(&["!!!".into(), "Rust".into()])
        .await
        .unwrap();
    assert_eq!(keys, vec!["rust"]);
    assert_eq!(graph.tag_count(), 1);
}

#[tokio::test]
async fn batch_fails_fast_on_store_error() {
    let graph = Arc::new(MockGraph::new());
    graph.fail_on("find_tag_by_alias_or_label");

    let err = resolver(&graph)
        .resolve_batch(&["Rust".into(), "Go".into()])
        .await
        .unwrap_err();

    assert!(matches!(err, AskmeError::Store(_)), "got {err:?}");
    assert_eq!(graph.tag_count(), 0);
}

#[tokio::test]
async fn failed_usage_increment_does_not_fail_resolution() {
    let graph = Arc::new(MockGraph::new().with_tag(remote_work()));
    graph.fail_on("increment_tag_usage");

    let key = resolver(&graph).resolve_one("wfh").await.unwrap();
    assert_eq!(key, "remote-work");

    for _ in 0..100 {
        if graph.calls("increment_tag_usage") > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(graph.calls("increment_tag_usage"), 1);
    assert_eq!(graph.tag("remote-work").unwrap().usage_count, 1);
}

#[tokio::test]
async fn catalogue_reads() {
    let mut go = Tag::from_raw("Go", 2_000);
    go.usage_count = 5;
    let graph = Arc::new(
        MockGraph::new()
            .with_tag(remote_work())
            .with_tag(go)
            .with_tag(Tag::from_raw("Homebrew", 3_000)),
    );
    let tags = resolver(&graph);

    let tag = tags.get_tag("go").await.unwrap();
    assert_eq!(tag.label, "Go");
    let missing = tags.get_tag("nope").await.unwrap_err();
    assert!(matches!(missing, AskmeError::NotFound(_)));

    let listed = tags.list_tags(None, None).await.unwrap();
    assert_eq!(listed[0].key, "go");
    assert_eq!(listed.len(), 3);
    let paged = tags.list_tags(Some(1), Some(1)).await.unwrap();
    assert_eq!(paged.len(), 1);

    let mut hits: Vec<String> = tags
        .search_tags("WORK", None)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.key)
        .collect();
    hits.sort();
    assert_eq!(hits, vec!["remote-work"]);
}
