//! Integration tests for canonical tag storage.
//!
//! Requirements: Docker (for Neo4j via testcontainers)
//!
//! Run with: cargo test -p askme-graph --features test-utils --test tag_graph_test

#![cfg(feature = "test-utils")]

use askme_common::Tag;
use askme_graph::{GraphClient, StoreError, TagGraph};

async fn setup() -> (impl std::any::Any, GraphClient) {
    askme_graph::testutil::migrated_neo4j().await
}

fn tag(raw: &str) -> Tag {
    Tag::from_raw(raw, 1_700_000_000_000)
}

#[tokio::test]
async fn create_then_find_by_key() {
    let (_c, client) = setup().await;
    let tags = TagGraph::new(client);

    let key = tags.create(&tag("Career Change")).await.unwrap();
    assert_eq!(key, "career-change");

    let found = tags.find_by_key("career-change").await.unwrap().unwrap();
    assert_eq!(found.label, "Career Change");
    assert_eq!(found.aliases, vec!["Career Change".to_string()]);
    assert_eq!(found.usage_count, 1);
    assert_eq!(found.created_at, 1_700_000_000_000);
}

#[tokio::test]
async fn duplicate_key_is_reported_distinctly() {
    let (_c, client) = setup().await;
    let tags = TagGraph::new(client);

    tags.create(&tag("Career Change")).await.unwrap();
    let err = tags.create(&tag("career_change")).await.unwrap_err();
    assert!(
        matches!(err, StoreError::DuplicateKey(ref k) if k == "career-change"),
        "expected DuplicateKey, got {err:?}"
    );
}

#[tokio::test]
async fn alias_and_label_lookup_ignores_case() {
    let (_c, client) = setup().await;
    let tags = TagGraph::new(client);

    let mut remote = tag("Remote Work");
    remote.aliases.push("WFH".into());
    tags.create(&remote).await.unwrap();

    let by_alias = tags.find_by_alias_or_label("wfh").await.unwrap();
    assert_eq!(by_alias.map(|t| t.key), Some("remote-work".to_string()));

    let by_label = tags.find_by_alias_or_label("REMOTE WORK").await.unwrap();
    assert_eq!(by_label.map(|t| t.key), Some("remote-work".to_string()));

    assert!(tags.find_by_alias_or_label("remote").await.unwrap().is_none());
}

#[tokio::test]
async fn increment_bumps_usage_and_list_orders_by_it() {
    let (_c, client) = setup().await;
    let tags = TagGraph::new(client);

    tags.create(&tag("Rust")).await.unwrap();
    tags.create(&tag("Go")).await.unwrap();
    tags.increment_usage("go").await.unwrap();
    tags.increment_usage("go").await.unwrap();

    let listed = tags.list_by_usage(10, 0).await.unwrap();
    let keys: Vec<&str> = listed.iter().map(|t| t.key.as_str()).collect();
    assert_eq!(keys, vec!["go", "rust"]);
    assert_eq!(listed[0].usage_count, 3);

    let second_page = tags.list_by_usage(10, 1).await.unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].key, "rust");
}

#[tokio::test]
async fn search_matches_label_and_alias_substrings() {
    let (_c, client) = setup().await;
    let tags = TagGraph::new(client);

    let mut remote = tag("Remote Work");
    remote.aliases.push("work from home".into());
    tags.create(&remote).await.unwrap();
    tags.create(&tag("Homebrew")).await.unwrap();
    tags.create(&tag("Finance")).await.unwrap();

    let hits = tags.search("home", 10).await.unwrap();
    let mut keys: Vec<String> = hits.into_iter().map(|t| t.key).collect();
    keys.sort();
    assert_eq!(keys, vec!["homebrew".to_string(), "remote-work".to_string()]);
}
