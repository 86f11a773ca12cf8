use neo4rs::query;
use tracing::{debug, info};

use crate::GraphClient;

/// Run idempotent schema migrations: constraints, indexes.
pub async fn migrate(client: &GraphClient) -> Result<(), neo4rs::Error> {
    let g = &client.graph;

    info!("Running schema migrations...");

    // Tag.key uniqueness is what lets concurrent tag creation settle on one winner.
    let constraints = [
        "CREATE CONSTRAINT tag_key IF NOT EXISTS FOR (t:Tag) REQUIRE t.key IS UNIQUE",
        "CREATE CONSTRAINT user_id IF NOT EXISTS FOR (u:User) REQUIRE u.id IS UNIQUE",
        "CREATE CONSTRAINT post_id IF NOT EXISTS FOR (p:Post) REQUIRE p.id IS UNIQUE",
        "CREATE CONSTRAINT chat_id IF NOT EXISTS FOR (c:Chat) REQUIRE c.id IS UNIQUE",
        "CREATE CONSTRAINT message_id IF NOT EXISTS FOR (m:Message) REQUIRE m.id IS UNIQUE",
    ];

    for c in &constraints {
        run_ignoring_exists(g, c).await?;
    }
    info!("Uniqueness constraints created");

    let indexes = [
        "CREATE INDEX post_category IF NOT EXISTS FOR (p:Post) ON (p.category)",
        "CREATE INDEX post_depth IF NOT EXISTS FOR (p:Post) ON (p.depth)",
        "CREATE INDEX post_created_at IF NOT EXISTS FOR (p:Post) ON (p.created_at)",
        "CREATE INDEX tag_usage IF NOT EXISTS FOR (t:Tag) ON (t.usage_count)",
        "CREATE INDEX chat_post IF NOT EXISTS FOR (c:Chat) ON (c.post_id)",
        "CREATE INDEX message_chat IF NOT EXISTS FOR (m:Message) ON (m.chat_id)",
    ];

    for idx in &indexes {
        run_ignoring_exists(g, idx).await?;
    }
    info!("Property indexes created");

    info!("Schema migrations complete");
    Ok(())
}

/// Schema statements are `IF NOT EXISTS`, but an equivalent object under a
/// different name still errors; treat that as success.
async fn run_ignoring_exists(g: &neo4rs::Graph, statement: &str) -> Result<(), neo4rs::Error> {
    let Err(e) = g.run(query(statement)).await else {
        return Ok(());
    };
    let msg = e.to_string().to_lowercase();
    if !(msg.contains("already exists") || msg.contains("equivalent")) {
        return Err(e);
    }
    let name = statement.split_whitespace().nth(2).unwrap_or(statement);
    debug!(name, "Schema object already exists, skipped");
    Ok(())
}
