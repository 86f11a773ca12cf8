use neo4rs::{query, ConfigBuilder, Graph};
use tracing::info;

use askme_common::Config;

const FETCH_SIZE: usize = 500;
const MAX_CONNECTIONS: usize = 10;

/// Pooled Neo4j connection shared by the graph facades. Cheap to clone.
#[derive(Clone)]
pub struct GraphClient {
    pub(crate) graph: Graph,
}

impl GraphClient {
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, neo4rs::Error> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .fetch_size(FETCH_SIZE)
            .max_connections(MAX_CONNECTIONS)
            .build()?;
        let graph = Graph::connect(config).await?;
        info!(uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    pub async fn from_config(config: &Config) -> Result<Self, neo4rs::Error> {
        Self::connect(&config.neo4j_uri, &config.neo4j_user, &config.neo4j_password).await
    }

    /// Round-trip a trivial query. Used at startup to fail before serving.
    pub async fn ping(&self) -> Result<(), neo4rs::Error> {
        self.graph.run(query("RETURN 1")).await
    }

    /// Raw driver handle, for seeding and ad-hoc queries in tests.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }
}
