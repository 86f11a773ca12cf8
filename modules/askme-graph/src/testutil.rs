//! Disposable Neo4j instances for integration tests.

use testcontainers::{
    core::{ContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

use crate::GraphClient;

const NEO4J_IMAGE: &str = "neo4j";
const NEO4J_TAG: &str = "5.25.1";
const BOLT_PORT: u16 = 7687;
const TEST_PASSWORD: &str = "askme-test";

/// Start a community Neo4j container and connect to it.
///
/// Hold the returned container for the whole test; dropping it stops Neo4j.
pub async fn neo4j_container() -> (ContainerAsync<GenericImage>, GraphClient) {
    let container = GenericImage::new(NEO4J_IMAGE, NEO4J_TAG)
        .with_exposed_port(ContainerPort::Tcp(BOLT_PORT))
        .with_wait_for(WaitFor::message_on_stdout("Started."))
        .with_env_var("NEO4J_AUTH", format!("neo4j/{TEST_PASSWORD}"))
        .start()
        .await
        .expect("Failed to start Neo4j container");

    let port = container
        .get_host_port_ipv4(BOLT_PORT)
        .await
        .expect("Failed to get Neo4j host port");

    let client = GraphClient::connect(&format!("bolt://127.0.0.1:{port}"), "neo4j", TEST_PASSWORD)
        .await
        .expect("Failed to connect to Neo4j");

    (container, client)
}

/// `neo4j_container` with the schema already migrated, so uniqueness
/// constraints are live before the first write.
pub async fn migrated_neo4j() -> (ContainerAsync<GenericImage>, GraphClient) {
    let (container, client) = neo4j_container().await;
    crate::migrate::migrate(&client)
        .await
        .expect("migration failed");
    (container, client)
}
