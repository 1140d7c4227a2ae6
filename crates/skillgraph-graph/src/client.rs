//! Neo4j connection management and shared graph client.

use neo4rs::{query, ConfigBuilder, Graph, Query};

use skillgraph_core::config::Neo4jSettings;
use skillgraph_core::{EntityKind, ErrorKind};

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("Endpoint missing for {relation} from {from} to {to}")]
    MissingEndpoint {
        relation: String,
        from: String,
        to: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GraphError {
    /// Every store failure surfaces to callers as an unavailable store.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::StorageUnavailable
    }
}

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub fetch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::from_settings(&Neo4jSettings::default())
    }
}

impl GraphConfig {
    pub fn from_settings(settings: &Neo4jSettings) -> Self {
        Self {
            uri: settings.uri.clone(),
            user: settings.user.clone(),
            password: settings.password.clone(),
            max_connections: settings.max_connections,
            fetch_size: settings.fetch_size,
        }
    }
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Create the uniqueness constraint on `key` for each node label.
    ///
    /// Idempotent; safe to call at every startup.
    pub async fn ensure_schema(&self) -> Result<(), GraphError> {
        for kind in [EntityKind::Person, EntityKind::Skill, EntityKind::Project] {
            let label = kind.label();
            let cypher = format!(
                "CREATE CONSTRAINT {lower}_key_unique IF NOT EXISTS
                 FOR (n:{label}) REQUIRE n.key IS UNIQUE",
                lower = label.to_lowercase()
            );
            self.run(query(&cypher)).await?;
        }
        tracing::debug!("Graph schema constraints ensured");
        Ok(())
    }

    /// Execute a write-only query (MERGE, SET, DELETE).
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Execute a read query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a read query and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        Ok(stream.next().await?)
    }

    /// Begin a transaction.
    pub async fn start_txn(&self) -> Result<neo4rs::Txn, GraphError> {
        Ok(self.graph.start_txn().await?)
    }
}
