pub mod query;

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use neo4rs::{Graph, Node};
use serde_json::{Map, Value};
use tracing::{debug, info};

pub use self::query::{EntityQuery, MAX_ENTITIES};
use crate::{error::Error, settings::GraphSettings};

/// Text used in place of graph context when nothing matched.
pub const NO_ENTITIES: &str = "No relevant entities found.";

/// Property set of one matched node, taken verbatim from the store.
pub type Entity = Map<String, Value>;

/// A store that can run an [`EntityQuery`].
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn find_entities(&self, query: &EntityQuery) -> Result<Vec<Entity>, Error>;
}

/// Neo4j-backed [`GraphStore`].
///
/// `neo4rs::Graph` keeps a connection pool, so one store can serve many
/// concurrent turns. Each search borrows a connection for the duration of
/// the call only.
pub struct Neo4jStore {
    graph: Arc<Graph>,
    timeout: Duration,
}

impl Neo4jStore {
    pub async fn connect(settings: &GraphSettings) -> Result<Self, Error> {
        let graph = Graph::new(
            settings.uri.as_str(),
            settings.user.as_str(),
            settings.password.as_str(),
        )
        .await
        .map_err(|e| Error::GraphUnavailable(format!("failed to connect to Neo4j: {e}")))?;
        info!("Connected to Neo4j at {}", settings.uri);

        Ok(Self {
            graph: Arc::new(graph),
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }

    async fn run(&self, query: &EntityQuery) -> Result<Vec<Entity>, Error> {
        let mut result = self
            .graph
            .execute(query.to_neo4rs())
            .await
            .map_err(|e| Error::GraphUnavailable(e.to_string()))?;

        let mut entities = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| Error::GraphUnavailable(e.to_string()))?
        {
            let node: Node = row
                .get("n")
                .map_err(|e| Error::GraphUnavailable(format!("unexpected row shape: {e}")))?;
            entities.push(node_properties(&node));
            if entities.len() == MAX_ENTITIES {
                break;
            }
        }
        Ok(entities)
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn find_entities(&self, query: &EntityQuery) -> Result<Vec<Entity>, Error> {
        match tokio::time::timeout(self.timeout, self.run(query)).await {
            Ok(result) => result,
            Err(_) => Err(Error::GraphUnavailable(format!(
                "query timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

fn node_properties(node: &Node) -> Entity {
    let mut entity = Entity::new();
    for key in node.keys() {
        match node.get::<Value>(key) {
            Ok(value) => {
                entity.insert(key.to_string(), value);
            }
            Err(e) => debug!("Skipping property {key} without a JSON form: {e}"),
        }
    }
    entity
}

/// Serialized graph facts inserted into the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBlob(String);

impl ContextBlob {
    /// Renders at most [`MAX_ENTITIES`] entities as pretty-printed JSON
    /// blocks separated by blank lines.
    pub fn from_entities(entities: &[Entity]) -> Self {
        if entities.is_empty() {
            return Self::empty();
        }
        let blocks = entities
            .iter()
            .take(MAX_ENTITIES)
            // A map of JSON values always serializes.
            .map(|e| serde_json::to_string_pretty(e).unwrap_or_default())
            .collect::<Vec<_>>();
        Self(blocks.join("\n\n"))
    }

    pub fn empty() -> Self {
        Self(NO_ENTITIES.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == NO_ENTITIES
    }
}

impl fmt::Display for ContextBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Runs entity searches and shapes the matches into a [`ContextBlob`].
#[derive(Clone)]
pub struct ContextFetcher {
    store: Arc<dyn GraphStore>,
}

impl ContextFetcher {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub async fn fetch(&self, query: &EntityQuery) -> Result<ContextBlob, Error> {
        let entities = self.store.find_entities(query).await?;
        debug!(
            "Graph search for {:?} matched {} entities",
            query.search_text(),
            entities.len()
        );
        Ok(ContextBlob::from_entities(&entities))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::{ContextBlob, ContextFetcher, Entity, EntityQuery, GraphStore, NO_ENTITIES};
    use crate::error::Error;

    /// Returns canned entities and records the search texts it receives.
    #[derive(Default)]
    pub(crate) struct FakeStore {
        pub(crate) entities: Vec<Entity>,
        pub(crate) unavailable: bool,
        pub(crate) searches: Mutex<Vec<String>>,
    }

    impl FakeStore {
        pub(crate) fn with(entities: Vec<Entity>) -> Self {
            Self {
                entities,
                ..Default::default()
            }
        }

        pub(crate) fn unavailable() -> Self {
            Self {
                unavailable: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl GraphStore for FakeStore {
        async fn find_entities(&self, query: &EntityQuery) -> Result<Vec<Entity>, Error> {
            self.searches
                .lock()
                .unwrap()
                .push(query.search_text().to_string());
            if self.unavailable {
                return Err(Error::GraphUnavailable("connection refused".to_string()));
            }
            Ok(self.entities.clone())
        }
    }

    pub(crate) fn entity(value: serde_json::Value) -> Entity {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("entity must be a JSON object"),
        }
    }

    #[tokio::test]
    async fn no_matches_yield_sentinel() {
        let fetcher = ContextFetcher::new(Arc::new(FakeStore::default()));
        let blob = fetcher.fetch(&EntityQuery::build("nothing")).await.unwrap();
        assert_eq!(blob.as_str(), NO_ENTITIES);
        assert!(blob.is_empty());
    }

    #[tokio::test]
    async fn serializes_each_match() {
        let store = FakeStore::with(vec![
            entity(json!({"disease": "Flu", "symptom": "fever, headache"})),
            entity(json!({"name": "Migraine"})),
        ]);
        let fetcher = ContextFetcher::new(Arc::new(store));
        let blob = fetcher.fetch(&EntityQuery::build("fever")).await.unwrap();

        assert_eq!(
            blob.as_str(),
            "{\n  \"disease\": \"Flu\",\n  \"symptom\": \"fever, headache\"\n}\n\n{\n  \"name\": \"Migraine\"\n}"
        );
    }

    #[tokio::test]
    async fn caps_matches() {
        let entities = (0..8)
            .map(|i| entity(json!({ "name": format!("entity-{i}") })))
            .collect();
        let fetcher = ContextFetcher::new(Arc::new(FakeStore::with(entities)));
        let blob = fetcher.fetch(&EntityQuery::build("entity")).await.unwrap();

        assert_eq!(blob.as_str().matches("\"name\"").count(), 5);
        assert!(blob.as_str().contains("entity-4"));
        assert!(!blob.as_str().contains("entity-5"));
    }

    #[tokio::test]
    async fn store_failure_is_reported() {
        let fetcher = ContextFetcher::new(Arc::new(FakeStore::unavailable()));
        let err = fetcher
            .fetch(&EntityQuery::build("fever"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GraphUnavailable(_)));
    }

    #[test]
    fn blocks_are_never_empty() {
        let blob = ContextBlob::from_entities(&[
            entity(json!({"name": "Asthma", "severity": 3, "triggers": ["dust", "cold air"]})),
            entity(json!({"title": null, "chronic": true})),
        ]);
        let blocks: Vec<&str> = blob.as_str().split("\n\n").collect();

        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.starts_with('{') && b.ends_with('}')));
        assert!(blocks[0].contains("\"triggers\": [\n    \"dust\",\n    \"cold air\"\n  ]"));
        assert!(blocks[1].contains("\"title\": null"));
    }

    #[test]
    fn blob_display() {
        let blob = ContextBlob::from_entities(&[entity(json!({"title": "Cold"}))]);
        assert_eq!(blob.to_string(), blob.as_str());
        assert_eq!(ContextBlob::from_entities(&[]), ContextBlob::empty());
    }
}
