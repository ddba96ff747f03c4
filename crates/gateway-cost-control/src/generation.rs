use std::sync::Arc;

use graphql_cost_analysis::{build_federated_cost_map, ApiSchema, CostMap, SchemaFetcher};
use tokio::sync::watch;

use crate::error::CostControlError;

/// A schema and the costs of its coordinates. Requests pin the generation that was current when
/// they started, so a reload never changes the costs of an operation in flight.
#[derive(Debug)]
pub struct SchemaGeneration {
    pub schema: ApiSchema,
    pub cost_map: CostMap,
}

impl SchemaGeneration {
    pub fn new(schema: ApiSchema, cost_map: CostMap) -> Self {
        SchemaGeneration { schema, cost_map }
    }

    /// Builds a generation from a supergraph, fetching the cost-annotated schema of every subgraph.
    pub async fn from_supergraph(supergraph_sdl: &str, fetcher: &SchemaFetcher) -> Result<Self, CostControlError> {
        let schema = ApiSchema::parse(supergraph_sdl)?;
        let cost_map = build_federated_cost_map(supergraph_sdl, fetcher).await?;

        Ok(SchemaGeneration { schema, cost_map })
    }
}

pub type GenerationSender = watch::Sender<Arc<SchemaGeneration>>;
pub type GenerationWatcher = watch::Receiver<Arc<SchemaGeneration>>;

/// Publishes a new schema generation whenever the supergraph changes.
pub struct CostMapPublisher {
    sender: GenerationSender,
    fetcher: SchemaFetcher,
}

impl CostMapPublisher {
    pub fn new(initial: SchemaGeneration, fetcher: SchemaFetcher) -> (Self, GenerationWatcher) {
        let (sender, watcher) = watch::channel(Arc::new(initial));

        (CostMapPublisher { sender, fetcher }, watcher)
    }

    pub async fn from_supergraph(
        supergraph_sdl: &str,
        fetcher: SchemaFetcher,
    ) -> Result<(Self, GenerationWatcher), CostControlError> {
        let initial = SchemaGeneration::from_supergraph(supergraph_sdl, &fetcher).await?;

        Ok(Self::new(initial, fetcher))
    }

    pub fn subscribe(&self) -> GenerationWatcher {
        self.sender.subscribe()
    }

    /// Replaces the current generation. Requests already holding the previous one keep it.
    pub fn publish(&self, generation: SchemaGeneration) {
        let entries = generation.cost_map.len();
        self.sender.send_replace(Arc::new(generation));

        tracing::debug!("Published a new schema generation with {entries} cost entries");
    }

    /// Rebuilds the generation from a new supergraph. On failure the current one stays in place.
    pub async fn reload(&self, supergraph_sdl: &str) -> Result<(), CostControlError> {
        let generation = SchemaGeneration::from_supergraph(supergraph_sdl, &self.fetcher).await?;
        self.publish(generation);

        Ok(())
    }
}
