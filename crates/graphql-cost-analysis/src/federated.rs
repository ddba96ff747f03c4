use async_graphql_parser::types::{EnumValueDefinition, TypeKind, TypeSystemDefinition};
use async_graphql_value::ConstValue;
use futures_util::future::join_all;
use url::Url;

use crate::{
    cost_map::CostMap,
    error::ConfigurationError,
    extract::extract_cost_map,
    fetch::{SchemaFetcher, SchemaRequest},
};

const GRAPH_ENUM_NAME: &str = "join__Graph";
const GRAPH_DIRECTIVE_NAME: &str = "join__graph";

/// A subgraph as declared in the supergraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subgraph {
    pub name: String,
    pub url: Url,
}

/// Lists the subgraphs of a supergraph, in declaration order.
pub fn subgraphs(supergraph_sdl: &str) -> Result<Vec<Subgraph>, ConfigurationError> {
    let document = async_graphql_parser::parse_schema(supergraph_sdl).map_err(ConfigurationError::InvalidSupergraph)?;

    let values = document
        .definitions
        .iter()
        .find_map(|definition| match definition {
            TypeSystemDefinition::Type(ty) if ty.node.name.node.as_str() == GRAPH_ENUM_NAME => match &ty.node.kind {
                TypeKind::Enum(enum_type) => Some(&enum_type.values),
                _ => None,
            },
            _ => None,
        })
        .ok_or(ConfigurationError::MissingGraphEnum)?;

    if values.is_empty() {
        return Err(ConfigurationError::NoGraphs);
    }

    values.iter().map(|value| subgraph(&value.node)).collect()
}

fn subgraph(value: &EnumValueDefinition) -> Result<Subgraph, ConfigurationError> {
    let graph = value.value.node.to_string();

    let directive = value
        .directives
        .iter()
        .find(|directive| directive.node.name.node.as_str() == GRAPH_DIRECTIVE_NAME)
        .ok_or_else(|| ConfigurationError::MissingServiceUrl(graph.clone()))?;

    let string_argument = |name: &str| match directive.node.get_argument(name).map(|value| &value.node) {
        Some(ConstValue::String(value)) => Some(value.as_str()),
        _ => None,
    };

    let url = string_argument("url").ok_or_else(|| ConfigurationError::MissingServiceUrl(graph.clone()))?;
    let url = Url::parse(url).map_err(|error| ConfigurationError::InvalidServiceUrl {
        graph: graph.clone(),
        url: url.to_owned(),
        error,
    })?;

    let name = string_argument("name")
        .map(str::to_owned)
        .unwrap_or_else(|| graph.to_lowercase());

    Ok(Subgraph { name, url })
}

/// Builds the cost map of a supergraph from the cost-annotated schemas of its subgraphs.
///
/// Subgraphs that cannot be reached, time out, or do not expose a schema with directives are
/// skipped. Their coordinates are simply absent from the map.
pub async fn build_federated_cost_map(
    supergraph_sdl: &str,
    fetcher: &SchemaFetcher,
) -> Result<CostMap, ConfigurationError> {
    let subgraphs = subgraphs(supergraph_sdl)?;

    let schemas = join_all(subgraphs.iter().map(|subgraph| {
        fetcher.fetch_sdl(SchemaRequest {
            subgraph_name: &subgraph.name,
            url: &subgraph.url,
        })
    }))
    .await;

    let mut cost_map = CostMap::new();

    for (subgraph, schema) in subgraphs.iter().zip(schemas) {
        let sdl = match schema {
            Ok(Some(sdl)) => sdl,
            Ok(None) => {
                tracing::warn!(
                    "Subgraph `{}` does not expose its schema with directives, its costs are ignored",
                    subgraph.name
                );
                continue;
            }
            Err(error) => {
                tracing::warn!("Could not fetch the schema of subgraph `{}`: {error}", subgraph.name);
                continue;
            }
        };

        match extract_cost_map(&sdl) {
            Ok(subgraph_cost_map) => {
                tracing::debug!(
                    "Subgraph `{}` contributed {} cost entries",
                    subgraph.name,
                    subgraph_cost_map.len()
                );
                cost_map.merge(subgraph_cost_map);
            }
            Err(error) => {
                tracing::warn!("Ignoring the schema of subgraph `{}`: {error}", subgraph.name);
            }
        }
    }

    Ok(cost_map)
}
