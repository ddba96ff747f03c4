use std::path::Path;

use gateway_cost_control::{CostControl, CostLimit, CostMapPublisher, SchemaGeneration};
use graphql_cost_analysis::{build_federated_cost_map, extract_cost_map, ApiSchema, CostMap, SchemaFetcher, Variables};
use serde_json::{json, Value};

use crate::args::{read, AnalyzeArgs, Config};

pub(crate) fn extract(schema: &Path) -> anyhow::Result<Value> {
    let cost_map = extract_cost_map(&read(schema)?)?;

    Ok(serde_json::to_value(cost_map)?)
}

pub(crate) async fn federated(supergraph: &Path, config: Option<&Path>) -> anyhow::Result<Value> {
    let config = Config::load(config)?;
    let timeout = config.cost_control.unwrap_or_default().subgraph_schema_timeout();

    let fetcher = SchemaFetcher::http().with_timeout(timeout);
    let cost_map = build_federated_cost_map(&read(supergraph)?, &fetcher).await?;

    tracing::info!("Built a cost map with {} entries", cost_map.len());

    Ok(serde_json::to_value(cost_map)?)
}

pub(crate) fn analyze(args: &AnalyzeArgs) -> anyhow::Result<Value> {
    let config = Config::load(args.config.as_deref())?;

    // Without configuration the costs are only measured.
    let limit = config
        .cost_control
        .as_ref()
        .map(CostLimit::from)
        .unwrap_or(CostLimit::Measure { limit: None });

    let schema = ApiSchema::parse(&read(&args.schema)?)?;
    let generation = SchemaGeneration::new(schema, cost_map(args)?);
    let (_publisher, generations) = CostMapPublisher::new(generation, SchemaFetcher::http());
    let control = CostControl::new(limit, generations);

    let variables = match &args.variables {
        Some(path) => serde_json::from_str::<Variables>(&read(path)?)?,
        None => Variables::new(),
    };

    let operation = control.prepare(&read(&args.query)?, args.operation_name.as_deref(), variables)?;
    let estimated = control.check(&operation)?;

    let response = match &args.response {
        Some(path) => {
            let mut response: Value = serde_json::from_str(&read(path)?)?;
            control.record_response(&operation, &mut response)?;
            Some(response)
        }
        None => None,
    };

    let actual = response
        .as_ref()
        .and_then(|response| response.pointer("/extensions/operationCosts"))
        .cloned();

    Ok(json!({
        "estimated": estimated,
        "actual": actual,
    }))
}

fn cost_map(args: &AnalyzeArgs) -> anyhow::Result<CostMap> {
    if let Some(path) = &args.cost_map {
        return Ok(serde_json::from_str(&read(path)?)?);
    }

    if args.subgraph.is_empty() {
        tracing::warn!("No cost map or subgraph given, every type and composite field weighs 1");
    }

    let mut cost_map = CostMap::new();

    for path in &args.subgraph {
        cost_map.merge(extract_cost_map(&read(path)?)?);
    }

    Ok(cost_map)
}
