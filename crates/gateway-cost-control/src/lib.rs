//! Cost control for a federated GraphQL gateway.
//!
//! The gateway builds a [`SchemaGeneration`] from its supergraph and publishes it with a
//! [`CostMapPublisher`]. Each request is [prepared](CostControl::prepare) against the current
//! generation, [checked](CostControl::check) before execution and, once executed, its response is
//! annotated with the realized cost by [`CostControl::record_response`].

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod config;
mod error;
mod generation;
mod sdl;

use std::sync::Arc;

use async_graphql_parser::{
    parse_query,
    types::{DocumentOperations, ExecutableDocument},
};
use graphql_cost_analysis::{CostAnalyzer, OperationCostData, Variables};
use serde_json::Value;

pub use self::{
    config::{CostControlConfig, CostControlMode, CostLimit, DEFAULT_MAX_FIELD_COST},
    error::CostControlError,
    generation::{CostMapPublisher, GenerationSender, GenerationWatcher, SchemaGeneration},
    sdl::add_sdl_with_directives,
};

const INTROSPECTION_OPERATION_NAME: &str = "IntrospectionQuery";

#[derive(Clone)]
pub struct CostControl {
    limit: CostLimit,
    generations: GenerationWatcher,
}

/// An operation pinned to the schema generation that was current when the request arrived.
pub struct PreparedOperation {
    generation: Arc<SchemaGeneration>,
    document: ExecutableDocument,
    operation_name: Option<String>,
    variables: Variables,
}

impl PreparedOperation {
    fn analyzer(&self) -> CostAnalyzer<'_> {
        CostAnalyzer::new(&self.generation.schema, &self.generation.cost_map)
    }

    fn is_introspection(&self) -> bool {
        let name = match (&self.document.operations, self.operation_name.as_deref()) {
            (_, Some(name)) => Some(name),
            (DocumentOperations::Multiple(operations), None) if operations.len() == 1 => {
                operations.keys().next().map(|name| name.as_str())
            }
            _ => None,
        };

        name == Some(INTROSPECTION_OPERATION_NAME)
    }
}

impl CostControl {
    pub fn new(limit: CostLimit, generations: GenerationWatcher) -> Self {
        CostControl { limit, generations }
    }

    pub fn from_config(config: &CostControlConfig, generations: GenerationWatcher) -> Self {
        Self::new(CostLimit::from(config), generations)
    }

    pub fn prepare(
        &self,
        query: &str,
        operation_name: Option<&str>,
        variables: Variables,
    ) -> Result<PreparedOperation, CostControlError> {
        let generation = self.generations.borrow().clone();
        let document = parse_query(query)?;

        Ok(PreparedOperation {
            generation,
            document,
            operation_name: operation_name.map(str::to_owned),
            variables,
        })
    }

    /// Estimates the cost of an operation before it is executed.
    ///
    /// Returns `None` when cost control is disabled or for introspection queries.
    pub fn check(&self, operation: &PreparedOperation) -> Result<Option<OperationCostData>, CostControlError> {
        if !self.limit.is_enabled() || operation.is_introspection() {
            return Ok(None);
        }

        let cost = operation.analyzer().static_cost(
            &operation.document,
            operation.operation_name.as_deref(),
            &operation.variables,
        )?;

        let Some(limit) = self.limit.limit().filter(|limit| cost.field_cost > *limit) else {
            return Ok(Some(cost));
        };

        if self.limit.is_enforce() {
            tracing::debug!(
                "Rejecting operation with an estimated field cost of {} over the limit of {limit}",
                cost.field_cost
            );

            return Err(CostControlError::CostLimitExceeded {
                field_cost: cost.field_cost,
                limit,
            });
        }

        tracing::warn!(
            "Estimated field cost of {} exceeds maximum operation field cost of {limit}",
            cost.field_cost
        );

        Ok(Some(cost))
    }

    /// Computes the cost of an executed operation from its data and adds it to the response under
    /// `extensions.operationCosts`.
    pub fn record_response(
        &self,
        operation: &PreparedOperation,
        response: &mut Value,
    ) -> Result<Option<OperationCostData>, CostControlError> {
        if !self.limit.is_enabled() || operation.is_introspection() {
            return Ok(None);
        }

        let cost = operation.analyzer().response_cost(
            &operation.document,
            operation.operation_name.as_deref(),
            &operation.variables,
            response.get("data"),
        )?;

        let Some(cost) = cost else {
            return Ok(None);
        };

        let Some(response) = response.as_object_mut() else {
            return Ok(Some(cost));
        };

        let extensions = response
            .entry("extensions")
            .or_insert_with(|| Value::Object(Default::default()));

        match (extensions, serde_json::to_value(cost)) {
            (Value::Object(extensions), Ok(costs)) => {
                extensions.insert("operationCosts".to_owned(), costs);
            }
            (Value::Object(_), Err(error)) => tracing::warn!("Could not serialize the operation costs: {error}"),
            _ => tracing::warn!("Response extensions are not an object, not adding the operation costs"),
        }

        Ok(Some(cost))
    }
}

#[cfg(test)]
mod tests {
    use graphql_cost_analysis::{
        extract_cost_map, ApiSchema, FetchError, FetchResult, SchemaFetcher, SchemaFetcherInner, SchemaRequest,
    };
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    const SDL: &str = indoc! {r#"
        type Query {
            products(first: Int): [Product] @listSize(slicingArguments: ["first"])
        }

        type Product {
            name: String
            reviews: [Review] @listSize(assumedSize: 2)
        }

        type Review {
            content: String @cost(weight: "3")
        }
    "#};

    fn generation(sdl: &str) -> SchemaGeneration {
        SchemaGeneration::new(ApiSchema::parse(sdl).unwrap(), extract_cost_map(sdl).unwrap())
    }

    struct Unused;

    #[async_trait::async_trait]
    impl SchemaFetcherInner for Unused {
        async fn fetch_sdl(&self, _: SchemaRequest<'_>) -> FetchResult<Option<String>> {
            Err(FetchError::any("no subgraph"))
        }
    }

    fn control(limit: CostLimit) -> (CostMapPublisher, CostControl) {
        let (publisher, watcher) = CostMapPublisher::new(generation(SDL), SchemaFetcher::new(Unused));

        (publisher, CostControl::new(limit, watcher))
    }

    fn no_variables() -> Variables {
        Variables::new()
    }

    #[test]
    fn enforce_rejects_expensive_operations() {
        let (_publisher, control) = control(CostLimit::Enforce { limit: 20.0 });

        // products + 10 × reviews + 20 × 3 for content
        let operation = control
            .prepare("{ products(first: 10) { reviews { content } } }", None, no_variables())
            .unwrap();
        let error = control.check(&operation).unwrap_err();

        assert!(error.is_rejection());
        assert_eq!(
            error.to_string(),
            "Estimated field cost of 71 exceeds maximum operation field cost of 20."
        );

        let operation = control
            .prepare("{ products(first: 2) { name } }", None, no_variables())
            .unwrap();
        let cost = control.check(&operation).unwrap().unwrap();

        assert_eq!(cost.field_cost, 1.0);
    }

    #[test]
    fn measure_reports_without_rejecting() {
        let (_publisher, control) = control(CostLimit::Measure { limit: Some(1.0) });

        let operation = control
            .prepare("{ products(first: 10) { reviews { content } } }", None, no_variables())
            .unwrap();

        assert_eq!(control.check(&operation).unwrap().unwrap().field_cost, 71.0);
    }

    #[test]
    fn disabled_control_computes_nothing() {
        let (_publisher, control) = control(CostLimit::Disabled);

        let operation = control
            .prepare("{ products(first: 10) { name } }", None, no_variables())
            .unwrap();

        assert_eq!(control.check(&operation).unwrap(), None);
    }

    #[test]
    fn introspection_is_skipped() {
        let (_publisher, control) = control(CostLimit::Enforce { limit: 0.0 });

        let operation = control
            .prepare(
                "query IntrospectionQuery { products(first: 100) { name } }",
                None,
                no_variables(),
            )
            .unwrap();

        assert_eq!(control.check(&operation).unwrap(), None);
    }

    #[test]
    fn invalid_operations_are_rejected() {
        let (_publisher, control) = control(CostLimit::Measure { limit: None });

        let error = control.prepare("{ products(", None, no_variables()).err().unwrap();

        assert!(matches!(error, CostControlError::InvalidOperation(_)));
        assert!(error.is_rejection());
    }

    #[test]
    fn responses_carry_the_realized_cost() {
        let (_publisher, control) = control(CostLimit::Measure { limit: None });

        let operation = control
            .prepare(
                "query Reviews($first: Int) { products(first: $first) { reviews { content } } }",
                Some("Reviews"),
                match json!({ "first": 10 }) {
                    Value::Object(variables) => variables,
                    _ => unreachable!(),
                },
            )
            .unwrap();

        let mut response = json!({
            "data": {
                "products": [
                    { "reviews": [{ "content": "great" }] }
                ]
            }
        });

        let cost = control.record_response(&operation, &mut response).unwrap();

        // products + reviews + content weighing 3
        assert_eq!(
            response["extensions"],
            json!({ "operationCosts": { "typeCost": 3.0, "fieldCost": 5.0 } })
        );
        assert_eq!(cost.map(|cost| cost.field_cost), Some(5.0));
    }

    #[test]
    fn failed_responses_are_not_annotated() {
        let (_publisher, control) = control(CostLimit::Measure { limit: None });

        let operation = control
            .prepare("{ products(first: 1) { name } }", None, no_variables())
            .unwrap();
        let mut response = json!({ "data": null, "errors": [{ "message": "boom" }] });

        assert_eq!(control.record_response(&operation, &mut response).unwrap(), None);
        assert!(response.get("extensions").is_none());
    }

    #[test]
    fn prepared_operations_keep_their_generation() {
        let (publisher, control) = control(CostLimit::Measure { limit: None });
        let query = "{ products(first: 10) { reviews { content } } }";

        let pinned = control.prepare(query, None, no_variables()).unwrap();

        publisher.publish(generation(&SDL.replace(r#"weight: "3""#, r#"weight: "1""#)));
        let fresh = control.prepare(query, None, no_variables()).unwrap();

        assert_eq!(control.check(&pinned).unwrap().unwrap().field_cost, 71.0);
        assert_eq!(control.check(&fresh).unwrap().unwrap().field_cost, 31.0);
    }
}
