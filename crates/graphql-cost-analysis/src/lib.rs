//! Cost analysis of GraphQL operations, driven by the `@cost` and `@listSize` directives of the
//! subgraph schemas.
//!
//! A [`CostMap`] is extracted from each subgraph schema with [`extract_cost_map`], or from all the
//! subgraphs of a supergraph at once with [`build_federated_cost_map`]. A [`CostAnalyzer`] then
//! counts how often an operation uses each schema coordinate and weighs those counts:
//!
//! - statically, sizing lists from `@listSize` and the arguments of the operation, which gives an
//!   upper bound usable to reject an operation before executing it;
//! - from the response, sizing lists from the data actually returned.

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod calculate;
mod coordinate;
mod cost_map;
mod count;
mod error;
mod estimate;
mod extract;
mod federated;
mod fetch;
mod schema;
mod traversal;

use async_graphql_parser::types::{ExecutableDocument, OperationDefinition};

pub use self::{
    calculate::{compute_cost, OperationCostData},
    coordinate::{DirectiveUsage, InvalidCoordinate, SchemaCoordinate},
    cost_map::{CostEntry, CostMap},
    count::{Counts, OperationCountData},
    error::{AnalysisError, ConfigurationError, ExtractError},
    extract::extract_cost_map,
    federated::{build_federated_cost_map, subgraphs, Subgraph},
    fetch::{
        FetchError, FetchResult, HttpSchemaFetcher, SchemaFetcher, SchemaFetcherInner, SchemaRequest,
        DEFAULT_SCHEMA_FETCH_TIMEOUT,
    },
    schema::{ApiSchema, DefinitionKind},
};
use self::{
    count::{ResponseSizer, StaticSizer},
    traversal::{select_operation, FieldSizer, Traversal},
};

/// Variable values of a request.
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// Analyzes operations against one schema generation.
#[derive(Clone, Copy)]
pub struct CostAnalyzer<'a> {
    schema: &'a ApiSchema,
    cost_map: &'a CostMap,
}

impl<'a> CostAnalyzer<'a> {
    pub fn new(schema: &'a ApiSchema, cost_map: &'a CostMap) -> Self {
        CostAnalyzer { schema, cost_map }
    }

    /// Counts coordinates with list sizes estimated from the operation.
    pub fn static_counts(
        &self,
        document: &ExecutableDocument,
        operation_name: Option<&str>,
        variables: &Variables,
    ) -> Result<OperationCountData, AnalysisError> {
        let operation = select_operation(document, operation_name)?;
        let resolved = resolve_variables(operation, variables);

        self.count(
            document,
            operation,
            variables,
            StaticSizer::new(self.cost_map, &resolved),
        )
    }

    /// Upper bound of the cost of an operation.
    pub fn static_cost(
        &self,
        document: &ExecutableDocument,
        operation_name: Option<&str>,
        variables: &Variables,
    ) -> Result<OperationCostData, AnalysisError> {
        let counts = self.static_counts(document, operation_name, variables)?;

        Ok(compute_cost(&counts, self.cost_map))
    }

    /// Counts coordinates with list sizes taken from the response data. Returns `None` if there
    /// is no data.
    pub fn response_counts(
        &self,
        document: &ExecutableDocument,
        operation_name: Option<&str>,
        variables: &Variables,
        data: Option<&serde_json::Value>,
    ) -> Result<Option<OperationCountData>, AnalysisError> {
        let operation = select_operation(document, operation_name)?;

        let Some(data) = data.filter(|data| !data.is_null()) else {
            return Ok(None);
        };

        self.count(document, operation, variables, ResponseSizer::new(data))
            .map(Some)
    }

    /// Realized cost of an executed operation.
    pub fn response_cost(
        &self,
        document: &ExecutableDocument,
        operation_name: Option<&str>,
        variables: &Variables,
        data: Option<&serde_json::Value>,
    ) -> Result<Option<OperationCostData>, AnalysisError> {
        let counts = self.response_counts(document, operation_name, variables, data)?;

        Ok(counts.map(|counts| compute_cost(&counts, self.cost_map)))
    }

    fn count<'b, S>(
        &self,
        document: &'b ExecutableDocument,
        operation: &'b OperationDefinition,
        variables: &'b Variables,
        sizer: S,
    ) -> Result<OperationCountData, AnalysisError>
    where
        'a: 'b,
        S: FieldSizer<'b>,
    {
        Traversal::new(self.schema, self.cost_map, document, variables, sizer).run(operation)
    }
}

/// Variables of the request, completed with the defaults of the operation.
fn resolve_variables(operation: &OperationDefinition, variables: &Variables) -> Variables {
    let mut resolved = variables.clone();

    for variable in &operation.variable_definitions {
        let variable = &variable.node;
        let name = variable.name.node.as_str();

        if resolved.contains_key(name) {
            continue;
        }

        let Some(default_value) = &variable.default_value else {
            continue;
        };

        match default_value.node.clone().into_json() {
            Ok(value) => {
                resolved.insert(name.to_owned(), value);
            }
            Err(error) => tracing::debug!("Ignoring default value of ${name}: {error}"),
        }
    }

    resolved
}
