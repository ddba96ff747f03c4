mod response_sizer;
mod static_sizer;

use std::collections::BTreeMap;

use async_graphql_parser::types::{Directive, VariableDefinition};
use async_graphql_value::Value;

pub(crate) use self::{response_sizer::ResponseSizer, static_sizer::StaticSizer};
use crate::{
    coordinate::{DirectiveUsage, SchemaCoordinate},
    cost_map::CostMap,
    schema::{named_type, ApiSchema, DefinitionKind},
    traversal::VisitedField,
    Variables,
};

pub type Counts = BTreeMap<SchemaCoordinate, u64>;

/// Occurrences of every schema coordinate used by an operation.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationCountData {
    pub type_counts: Counts,
    pub field_counts: Counts,
    pub field_argument_counts: Counts,
    /// Directives applied on fields, in the operation or in the type system.
    pub directive_counts: Counts,
    pub directive_argument_counts: Counts,
    pub input_type_counts: Counts,
    pub input_field_counts: Counts,
}

fn increment(counts: &mut Counts, coordinate: SchemaCoordinate, by: u64) {
    let count = counts.entry(coordinate).or_default();
    *count = count.saturating_add(by);
}

/// Accumulates the counts of one traversal.
pub(crate) struct Counter<'a> {
    schema: &'a ApiSchema,
    cost_map: &'a CostMap,
    variables: &'a Variables,
    counts: OperationCountData,
}

impl<'a> Counter<'a> {
    pub fn new(schema: &'a ApiSchema, cost_map: &'a CostMap, variables: &'a Variables) -> Self {
        Counter {
            schema,
            cost_map,
            variables,
            counts: OperationCountData::default(),
        }
    }

    pub fn finish(self) -> OperationCountData {
        self.counts
    }

    /// Composite and input object types always count, leaf types only if they appear in the
    /// cost map.
    fn is_countable_type(&self, type_name: &str) -> bool {
        self.is_countable(&SchemaCoordinate::ty(type_name), type_name)
    }

    fn is_countable(&self, coordinate: &SchemaCoordinate, named_type: &str) -> bool {
        !self.schema.is_leaf(named_type) || self.cost_map.contains(coordinate)
    }

    pub fn count_root_type(&mut self, root_type: &str) {
        self.counts.type_counts.insert(SchemaCoordinate::ty(root_type), 1);
    }

    pub fn count_field(&mut self, field: &VisitedField<'_>, multiplier: u64, size: u64) {
        let named_type = field.named_type();

        if self.is_countable_type(named_type) {
            increment(
                &mut self.counts.type_counts,
                SchemaCoordinate::ty(named_type),
                multiplier.saturating_mul(size),
            );
        }

        let coordinate = field.coordinate();

        if !self.is_countable(&coordinate, named_type) {
            return;
        }

        let (type_name, field_name) = (field.parent_type, field.name());

        increment(&mut self.counts.field_counts, coordinate.clone(), multiplier);

        for (argument, _) in &field.field.arguments {
            increment(
                &mut self.counts.field_argument_counts,
                SchemaCoordinate::field_argument(type_name, field_name, argument.node.as_str()),
                multiplier,
            );
        }

        for directive in &field.field.directives {
            let directive = &directive.node;
            let name = directive.name.node.as_str();

            if let Some(directive_coordinate) = coordinate.with_directive(&DirectiveUsage::new(name, None)) {
                increment(&mut self.counts.directive_counts, directive_coordinate, multiplier);
            }

            for (argument, _) in &directive.arguments {
                let usage = DirectiveUsage::new(name, Some(argument.node.to_string()));

                if let Some(argument_coordinate) = coordinate.with_directive(&usage) {
                    increment(&mut self.counts.directive_argument_counts, argument_coordinate, multiplier);
                }
            }
        }

        self.count_type_system_directives(&coordinate, multiplier);
    }

    /// Directives applied on the field definition count for every occurrence of the field. A
    /// directive applied with arguments counts as many times as its most used argument.
    fn count_type_system_directives(&mut self, coordinate: &SchemaCoordinate, multiplier: u64) {
        let Some(directives) = self.cost_map.get(coordinate).and_then(|entry| entry.directives.as_ref()) else {
            return;
        };

        let mut applications: BTreeMap<&str, u64> = BTreeMap::new();

        for (usage, count) in directives {
            let total = multiplier.saturating_mul(*count);

            let Some(usage_coordinate) = coordinate.with_directive(usage) else {
                continue;
            };

            match usage.argument {
                Some(_) => {
                    increment(&mut self.counts.directive_argument_counts, usage_coordinate, total);

                    let applied = applications.entry(usage.name.as_str()).or_default();
                    *applied = (*applied).max(total);
                }
                None => increment(&mut self.counts.directive_counts, usage_coordinate, total),
            }
        }

        for (name, total) in applications {
            if let Some(directive_coordinate) = coordinate.with_directive(&DirectiveUsage::new(name, None)) {
                increment(&mut self.counts.directive_counts, directive_coordinate, total);
            }
        }
    }

    /// Input objects written in the arguments of a field and of its directives.
    pub fn count_field_inputs(&mut self, field: &VisitedField<'_>) {
        for (argument, value) in &field.field.arguments {
            if let Some(argument_type) = field.definition.argument_type(argument.node.as_str()) {
                self.count_input_value(&value.node, argument_type);
            }
        }

        for directive in &field.field.directives {
            self.count_directive_inputs(&directive.node);
        }
    }

    fn count_directive_inputs(&mut self, directive: &Directive) {
        let directive_name = directive.name.node.as_str();

        for (argument, value) in &directive.arguments {
            if let Some(argument_type) = self.schema.directive_argument_type(directive_name, argument.node.as_str()) {
                self.count_input_value(&value.node, argument_type);
            }
        }
    }

    /// Every input object literal counts once, no matter how many times the field is resolved.
    fn count_input_value(&mut self, value: &Value, type_name: &str) {
        match value {
            Value::Object(fields) => {
                if self.is_countable_type(type_name) {
                    increment(&mut self.counts.input_type_counts, SchemaCoordinate::ty(type_name), 1);
                }

                for (name, value) in fields {
                    let Some(definition) = self.schema.field(type_name, name.as_str()) else {
                        continue;
                    };

                    self.count_input_field(type_name, name.as_str(), &definition.base_type);
                    self.count_input_value(value, &definition.base_type);
                }
            }
            Value::List(items) => {
                for item in items {
                    self.count_input_value(item, type_name);
                }
            }
            Value::Variable(_)
            | Value::Null
            | Value::Number(_)
            | Value::String(_)
            | Value::Boolean(_)
            | Value::Binary(_)
            | Value::Enum(_) => (),
        }
    }

    fn count_input_field(&mut self, type_name: &str, field_name: &str, field_type: &str) {
        if self.is_countable_type(field_type) {
            increment(&mut self.counts.type_counts, SchemaCoordinate::ty(field_type), 1);
        }

        let coordinate = SchemaCoordinate::field(type_name, field_name);

        if self.is_countable(&coordinate, field_type) {
            increment(&mut self.counts.input_field_counts, coordinate, 1);
        }
    }

    /// The variable type, the input fields set in its value, and input objects in its default.
    pub fn count_variable_definition(&mut self, variable: &VariableDefinition) {
        let type_name = named_type(&variable.var_type.node);

        if self.is_countable_type(type_name) {
            increment(&mut self.counts.input_type_counts, SchemaCoordinate::ty(type_name), 1);
        }

        if let Some(default_value) = &variable.default_value {
            self.count_input_value(&default_value.node.clone().into_value(), type_name);
        }

        for directive in &variable.directives {
            self.count_directive_inputs(&directive.node);
        }

        if self.schema.kind(type_name) != Some(DefinitionKind::InputObject) {
            return;
        }

        let Some(serde_json::Value::Object(value)) = self.variables.get(variable.name.node.as_str()) else {
            return;
        };

        for field_name in value.keys() {
            let Some(definition) = self.schema.field(type_name, field_name) else {
                continue;
            };

            self.count_input_field(type_name, field_name, &definition.base_type);
        }
    }
}
