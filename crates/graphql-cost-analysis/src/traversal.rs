//! Depth-first walk of an operation with type information from the schema.
//!
//! Fields are visited in document order. Fragment spreads are walked where they are used, under
//! their type condition. Every field returning a composite type pushes a [`ParentFieldFrame`]
//! for the duration of its subtree, so the multiplier applied to a field is the product of the
//! sizes of its ancestors.

use async_graphql_parser::types::{
    DocumentOperations, ExecutableDocument, Field, OperationDefinition, OperationType, Selection, SelectionSet,
};

use crate::{
    coordinate::SchemaCoordinate,
    count::{Counter, OperationCountData},
    cost_map::CostMap,
    error::AnalysisError,
    estimate::SizedField,
    schema::{ApiSchema, FieldDefinition},
    Variables,
};

#[derive(Debug, Clone, Copy)]
pub(crate) struct ParentFieldFrame<'a> {
    /// Alias or name of the field, which is its key in the response.
    pub response_key: &'a str,
    pub size: u64,
    pub type_name: &'a str,
}

pub(crate) struct VisitedField<'a> {
    pub parent_type: &'a str,
    pub field: &'a Field,
    pub definition: &'a FieldDefinition,
    /// Number of frames above the field.
    pub depth: usize,
    pub is_composite: bool,
}

impl<'a> VisitedField<'a> {
    pub fn name(&self) -> &'a str {
        self.field.name.node.as_str()
    }

    pub fn response_key(&self) -> &'a str {
        self.field.response_key().node.as_str()
    }

    pub fn named_type(&self) -> &'a str {
        &self.definition.base_type
    }

    pub fn coordinate(&self) -> SchemaCoordinate {
        SchemaCoordinate::field(self.parent_type, self.name())
    }

    pub fn sized(&self) -> SizedField<'a> {
        SizedField::new(self.parent_type, self.field)
    }
}

/// Decides how many elements a field returns.
pub(crate) trait FieldSizer<'a> {
    fn field_size(&mut self, field: &VisitedField<'a>, frames: &[ParentFieldFrame<'a>]) -> Result<u64, AnalysisError>;

    /// Called once the subtree of a composite field was walked.
    fn leave_field(&mut self, _field: &VisitedField<'a>) {}
}

pub(crate) fn select_operation<'a>(
    document: &'a ExecutableDocument,
    operation_name: Option<&str>,
) -> Result<&'a OperationDefinition, AnalysisError> {
    match (&document.operations, operation_name) {
        (DocumentOperations::Single(operation), None) => Ok(&operation.node),
        (DocumentOperations::Single(_), Some(name)) => Err(AnalysisError::UnknownOperation(name.to_owned())),
        (DocumentOperations::Multiple(operations), Some(name)) => operations
            .get(name)
            .map(|operation| &operation.node)
            .ok_or_else(|| AnalysisError::UnknownOperation(name.to_owned())),
        (DocumentOperations::Multiple(operations), None) => {
            let mut operations = operations.values();

            match (operations.next(), operations.next()) {
                (Some(operation), None) => Ok(&operation.node),
                (None, _) => Err(AnalysisError::NoOperation),
                (Some(_), Some(_)) => Err(AnalysisError::OperationNameRequired),
            }
        }
    }
}

pub(crate) struct Traversal<'a, S> {
    schema: &'a ApiSchema,
    document: &'a ExecutableDocument,
    counter: Counter<'a>,
    sizer: S,
    frames: Vec<ParentFieldFrame<'a>>,
    fragments_in_use: Vec<&'a str>,
}

impl<'a, S> Traversal<'a, S>
where
    S: FieldSizer<'a>,
{
    pub fn new(
        schema: &'a ApiSchema,
        cost_map: &'a CostMap,
        document: &'a ExecutableDocument,
        variables: &'a Variables,
        sizer: S,
    ) -> Self {
        Traversal {
            schema,
            document,
            counter: Counter::new(schema, cost_map, variables),
            sizer,
            frames: Vec::new(),
            fragments_in_use: Vec::new(),
        }
    }

    pub fn run(mut self, operation: &'a OperationDefinition) -> Result<OperationCountData, AnalysisError> {
        let root_type = self.schema.root_type_name(operation.ty);

        if self.schema.kind(root_type).is_none() {
            return Err(AnalysisError::MissingRootType(operation_type_name(operation.ty)));
        }

        self.counter.count_root_type(root_type);

        for variable in &operation.variable_definitions {
            self.counter.count_variable_definition(&variable.node);
        }

        self.walk_selection_set(root_type, &operation.selection_set.node)?;

        Ok(self.counter.finish())
    }

    fn walk_selection_set(&mut self, parent_type: &'a str, selection_set: &'a SelectionSet) -> Result<(), AnalysisError> {
        for selection in &selection_set.items {
            match &selection.node {
                Selection::Field(field) => self.walk_field(parent_type, &field.node)?,
                Selection::InlineFragment(fragment) => {
                    let fragment = &fragment.node;
                    let type_name = fragment
                        .type_condition
                        .as_ref()
                        .map(|condition| condition.node.on.node.as_str())
                        .unwrap_or(parent_type);

                    self.walk_selection_set(type_name, &fragment.selection_set.node)?;
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.node.fragment_name.node.as_str();

                    if self.fragments_in_use.contains(&name) {
                        continue;
                    }

                    let Some(fragment) = self.document.fragments.get(name) else {
                        continue;
                    };

                    self.fragments_in_use.push(name);
                    let result = self.walk_selection_set(
                        fragment.node.type_condition.node.on.node.as_str(),
                        &fragment.node.selection_set.node,
                    );
                    self.fragments_in_use.pop();

                    result?;
                }
            }
        }

        Ok(())
    }

    fn walk_field(&mut self, parent_type: &'a str, field: &'a Field) -> Result<(), AnalysisError> {
        // Also skips meta fields such as __typename.
        let Some(definition) = self.schema.field(parent_type, field.name.node.as_str()) else {
            return Ok(());
        };

        let visited = VisitedField {
            parent_type,
            field,
            definition,
            depth: self.frames.len(),
            is_composite: self.schema.is_composite(&definition.base_type),
        };

        let size = self.sizer.field_size(&visited, &self.frames)?;
        let multiplier = self
            .frames
            .iter()
            .fold(1u64, |multiplier, frame| multiplier.saturating_mul(frame.size));

        self.counter.count_field(&visited, multiplier, size);
        self.counter.count_field_inputs(&visited);

        if !visited.is_composite {
            return Ok(());
        }

        self.frames.push(ParentFieldFrame {
            response_key: visited.response_key(),
            size,
            type_name: visited.named_type(),
        });

        let result = self.walk_selection_set(visited.named_type(), &field.selection_set.node);

        self.frames.pop();
        self.sizer.leave_field(&visited);

        result
    }
}

fn operation_type_name(operation_type: OperationType) -> &'static str {
    match operation_type {
        OperationType::Query => "query",
        OperationType::Mutation => "mutation",
        OperationType::Subscription => "subscription",
    }
}
