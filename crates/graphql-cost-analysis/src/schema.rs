//! Type bindings used while walking an operation: for every type, its kind and the named type of
//! its fields, arguments and input fields.

use std::collections::HashMap;

use async_graphql_parser::types::{self as ast, BaseType, ServiceDocument, TypeKind, TypeSystemDefinition};

use crate::error::ExtractError;

const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefinitionKind {
    Object,
    Interface,
    Union,
    Scalar,
    Enum,
    InputObject,
}

impl DefinitionKind {
    /// Scalars and enums.
    pub fn is_leaf(self) -> bool {
        matches!(self, DefinitionKind::Scalar | DefinitionKind::Enum)
    }

    /// Types with a selection set.
    pub fn is_composite(self) -> bool {
        matches!(
            self,
            DefinitionKind::Object | DefinitionKind::Interface | DefinitionKind::Union
        )
    }
}

#[derive(Debug)]
pub struct Definition {
    pub kind: DefinitionKind,
    /// Output fields for objects and interfaces, input fields for input objects.
    fields: HashMap<String, FieldDefinition>,
}

#[derive(Debug)]
pub struct FieldDefinition {
    /// The type without any wrapping type (`!` and `[]`).
    pub base_type: String,
    /// argument name -> named argument type
    arguments: HashMap<String, String>,
}

impl FieldDefinition {
    pub fn argument_type(&self, argument: &str) -> Option<&str> {
        self.arguments.get(argument).map(String::as_str)
    }
}

/// The API schema an operation is validated against.
///
/// A supergraph SDL works too, the `join__*` directives are ignored.
#[derive(Debug)]
pub struct ApiSchema {
    definitions: HashMap<String, Definition>,
    /// directive name -> argument name -> named argument type
    directives: HashMap<String, HashMap<String, String>>,
    query_type_name: String,
    mutation_type_name: String,
    subscription_type_name: String,
}

impl ApiSchema {
    pub fn parse(sdl: &str) -> Result<Self, ExtractError> {
        Ok(async_graphql_parser::parse_schema(sdl)?.into())
    }

    pub fn kind(&self, type_name: &str) -> Option<DefinitionKind> {
        match self.definitions.get(type_name) {
            Some(definition) => Some(definition.kind),
            None if BUILTIN_SCALARS.contains(&type_name) => Some(DefinitionKind::Scalar),
            None => None,
        }
    }

    /// Unknown types are treated as opaque scalars.
    pub fn is_leaf(&self, type_name: &str) -> bool {
        self.kind(type_name).map(DefinitionKind::is_leaf).unwrap_or(true)
    }

    pub fn is_composite(&self, type_name: &str) -> bool {
        self.kind(type_name).is_some_and(DefinitionKind::is_composite)
    }

    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldDefinition> {
        self.definitions.get(type_name)?.fields.get(field_name)
    }

    pub fn directive_argument_type(&self, directive: &str, argument: &str) -> Option<&str> {
        self.directives.get(directive)?.get(argument).map(String::as_str)
    }

    pub fn root_type_name(&self, operation_type: ast::OperationType) -> &str {
        match operation_type {
            ast::OperationType::Query => &self.query_type_name,
            ast::OperationType::Mutation => &self.mutation_type_name,
            ast::OperationType::Subscription => &self.subscription_type_name,
        }
    }
}

pub(crate) fn named_type(ty: &ast::Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(inner) => named_type(inner),
    }
}

fn ingest_fields<'a>(
    fields: &mut HashMap<String, FieldDefinition>,
    definitions: impl Iterator<Item = (&'a str, &'a ast::Type, &'a [async_graphql_parser::Positioned<ast::InputValueDefinition>])>,
) {
    for (name, ty, arguments) in definitions {
        let arguments = arguments
            .iter()
            .map(|argument| (argument.node.name.node.to_string(), named_type(&argument.node.ty.node).to_owned()))
            .collect();

        fields.insert(
            name.to_owned(),
            FieldDefinition {
                base_type: named_type(ty).to_owned(),
                arguments,
            },
        );
    }
}

impl From<ServiceDocument> for ApiSchema {
    fn from(value: ServiceDocument) -> Self {
        let mut schema = ApiSchema {
            definitions: HashMap::new(),
            directives: HashMap::new(),
            query_type_name: "Query".to_owned(),
            mutation_type_name: "Mutation".to_owned(),
            subscription_type_name: "Subscription".to_owned(),
        };

        for definition in &value.definitions {
            match definition {
                TypeSystemDefinition::Schema(schema_definition) => {
                    let schema_definition = &schema_definition.node;

                    if let Some(query) = &schema_definition.query {
                        schema.query_type_name = query.node.to_string();
                    }
                    if let Some(mutation) = &schema_definition.mutation {
                        schema.mutation_type_name = mutation.node.to_string();
                    }
                    if let Some(subscription) = &schema_definition.subscription {
                        schema.subscription_type_name = subscription.node.to_string();
                    }
                }
                TypeSystemDefinition::Type(type_definition) => {
                    let type_definition = &type_definition.node;
                    let kind = match &type_definition.kind {
                        TypeKind::Scalar => DefinitionKind::Scalar,
                        TypeKind::Object(_) => DefinitionKind::Object,
                        TypeKind::Interface(_) => DefinitionKind::Interface,
                        TypeKind::Union(_) => DefinitionKind::Union,
                        TypeKind::Enum(_) => DefinitionKind::Enum,
                        TypeKind::InputObject(_) => DefinitionKind::InputObject,
                    };

                    // Extensions may come before the definition they extend.
                    let entry = schema
                        .definitions
                        .entry(type_definition.name.node.to_string())
                        .or_insert_with(|| Definition {
                            kind,
                            fields: HashMap::new(),
                        });

                    match &type_definition.kind {
                        TypeKind::Object(ast::ObjectType { fields, .. })
                        | TypeKind::Interface(ast::InterfaceType { fields, .. }) => ingest_fields(
                            &mut entry.fields,
                            fields.iter().map(|field| {
                                (
                                    field.node.name.node.as_str(),
                                    &field.node.ty.node,
                                    field.node.arguments.as_slice(),
                                )
                            }),
                        ),
                        TypeKind::InputObject(ast::InputObjectType { fields }) => ingest_fields(
                            &mut entry.fields,
                            fields
                                .iter()
                                .map(|field| (field.node.name.node.as_str(), &field.node.ty.node, &[][..])),
                        ),
                        TypeKind::Scalar | TypeKind::Union(_) | TypeKind::Enum(_) => (),
                    }
                }
                TypeSystemDefinition::Directive(directive) => {
                    let arguments = directive
                        .node
                        .arguments
                        .iter()
                        .map(|argument| (argument.node.name.node.to_string(), named_type(&argument.node.ty.node).to_owned()))
                        .collect();

                    schema.directives.insert(directive.node.name.node.to_string(), arguments);
                }
            }
        }

        schema
    }
}
