//! Reads `@cost` and `@listSize` annotations out of a subgraph schema.

mod literal;

use std::collections::BTreeMap;

use async_graphql_parser::{
    types::{ConstDirective, FieldDefinition, InputValueDefinition, TypeDefinition, TypeKind, TypeSystemDefinition},
    Positioned,
};

use self::literal::Literal;
use crate::{
    coordinate::{DirectiveUsage, SchemaCoordinate},
    cost_map::{CostEntry, CostMap},
    error::ExtractError,
    schema::named_type,
};

const COST_DIRECTIVE_NAME: &str = "cost";
const LIST_SIZE_DIRECTIVE_NAME: &str = "listSize";
const EXTERNAL_DIRECTIVE_NAME: &str = "external";

/// Directives that carry federation or cost semantics, never counted as type system directives.
const RESERVED_DIRECTIVE_NAMES: [&str; 8] = [
    COST_DIRECTIVE_NAME,
    EXTERNAL_DIRECTIVE_NAME,
    "inaccessible",
    "key",
    LIST_SIZE_DIRECTIVE_NAME,
    "provides",
    "requires",
    "tag",
];

type Directives = [Positioned<ConstDirective>];

/// Builds the cost map of a single schema.
pub fn extract_cost_map(sdl: &str) -> Result<CostMap, ExtractError> {
    let document = async_graphql_parser::parse_schema(sdl)?;
    let mut cost_map = CostMap::new();

    for definition in &document.definitions {
        match definition {
            TypeSystemDefinition::Type(definition) => ingest_type_definition(&mut cost_map, &definition.node),
            TypeSystemDefinition::Directive(definition) => {
                let directive_name = definition.node.name.node.as_str();

                // Lets operations be charged for arguments of executable directives.
                for argument in &definition.node.arguments {
                    if let Some(weight) = weight(&argument.node.directives) {
                        cost_map
                            .entry_mut(SchemaCoordinate::directive_argument(
                                directive_name,
                                argument.node.name.node.as_str(),
                            ))
                            .weight = Some(weight);
                    }
                }
            }
            TypeSystemDefinition::Schema(_) => (),
        }
    }

    Ok(cost_map)
}

fn ingest_type_definition(cost_map: &mut CostMap, definition: &TypeDefinition) {
    let type_name = definition.name.node.as_str();

    match &definition.kind {
        TypeKind::Object(object) => {
            ingest_composite_type(cost_map, definition);

            for field in &object.fields {
                ingest_field(cost_map, type_name, &field.node);
            }
        }
        TypeKind::InputObject(input_object) if !definition.extend => {
            ingest_composite_type(cost_map, definition);

            for field in &input_object.fields {
                ingest_input_field(cost_map, type_name, &field.node);
            }
        }
        TypeKind::Scalar | TypeKind::Enum(_) if !definition.extend => {
            // Leaf types only matter when they are weighted.
            if let Some(weight) = weight(&definition.directives) {
                cost_map.insert(
                    SchemaCoordinate::ty(type_name),
                    CostEntry {
                        weight: Some(weight),
                        ..Default::default()
                    },
                );
            }
        }
        TypeKind::InputObject(_) | TypeKind::Scalar | TypeKind::Enum(_) | TypeKind::Interface(_) | TypeKind::Union(_) => {
        }
    }
}

fn ingest_composite_type(cost_map: &mut CostMap, definition: &TypeDefinition) {
    let coordinate = SchemaCoordinate::ty(definition.name.node.as_str());

    // Extensions never weigh the type itself.
    if !definition.extend {
        if let Some(weight) = weight(&definition.directives) {
            cost_map.entry_mut(coordinate.clone()).weight = Some(weight);
        }
    }

    if let Some(directives) = type_system_directives(&definition.directives) {
        cost_map.entry_mut(coordinate).directives = Some(directives);
    }
}

fn ingest_field(cost_map: &mut CostMap, type_name: &str, field: &FieldDefinition) {
    if has_directive(&field.directives, EXTERNAL_DIRECTIVE_NAME) {
        return;
    }

    let field_name = field.name.node.as_str();
    let coordinate = SchemaCoordinate::field(type_name, field_name);
    let is_list_sized = ingest_field_directives(cost_map, &coordinate, &field.directives);

    for argument in &field.arguments {
        let argument = &argument.node;
        let entry = cost_map.entry_mut(SchemaCoordinate::field_argument(
            type_name,
            field_name,
            argument.name.node.as_str(),
        ));

        if let Some(weight) = weight(&argument.directives) {
            entry.weight = Some(weight);
        }

        entry.argument_type = Some(named_type(&argument.ty.node).to_owned());

        // Defaults are only needed to size lists from omitted slicing arguments.
        if is_list_sized {
            if let Some(default_value) = &argument.default_value {
                if let Some(default_value) = Literal::from(&default_value.node).as_default_value() {
                    entry.default_value = Some(default_value);
                }
            }
        }

        if let Some(directives) = type_system_directives(&argument.directives) {
            entry.directives = Some(directives);
        }
    }
}

fn ingest_input_field(cost_map: &mut CostMap, type_name: &str, field: &InputValueDefinition) {
    if has_directive(&field.directives, EXTERNAL_DIRECTIVE_NAME) {
        return;
    }

    let coordinate = SchemaCoordinate::field(type_name, field.name.node.as_str());
    ingest_field_directives(cost_map, &coordinate, &field.directives);
}

/// Records weight, list size and type system directives of a field. Returns whether the field is
/// list-sized.
fn ingest_field_directives(cost_map: &mut CostMap, coordinate: &SchemaCoordinate, directives: &Directives) -> bool {
    let weight = weight(directives);
    let list_size = find_directive(directives, LIST_SIZE_DIRECTIVE_NAME).map(ListSize::from_directive);
    let is_list_sized = list_size.is_some();

    if weight.is_some() || list_size.is_some() {
        let entry = cost_map.entry_mut(coordinate.clone());

        if weight.is_some() {
            entry.weight = weight;
        }

        if let Some(list_size) = list_size {
            list_size.apply(entry);
        }
    }

    if let Some(directives) = type_system_directives(directives) {
        cost_map.entry_mut(coordinate.clone()).directives = Some(directives);
    }

    is_list_sized
}

#[derive(Debug, Default)]
struct ListSize {
    assumed_size: Option<u64>,
    slicing_arguments: Option<Vec<String>>,
    sized_fields: Option<Vec<String>>,
    require_one_slicing_argument: Option<bool>,
}

impl ListSize {
    fn from_directive(directive: &ConstDirective) -> Self {
        let argument = |name: &str| directive.get_argument(name).map(|value| Literal::from(&value.node));

        let assumed_size = argument("assumedSize").and_then(|value| value.as_size());
        let slicing_arguments = argument("slicingArguments").and_then(|value| value.as_names());
        let sized_fields = argument("sizedFields").and_then(|value| value.as_names());

        let require_one_slicing_argument = if slicing_arguments.is_some() || sized_fields.is_some() {
            Some(
                argument("requireOneSlicingArgument")
                    .and_then(|value| value.as_boolean())
                    .unwrap_or(true),
            )
        } else {
            None
        };

        ListSize {
            assumed_size,
            slicing_arguments,
            sized_fields,
            require_one_slicing_argument,
        }
    }

    fn apply(self, entry: &mut CostEntry) {
        let ListSize {
            assumed_size,
            slicing_arguments,
            sized_fields,
            require_one_slicing_argument,
        } = self;

        entry.assumed_size = assumed_size.or(entry.assumed_size);
        entry.slicing_arguments = slicing_arguments.or(entry.slicing_arguments.take());
        entry.sized_fields = sized_fields.or(entry.sized_fields.take());
        entry.require_one_slicing_argument = require_one_slicing_argument.or(entry.require_one_slicing_argument);
    }
}

fn find_directive<'a>(directives: &'a Directives, name: &str) -> Option<&'a ConstDirective> {
    directives
        .iter()
        .map(|directive| &directive.node)
        .find(|directive| directive.name.node.as_str() == name)
}

fn has_directive(directives: &Directives, name: &str) -> bool {
    find_directive(directives, name).is_some()
}

/// The weight of `@cost`, if the directive is applied with a numeric weight.
fn weight(directives: &Directives) -> Option<String> {
    let directive = find_directive(directives, COST_DIRECTIVE_NAME)?;
    let weight = directive
        .get_argument("weight")
        .and_then(|weight| Literal::from(&weight.node).as_weight());

    if weight.is_none() {
        tracing::warn!("Ignoring @cost directive without a numeric weight");
    }

    weight
}

/// Counts the directives that are neither federation nor cost directives. Directives with
/// arguments are counted once per argument.
fn type_system_directives(directives: &Directives) -> Option<BTreeMap<DirectiveUsage, u64>> {
    let mut usages = BTreeMap::new();

    for directive in directives {
        let directive = &directive.node;
        let name = directive.name.node.as_str();

        if RESERVED_DIRECTIVE_NAMES.contains(&name) {
            continue;
        }

        if directive.arguments.is_empty() {
            *usages.entry(DirectiveUsage::new(name, None)).or_default() += 1;
        } else {
            for (argument, _) in &directive.arguments {
                *usages
                    .entry(DirectiveUsage::new(name, Some(argument.node.to_string())))
                    .or_default() += 1;
            }
        }
    }

    (!usages.is_empty()).then_some(usages)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn extract(sdl: &str) -> serde_json::Value {
        serde_json::to_value(extract_cost_map(sdl).unwrap()).unwrap()
    }

    #[test]
    fn type_and_field_weights() {
        let sdl = indoc! {r#"
            type Review @cost(weight: "2") {
                id: ID!
                content: String @cost(weight: "2")
                product: Product
            }
        "#};

        assert_eq!(
            extract(sdl),
            json!({
                "Review": { "weight": "2" },
                "Review.content": { "weight": "2" },
            })
        );
    }

    #[test]
    fn list_size_and_arguments() {
        let sdl = indoc! {r#"
            type Query {
                products(first: Int = 10, last: Int, after: ID): ProductConnection @listSize(
                    slicingArguments: ["first", "last"],
                    sizedFields: ["edges"],
                )
                product(id: ID! = "1"): Product
            }
        "#};

        assert_eq!(
            extract(sdl),
            json!({
                "Query.products": {
                    "slicingArguments": ["first", "last"],
                    "sizedFields": ["edges"],
                    "requireOneSlicingArgument": true,
                },
                "Query.products(first:)": { "argumentType": "Int", "defaultValue": "10" },
                "Query.products(last:)": { "argumentType": "Int" },
                "Query.products(after:)": { "argumentType": "ID" },
                "Query.product(id:)": { "argumentType": "ID" },
            })
        );
    }

    #[test]
    fn require_one_slicing_argument_can_be_disabled() {
        let sdl = indoc! {r#"
            type Query {
                products(first: Int, last: Int): [Product] @listSize(
                    slicingArguments: ["first", "last"],
                    requireOneSlicingArgument: false
                )
                tags: [String] @listSize(assumedSize: 3)
            }
        "#};

        let cost_map = extract_cost_map(sdl).unwrap();

        let products = cost_map.get(&SchemaCoordinate::field("Query", "products")).unwrap();
        assert_eq!(products.require_one_slicing_argument, Some(false));

        let tags = cost_map.get(&SchemaCoordinate::field("Query", "tags")).unwrap();
        assert_eq!(tags.assumed_size, Some(3));
        assert_eq!(tags.require_one_slicing_argument, None);
    }

    #[test]
    fn external_fields_and_extension_weights_are_ignored() {
        let sdl = indoc! {r#"
            extend type Product @key(fields: "id") @cost(weight: "7") {
                id: ID! @external @cost(weight: "3")
                reviews: [Review] @listSize(assumedSize: 5)
            }
        "#};

        assert_eq!(
            extract(sdl),
            json!({
                "Product.reviews": { "assumedSize": 5 },
            })
        );
    }

    #[test]
    fn type_system_directives_are_counted() {
        let sdl = indoc! {r#"
            type Mission @audited {
                designation: String @casing(type: UPPER) @tag(name: "public")
                crew: [String] @deprecated @deprecated(reason: "gone")
            }
        "#};

        assert_eq!(
            extract(sdl),
            json!({
                "Mission": { "directives": { "@audited": 1 } },
                "Mission.designation": { "directives": { "@casing(type:)": 1 } },
                "Mission.crew": { "directives": { "@deprecated": 1, "@deprecated(reason:)": 1 } },
            })
        );
    }

    #[test]
    fn leaf_types_need_a_weight() {
        let sdl = indoc! {r#"
            scalar DateTime @cost(weight: "0.5")
            scalar Url
            enum Status @cost(weight: "2") { ACTIVE }
            enum Unweighted { A }
        "#};

        assert_eq!(
            extract(sdl),
            json!({
                "DateTime": { "weight": "0.5" },
                "Status": { "weight": "2" },
            })
        );
    }

    #[test]
    fn input_fields_and_directive_arguments() {
        let sdl = indoc! {r#"
            directive @expensive(level: Int @cost(weight: "4"), label: String) on FIELD

            input ProductFilter @cost(weight: "3") {
                name: String @cost(weight: "1.5")
                tag: String
            }
        "#};

        assert_eq!(
            extract(sdl),
            json!({
                "@expensive(level:)": { "weight": "4" },
                "ProductFilter": { "weight": "3" },
                "ProductFilter.name": { "weight": "1.5" },
            })
        );
    }

    #[test]
    fn extraction_is_deterministic() {
        let sdl = indoc! {r#"
            type Query { products(first: Int): [Product] @listSize(slicingArguments: ["first"]) }
            type Product @cost(weight: "2") { tags: [String] @listSize(assumedSize: 3) }
        "#};

        assert_eq!(extract_cost_map(sdl).unwrap(), extract_cost_map(sdl).unwrap());
    }

    #[test]
    fn unparsable_schema_is_an_error() {
        assert!(extract_cost_map("type Query {").is_err());
    }
}
