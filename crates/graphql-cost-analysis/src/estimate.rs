//! Element count bounds of list fields, from `@listSize` and the arguments of the operation.

use async_graphql_parser::{types::Field, Positioned};
use async_graphql_value::{Name, Value};

use crate::{
    coordinate::SchemaCoordinate,
    cost_map::{CostEntry, CostMap},
    error::AnalysisError,
    Variables,
};

pub(crate) type Arguments = [(Positioned<Name>, Positioned<Value>)];

/// The field a list size is computed for: the coordinate its default values are recorded under and
/// the arguments it received in the operation.
#[derive(Clone, Copy)]
pub(crate) struct SizedField<'a> {
    pub type_name: &'a str,
    pub field_name: &'a str,
    pub arguments: &'a Arguments,
}

impl<'a> SizedField<'a> {
    pub fn new(type_name: &'a str, field: &'a Field) -> Self {
        SizedField {
            type_name,
            field_name: field.name.node.as_str(),
            arguments: &field.arguments,
        }
    }

    fn argument(&self, name: &str) -> Option<&'a Value> {
        self.arguments
            .iter()
            .find(|(argument, _)| argument.node.as_str() == name)
            .map(|(_, value)| &value.node)
            .filter(|value| !matches!(value, Value::Null))
    }

    /// An argument given in the operation. Variables the request leaves unbound or null do not
    /// count, as the schema default then applies.
    fn supplied_argument(&self, name: &str, variables: &Variables) -> Option<&'a Value> {
        self.argument(name).filter(|value| match value {
            Value::Variable(variable) => {
                variables
                    .get(variable.as_str())
                    .is_some_and(|value| !value.is_null())
                    || find_by_key(variables, name).is_some()
            }
            _ => true,
        })
    }
}

/// Size of a list field, always at least 1.
///
/// `assumedSize` wins. Otherwise the largest of the slicing arguments given in the operation is
/// used, or the largest of their default values if none was given.
pub(crate) fn list_size(cost_map: &CostMap, entry: &CostEntry, field: SizedField<'_>, variables: &Variables) -> u64 {
    if let Some(assumed_size) = entry.assumed_size.filter(|size| *size > 0) {
        return assumed_size;
    }

    let Some(slicing_arguments) = &entry.slicing_arguments else {
        return 1;
    };

    let mut supplied = false;
    let mut size = 1;

    for name in slicing_arguments {
        let Some(value) = field.supplied_argument(name, variables) else {
            continue;
        };

        supplied = true;

        if let Some(argument_size) = argument_size(value, name, variables) {
            size = size.max(argument_size);
        }
    }

    if !supplied {
        size = slicing_arguments
            .iter()
            .filter_map(|name| {
                let coordinate = SchemaCoordinate::field_argument(field.type_name, field.field_name, name.as_str());
                cost_map.get(&coordinate)?.default_value.as_deref()?.trim().parse::<u64>().ok()
            })
            .max()
            .unwrap_or(1);
    }

    size.max(1)
}

/// Fails when more than one slicing argument is given to a field that requires exactly one.
pub(crate) fn validate_slicing_arguments(
    entry: &CostEntry,
    coordinate: &SchemaCoordinate,
    field: SizedField<'_>,
    variables: &Variables,
) -> Result<(), AnalysisError> {
    if entry.require_one_slicing_argument != Some(true) {
        return Ok(());
    }

    let Some(slicing_arguments) = &entry.slicing_arguments else {
        return Ok(());
    };

    let supplied = slicing_arguments
        .iter()
        .filter(|name| field.supplied_argument(name, variables).is_some())
        .count();

    if supplied > 1 {
        return Err(AnalysisError::TooManySlicingArguments(coordinate.clone()));
    }

    Ok(())
}

fn argument_size(value: &Value, argument_name: &str, variables: &Variables) -> Option<u64> {
    match value {
        Value::Number(number) => number_size(number),
        Value::String(string) => string.trim().parse().ok(),
        Value::Variable(name) => variables
            .get(name.as_str())
            .and_then(json_size)
            .or_else(|| find_by_key(variables, argument_name)),
        Value::Null
        | Value::Boolean(_)
        | Value::Binary(_)
        | Value::Enum(_)
        | Value::List(_)
        | Value::Object(_) => None,
    }
}

fn number_size(number: &serde_json::Number) -> Option<u64> {
    number
        .as_u64()
        .or_else(|| number.as_i64().map(|_| 0))
        .or_else(|| number.as_f64().filter(|n| n.is_finite() && *n >= 0.0).map(|n| n as u64))
}

fn json_size(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(number) => number_size(number),
        serde_json::Value::String(string) => string.trim().parse().ok(),
        serde_json::Value::Null
        | serde_json::Value::Bool(_)
        | serde_json::Value::Array(_)
        | serde_json::Value::Object(_) => None,
    }
}

/// Depth-first search for the first key named `key` holding a size, in insertion order.
fn find_by_key(object: &serde_json::Map<String, serde_json::Value>, key: &str) -> Option<u64> {
    object.iter().find_map(|(name, value)| {
        if name == key {
            if let Some(size) = json_size(value) {
                return Some(size);
            }
        }

        find_in_value(value, key)
    })
}

fn find_in_value(value: &serde_json::Value, key: &str) -> Option<u64> {
    match value {
        serde_json::Value::Object(object) => find_by_key(object, key),
        serde_json::Value::Array(items) => items.iter().find_map(|item| find_in_value(item, key)),
        serde_json::Value::Null
        | serde_json::Value::Bool(_)
        | serde_json::Value::Number(_)
        | serde_json::Value::String(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use async_graphql_parser::{
        parse_query,
        types::{DocumentOperations, Selection},
    };
    use serde_json::json;

    use super::*;

    fn slicing(arguments: &[&str]) -> CostEntry {
        CostEntry {
            slicing_arguments: Some(arguments.iter().map(|argument| (*argument).to_owned()).collect()),
            require_one_slicing_argument: Some(true),
            ..Default::default()
        }
    }

    fn variables(value: serde_json::Value) -> Variables {
        match value {
            serde_json::Value::Object(object) => object,
            _ => unreachable!(),
        }
    }

    /// Runs `f` against the first root field of `query`.
    fn with_root_field<T>(query: &str, f: impl FnOnce(SizedField<'_>) -> T) -> T {
        let document = parse_query(query).unwrap();
        let operation = match &document.operations {
            DocumentOperations::Single(operation) => operation,
            DocumentOperations::Multiple(operations) => operations.values().next().unwrap(),
        };

        match &operation.node.selection_set.node.items[0].node {
            Selection::Field(field) => f(SizedField::new("Query", &field.node)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn assumed_size_wins() {
        let entry = CostEntry {
            assumed_size: Some(3),
            ..slicing(&["first"])
        };

        let size = with_root_field("{ products(first: 10) { id } }", |field| {
            list_size(&CostMap::new(), &entry, field, &Variables::new())
        });

        assert_eq!(size, 3);
    }

    #[test]
    fn largest_slicing_argument() {
        let size = with_root_field("{ products(first: 5, last: 2) { id } }", |field| {
            list_size(&CostMap::new(), &slicing(&["first", "last"]), field, &Variables::new())
        });

        assert_eq!(size, 5);
    }

    #[test]
    fn numeric_strings_are_sizes() {
        let size = with_root_field(r#"{ products(first: "7") { id } }"#, |field| {
            list_size(&CostMap::new(), &slicing(&["first"]), field, &Variables::new())
        });

        assert_eq!(size, 7);
    }

    #[test]
    fn variables_are_resolved() {
        let variables = variables(json!({ "first": 4 }));

        let size = with_root_field("query ($first: Int) { products(first: $first) { id } }", |field| {
            list_size(&CostMap::new(), &slicing(&["first"]), field, &variables)
        });

        assert_eq!(size, 4);
    }

    #[test]
    fn nested_variables_are_searched_depth_first() {
        let variables = variables(json!({
            "pagination": { "page": { "first": 8 }, "first": 2 },
            "first": "nope",
        }));

        let size = with_root_field("query ($size: Int) { products(first: $size) { id } }", |field| {
            list_size(&CostMap::new(), &slicing(&["first"]), field, &variables)
        });

        assert_eq!(size, 8);
    }

    #[test]
    fn defaults_are_used_when_no_slicing_argument_is_given() {
        let cost_map: CostMap = [
            (
                SchemaCoordinate::field_argument("Query", "products", "first"),
                CostEntry {
                    default_value: Some("10".to_owned()),
                    ..Default::default()
                },
            ),
            (
                SchemaCoordinate::field_argument("Query", "products", "last"),
                CostEntry {
                    default_value: Some("20".to_owned()),
                    ..Default::default()
                },
            ),
        ]
        .into_iter()
        .collect();

        let size = with_root_field("{ products { id } }", |field| {
            list_size(&cost_map, &slicing(&["first", "last"]), field, &Variables::new())
        });
        assert_eq!(size, 20);

        let size = with_root_field("{ products(first: 3) { id } }", |field| {
            list_size(&cost_map, &slicing(&["first", "last"]), field, &Variables::new())
        });
        assert_eq!(size, 3);
    }

    #[test]
    fn unbound_variables_fall_back_to_defaults() {
        let cost_map: CostMap = [(
            SchemaCoordinate::field_argument("Query", "products", "first"),
            CostEntry {
                default_value: Some("50".to_owned()),
                ..Default::default()
            },
        )]
        .into_iter()
        .collect();
        let query = "query ($n: Int) { products(first: $n) { id } }";

        let size = with_root_field(query, |field| {
            list_size(&cost_map, &slicing(&["first"]), field, &Variables::new())
        });
        assert_eq!(size, 50);

        let size = with_root_field(query, |field| {
            list_size(&cost_map, &slicing(&["first"]), field, &variables(json!({ "n": null })))
        });
        assert_eq!(size, 50);

        let size = with_root_field(query, |field| {
            list_size(&cost_map, &slicing(&["first"]), field, &variables(json!({ "n": 3 })))
        });
        assert_eq!(size, 3);
    }

    #[test]
    fn sizes_are_at_least_one() {
        let size = with_root_field("{ products(first: 0) { id } }", |field| {
            list_size(&CostMap::new(), &slicing(&["first"]), field, &Variables::new())
        });
        assert_eq!(size, 1);

        let size = with_root_field("{ products(first: -4) { id } }", |field| {
            list_size(&CostMap::new(), &slicing(&["first"]), field, &Variables::new())
        });
        assert_eq!(size, 1);

        let size = with_root_field("{ products { id } }", |field| {
            list_size(&CostMap::new(), &CostEntry::default(), field, &Variables::new())
        });
        assert_eq!(size, 1);
    }

    #[test]
    fn only_one_slicing_argument_is_allowed() {
        let coordinate = SchemaCoordinate::field("Query", "products");
        let entry = slicing(&["first", "last"]);

        let result = with_root_field("{ products(first: 5, last: 2) { id } }", |field| {
            validate_slicing_arguments(&entry, &coordinate, field, &Variables::new())
        });
        assert_eq!(result, Err(AnalysisError::TooManySlicingArguments(coordinate.clone())));

        let result = with_root_field("{ products(first: 5, last: null) { id } }", |field| {
            validate_slicing_arguments(&entry, &coordinate, field, &Variables::new())
        });
        assert_eq!(result, Ok(()));

        let result = with_root_field("query ($last: Int) { products(first: 5, last: $last) { id } }", |field| {
            validate_slicing_arguments(&entry, &coordinate, field, &Variables::new())
        });
        assert_eq!(result, Ok(()));

        let relaxed = CostEntry {
            require_one_slicing_argument: Some(false),
            ..entry
        };
        let result = with_root_field("{ products(first: 5, last: 2) { id } }", |field| {
            validate_slicing_arguments(&relaxed, &coordinate, field, &Variables::new())
        });
        assert_eq!(result, Ok(()));
    }
}
