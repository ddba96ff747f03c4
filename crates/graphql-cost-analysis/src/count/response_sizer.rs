use serde_json::Value;

use crate::{
    error::AnalysisError,
    traversal::{FieldSizer, ParentFieldFrame, VisitedField},
};

/// Sizes fields from the data of an executed operation, giving its realized cost.
///
/// Lists are sampled: below a list, the path continues in its first element.
pub(crate) struct ResponseSizer<'a> {
    data: &'a Value,
}

impl<'a> ResponseSizer<'a> {
    pub fn new(data: &'a Value) -> Self {
        ResponseSizer { data }
    }
}

fn first_element(mut value: &Value) -> Option<&Value> {
    while let Value::Array(items) = value {
        value = items.first()?;
    }

    Some(value)
}

impl<'a> FieldSizer<'a> for ResponseSizer<'a> {
    fn field_size(&mut self, field: &VisitedField<'a>, frames: &[ParentFieldFrame<'a>]) -> Result<u64, AnalysisError> {
        let mut value = self.data;

        for frame in frames {
            let Some(parent) = first_element(value).and_then(|parent| parent.get(frame.response_key)) else {
                tracing::trace!(
                    "No data for `{}` of type {}, sizing {} as 1",
                    frame.response_key,
                    frame.type_name,
                    field.coordinate()
                );
                return Ok(1);
            };

            value = parent;
        }

        let size = match first_element(value).and_then(|parent| parent.get(field.response_key())) {
            Some(Value::Array(items)) => items.len() as u64,
            _ => 1,
        };

        // Frames never have a zero size, so an empty list is charged as one element.
        Ok(size.max(1))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn samples_the_first_element_of_lists() {
        let data = json!({
            "products": {
                "edges": [
                    { "node": { "tags": ["a", "b"] } },
                    { "node": { "tags": ["a", "b", "c"] } },
                ]
            }
        });

        let value = first_element(&data["products"]["edges"]).unwrap();
        assert_eq!(value, &json!({ "node": { "tags": ["a", "b"] } }));

        assert_eq!(first_element(&json!([[], 1])), None);
        assert_eq!(first_element(&json!([[{ "a": 1 }]])), Some(&json!({ "a": 1 })));
    }
}
