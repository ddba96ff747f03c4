use serde_json::Value;

/// Adds `extensions.sdlWithDirectives` to the response of a `_service { sdl }` query, so that
/// gateways can read the cost directives the federation `sdl` strips.
///
/// Responses without `data._service` are left as they are.
pub fn add_sdl_with_directives(response: &mut Value, sdl: &str) {
    let has_service = response
        .get("data")
        .and_then(|data| data.get("_service"))
        .is_some_and(|service| !service.is_null());

    if !has_service {
        return;
    }

    let Some(response) = response.as_object_mut() else {
        return;
    };

    let extensions = response
        .entry("extensions")
        .or_insert_with(|| Value::Object(Default::default()));

    match extensions {
        Value::Object(extensions) => {
            extensions.insert("sdlWithDirectives".to_owned(), Value::String(sdl.to_owned()));
        }
        _ => tracing::warn!("Response extensions are not an object, not adding the schema directives"),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    const SDL: &str = "type Query { products: [Product] @listSize(assumedSize: 10) }";

    #[test]
    fn service_queries_get_the_sdl() {
        let mut response = json!({ "data": { "_service": { "sdl": "type Query" } } });

        add_sdl_with_directives(&mut response, SDL);

        assert_eq!(
            response,
            json!({
                "data": { "_service": { "sdl": "type Query" } },
                "extensions": { "sdlWithDirectives": SDL }
            })
        );
    }

    #[test]
    fn existing_extensions_are_kept() {
        let mut response = json!({
            "data": { "_service": { "sdl": "type Query" } },
            "extensions": { "traceId": "abc" }
        });

        add_sdl_with_directives(&mut response, SDL);

        assert_eq!(
            response["extensions"],
            json!({ "traceId": "abc", "sdlWithDirectives": SDL })
        );
    }

    #[test]
    fn other_responses_are_untouched() {
        let original = json!({ "data": { "products": [] } });
        let mut response = original.clone();

        add_sdl_with_directives(&mut response, SDL);
        assert_eq!(response, original);

        let mut failed = json!({ "data": null, "errors": [{ "message": "boom" }] });
        add_sdl_with_directives(&mut failed, SDL);
        assert_eq!(failed, json!({ "data": null, "errors": [{ "message": "boom" }] }));
    }
}
