use std::{sync::Arc, time::Duration};

use url::Url;

pub const DEFAULT_SCHEMA_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

const SERVICE_SDL_QUERY: &str = "query { _service { sdl } }";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Request to the `{0}` subgraph timed out")]
    Timeout(String),
    #[error("Request to the `{subgraph_name}` subgraph failed: {error}")]
    Request {
        subgraph_name: String,
        #[source]
        error: reqwest::Error,
    },
    #[error("Invalid response from the `{subgraph_name}` subgraph: {error}")]
    InvalidResponse {
        subgraph_name: String,
        #[source]
        error: serde_json::Error,
    },
    #[error("{0}")]
    AnyError(String),
}

impl FetchError {
    pub fn any(error: impl ToString) -> Self {
        FetchError::AnyError(error.to_string())
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

pub struct SchemaRequest<'a> {
    pub subgraph_name: &'a str,
    pub url: &'a Url,
}

/// Retrieves the cost-annotated schema of a subgraph.
#[async_trait::async_trait]
pub trait SchemaFetcherInner: Send + Sync {
    /// Returns `None` if the subgraph does not expose a schema with its directives.
    async fn fetch_sdl(&self, request: SchemaRequest<'_>) -> FetchResult<Option<String>>;
}

#[derive(Clone)]
pub struct SchemaFetcher {
    inner: Arc<dyn SchemaFetcherInner>,
    timeout: Duration,
}

impl SchemaFetcher {
    pub fn new(fetcher: impl SchemaFetcherInner + 'static) -> SchemaFetcher {
        SchemaFetcher {
            inner: Arc::new(fetcher),
            timeout: DEFAULT_SCHEMA_FETCH_TIMEOUT,
        }
    }

    pub fn http() -> SchemaFetcher {
        SchemaFetcher::new(HttpSchemaFetcher::default())
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> SchemaFetcher {
        self.timeout = timeout;
        self
    }

    pub async fn fetch_sdl(&self, request: SchemaRequest<'_>) -> FetchResult<Option<String>> {
        let subgraph_name = request.subgraph_name;

        let timeout = async {
            tokio::time::sleep(self.timeout).await;
            Err(FetchError::Timeout(subgraph_name.to_owned()))
        };

        let execution = self.inner.fetch_sdl(request);

        tokio::select! {
            result = timeout => { result }
            result = execution => { result }
        }
    }
}

/// Asks the subgraph for its `_service` and reads `extensions.sdlWithDirectives` from the answer.
#[derive(Clone, Default)]
pub struct HttpSchemaFetcher {
    client: reqwest::Client,
}

#[derive(serde::Deserialize)]
struct ServiceResponse {
    #[serde(default)]
    extensions: Option<ServiceExtensions>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceExtensions {
    #[serde(default)]
    sdl_with_directives: Option<String>,
}

#[async_trait::async_trait]
impl SchemaFetcherInner for HttpSchemaFetcher {
    async fn fetch_sdl(&self, request: SchemaRequest<'_>) -> FetchResult<Option<String>> {
        let subgraph_name = request.subgraph_name;
        let request_error = |error| FetchError::Request {
            subgraph_name: subgraph_name.to_owned(),
            error,
        };

        let bytes = self
            .client
            .post(request.url.clone())
            .header("Content-Type", "application/json")
            .body(serde_json::json!({ "query": SERVICE_SDL_QUERY }).to_string())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(request_error)?
            .bytes()
            .await
            .map_err(request_error)?;

        let response: ServiceResponse =
            serde_json::from_slice(&bytes).map_err(|error| FetchError::InvalidResponse {
                subgraph_name: subgraph_name.to_owned(),
                error,
            })?;

        Ok(response
            .extensions
            .and_then(|extensions| extensions.sdl_with_directives))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    struct Slow;

    #[async_trait::async_trait]
    impl SchemaFetcherInner for Slow {
        async fn fetch_sdl(&self, _: SchemaRequest<'_>) -> FetchResult<Option<String>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Some("type Query { a: Int }".to_owned()))
        }
    }

    #[tokio::test]
    async fn slow_subgraphs_time_out() {
        let fetcher = SchemaFetcher::new(Slow).with_timeout(Duration::from_millis(10));
        let url = Url::parse("http://products.example.com/graphql").unwrap();

        let result = fetcher
            .fetch_sdl(SchemaRequest {
                subgraph_name: "products",
                url: &url,
            })
            .await;

        assert!(matches!(result, Err(FetchError::Timeout(name)) if name == "products"));
    }

    const SDL_WITH_DIRECTIVES: &str = r#"type Query { products: [String] @listSize(assumedSize: 3) }"#;

    async fn fetch_from(server: &MockServer) -> FetchResult<Option<String>> {
        let url = Url::parse(&format!("{}/graphql", server.uri())).unwrap();

        SchemaFetcher::http()
            .fetch_sdl(SchemaRequest {
                subgraph_name: "products",
                url: &url,
            })
            .await
    }

    async fn subgraph(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({ "query": "query { _service { sdl } }" })))
            .respond_with(template)
            .expect(1)
            .mount(&server)
            .await;

        server
    }

    #[tokio::test]
    async fn reads_sdl_with_directives() {
        let server = subgraph(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "_service": { "sdl": "type Query { products: [String] }" } },
            "extensions": { "sdlWithDirectives": SDL_WITH_DIRECTIVES }
        })))
        .await;

        let sdl = fetch_from(&server).await.unwrap();

        assert_eq!(sdl.as_deref(), Some(SDL_WITH_DIRECTIVES));
    }

    #[tokio::test]
    async fn subgraphs_without_directives() {
        let server = subgraph(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "_service": { "sdl": "type Query { products: [String] }" } }
        })))
        .await;

        assert_eq!(fetch_from(&server).await.unwrap(), None);
    }

    #[tokio::test]
    async fn server_errors_are_request_failures() {
        let server = subgraph(ResponseTemplate::new(500)).await;

        let result = fetch_from(&server).await;

        assert!(matches!(result, Err(FetchError::Request { subgraph_name, .. }) if subgraph_name == "products"));
    }

    #[tokio::test]
    async fn unparsable_responses_are_invalid() {
        let server = subgraph(ResponseTemplate::new(200).set_body_string("not json")).await;

        let result = fetch_from(&server).await;

        assert!(matches!(result, Err(FetchError::InvalidResponse { .. })));
    }
}
