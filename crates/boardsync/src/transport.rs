//! HTTP transport for the GraphQL endpoint.
//!
//! The [`Transport`] trait is the seam between the Facade and the network.
//! [`HttpTransport`] is the production implementation; tests either point it
//! at a mock server or substitute their own [`Transport`].

use std::fmt;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use crate::config::ClientConfig;

/// Header carrying the comma-joined list of enabled preview features.
pub const FEATURES_HEADER: &str = "GraphQL-Features";

/// One protocol request: a document plus its variables object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphqlRequest {
    pub query: String,
    pub variables: JsonValue,
}

impl GraphqlRequest {
    pub fn new(query: impl Into<String>, variables: JsonValue) -> Self {
        Self {
            query: query.into(),
            variables,
        }
    }

    /// Name of the first operation declared in the document, for logging.
    pub fn operation_name(&self) -> &str {
        let mut words = self.query.split_whitespace();
        while let Some(word) = words.next() {
            if word == "query" || word == "mutation" {
                return words
                    .next()
                    .and_then(|name| name.split(['(', '{']).next())
                    .filter(|name| !name.is_empty())
                    .unwrap_or("anonymous");
            }
        }
        "anonymous"
    }
}

/// One entry of the response envelope's `errors` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GraphqlError {
    pub message: String,
    /// Machine-readable error type such as `NOT_FOUND` or `RATE_LIMITED`.
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub path: Option<Vec<JsonValue>>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<JsonValue>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

/// Raw transport or protocol failure, before classification.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The request never produced an HTTP response.
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        /// Raw `Retry-After` header value, if the server sent one.
        retry_after: Option<String>,
    },

    /// The envelope carried a non-empty `errors` list.
    #[error("{}", join_messages(.0))]
    Graphql(Vec<GraphqlError>),

    /// The envelope had no `data` object.
    #[error("response contained no data")]
    MissingData,

    /// The body was not a valid response envelope.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl TransportError {
    /// HTTP status code, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// Raw `Retry-After` header value, when the failure exposed one.
    pub fn retry_after_header(&self) -> Option<&str> {
        match self {
            Self::Status { retry_after, .. } => retry_after.as_deref(),
            _ => None,
        }
    }

    /// Protocol-level errors, empty for HTTP and network failures.
    pub fn graphql_errors(&self) -> &[GraphqlError] {
        match self {
            Self::Graphql(errors) => errors,
            _ => &[],
        }
    }
}

fn join_messages(errors: &[GraphqlError]) -> String {
    if errors.is_empty() {
        return "GraphQL request failed".to_string();
    }
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Issues protocol requests and returns the envelope's `data` object.
#[async_trait]
pub trait Transport: fmt::Debug + Send + Sync {
    /// Sends `request` and returns the `data` object of the response.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] for network failures, non-success HTTP
    /// statuses, protocol errors in the envelope, or an envelope without data.
    async fn execute(&self, request: &GraphqlRequest) -> Result<JsonValue, TransportError>;
}

/// [`Transport`] over HTTPS POST using `reqwest`.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    features: String,
    user_agent: String,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .field("features", &self.features)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint().to_string(),
            token: config.token().to_string(),
            features: config.features_header(),
            user_agent: config.user_agent().to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &GraphqlRequest) -> Result<JsonValue, TransportError> {
        let operation = request.operation_name();
        debug!(operation, endpoint = %self.endpoint, "Sending GraphQL request");

        let mut builder = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, &self.user_agent)
            .json(request);
        if !self.features.is_empty() {
            builder = builder.header(FEATURES_HEADER, &self.features);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            debug!(operation, status = status.as_u16(), "GraphQL request rejected");
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: status_message(status, &body),
                retry_after,
            });
        }

        let bytes = response.bytes().await?;
        trace!(operation, len = bytes.len(), "Received GraphQL response");
        let envelope: Envelope = serde_json::from_slice(&bytes)?;
        if !envelope.errors.is_empty() {
            return Err(TransportError::Graphql(envelope.errors));
        }
        match envelope.data {
            Some(JsonValue::Null) | None => Err(TransportError::MissingData),
            Some(data) => Ok(data),
        }
    }
}

/// Prefers the `message` field of a JSON error body over the raw text.
fn status_message(status: reqwest::StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, headers, method, path},
    };

    use super::*;
    use crate::config::Feature;

    fn transport_for(server: &MockServer) -> HttpTransport {
        let config = ClientConfig::new("test-token").with_endpoint(format!("{}/graphql", server.uri()));
        HttpTransport::new(&config)
    }

    #[test]
    fn test_operation_name_reads_named_query() {
        let request = GraphqlRequest::new("query GetIssue($id: ID!) { node(id: $id) { id } }", json!({}));
        assert_eq!(request.operation_name(), "GetIssue");
    }

    #[test]
    fn test_operation_name_anonymous_document() {
        let request = GraphqlRequest::new("{ viewer { login } }", json!({}));
        assert_eq!(request.operation_name(), "anonymous");
    }

    #[test]
    fn test_graphql_error_display_joins_messages() {
        let err = TransportError::Graphql(vec![
            GraphqlError {
                message: "first".to_string(),
                error_type: None,
                path: None,
            },
            GraphqlError {
                message: "second".to_string(),
                error_type: Some("NOT_FOUND".to_string()),
                path: None,
            },
        ]);
        assert_eq!(err.to_string(), "first; second");
    }

    #[tokio::test]
    async fn test_execute_sends_credentials_and_feature_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("authorization", "Bearer test-token"))
            .and(headers(FEATURES_HEADER, vec!["sub_issues", "issue_types"]))
            .and(body_partial_json(json!({ "variables": { "id": "I_1" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "node": { "id": "I_1" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let data = transport_for(&server)
            .execute(&GraphqlRequest::new(
                "query GetNode($id: ID!) { node(id: $id) { id } }",
                json!({ "id": "I_1" }),
            ))
            .await
            .unwrap();

        assert_eq!(data, json!({ "node": { "id": "I_1" } }));
    }

    #[tokio::test]
    async fn test_execute_without_features_omits_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(headers(FEATURES_HEADER, vec!["sub_issues", "issue_types"]))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "ok": true } })))
            .mount(&server)
            .await;

        let config = ClientConfig::new("test-token")
            .with_endpoint(server.uri())
            .with_features(Vec::<Feature>::new());
        let data = HttpTransport::new(&config)
            .execute(&GraphqlRequest::new("{ ok }", json!({})))
            .await
            .unwrap();

        assert_eq!(data, json!({ "ok": true }));
        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        assert!(received[0].headers.get(FEATURES_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_execute_default_features_sends_each_feature() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "ok": true } })))
            .mount(&server)
            .await;

        transport_for(&server)
            .execute(&GraphqlRequest::new("{ ok }", json!({})))
            .await
            .unwrap();

        let received = server.received_requests().await.unwrap();
        let value = received[0].headers.get(FEATURES_HEADER).unwrap();
        assert_eq!(value.to_str().unwrap(), "sub_issues,issue_types");
    }

    #[tokio::test]
    async fn test_execute_sends_configured_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("user-agent", "gh-boardsync/9.9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "ok": true } })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ClientConfig::new("test-token")
            .with_endpoint(server.uri())
            .with_user_agent("gh-boardsync/9.9");
        HttpTransport::new(&config)
            .execute(&GraphqlRequest::new("{ ok }", json!({})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_execute_status_error_keeps_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("retry-after", "30")
                    .set_body_json(json!({ "message": "You have exceeded a secondary rate limit." })),
            )
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .execute(&GraphqlRequest::new("{ viewer { login } }", json!({})))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(403));
        assert_eq!(err.retry_after_header(), Some("30"));
        assert!(err.to_string().contains("secondary rate limit"));
    }

    #[tokio::test]
    async fn test_execute_plain_text_error_body_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .execute(&GraphqlRequest::new("{ viewer { login } }", json!({})))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "HTTP 401: Bad credentials");
        assert_eq!(err.retry_after_header(), None);
    }

    #[tokio::test]
    async fn test_execute_envelope_errors_become_graphql_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "user": null },
                "errors": [{
                    "type": "NOT_FOUND",
                    "path": ["user"],
                    "message": "Could not resolve to a User with the login of 'nobody'."
                }]
            })))
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .execute(&GraphqlRequest::new("{ user(login: \"nobody\") { id } }", json!({})))
            .await
            .unwrap_err();

        let errors = err.graphql_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type.as_deref(), Some("NOT_FOUND"));
        assert_eq!(errors[0].path, Some(vec![json!("user")]));
    }

    #[tokio::test]
    async fn test_execute_null_data_is_missing_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .execute(&GraphqlRequest::new("{ viewer { login } }", json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::MissingData));
    }

    #[tokio::test]
    async fn test_execute_non_json_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .execute(&GraphqlRequest::new("{ viewer { login } }", json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Decode(_)));
    }
}
