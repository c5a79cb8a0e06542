//! Error taxonomy and classification.
//!
//! Raw [`TransportError`]s are classified into an [`Error`] immediately at the
//! call site that invoked the transport. Callers branch on [`Error::kind`],
//! which sees through the context layers added by [`wrap_error`].

use std::time::Duration;

use crate::{fields::FieldError, transport::TransportError};

/// Phrases that mark a message as a rate-limit rejection.
const RATE_LIMIT_PHRASES: &[&str] = &["rate limit", "ratelimit", "rate-limit", "too many requests"];

const NOT_FOUND_PHRASES: &[&str] = &["could not resolve to", "not found"];

const AUTH_PHRASES: &[&str] = &[
    "bad credentials",
    "requires authentication",
    "must authenticate",
    "invalid token",
    "token expired",
];

/// Coarse classification used to decide how a failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server could not resolve an entity.
    NotFound,
    /// The request was throttled; the only retryable kind.
    RateLimited,
    /// Missing or invalid credentials.
    Auth,
    /// Unsupported field type or a value that cannot be coerced.
    Unsupported,
    /// Anything else, including network and decoding failures.
    Other,
}

/// Errors returned by every [`Client`](crate::Client) operation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        /// Server-supplied hint, when one was present and well formed.
        retry_after: Option<Duration>,
    },

    #[error("authentication failed: {message}")]
    Auth { message: String },

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Transport(TransportError),

    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to {operation} {resource}: {source}")]
    Context {
        operation: String,
        resource: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Field(_) => ErrorKind::Unsupported,
            Self::Transport(_) | Self::Decode { .. } => ErrorKind::Other,
            Self::Context { source, .. } => source.kind(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind() == ErrorKind::RateLimited
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_auth(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }

    /// Retry-after hint carried by a rate-limit error, through any context.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            Self::Context { source, .. } => source.retry_after(),
            _ => None,
        }
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub(crate) fn decode(what: &'static str, source: serde_json::Error) -> Self {
        Self::Decode { what, source }
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match classify(&err) {
            ErrorKind::RateLimited => Self::RateLimited {
                retry_after: retry_after(&err),
                message: err.to_string(),
            },
            ErrorKind::NotFound => Self::NotFound {
                message: err.to_string(),
            },
            ErrorKind::Auth => Self::Auth {
                message: err.to_string(),
            },
            ErrorKind::Unsupported | ErrorKind::Other => Self::Transport(err),
        }
    }
}

/// Buckets a raw transport failure.
///
/// Rate limiting is checked first: protocol `RATE_LIMITED` errors, any 429,
/// a 403 whose message mentions rate limiting, then the message alone. A 403
/// without such a message is an ordinary permission error and is not retried.
pub fn classify(err: &TransportError) -> ErrorKind {
    let errors = err.graphql_errors();
    let message = err.to_string().to_lowercase();
    let has_type = |kind: &str| {
        errors
            .iter()
            .any(|e| e.error_type.as_deref().is_some_and(|t| t.eq_ignore_ascii_case(kind)))
    };

    if has_type("RATE_LIMITED") {
        return ErrorKind::RateLimited;
    }
    match err.status() {
        Some(429) => return ErrorKind::RateLimited,
        Some(403) if mentions(&message, RATE_LIMIT_PHRASES) => return ErrorKind::RateLimited,
        _ => {}
    }
    if mentions(&message, RATE_LIMIT_PHRASES) {
        return ErrorKind::RateLimited;
    }

    if has_type("NOT_FOUND") || err.status() == Some(404) || mentions(&message, NOT_FOUND_PHRASES) {
        return ErrorKind::NotFound;
    }

    if err.status() == Some(401) || mentions(&message, AUTH_PHRASES) {
        return ErrorKind::Auth;
    }

    ErrorKind::Other
}

/// Integer-seconds `Retry-After` hint; absent or malformed values give `None`.
pub fn retry_after(err: &TransportError) -> Option<Duration> {
    err.retry_after_header()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Adds the attempted operation and target resource to `err`.
///
/// The result keeps the [`ErrorKind`] of `err`.
pub fn wrap_error(operation: impl Into<String>, resource: impl Into<String>, err: Error) -> Error {
    Error::Context {
        operation: operation.into(),
        resource: resource.into(),
        source: Box::new(err),
    }
}

fn mentions(message: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| message.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::GraphqlError;

    fn status(status: u16, message: &str) -> TransportError {
        TransportError::Status {
            status,
            message: message.to_string(),
            retry_after: None,
        }
    }

    fn graphql(error_type: Option<&str>, message: &str) -> TransportError {
        TransportError::Graphql(vec![GraphqlError {
            message: message.to_string(),
            error_type: error_type.map(str::to_string),
            path: None,
        }])
    }

    #[test]
    fn test_classify_429_is_rate_limited() {
        assert_eq!(classify(&status(429, "slow down")), ErrorKind::RateLimited);
    }

    #[test]
    fn test_classify_403_with_rate_limit_message_is_rate_limited() {
        let err = status(403, "You have exceeded a secondary rate limit.");
        assert_eq!(classify(&err), ErrorKind::RateLimited);
    }

    #[test]
    fn test_classify_403_permission_denied_is_not_rate_limited() {
        let err = status(403, "Resource not accessible by integration");
        assert_ne!(classify(&err), ErrorKind::RateLimited);
        assert_eq!(classify(&err), ErrorKind::Other);
    }

    #[test]
    fn test_classify_graphql_rate_limited_type() {
        let err = graphql(Some("RATE_LIMITED"), "API rate limit exceeded for user ID 1.");
        assert_eq!(classify(&err), ErrorKind::RateLimited);
    }

    #[test]
    fn test_classify_rate_limit_phrase_alone() {
        let err = graphql(None, "was submitted too quickly: rate limit hit");
        assert_eq!(classify(&err), ErrorKind::RateLimited);
    }

    #[test]
    fn test_classify_could_not_resolve_is_not_found() {
        let err = graphql(None, "Could not resolve to an Organization with the login of 'x'.");
        assert_eq!(classify(&err), ErrorKind::NotFound);
    }

    #[test]
    fn test_classify_not_found_type() {
        assert_eq!(classify(&graphql(Some("NOT_FOUND"), "missing")), ErrorKind::NotFound);
    }

    #[test]
    fn test_classify_401_is_auth() {
        assert_eq!(classify(&status(401, "Unauthorized")), ErrorKind::Auth);
    }

    #[test]
    fn test_classify_bad_credentials_message_is_auth() {
        assert_eq!(classify(&graphql(None, "Bad credentials")), ErrorKind::Auth);
    }

    #[test]
    fn test_classify_server_error_is_other() {
        assert_eq!(classify(&status(502, "Bad Gateway")), ErrorKind::Other);
    }

    #[test]
    fn test_retry_after_parses_integer_seconds() {
        let err = TransportError::Status {
            status: 429,
            message: "slow down".to_string(),
            retry_after: Some(" 42 ".to_string()),
        };
        assert_eq!(retry_after(&err), Some(Duration::from_secs(42)));
    }

    #[test]
    fn test_retry_after_malformed_value_is_no_hint() {
        let err = TransportError::Status {
            status: 429,
            message: "slow down".to_string(),
            retry_after: Some("Wed, 21 Oct 2015 07:28:00 GMT".to_string()),
        };
        assert_eq!(retry_after(&err), None);
    }

    #[test]
    fn test_retry_after_absent_is_no_hint() {
        assert_eq!(retry_after(&status(429, "slow down")), None);
    }

    #[test]
    fn test_from_transport_error_carries_retry_after() {
        let err = Error::from(TransportError::Status {
            status: 429,
            message: "slow down".to_string(),
            retry_after: Some("7".to_string()),
        });
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_wrap_error_preserves_kind() {
        let wrapped = wrap_error("get project", "octo/1", Error::not_found("gone"));
        assert!(wrapped.is_not_found());
        assert_eq!(wrapped.to_string(), "failed to get project octo/1: not found: gone");

        let limited = wrap_error(
            "get items",
            "PVT_1",
            Error::RateLimited {
                message: "slow down".to_string(),
                retry_after: Some(Duration::from_secs(3)),
            },
        );
        let twice = wrap_error("sync", "board", limited);
        assert!(twice.is_rate_limited());
        assert_eq!(twice.retry_after(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_field_error_is_unsupported_kind() {
        let err = Error::from(FieldError::UnsupportedType("ITERATION".to_string()));
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }
}
