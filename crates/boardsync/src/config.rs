//! Client configuration.
//!
//! Configuration is injected into [`Client`](crate::Client) at construction;
//! nothing in this crate reads process-wide state after that point.
//!
//! # Environment
//!
//! [`ClientConfig::from_env`] resolves:
//!
//! - the credential from `GH_TOKEN`, then `GITHUB_TOKEN`
//! - the endpoint from `BOARDSYNC_GRAPHQL_URL`, then `GH_HOST`
//!   (`https://<host>/api/graphql` for an enterprise host), then
//!   `https://api.github.com/graphql`

use std::fmt;

use crate::retry::RetryPolicy;

/// Default GraphQL endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.github.com/graphql";

const DEFAULT_HOST: &str = "github.com";

/// Errors raised while assembling a [`ClientConfig`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// No credential was found in the environment.
    #[error("no credential found: set GH_TOKEN or GITHUB_TOKEN")]
    MissingToken,

    /// The configured endpoint is empty.
    #[error("invalid endpoint: {0:?}")]
    InvalidEndpoint(String),
}

/// Optional server capabilities advertised through the preview header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    /// Parent/child issue relationships.
    SubIssues,
    /// Issue type metadata.
    IssueTypes,
}

impl Feature {
    pub const ALL: [Self; 2] = [Self::SubIssues, Self::IssueTypes];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SubIssues => "sub_issues",
            Self::IssueTypes => "issue_types",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings for a [`Client`](crate::Client).
#[derive(Clone)]
pub struct ClientConfig {
    endpoint: String,
    token: String,
    features: Vec<Feature>,
    user_agent: String,
    retry: RetryPolicy,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("features", &self.features)
            .field("user_agent", &self.user_agent)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    /// Creates a configuration with the default endpoint, every preview
    /// feature enabled and the default retry policy.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: token.into(),
            features: Feature::ALL.to_vec(),
            user_agent: concat!("boardsync/", env!("CARGO_PKG_VERSION")).to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingToken`] if neither `GH_TOKEN` nor
    /// `GITHUB_TOKEN` holds a non-blank value, and
    /// [`ConfigError::InvalidEndpoint`] if the endpoint override is blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`Self::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = ["GH_TOKEN", "GITHUB_TOKEN"]
            .into_iter()
            .filter_map(&lookup)
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let endpoint = if let Some(url) = lookup("BOARDSYNC_GRAPHQL_URL") {
            url
        } else if let Some(host) = lookup("GH_HOST").filter(|h| !h.trim().is_empty()) {
            endpoint_for_host(&host)
        } else {
            DEFAULT_ENDPOINT.to_string()
        };

        let endpoint = normalize_endpoint(&endpoint)?;
        Ok(Self::new(token).with_endpoint(endpoint))
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Replaces the enabled preview features. Duplicates are dropped.
    #[must_use]
    pub fn with_features(mut self, features: impl IntoIterator<Item = Feature>) -> Self {
        let mut enabled: Vec<Feature> = Vec::new();
        for feature in features {
            if !enabled.contains(&feature) {
                enabled.push(feature);
            }
        }
        self.features = enabled;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Value of the preview header: enabled features, comma-joined.
    pub fn features_header(&self) -> String {
        self.features
            .iter()
            .map(|feature| feature.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn endpoint_for_host(host: &str) -> String {
    let host = host
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    if host.eq_ignore_ascii_case(DEFAULT_HOST) {
        DEFAULT_ENDPOINT.to_string()
    } else {
        format!("https://{host}/api/graphql")
    }
}

fn normalize_endpoint(endpoint: &str) -> Result<String, ConfigError> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_prefers_gh_token() {
        let config =
            ClientConfig::from_lookup(lookup_from(&[("GH_TOKEN", "gh"), ("GITHUB_TOKEN", "github")]))
                .unwrap();
        assert_eq!(config.token(), "gh");
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_from_lookup_blank_gh_token_falls_back() {
        let config =
            ClientConfig::from_lookup(lookup_from(&[("GH_TOKEN", "  "), ("GITHUB_TOKEN", "github")]))
                .unwrap();
        assert_eq!(config.token(), "github");
    }

    #[test]
    fn test_from_lookup_without_token_returns_error() {
        let err = ClientConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken));
    }

    #[test]
    fn test_from_lookup_enterprise_host_derives_endpoint() {
        let config =
            ClientConfig::from_lookup(lookup_from(&[("GH_TOKEN", "t"), ("GH_HOST", "ghe.example.com/")]))
                .unwrap();
        assert_eq!(config.endpoint(), "https://ghe.example.com/api/graphql");
    }

    #[test]
    fn test_from_lookup_public_host_keeps_default_endpoint() {
        let config =
            ClientConfig::from_lookup(lookup_from(&[("GH_TOKEN", "t"), ("GH_HOST", "github.com")]))
                .unwrap();
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_from_lookup_explicit_url_wins_over_host() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("GH_TOKEN", "t"),
            ("GH_HOST", "ghe.example.com"),
            ("BOARDSYNC_GRAPHQL_URL", "http://localhost:8080/graphql/"),
        ]))
        .unwrap();
        assert_eq!(config.endpoint(), "http://localhost:8080/graphql");
    }

    #[test]
    fn test_from_lookup_blank_url_returns_error() {
        let err = ClientConfig::from_lookup(lookup_from(&[
            ("GH_TOKEN", "t"),
            ("BOARDSYNC_GRAPHQL_URL", "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint(_)));
    }

    #[test]
    fn test_features_header_joins_enabled_features() {
        let config = ClientConfig::new("t");
        assert_eq!(config.features_header(), "sub_issues,issue_types");
    }

    #[test]
    fn test_with_features_drops_duplicates() {
        let config = ClientConfig::new("t").with_features([
            Feature::IssueTypes,
            Feature::IssueTypes,
            Feature::SubIssues,
        ]);
        assert_eq!(config.features_header(), "issue_types,sub_issues");
    }

    #[test]
    fn test_debug_output_hides_token() {
        let config = ClientConfig::new("super-secret");
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
