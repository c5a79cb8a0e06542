//! Typed results handed to callers of the [`Client`](crate::Client).

use std::fmt;

use serde::Serialize;

/// Which lookup path resolved a board owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    User,
    Organization,
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Organization => "organization",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Owner {
    pub kind: OwnerKind,
    pub login: String,
}

/// A board, identified remotely by owner and number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: String,
    pub number: u32,
    pub title: String,
    pub url: String,
    pub owner: Owner,
    pub closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub id: String,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub state: IssueState,
    pub url: String,
    /// Repository in `owner/name` form.
    pub repository: String,
    /// Label names; at most the first 100 are read back.
    pub labels: Vec<String>,
}

/// A field value read back from a board item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValue {
    pub field_name: String,
    pub value: String,
}

/// A board entry wrapping an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub id: String,
    pub issue: Issue,
    /// Values of set fields; at most the first 100 are read back.
    pub field_values: Vec<FieldValue>,
}

impl Item {
    pub fn field_value(&self, field_name: &str) -> Option<&str> {
        self.field_values
            .iter()
            .find(|value| value.field_name == field_name)
            .map(|value| value.value.as_str())
    }
}

/// Restricts which board items a traversal returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    /// Keep only issues from this `owner/name` repository.
    pub repository: Option<String>,
}

impl ItemFilter {
    pub fn repository(repository: impl Into<String>) -> Self {
        Self {
            repository: Some(repository.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.repository.is_none()
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.repository
            .as_deref()
            .is_none_or(|repo| repo.eq_ignore_ascii_case(&item.issue.repository))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IssueStateFilter {
    #[default]
    Open,
    Closed,
    All,
}

impl IssueStateFilter {
    pub(crate) fn states(self) -> &'static [&'static str] {
        match self {
            Self::Open => &["OPEN"],
            Self::Closed => &["CLOSED"],
            Self::All => &["OPEN", "CLOSED"],
        }
    }
}
