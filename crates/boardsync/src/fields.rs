//! Board field metadata and value coercion.
//!
//! [`resolve`] turns a caller-supplied string into the server's typed value
//! for one field. It is pure: field metadata must already be fetched.

use serde::{Deserialize, Serialize};

/// Server-side data type of a board field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum FieldDataType {
    Text,
    Number,
    Date,
    SingleSelect,
    /// Any type this layer cannot write, such as `ITERATION` or `ASSIGNEES`.
    Unsupported(String),
}

impl FieldDataType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "TEXT",
            Self::Number => "NUMBER",
            Self::Date => "DATE",
            Self::SingleSelect => "SINGLE_SELECT",
            Self::Unsupported(other) => other,
        }
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl From<String> for FieldDataType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "TEXT" => Self::Text,
            "NUMBER" => Self::Number,
            "DATE" => Self::Date,
            "SINGLE_SELECT" => Self::SingleSelect,
            _ => Self::Unsupported(value),
        }
    }
}

impl From<FieldDataType> for String {
    fn from(value: FieldDataType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for FieldDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldOption {
    pub id: String,
    pub name: String,
}

/// A named, typed attribute of a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub id: String,
    pub name: String,
    pub data_type: FieldDataType,
    /// Ordered options; empty unless `data_type` is `SingleSelect`.
    pub options: Vec<FieldOption>,
}

impl Field {
    /// First option whose name matches `name` exactly.
    pub fn option(&self, name: &str) -> Option<&FieldOption> {
        self.options.iter().find(|option| option.name == name)
    }
}

/// First field named `name`, compared case-sensitively.
///
/// The server does not enforce unique names; later duplicates are ignored.
pub fn find_field<'a>(fields: &'a [Field], name: &str) -> Option<&'a Field> {
    fields.iter().find(|field| field.name == name)
}

/// A value the server accepts for one field, in its wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectFieldValue {
    Text(String),
    Number(f64),
    Date(String),
    SingleSelectOptionId(String),
}

/// Result of coercing a raw string for a field.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    /// Write this value.
    Set(ProjectFieldValue),
    /// Remove the field's value.
    Clear,
}

/// Why a value could not be coerced for a field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum FieldError {
    #[error("field not found: {0:?}")]
    FieldNotFound(String),

    #[error("unsupported field type: {0}")]
    UnsupportedType(String),

    #[error("invalid number value: {0:?}")]
    InvalidNumber(String),

    #[error("invalid date format: {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("option not found: {0:?}")]
    OptionNotFound(String),
}

/// Coerces `raw` into the typed value `field` expects.
///
/// An empty string clears a `DATE` field and sets a `TEXT` field to empty.
///
/// # Errors
///
/// Returns a [`FieldError`] when the field type is unsupported or `raw`
/// cannot be coerced.
pub fn resolve(field: &Field, raw: &str) -> Result<ResolvedValue, FieldError> {
    let value = match &field.data_type {
        FieldDataType::Text => ProjectFieldValue::Text(raw.to_string()),
        FieldDataType::Number => {
            let number = raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| FieldError::InvalidNumber(raw.to_string()))?;
            ProjectFieldValue::Number(number)
        }
        FieldDataType::Date if raw.is_empty() => return Ok(ResolvedValue::Clear),
        FieldDataType::Date => {
            if !is_iso_date(raw) {
                return Err(FieldError::InvalidDate(raw.to_string()));
            }
            ProjectFieldValue::Date(raw.to_string())
        }
        FieldDataType::SingleSelect => {
            let option = field
                .option(raw)
                .ok_or_else(|| FieldError::OptionNotFound(raw.to_string()))?;
            ProjectFieldValue::SingleSelectOptionId(option.id.clone())
        }
        FieldDataType::Unsupported(kind) => return Err(FieldError::UnsupportedType(kind.clone())),
    };
    Ok(ResolvedValue::Set(value))
}

/// `YYYY-MM-DD` with exactly that shape, naming a real calendar day.
fn is_iso_date(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    shaped && chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}
