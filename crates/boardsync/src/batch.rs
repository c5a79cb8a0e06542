//! Multi-operation field updates.
//!
//! A batch of independent `(item, field, value)` updates is compiled into one
//! mutation document with one aliased sub-operation and one typed input
//! variable per update, so N updates cost a single round trip.
//!
//! The number of sub-operations depends on the input, so the response is
//! decoded per alias rather than into a fixed structure.

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::{Map, Value as JsonValue, json};

use crate::{
    error::Error,
    fields::{self, Field, FieldDataType, FieldError, ResolvedValue},
    transport::GraphqlRequest,
};

/// One requested change: set `field_name` on `item_id` to `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub item_id: String,
    pub field_name: String,
    pub value: String,
}

impl FieldUpdate {
    pub fn new(item_id: impl Into<String>, field_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            field_name: field_name.into(),
            value: value.into(),
        }
    }
}

/// A [`FieldUpdate`] with its field metadata and typed value resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedUpdate {
    pub item_id: String,
    pub field_name: String,
    pub field_id: String,
    pub data_type: FieldDataType,
    pub value: ResolvedValue,
}

/// Outcome of one [`FieldUpdate`] in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchUpdateResult {
    pub item_id: String,
    pub field_name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchUpdateResult {
    pub(crate) fn succeeded(item_id: &str, field_name: &str) -> Self {
        Self {
            item_id: item_id.to_string(),
            field_name: field_name.to_string(),
            success: true,
            error: None,
        }
    }

    pub(crate) fn failed(item_id: &str, field_name: &str, error: impl Into<String>) -> Self {
        Self {
            item_id: item_id.to_string(),
            field_name: field_name.to_string(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Looks up the update's field by name and coerces its value.
///
/// # Errors
///
/// Returns [`FieldError::FieldNotFound`] for an unknown field name, or the
/// coercion error from [`fields::resolve`].
pub fn resolve_update(update: &FieldUpdate, fields: &[Field]) -> Result<ResolvedUpdate, FieldError> {
    let field = fields::find_field(fields, &update.field_name)
        .ok_or_else(|| FieldError::FieldNotFound(update.field_name.clone()))?;
    let value = fields::resolve(field, &update.value)?;
    Ok(ResolvedUpdate {
        item_id: update.item_id.clone(),
        field_name: update.field_name.clone(),
        field_id: field.id.clone(),
        data_type: field.data_type.clone(),
        value,
    })
}

/// A compiled batch: one document plus its variables.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledBatch {
    pub document: String,
    pub variables: Map<String, JsonValue>,
    /// Alias of each sub-operation, in input order.
    pub aliases: Vec<String>,
}

impl CompiledBatch {
    pub fn request(&self) -> GraphqlRequest {
        GraphqlRequest::new(self.document.clone(), JsonValue::Object(self.variables.clone()))
    }

    /// The JSON request body (`query` and `variables`).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails, which does not happen for
    /// values produced by [`compile`].
    pub fn body(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.request())
    }
}

/// Compiles resolved updates for `project_id` into one mutation.
///
/// Returns `Ok(None)` for an empty batch; callers must skip execution rather
/// than send an empty document.
///
/// # Errors
///
/// Returns an unsupported-field-type error if any update targets a field type
/// other than text, number, date or single select.
pub fn compile(project_id: &str, updates: &[ResolvedUpdate]) -> Result<Option<CompiledBatch>, Error> {
    if updates.is_empty() {
        return Ok(None);
    }

    let mut declarations = Vec::with_capacity(updates.len());
    let mut selections = String::new();
    let mut variables = Map::with_capacity(updates.len());
    let mut aliases = Vec::with_capacity(updates.len());

    for (index, update) in updates.iter().enumerate() {
        if !update.data_type.is_writable() {
            return Err(FieldError::UnsupportedType(update.data_type.to_string()).into());
        }

        let variable = format!("input{index}");
        let alias = format!("update{index}");
        let (input_type, mutation, input) = match &update.value {
            ResolvedValue::Set(value) => (
                "UpdateProjectV2ItemFieldValueInput",
                "updateProjectV2ItemFieldValue",
                json!({
                    "projectId": project_id,
                    "itemId": update.item_id,
                    "fieldId": update.field_id,
                    "value": value,
                }),
            ),
            ResolvedValue::Clear => (
                "ClearProjectV2ItemFieldValueInput",
                "clearProjectV2ItemFieldValue",
                json!({
                    "projectId": project_id,
                    "itemId": update.item_id,
                    "fieldId": update.field_id,
                }),
            ),
        };

        declarations.push(format!("${variable}: {input_type}!"));
        // Writing to a String cannot fail.
        let _ = write!(
            selections,
            "\n  {alias}: {mutation}(input: ${variable}) {{\n    projectV2Item {{\n      id\n    }}\n  }}"
        );
        variables.insert(variable, input);
        aliases.push(alias);
    }

    let document = format!(
        "mutation BatchUpdateProjectItemFields({}) {{{selections}\n}}",
        declarations.join(", ")
    );

    Ok(Some(CompiledBatch {
        document,
        variables,
        aliases,
    }))
}
