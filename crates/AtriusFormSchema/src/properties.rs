//! # Field Group Properties
//!
//! Display and validation attributes carried by a single [`FieldGroup`](crate::FieldGroup).
//! Everything here serializes into the `props` object of the compiled form schema; empty
//! collections, `false` flags and absent values are omitted so the rendering engine only
//! sees what was actually set.

use serde::{Deserialize, Serialize};

/// One selectable answer of a choice field.
///
/// Options keep the order in which the terminology lookup returned them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub code: String,
    #[serde(rename = "display")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl FieldOption {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            system: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// How several enable-when expressions on the same field are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnableBehavior {
    Any,
    All,
}

impl EnableBehavior {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "any" => Some(EnableBehavior::Any),
            "all" => Some(EnableBehavior::All),
            _ => None,
        }
    }
}

/// A resolved visibility condition.
///
/// `path` is relative to the field group holding the expression and only ever consists of
/// `parent` hops followed by an optional `fieldGroup.<index>` step. The re-scoping pass for
/// repeating sections rewrites it in place, which is why `source_question_id` is kept even
/// though it is never rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnableWhenExpr {
    pub path: String,
    #[serde(rename = "op")]
    pub operator: String,
    pub value: String,
    #[serde(skip)]
    pub source_question_id: String,
}

/// Marks a field as a paste target for data copied from an external system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardImportSpec {
    pub import_key: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub multi: bool,
}

/// Named validators understood by the rendering engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Validator {
    #[serde(rename = "valueCodingValidator")]
    ValueCoding,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub clearable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Input type hint for plain inputs (`number`, `email`, ...).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enable_when: Vec<EnableWhenExpr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_behavior: Option<EnableBehavior>,
    #[serde(rename = "clipboard", skip_serializing_if = "Option::is_none")]
    pub import_spec: Option<ClipboardImportSpec>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

impl Properties {
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// Label only when there is something to show.
    pub fn with_optional_label(label: Option<&str>) -> Self {
        Self {
            label: label.filter(|l| !l.is_empty()).map(str::to_string),
            ..Self::default()
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = options;
        self
    }
}
