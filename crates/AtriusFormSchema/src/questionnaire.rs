//! # Source Questionnaire Model
//!
//! Read-only view of a FHIR R4 `Questionnaire` as the compiler needs it. The JSON is parsed
//! with serde into a thin wire representation and then normalized into [`SourceQuestion`]
//! nodes: extensions are reduced to the three signals the compiler looks at (item control,
//! reference profile, reference resource) and every `answer[x]` of an `enableWhen` becomes a
//! literal answer code.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::FormSchemaError;
use crate::properties::EnableBehavior;

pub const ITEM_CONTROL_EXTENSION: &str =
    "http://hl7.org/fhir/StructureDefinition/questionnaire-itemControl";
pub const REFERENCE_PROFILE_EXTENSION: &str =
    "http://hl7.org/fhir/StructureDefinition/questionnaire-referenceProfile";
pub const REFERENCE_RESOURCE_EXTENSION: &str =
    "http://hl7.org/fhir/StructureDefinition/questionnaire-referenceResource";

/// Questionnaire item type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemType {
    Group,
    Display,
    Boolean,
    Decimal,
    Integer,
    Date,
    DateTime,
    Time,
    String,
    Text,
    Url,
    Choice,
    OpenChoice,
    Coding,
    Reference,
    Attachment,
    Quantity,
    Other(std::string::String),
}

impl ItemType {
    pub fn parse(value: &str) -> Self {
        match value {
            "group" => ItemType::Group,
            "display" => ItemType::Display,
            "boolean" => ItemType::Boolean,
            "decimal" => ItemType::Decimal,
            "integer" => ItemType::Integer,
            "date" => ItemType::Date,
            "dateTime" => ItemType::DateTime,
            "time" => ItemType::Time,
            "string" => ItemType::String,
            "text" => ItemType::Text,
            "url" => ItemType::Url,
            "choice" => ItemType::Choice,
            "open-choice" => ItemType::OpenChoice,
            "coding" => ItemType::Coding,
            "reference" => ItemType::Reference,
            "attachment" => ItemType::Attachment,
            "quantity" => ItemType::Quantity,
            other => ItemType::Other(other.to_string()),
        }
    }
}

/// One visibility rule of a source question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEnableWhen {
    pub target_link_id: String,
    pub operator: String,
    pub answer_code: String,
}

/// One node of the source questionnaire tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceQuestion {
    pub link_id: String,
    pub text: Option<String>,
    pub item_type: ItemType,
    pub required: bool,
    pub repeats: bool,
    pub read_only: bool,
    pub children: Vec<SourceQuestion>,
    pub answer_value_set: Option<String>,
    pub control_hint: Option<String>,
    pub reference_profile: Option<String>,
    pub reference_resource: Option<String>,
    pub initial_answer_code: Option<String>,
    pub enable_when: Vec<SourceEnableWhen>,
    pub enable_behavior: Option<EnableBehavior>,
}

impl SourceQuestion {
    /// A question with nothing but an id and a type; handy for building trees in code.
    pub fn new(link_id: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            link_id: link_id.into(),
            text: None,
            item_type,
            required: false,
            repeats: false,
            read_only: false,
            children: Vec::new(),
            answer_value_set: None,
            control_hint: None,
            reference_profile: None,
            reference_resource: None,
            initial_answer_code: None,
            enable_when: Vec::new(),
            enable_behavior: None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    pub fn answer_key(&self) -> String {
        format!("{}.answer", self.link_id)
    }
}

/// A parsed questionnaire: metadata plus its top-level items.
#[derive(Debug, Clone, PartialEq)]
pub struct Questionnaire {
    pub id: Option<String>,
    pub url: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub items: Vec<SourceQuestion>,
}

impl Questionnaire {
    pub fn from_json(value: Value) -> Result<Self, FormSchemaError> {
        let raw: RawQuestionnaire = serde_json::from_value(value)?;
        if raw.resource_type != "Questionnaire" {
            return Err(FormSchemaError::InvalidQuestionnaire(format!(
                "expected resourceType Questionnaire, found {}",
                raw.resource_type
            )));
        }
        Ok(Self {
            id: raw.id,
            url: raw.url,
            name: raw.name,
            title: raw.title,
            items: raw.item.into_iter().map(SourceQuestion::from).collect(),
        })
    }

    pub fn from_str(json: &str) -> Result<Self, FormSchemaError> {
        Self::from_json(serde_json::from_str(json)?)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestionnaire {
    resource_type: String,
    id: Option<String>,
    url: Option<String>,
    name: Option<String>,
    title: Option<String>,
    #[serde(default)]
    item: Vec<RawItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    link_id: String,
    text: Option<String>,
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    repeats: bool,
    #[serde(default)]
    read_only: bool,
    answer_value_set: Option<String>,
    #[serde(default)]
    extension: Vec<Value>,
    #[serde(default)]
    enable_when: Vec<Value>,
    enable_behavior: Option<String>,
    #[serde(default)]
    initial: Vec<Value>,
    #[serde(default)]
    item: Vec<RawItem>,
}

impl From<RawItem> for SourceQuestion {
    /// Malformed visibility data stays local to the item: a condition without a literal
    /// target, operator or answer is dropped and an unknown behavior falls back to the
    /// default.
    fn from(raw: RawItem) -> Self {
        let enable_when = raw
            .enable_when
            .iter()
            .filter_map(|ew| match parse_enable_when(ew) {
                Ok(condition) => Some(condition),
                Err(missing) => {
                    warn!(
                        item = %raw.link_id,
                        "Dropping enableWhen without {}", missing
                    );
                    None
                }
            })
            .collect();

        let enable_behavior = raw.enable_behavior.as_deref().and_then(|value| {
            let behavior = EnableBehavior::parse(value);
            if behavior.is_none() {
                warn!(
                    item = %raw.link_id,
                    "Unknown enableBehavior '{}', using the default", value
                );
            }
            behavior
        });

        Self {
            text: raw.text,
            item_type: ItemType::parse(&raw.item_type),
            required: raw.required,
            repeats: raw.repeats,
            read_only: raw.read_only,
            answer_value_set: raw.answer_value_set,
            control_hint: extension_value(&raw.extension, ITEM_CONTROL_EXTENSION)
                .and_then(coding_code),
            reference_profile: extension_value(&raw.extension, REFERENCE_PROFILE_EXTENSION)
                .and_then(Value::as_str)
                .map(str::to_string),
            reference_resource: extension_value(&raw.extension, REFERENCE_RESOURCE_EXTENSION)
                .and_then(Value::as_str)
                .map(str::to_string),
            initial_answer_code: raw.initial.first().and_then(answer_code),
            enable_when,
            enable_behavior,
            children: raw.item.into_iter().map(SourceQuestion::from).collect(),
            link_id: raw.link_id,
        }
    }
}

/// The `value[x]` of the first extension with the given url.
fn extension_value<'a>(extensions: &'a [Value], url: &str) -> Option<&'a Value> {
    extensions
        .iter()
        .find(|ext| ext.get("url").and_then(Value::as_str) == Some(url))
        .and_then(|ext| {
            ext.as_object()?
                .iter()
                .find(|(name, _)| name.starts_with("value"))
                .map(|(_, value)| value)
        })
}

/// First coding code of a CodeableConcept (or the code of a bare Coding).
fn coding_code(value: &Value) -> Option<String> {
    let coding = value
        .get("coding")
        .and_then(Value::as_array)
        .and_then(|codings| codings.first())
        .unwrap_or(value);
    coding.get("code").and_then(Value::as_str).map(str::to_string)
}

/// Literal code of an `answer[x]` / `value[x]` element.
fn answer_code(element: &Value) -> Option<String> {
    let object = element.as_object()?;
    object.iter().find_map(|(name, value)| {
        if !(name.starts_with("answer") || name.starts_with("value")) {
            return None;
        }
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(_) => coding_code(value),
            _ => None,
        }
    })
}

/// A literal condition, or the name of the first element it is missing.
fn parse_enable_when(value: &Value) -> Result<SourceEnableWhen, &'static str> {
    Ok(SourceEnableWhen {
        target_link_id: value
            .get("question")
            .and_then(Value::as_str)
            .ok_or("question")?
            .to_string(),
        operator: value
            .get("operator")
            .and_then(Value::as_str)
            .ok_or("operator")?
            .to_string(),
        answer_code: answer_code(value).ok_or("answer")?,
    })
}
