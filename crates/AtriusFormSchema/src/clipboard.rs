//! # Clipboard Annotator
//!
//! Some fields can be filled by pasting a record copied from an external system. Each such
//! field carries a [`ClipboardImportSpec`] naming the key under which the external system
//! exports the value.
//!
//! Keys come from two ordered tables, one for the common questionnaire and one for the
//! disease specific ones:
//!
//! ```json
//! {
//!   "common": {
//!     "notifierFacility.address.city": "N.City",
//!     "notifierFacility.name": "N.Name"
//!   },
//!   "condition": {
//!     "hospitalized.serviceProvider.name": "H.Name"
//!   }
//! }
//! ```
//!
//! A table entry matches a field when the entry starts with the question's linkId, the rest
//! of the entry is either empty or begins at a `.` boundary, and that rest contains the
//! field name. Entries are tried in file order and the first match wins.

use serde_json::Value;

use crate::FormSchemaError;
use crate::config::QuestionnaireRole;
use crate::field_group::FieldGroup;
use crate::properties::ClipboardImportSpec;

/// Ordered list of `pattern -> import key` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardTable {
    entries: Vec<(String, String)>,
}

impl ClipboardTable {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    fn from_json(name: &str, value: Option<&Value>) -> Result<Self, FormSchemaError> {
        let Some(value) = value else {
            return Ok(Self::default());
        };
        let object = value.as_object().ok_or_else(|| {
            FormSchemaError::InvalidConfig(format!("clipboard table '{name}' must be an object"))
        })?;
        let mut entries = Vec::with_capacity(object.len());
        for (pattern, key) in object {
            let key = key.as_str().ok_or_else(|| {
                FormSchemaError::InvalidConfig(format!(
                    "clipboard entry '{name}.{pattern}' must map to a string"
                ))
            })?;
            entries.push((pattern.clone(), key.to_string()));
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Import key of the first entry matching `link_id` and `field`.
    ///
    /// An empty `field` addresses the question itself and only matches an entry equal to
    /// the linkId.
    pub fn lookup(&self, link_id: &str, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(pattern, _)| {
                let Some(rest) = pattern.strip_prefix(link_id) else {
                    return false;
                };
                if field.is_empty() {
                    return rest.is_empty();
                }
                rest.starts_with('.') && rest.contains(field)
            })
            .map(|(_, key)| key.as_str())
    }

    /// Attaches an import spec to `field_group` when the table has a key for it.
    /// Returns whether a key was found.
    pub fn annotate(
        &self,
        field_group: &mut FieldGroup,
        link_id: &str,
        field: &str,
        multi: bool,
    ) -> bool {
        match self.lookup(link_id, field) {
            Some(import_key) => {
                field_group.props_mut().import_spec = Some(ClipboardImportSpec {
                    import_key: import_key.to_string(),
                    multi,
                });
                true
            }
            None => false,
        }
    }
}

/// The two clipboard tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardKeys {
    pub common: ClipboardTable,
    pub condition: ClipboardTable,
}

impl ClipboardKeys {
    pub fn from_json(value: &Value) -> Result<Self, FormSchemaError> {
        Ok(Self {
            common: ClipboardTable::from_json("common", value.get("common"))?,
            condition: ClipboardTable::from_json("condition", value.get("condition"))?,
        })
    }

    pub fn table(&self, role: QuestionnaireRole) -> &ClipboardTable {
        match role {
            QuestionnaireRole::Common => &self.common,
            QuestionnaireRole::Condition => &self.condition,
        }
    }
}
