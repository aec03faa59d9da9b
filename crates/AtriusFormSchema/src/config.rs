//! Compiler configuration: feature flags and the data directory layout.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Boolean toggles that change the shape of the compiled forms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureFlags {
    /// Render labelled groups inside a panel wrapper.
    pub group_labels_as_panels: bool,
    /// Emit the free-text reason field of a hospitalization.
    pub hospitalization_reason: bool,
    /// Emit the "copy notifier facility" checkbox above a hospitalization's service provider.
    pub hospitalization_copy_checkboxes: bool,
}

/// Which clipboard table a questionnaire uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionnaireRole {
    /// Questions shared by every notification (notifier, notified person, ...).
    Common,
    /// Disease specific questions.
    Condition,
}

/// Where the loader finds its input.
///
/// ```text
/// <data_dir>/
///   questionnaires/*.json   FHIR Questionnaire resources
///   terminology/*.json      FHIR ValueSet / CodeSystem resources (or Bundles of them)
///   clipboard.json          optional {"common": {...}, "condition": {...}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSourceConfig {
    pub data_dir: PathBuf,
    /// Key of the questionnaire compiled with the common clipboard table.
    pub common_questionnaire: String,
    pub features: FeatureFlags,
}

impl FormSourceConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            common_questionnaire: "common".to_string(),
            features: FeatureFlags::default(),
        }
    }

    pub fn questionnaire_dir(&self) -> PathBuf {
        self.data_dir.join("questionnaires")
    }

    pub fn terminology_dir(&self) -> PathBuf {
        self.data_dir.join("terminology")
    }

    pub fn clipboard_file(&self) -> PathBuf {
        self.data_dir.join("clipboard.json")
    }

    pub fn role_of(&self, key: &str) -> QuestionnaireRole {
        if key == self.common_questionnaire {
            QuestionnaireRole::Common
        } else {
            QuestionnaireRole::Condition
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
