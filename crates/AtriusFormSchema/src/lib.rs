//! # Questionnaire Form Schema Compiler
//!
//! This crate compiles FHIR R4 `Questionnaire` resources into a declarative form schema: a
//! tree of field groups that a front-end form engine renders directly. Every question
//! becomes one or more field groups carrying their labels, answer options, clipboard import
//! keys and visibility conditions.
//!
//! There are two consumers of this crate:
//! - `atrius-form-server` - an HTTP server that loads a data directory once, serves the
//!   compiled forms and swaps in a freshly compiled set on reload.
//! - `atrius-form-cli` - compiles a single questionnaire file and prints the schema.
//!
//! ## Architecture
//!
//! - **Source model** ([`Questionnaire`], [`SourceQuestion`]): the parsed questionnaire tree
//! - **Output model** ([`FieldGroupTree`], [`FieldGroup`], [`Properties`]): arena-backed
//!   field-group tree with JSON serialization
//! - **Item processors** ([`processors`]): one processor per question kind, selected through
//!   the closed [`ItemProcessor`] enum
//! - **Enable-when resolution** ([`enable_when`]): turns `enableWhen` links into relative
//!   paths within the tree being built, and re-scopes them inside repeating sections
//! - **Clipboard annotation** ([`clipboard`]): attaches external paste keys to fields
//! - **Driver** ([`FormCompiler`]): walks a questionnaire and wires everything together
//! - **Loading and publishing** ([`loader`], [`FormStore`]): compiles a data directory and
//!   publishes the result atomically
//!
//! ## Usage Example
//!
//! ```rust
//! use atrius_form_schema::{
//!     ClipboardKeys, FeatureFlags, FieldOption, FormCompiler, Questionnaire,
//!     QuestionnaireRole, ValueSetRegistry,
//! };
//!
//! let questionnaire = Questionnaire::from_str(r#"{
//!     "resourceType": "Questionnaire",
//!     "item": [{
//!         "linkId": "fever",
//!         "type": "coding",
//!         "text": "Fever",
//!         "answerValueSet": "https://example.org/ValueSet/yesNo"
//!     }]
//! }"#).unwrap();
//!
//! let mut value_sets = ValueSetRegistry::new();
//! value_sets.insert(
//!     "https://example.org/ValueSet/yesNo",
//!     vec![FieldOption::new("yes", "Yes"), FieldOption::new("no", "No")],
//! );
//! let clipboard = ClipboardKeys::default();
//!
//! let compiler = FormCompiler::new(&value_sets, &clipboard, FeatureFlags::default());
//! let form = compiler.compile("CVDD", &questionnaire, QuestionnaireRole::Condition);
//!
//! let json = form.to_json().unwrap();
//! assert_eq!(json["fieldGroup"][0]["key"], "fever.answer");
//! assert_eq!(json["fieldGroup"][0]["fieldGroup"][0]["type"], "autocomplete-coding");
//! ```

pub mod clipboard;
pub mod compiler;
pub mod config;
pub mod enable_when;
pub mod field_group;
pub mod loader;
pub mod processors;
pub mod properties;
pub mod questionnaire;
pub mod store;
pub mod terminology;

use thiserror::Error;

pub use clipboard::{ClipboardKeys, ClipboardTable};
pub use compiler::{CompiledForm, FormCompiler};
pub use config::{FeatureFlags, FormSourceConfig, QuestionnaireRole};
pub use enable_when::EnableWhenError;
pub use field_group::{FieldArray, FieldGroup, FieldGroupId, FieldGroupTree, FieldKind, Wrapper};
pub use loader::{CompiledForms, load_forms};
pub use processors::ItemProcessor;
pub use properties::{
    ClipboardImportSpec, EnableBehavior, EnableWhenExpr, FieldOption, Properties, Validator,
};
pub use questionnaire::{ItemType, Questionnaire, SourceEnableWhen, SourceQuestion};
pub use store::FormStore;
pub use terminology::{TerminologyError, ValueSetLookup, ValueSetRegistry};

/// Errors raised while loading or compiling questionnaires.
#[derive(Debug, Error)]
pub enum FormSchemaError {
    /// An answer value set referenced by a question is not known to the lookup.
    #[error("Value set not found: {0}")]
    ValueSetNotFound(String),

    /// The questionnaire JSON is structurally valid but cannot be compiled.
    #[error("Invalid questionnaire: {0}")]
    InvalidQuestionnaire(String),

    /// A configuration file (clipboard keys, data directory) is malformed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<TerminologyError> for FormSchemaError {
    fn from(err: TerminologyError) -> Self {
        match err {
            TerminologyError::NotFound(url) => FormSchemaError::ValueSetNotFound(url),
        }
    }
}
