//! # Data Directory Loader
//!
//! Reads everything the compiler needs from one directory (see [`FormSourceConfig`] for the
//! layout) and compiles every questionnaire found there.
//!
//! Terminology is loaded before any questionnaire is compiled, so option lookups during
//! compilation never touch the file system. A questionnaire file that cannot be read or
//! parsed fails the whole load; defects inside a parsable questionnaire only drop the
//! affected items.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

use crate::FormSchemaError;
use crate::clipboard::ClipboardKeys;
use crate::compiler::{CompiledForm, FormCompiler};
use crate::config::FormSourceConfig;
use crate::questionnaire::Questionnaire;
use crate::terminology::ValueSetRegistry;

/// Every compiled form of one load, keyed by questionnaire key.
#[derive(Debug, Clone)]
pub struct CompiledForms {
    pub forms: BTreeMap<String, CompiledForm>,
    pub loaded_at: DateTime<Utc>,
}

impl CompiledForms {
    pub fn empty() -> Self {
        Self {
            forms: BTreeMap::new(),
            loaded_at: Utc::now(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CompiledForm> {
        self.forms.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.forms.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

/// Loads and compiles the data directory described by `config`.
pub async fn load_forms(config: &FormSourceConfig) -> Result<CompiledForms, FormSchemaError> {
    let value_sets = load_terminology(&config.terminology_dir()).await?;
    let clipboard = load_clipboard(&config.clipboard_file()).await?;
    let compiler = FormCompiler::new(&value_sets, &clipboard, config.features);

    let mut forms = BTreeMap::new();
    for path in json_files(&config.questionnaire_dir()).await? {
        let questionnaire = read_questionnaire(&path).await?;
        let key = form_key(&path, &questionnaire);
        let role = config.role_of(&key);
        debug!(form = %key, role = ?role, path = %path.display(), "Compiling questionnaire");

        let form = compiler.compile(&key, &questionnaire, role);
        if forms.insert(key.clone(), form).is_some() {
            return Err(FormSchemaError::InvalidConfig(format!(
                "two questionnaires share the key '{key}'"
            )));
        }
    }

    info!(
        forms = forms.len(),
        value_sets = value_sets.len(),
        data_dir = %config.data_dir().display(),
        "Loaded questionnaire forms"
    );
    Ok(CompiledForms {
        forms,
        loaded_at: Utc::now(),
    })
}

/// Registers every ValueSet and CodeSystem below `dir`. A missing directory yields an empty
/// registry.
pub async fn load_terminology(dir: &Path) -> Result<ValueSetRegistry, FormSchemaError> {
    let mut registry = ValueSetRegistry::new();
    for path in json_files(dir).await? {
        registry.add_resource(&read_json(&path).await?);
    }
    registry.finish();
    Ok(registry)
}

/// Reads the clipboard tables; a missing file means no clipboard keys at all.
pub async fn load_clipboard(path: &Path) -> Result<ClipboardKeys, FormSchemaError> {
    if !fs::try_exists(path).await? {
        debug!(path = %path.display(), "No clipboard configuration");
        return Ok(ClipboardKeys::default());
    }
    ClipboardKeys::from_json(&read_json(path).await?)
}

pub async fn read_questionnaire(path: &Path) -> Result<Questionnaire, FormSchemaError> {
    Questionnaire::from_json(read_json(path).await?).map_err(|err| match err {
        FormSchemaError::InvalidQuestionnaire(msg) => {
            FormSchemaError::InvalidQuestionnaire(format!("{}: {msg}", path.display()))
        }
        other => other,
    })
}

/// The questionnaire's `id`, or the file stem when it has none.
pub fn form_key(path: &Path, questionnaire: &Questionnaire) -> String {
    questionnaire
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_default()
}

async fn read_json(path: &Path) -> Result<Value, FormSchemaError> {
    let contents = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&contents)?)
}

/// `*.json` files directly inside `dir`, sorted by name.
async fn json_files(dir: &Path) -> Result<Vec<PathBuf>, FormSchemaError> {
    if !fs::try_exists(dir).await? {
        return Ok(Vec::new());
    }
    let mut entries = fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") && entry.file_type().await?.is_file()
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
