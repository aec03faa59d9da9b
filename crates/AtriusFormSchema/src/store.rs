//! Published set of compiled forms.
//!
//! Readers take a snapshot with [`FormStore::snapshot`] and keep using it for the rest of
//! their request. A reload compiles the data directory off to the side and swaps the whole
//! set in one step; a failed reload leaves the published set untouched.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{info, warn};

use crate::FormSchemaError;
use crate::compiler::CompiledForm;
use crate::config::FormSourceConfig;
use crate::loader::{CompiledForms, load_forms};

#[derive(Debug)]
pub struct FormStore {
    config: FormSourceConfig,
    forms: ArcSwap<CompiledForms>,
}

impl FormStore {
    /// A store that publishes nothing until the first [`reload`](Self::reload).
    pub fn new(config: FormSourceConfig) -> Self {
        Self {
            config,
            forms: ArcSwap::from_pointee(CompiledForms::empty()),
        }
    }

    /// Loads the data directory and publishes the result.
    pub async fn open(config: FormSourceConfig) -> Result<Self, FormSchemaError> {
        let forms = load_forms(&config).await?;
        Ok(Self {
            config,
            forms: ArcSwap::from_pointee(forms),
        })
    }

    pub fn config(&self) -> &FormSourceConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Arc<CompiledForms> {
        self.forms.load_full()
    }

    pub fn get(&self, key: &str) -> Option<CompiledForm> {
        self.forms.load().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.forms.load().keys().map(str::to_string).collect()
    }

    /// Recompiles the data directory and swaps the result in.
    pub async fn reload(&self) -> Result<Arc<CompiledForms>, FormSchemaError> {
        match load_forms(&self.config).await {
            Ok(forms) => {
                let forms = Arc::new(forms);
                self.forms.store(Arc::clone(&forms));
                info!(forms = forms.len(), "Published reloaded forms");
                Ok(forms)
            }
            Err(err) => {
                warn!(error = %err, "Reload failed, keeping the published forms");
                Err(err)
            }
        }
    }
}
