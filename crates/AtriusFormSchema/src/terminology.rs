//! # Answer Option Lookup
//!
//! Choice fields get their options from a terminology lookup keyed by the item's
//! `answerValueSet`. The compiler only depends on the [`ValueSetLookup`] trait; the
//! in-memory [`ValueSetRegistry`] is what the loader fills from the FHIR `ValueSet` and
//! `CodeSystem` resources found next to the questionnaires.
//!
//! Option lists are resolved in this order:
//! 1. `ValueSet.expansion.contains` (recursively, abstract entries skipped)
//! 2. `ValueSet.compose.include[].concept`
//! 3. `ValueSet.compose.include[].system` pointing at a registered `CodeSystem`
//!
//! Lookups ignore a `|version` suffix on the canonical url.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::properties::FieldOption;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerminologyError {
    #[error("Value set not found: {0}")]
    NotFound(String),
}

/// Resolves an answer value set to its ordered options.
pub trait ValueSetLookup: Send + Sync {
    /// Returns [`TerminologyError::NotFound`] when the value set is unknown; never panics.
    fn options(&self, value_set: &str) -> Result<Vec<FieldOption>, TerminologyError>;
}

/// Canonical url without its `|version` suffix.
pub fn canonical_url(reference: &str) -> &str {
    reference.split('|').next().unwrap_or(reference)
}

#[derive(Debug, Clone, Default)]
pub struct ValueSetRegistry {
    value_sets: HashMap<String, Vec<FieldOption>>,
    code_systems: HashMap<String, Vec<FieldOption>>,
    pending: Vec<(String, Vec<String>)>,
}

impl ValueSetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an option list directly.
    pub fn insert(&mut self, url: impl Into<String>, options: Vec<FieldOption>) {
        let url = url.into();
        self.value_sets
            .insert(canonical_url(&url).to_string(), options);
    }

    pub fn len(&self) -> usize {
        self.value_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value_sets.is_empty()
    }

    /// Adds a `ValueSet`, `CodeSystem` or a `Bundle` of either. Other resource types are
    /// skipped.
    pub fn add_resource(&mut self, resource: &Value) {
        match resource.get("resourceType").and_then(Value::as_str) {
            Some("Bundle") => {
                for entry in resource
                    .get("entry")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                {
                    if let Some(inner) = entry.get("resource") {
                        self.add_resource(inner);
                    }
                }
            }
            Some("CodeSystem") => self.add_code_system(resource),
            Some("ValueSet") => self.add_value_set(resource),
            other => debug!("Skipping terminology resource of type {:?}", other),
        }
    }

    /// Resolves value sets whose compose only names code systems. Call once after every
    /// resource has been added, since code systems may be registered after the value sets
    /// that include them.
    pub fn finish(&mut self) {
        for (url, systems) in std::mem::take(&mut self.pending) {
            let options: Vec<FieldOption> = systems
                .iter()
                .filter_map(|system| self.code_systems.get(system))
                .flatten()
                .cloned()
                .collect();
            if options.is_empty() {
                debug!("Value set {} includes no known code system", url);
                continue;
            }
            self.value_sets.entry(url).or_insert(options);
        }
    }

    fn add_code_system(&mut self, resource: &Value) {
        let Some(url) = resource.get("url").and_then(Value::as_str) else {
            return;
        };
        let mut options = Vec::new();
        collect_concepts(resource.get("concept"), Some(url), &mut options);
        self.code_systems
            .insert(canonical_url(url).to_string(), options);
    }

    fn add_value_set(&mut self, resource: &Value) {
        let Some(url) = resource.get("url").and_then(Value::as_str) else {
            return;
        };
        let url = canonical_url(url).to_string();

        if let Some(contains) = resource.pointer("/expansion/contains") {
            let mut options = Vec::new();
            collect_contains(contains, &mut options);
            self.value_sets.insert(url, options);
            return;
        }

        let includes = resource
            .pointer("/compose/include")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut options = Vec::new();
        let mut systems = Vec::new();
        for include in &includes {
            let system = include.get("system").and_then(Value::as_str);
            match include.get("concept") {
                Some(concepts) => collect_concepts(Some(concepts), system, &mut options),
                None => systems.extend(system.map(|s| canonical_url(s).to_string())),
            }
        }

        if options.is_empty() && !systems.is_empty() {
            self.pending.push((url, systems));
        } else {
            self.value_sets.insert(url, options);
        }
    }
}

impl ValueSetLookup for ValueSetRegistry {
    fn options(&self, value_set: &str) -> Result<Vec<FieldOption>, TerminologyError> {
        self.value_sets
            .get(canonical_url(value_set))
            .cloned()
            .ok_or_else(|| TerminologyError::NotFound(value_set.to_string()))
    }
}

fn option_from(entry: &Value, system: Option<&str>) -> Option<FieldOption> {
    let code = entry.get("code").and_then(Value::as_str)?;
    let label = entry
        .get("display")
        .and_then(Value::as_str)
        .unwrap_or(code);
    let option = FieldOption::new(code, label);
    Some(match entry.get("system").and_then(Value::as_str).or(system) {
        Some(system) => option.with_system(system),
        None => option,
    })
}

fn collect_contains(contains: &Value, out: &mut Vec<FieldOption>) {
    for entry in contains.as_array().into_iter().flatten() {
        let is_abstract = entry
            .get("abstract")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !is_abstract {
            out.extend(option_from(entry, None));
        }
        if let Some(nested) = entry.get("contains") {
            collect_contains(nested, out);
        }
    }
}

fn collect_concepts(concepts: Option<&Value>, system: Option<&str>, out: &mut Vec<FieldOption>) {
    for concept in concepts.and_then(Value::as_array).into_iter().flatten() {
        out.extend(option_from(concept, system));
        collect_concepts(concept.get("concept"), system, out);
    }
}
