//! # Compiler Driver
//!
//! Walks a questionnaire top-down and hands every question to its [`ItemProcessor`].
//!
//! - Children of a group are compiled below the group node. A repeating group gets a row
//!   template first and its children are compiled into the template.
//! - Children of any other item are compiled as following siblings in the same parent.
//! - Whenever a row template is complete, the enable-when expressions inside it are
//!   re-scoped (see [`enable_when::rescope_field_array`]).
//!
//! A question whose processor fails is rolled back: every field group it attached to the
//! parent is detached again, the failure is logged at warn level, and the walk continues
//! with the next question. Compilation itself never fails.

use serde::ser::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::clipboard::ClipboardKeys;
use crate::config::{FeatureFlags, QuestionnaireRole};
use crate::enable_when;
use crate::field_group::{FieldArray, FieldGroup, FieldGroupId, FieldGroupTree};
use crate::processors::{ItemContext, ItemProcessor};
use crate::questionnaire::{Questionnaire, SourceQuestion};
use crate::terminology::ValueSetLookup;

/// Attaches an empty row template below `section`, so rows built into it can already walk
/// up to the section while it is being filled.
pub(crate) fn begin_field_array(tree: &mut FieldGroupTree, section: FieldGroupId) -> FieldGroupId {
    tree.add_child(section, FieldGroup::group())
}

/// Installs the finished template on `section` and re-scopes the conditions inside it.
pub(crate) fn finish_field_array(
    tree: &mut FieldGroupTree,
    section: FieldGroupId,
    template: FieldGroupId,
) {
    if tree.children(template).is_empty() {
        tree.detach(template);
    }
    tree.set_field_array(section, FieldArray::new(template));
    enable_when::rescope_field_array(tree, section);
}

/// One compiled questionnaire.
#[derive(Debug, Clone)]
pub struct CompiledForm {
    pub key: String,
    pub role: QuestionnaireRole,
    pub title: Option<String>,
    pub tree: FieldGroupTree,
}

impl CompiledForm {
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        self.tree.to_json()
    }
}

impl Serialize for CompiledForm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tree.view(self.tree.root()).serialize(serializer)
    }
}

/// Compiles questionnaires against one set of collaborators.
pub struct FormCompiler<'a> {
    value_sets: &'a dyn ValueSetLookup,
    clipboard: &'a ClipboardKeys,
    features: FeatureFlags,
}

impl<'a> FormCompiler<'a> {
    pub fn new(
        value_sets: &'a dyn ValueSetLookup,
        clipboard: &'a ClipboardKeys,
        features: FeatureFlags,
    ) -> Self {
        Self {
            value_sets,
            clipboard,
            features,
        }
    }

    /// Compiles `questionnaire` under `key`.
    ///
    /// A [`QuestionnaireRole::Condition`] questionnaire uses its key as disease code and
    /// the condition clipboard table; the common questionnaire has no disease code.
    pub fn compile(
        &self,
        key: &str,
        questionnaire: &Questionnaire,
        role: QuestionnaireRole,
    ) -> CompiledForm {
        let disease = match role {
            QuestionnaireRole::Common => "",
            QuestionnaireRole::Condition => key,
        };
        let mut ctx = ItemContext::new(
            self.value_sets,
            self.clipboard.table(role),
            self.features,
            disease,
        );

        let mut tree = FieldGroupTree::new();
        let root = tree.root();
        compile_items(&mut tree, &questionnaire.items, root, &mut ctx);

        debug!(form = key, nodes = tree.len(), "Compiled questionnaire");
        CompiledForm {
            key: key.to_string(),
            role,
            title: questionnaire.title.clone(),
            tree,
        }
    }
}

fn compile_items(
    tree: &mut FieldGroupTree,
    questions: &[SourceQuestion],
    parent: FieldGroupId,
    ctx: &mut ItemContext<'_>,
) {
    for question in questions {
        compile_item(tree, question, parent, ctx);
    }
}

fn compile_item(
    tree: &mut FieldGroupTree,
    question: &SourceQuestion,
    parent: FieldGroupId,
    ctx: &mut ItemContext<'_>,
) {
    let processor = ItemProcessor::for_question(question);
    debug!(link_id = %question.link_id, processor = ?processor, "Compiling item");

    let attached_before = tree.children(parent).len();
    let produced = match processor.process(tree, question, parent, ctx) {
        Ok(produced) => produced,
        Err(err) => {
            let partial = tree.children(parent)[attached_before..].to_vec();
            for id in partial {
                tree.detach(id);
            }
            warn!(
                link_id = %question.link_id,
                error = %err,
                "Dropping item that could not be compiled"
            );
            return;
        }
    };

    if question.children.is_empty() {
        return;
    }
    match (processor, produced.first()) {
        (ItemProcessor::Group, Some(&group)) if question.repeats => {
            let template = begin_field_array(tree, group);
            compile_items(tree, &question.children, template, ctx);
            finish_field_array(tree, group, template);
        }
        (ItemProcessor::Group, Some(&group)) => {
            compile_items(tree, &question.children, group, ctx);
        }
        _ => compile_items(tree, &question.children, parent, ctx),
    }
}
