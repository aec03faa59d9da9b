//! # Item Processors
//!
//! One processor per kind of source question. [`ItemProcessor::for_question`] picks the
//! processor from the item type (and, for references, from the reference extensions);
//! [`ItemProcessor::process`] builds the question's field groups below a parent that
//! already sits in the tree, so enable-when paths can be resolved while building.
//!
//! Every non-group question produces an *answer container* keyed `<linkId>.answer` holding
//! the item's enable-when expressions, with the value field(s) below it. A repeating
//! question turns its container into a repeat section whose row template holds one value.
//!
//! | Item type | Processor | Value key |
//! |---|---|---|
//! | group | [`group`] | (children) |
//! | choice, open-choice, coding | [`choice`] | `valueCoding` |
//! | date | [`date`] | `valueDate` |
//! | string, url, text, integer, decimal, dateTime, time | [`input`] | `value<Type>` |
//! | boolean | [`input`] | `valueBoolean` |
//! | reference | [`reference`] | structured or `valueReference` |

pub mod choice;
pub mod date;
pub mod group;
pub mod input;
pub mod reference;

use tracing::info;

use crate::FormSchemaError;
use crate::clipboard::ClipboardTable;
use crate::compiler::{begin_field_array, finish_field_array};
use crate::config::FeatureFlags;
use crate::enable_when;
use crate::field_group::{FieldGroup, FieldGroupId, FieldGroupTree, FieldKind};
use crate::questionnaire::{ItemType, SourceQuestion};
use crate::terminology::ValueSetLookup;

pub use input::InputKind;
pub use reference::ReferenceKind;

/// Placeholder of every date input.
pub const DATE_PLACEHOLDER: &str = "DD.MM.YYYY";

/// Collaborators and per-questionnaire settings shared by all processors.
pub struct ItemContext<'a> {
    pub value_sets: &'a dyn ValueSetLookup,
    pub clipboard: &'a ClipboardTable,
    pub features: FeatureFlags,
    /// Disease code of the questionnaire being compiled; empty for the common one.
    pub disease: &'a str,
    enable_when_suppressed: bool,
}

impl<'a> ItemContext<'a> {
    pub fn new(
        value_sets: &'a dyn ValueSetLookup,
        clipboard: &'a ClipboardTable,
        features: FeatureFlags,
        disease: &'a str,
    ) -> Self {
        Self {
            value_sets,
            clipboard,
            features,
            disease,
            enable_when_suppressed: false,
        }
    }

    /// Resolves the question's enable-when conditions onto `holder`, unless suppressed.
    pub fn apply_enable_when(
        &self,
        tree: &mut FieldGroupTree,
        holder: FieldGroupId,
        question: &SourceQuestion,
    ) {
        if self.enable_when_suppressed {
            return;
        }
        enable_when::apply(
            tree,
            holder,
            &question.enable_when,
            question.enable_behavior,
        );
    }

    pub fn enable_when_suppressed(&self) -> bool {
        self.enable_when_suppressed
    }

    /// Runs `build` with enable-when application switched off, then restores the previous
    /// state.
    pub fn without_enable_when<T>(&mut self, build: impl FnOnce(&mut Self) -> T) -> T {
        let previous = std::mem::replace(&mut self.enable_when_suppressed, true);
        let out = build(self);
        self.enable_when_suppressed = previous;
        out
    }
}

/// The closed set of processors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemProcessor {
    Group,
    Choice,
    Date,
    Input(InputKind),
    Reference(ReferenceKind),
    /// Display items carry no answer.
    Display,
    /// Logged and dropped.
    Unsupported(String),
}

impl ItemProcessor {
    pub fn for_question(question: &SourceQuestion) -> Self {
        match &question.item_type {
            ItemType::Group => ItemProcessor::Group,
            ItemType::Choice | ItemType::OpenChoice | ItemType::Coding => ItemProcessor::Choice,
            ItemType::Date => ItemProcessor::Date,
            ItemType::String | ItemType::Url => ItemProcessor::Input(InputKind::Text),
            ItemType::Text => ItemProcessor::Input(InputKind::Textarea),
            ItemType::Integer => ItemProcessor::Input(InputKind::Integer),
            ItemType::Decimal => ItemProcessor::Input(InputKind::Decimal),
            ItemType::DateTime => ItemProcessor::Input(InputKind::DateTime),
            ItemType::Time => ItemProcessor::Input(InputKind::Time),
            ItemType::Boolean => ItemProcessor::Input(InputKind::Boolean),
            ItemType::Reference => match reference::classify(question) {
                Some(kind) => ItemProcessor::Reference(kind),
                None => ItemProcessor::Unsupported(format!(
                    "reference (profile: {:?}, resource: {:?})",
                    question.reference_profile, question.reference_resource
                )),
            },
            ItemType::Display => ItemProcessor::Display,
            ItemType::Attachment => ItemProcessor::Unsupported("attachment".to_string()),
            ItemType::Quantity => ItemProcessor::Unsupported("quantity".to_string()),
            ItemType::Other(other) => ItemProcessor::Unsupported(other.clone()),
        }
    }

    /// Builds the question's field groups below `parent` and returns the top-level ones.
    ///
    /// The group processor only creates the group node; its children are compiled by the
    /// driver.
    pub fn process(
        &self,
        tree: &mut FieldGroupTree,
        question: &SourceQuestion,
        parent: FieldGroupId,
        ctx: &mut ItemContext<'_>,
    ) -> Result<Vec<FieldGroupId>, FormSchemaError> {
        match self {
            ItemProcessor::Group => Ok(vec![group::process(tree, question, parent, ctx)]),
            ItemProcessor::Choice => choice::process(tree, question, parent, ctx),
            ItemProcessor::Date => Ok(vec![date::process(tree, question, parent, ctx)]),
            ItemProcessor::Input(kind) => Ok(vec![input::process(*kind, tree, question, parent, ctx)]),
            ItemProcessor::Reference(kind) => reference::process(*kind, tree, question, parent, ctx),
            ItemProcessor::Display => Ok(Vec::new()),
            ItemProcessor::Unsupported(kind) => {
                info!(
                    link_id = %question.link_id,
                    "Unsupported item kind '{}', omitting it from the form",
                    kind
                );
                Ok(Vec::new())
            }
        }
    }
}

/// Creates `<linkId>.answer` below `parent` and resolves the question's enable-when on it.
pub(crate) fn answer_container(
    tree: &mut FieldGroupTree,
    question: &SourceQuestion,
    parent: FieldGroupId,
    ctx: &ItemContext<'_>,
) -> FieldGroupId {
    let container = tree.add_child(parent, FieldGroup::keyed(question.answer_key()));
    ctx.apply_enable_when(tree, container, question);
    container
}

/// Builds the value row(s) of an answer container. When `repeating`, the container becomes a
/// repeat section and `build` fills its row template; otherwise `build` fills the container.
pub(crate) fn with_rows<T>(
    tree: &mut FieldGroupTree,
    container: FieldGroupId,
    repeating: bool,
    build: impl FnOnce(&mut FieldGroupTree, FieldGroupId) -> T,
) -> T {
    if !repeating {
        return build(tree, container);
    }
    tree.get_mut(container).kind = Some(FieldKind::RepeatSection);
    let template = begin_field_array(tree, container);
    let out = build(tree, template);
    finish_field_array(tree, container, template);
    out
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::properties::FieldOption;
    use crate::terminology::ValueSetRegistry;

    pub const COLORS: &str = "https://example.org/ValueSet/colors";

    pub fn registry() -> ValueSetRegistry {
        let mut registry = ValueSetRegistry::new();
        registry.insert(
            COLORS,
            vec![FieldOption::new("a", "A"), FieldOption::new("b", "B")],
        );
        registry
    }

    pub fn question(link_id: &str, item_type: ItemType) -> SourceQuestion {
        SourceQuestion::new(link_id, item_type)
    }
}
