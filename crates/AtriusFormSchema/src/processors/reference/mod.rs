//! # Reference Items
//!
//! A reference question either expands into a structured sub-resource or falls back to a
//! plain id input. Two independent extension signals decide which:
//!
//! | Signal | Contains | Builder |
//! |---|---|---|
//! | reference profile | `Immunization` | [`immunization`] |
//! | reference profile | `Encounter` / `Hospitalization` | [`hospitalization`] |
//! | reference resource | `Organization` | [`organization`] |
//! | neither present | | `valueReference` input |
//!
//! When a signal is present but names nothing the compiler can build, the item is
//! unsupported and produces no fields.

pub mod hospitalization;
pub mod immunization;
pub mod organization;

use crate::FormSchemaError;
use crate::field_group::{FieldGroup, FieldGroupId, FieldGroupTree, FieldKind, Wrapper};
use crate::processors::{ItemContext, answer_container, with_rows};
use crate::properties::Properties;
use crate::questionnaire::SourceQuestion;

pub const VALUE_REFERENCE_KEY: &str = "valueReference";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Organization,
    Hospitalization,
    Immunization,
    IdOnly,
}

/// Picks the builder for a reference question; `None` when a signal names an unsupported
/// resource.
pub fn classify(question: &SourceQuestion) -> Option<ReferenceKind> {
    let profile = question.reference_profile.as_deref();
    let resource = question.reference_resource.as_deref();

    if let Some(profile) = profile {
        if profile.contains("Immunization") {
            return Some(ReferenceKind::Immunization);
        }
        if profile.contains("Encounter") || profile.contains("Hospitalization") {
            return Some(ReferenceKind::Hospitalization);
        }
    }
    if resource.is_some_and(|r| r.contains("Organization")) {
        return Some(ReferenceKind::Organization);
    }
    if profile.is_none() && resource.is_none() {
        return Some(ReferenceKind::IdOnly);
    }
    None
}

pub fn process(
    kind: ReferenceKind,
    tree: &mut FieldGroupTree,
    question: &SourceQuestion,
    parent: FieldGroupId,
    ctx: &mut ItemContext<'_>,
) -> Result<Vec<FieldGroupId>, FormSchemaError> {
    let root = match kind {
        ReferenceKind::Organization => organization::build(
            tree,
            question,
            parent,
            &organization::OrganizationSlot {
                key: question.answer_key(),
                label: question.label().map(str::to_string),
                link_id: question.link_id.clone(),
                required: question.required,
                repeats: question.repeats,
            },
            ctx,
        ),
        ReferenceKind::Hospitalization => hospitalization::build(tree, question, parent, ctx)?,
        ReferenceKind::Immunization => immunization::build(tree, question, parent, ctx)?,
        ReferenceKind::IdOnly => id_only(tree, question, parent, ctx),
    };
    Ok(vec![root])
}

fn id_only(
    tree: &mut FieldGroupTree,
    question: &SourceQuestion,
    parent: FieldGroupId,
    ctx: &ItemContext<'_>,
) -> FieldGroupId {
    let container = answer_container(tree, question, parent, ctx);
    with_rows(tree, container, question.repeats, |tree, row_parent| {
        let mut field = FieldGroup::keyed(VALUE_REFERENCE_KEY)
            .with_kind(FieldKind::Input)
            .with_props(
                Properties::with_optional_label(question.label()).required(question.required),
            );
        ctx.clipboard
            .annotate(&mut field, &question.link_id, "", false);
        tree.add_child(row_parent, field)
    });
    container
}

/// A labelled panel grouping the fields of one sub-structure.
pub(crate) fn panel(
    tree: &mut FieldGroupTree,
    parent: FieldGroupId,
    key: &str,
    label: Option<&str>,
) -> FieldGroupId {
    tree.add_child(
        parent,
        FieldGroup::keyed(key)
            .with_wrapper(Wrapper::Panel)
            .with_field_group_class_name("flex-row")
            .with_props(Properties::with_optional_label(label)),
    )
}

/// One leaf input of a structured reference. `clipboard_field` is matched against the
/// clipboard table together with `link_id`.
pub(crate) struct Leaf<'a> {
    pub key: &'a str,
    pub label: &'a str,
    pub kind: FieldKind,
    pub required: bool,
    pub placeholder: Option<&'a str>,
    pub clipboard_field: &'a str,
}

impl<'a> Leaf<'a> {
    pub fn input(key: &'a str, label: &'a str) -> Self {
        Self {
            key,
            label,
            kind: FieldKind::Input,
            required: false,
            placeholder: None,
            clipboard_field: key,
        }
    }

    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    pub fn clipboard_field(mut self, field: &'a str) -> Self {
        self.clipboard_field = field;
        self
    }

    pub fn add_to(
        self,
        tree: &mut FieldGroupTree,
        parent: FieldGroupId,
        link_id: &str,
        ctx: &ItemContext<'_>,
    ) -> FieldGroupId {
        let mut props = Properties::labelled(self.label).required(self.required);
        props.placeholder = self.placeholder.map(str::to_string);
        let mut field = FieldGroup::keyed(self.key)
            .with_kind(self.kind)
            .with_class_name("flex-item")
            .with_props(props);
        ctx.clipboard
            .annotate(&mut field, link_id, self.clipboard_field, false);
        tree.add_child(parent, field)
    }
}
