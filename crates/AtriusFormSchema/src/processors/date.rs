//! Date items: a `valueDate` input with the fixed date placeholder.

use crate::field_group::{FieldGroup, FieldGroupId, FieldGroupTree, FieldKind};
use crate::processors::{DATE_PLACEHOLDER, ItemContext, answer_container, with_rows};
use crate::properties::Properties;
use crate::questionnaire::SourceQuestion;

pub const VALUE_DATE_KEY: &str = "valueDate";

pub fn process(
    tree: &mut FieldGroupTree,
    question: &SourceQuestion,
    parent: FieldGroupId,
    ctx: &ItemContext<'_>,
) -> FieldGroupId {
    let container = answer_container(tree, question, parent, ctx);
    with_rows(tree, container, question.repeats, |tree, row_parent| {
        let mut props = Properties::with_optional_label(question.label())
            .required(question.required)
            .placeholder(DATE_PLACEHOLDER);
        props.disabled = question.read_only;

        let mut field = FieldGroup::keyed(VALUE_DATE_KEY)
            .with_kind(FieldKind::Input)
            .with_props(props);
        ctx.clipboard
            .annotate(&mut field, &question.link_id, "", false);
        tree.add_child(row_parent, field)
    });
    container
}
