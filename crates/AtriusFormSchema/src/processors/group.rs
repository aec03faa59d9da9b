//! Group items: one grouping node keyed by linkId.

use crate::field_group::{FieldGroup, FieldGroupId, FieldGroupTree, FieldKind, Wrapper};
use crate::processors::ItemContext;
use crate::properties::Properties;
use crate::questionnaire::SourceQuestion;

/// Creates the group node. The label and panel wrapper are only added when the
/// `group_labels_as_panels` flag is on and the item has a non-empty text. A repeating group
/// becomes a repeat section; the driver fills its row template.
pub fn process(
    tree: &mut FieldGroupTree,
    question: &SourceQuestion,
    parent: FieldGroupId,
    ctx: &ItemContext<'_>,
) -> FieldGroupId {
    let mut node = FieldGroup::keyed(question.link_id.clone());

    if ctx.features.group_labels_as_panels {
        if let Some(label) = question.label() {
            node = node
                .with_wrapper(Wrapper::Panel)
                .with_props(Properties::labelled(label));
        }
    }
    if question.repeats {
        node = node.with_kind(FieldKind::RepeatSection);
    }

    let id = tree.add_child(parent, node);
    ctx.apply_enable_when(tree, id, question);
    id
}
