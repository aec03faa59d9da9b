//! Plain inputs: free text, numbers, date-times, times and booleans.

use crate::field_group::{FieldGroup, FieldGroupId, FieldGroupTree, FieldKind};
use crate::processors::{DATE_PLACEHOLDER, ItemContext, answer_container, with_rows};
use crate::properties::{FieldOption, Properties};
use crate::questionnaire::SourceQuestion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Textarea,
    Integer,
    Decimal,
    DateTime,
    Time,
    Boolean,
}

impl InputKind {
    pub fn value_key(self) -> &'static str {
        match self {
            InputKind::Text | InputKind::Textarea => "valueString",
            InputKind::Integer => "valueInteger",
            InputKind::Decimal => "valueDecimal",
            InputKind::DateTime => "valueDateTime",
            InputKind::Time => "valueTime",
            InputKind::Boolean => "valueBoolean",
        }
    }

    fn field_kind(self) -> FieldKind {
        match self {
            InputKind::Textarea => FieldKind::Textarea,
            InputKind::Boolean => FieldKind::RadioChoice,
            _ => FieldKind::Input,
        }
    }
}

pub fn process(
    kind: InputKind,
    tree: &mut FieldGroupTree,
    question: &SourceQuestion,
    parent: FieldGroupId,
    ctx: &ItemContext<'_>,
) -> FieldGroupId {
    let container = answer_container(tree, question, parent, ctx);
    with_rows(tree, container, question.repeats, |tree, row_parent| {
        let mut field = FieldGroup::keyed(kind.value_key())
            .with_kind(kind.field_kind())
            .with_props(props_for(kind, question));
        ctx.clipboard
            .annotate(&mut field, &question.link_id, "", false);
        tree.add_child(row_parent, field)
    });
    container
}

fn props_for(kind: InputKind, question: &SourceQuestion) -> Properties {
    let mut props =
        Properties::with_optional_label(question.label()).required(question.required);
    props.disabled = question.read_only;
    match kind {
        InputKind::Integer | InputKind::Decimal => props.input_type = Some("number".to_string()),
        InputKind::DateTime => props.placeholder = Some(format!("{DATE_PLACEHOLDER} HH:MM")),
        InputKind::Time => props.placeholder = Some("HH:MM".to_string()),
        InputKind::Boolean => {
            props.options = vec![FieldOption::new("true", "Yes"), FieldOption::new("false", "No")];
            props.default_code = question.initial_answer_code.clone();
        }
        InputKind::Text | InputKind::Textarea => {}
    }
    props
}
