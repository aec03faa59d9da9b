//! Immunization sub-tree: vaccine, date of vaccination and a free text note, one row per
//! vaccination when the item repeats.

use crate::FormSchemaError;
use crate::field_group::{FieldGroup, FieldGroupId, FieldGroupTree, FieldKind};
use crate::processors::reference::{Leaf, VALUE_REFERENCE_KEY};
use crate::processors::{DATE_PLACEHOLDER, ItemContext, answer_container, with_rows};
use crate::properties::{Properties, Validator};
use crate::questionnaire::SourceQuestion;

/// Vaccine value sets are published per disease: `<prefix><DISEASE>`.
pub const VACCINE_VALUE_SET_PREFIX: &str = "https://demis.rki.de/fhir/ValueSet/vaccine";

pub const VACCINE_KEY: &str = "vaccineCode.valueCoding";

pub fn build(
    tree: &mut FieldGroupTree,
    question: &SourceQuestion,
    parent: FieldGroupId,
    ctx: &ItemContext<'_>,
) -> Result<FieldGroupId, FormSchemaError> {
    let vaccines = ctx
        .value_sets
        .options(&format!("{VACCINE_VALUE_SET_PREFIX}{}", ctx.disease))?;
    let link_id = question.link_id.as_str();

    let container = answer_container(tree, question, parent, ctx);
    with_rows(tree, container, question.repeats, |tree, row_parent| {
        let row = tree.add_child(
            row_parent,
            FieldGroup::keyed(VALUE_REFERENCE_KEY)
                .with_field_group_class_name("flex-row")
                .with_props(Properties::with_optional_label(question.label())),
        );

        let mut props = Properties::labelled("Vaccine")
            .required(question.required)
            .options(vaccines);
        props.clearable = !question.required;
        let mut vaccine = FieldGroup::keyed(VACCINE_KEY)
            .with_kind(FieldKind::SingleChoice)
            .with_class_name("flex-item")
            .with_props(props);
        vaccine.validators.push(Validator::ValueCoding);
        ctx.clipboard
            .annotate(&mut vaccine, link_id, "vaccineCode", false);
        tree.add_child(row, vaccine);

        Leaf::input("occurrenceDateTime", "Date of vaccination")
            .placeholder(DATE_PLACEHOLDER)
            .add_to(tree, row, link_id, ctx);
        Leaf::input("note", "Note")
            .kind(FieldKind::Textarea)
            .add_to(tree, row, link_id, ctx);
    });

    Ok(container)
}
