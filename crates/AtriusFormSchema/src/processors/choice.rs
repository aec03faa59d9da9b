//! # Choice Items
//!
//! Choice, open-choice and coding items become a `valueCoding` field with options from the
//! item's answer value set.
//!
//! Kind resolution:
//! - no item-control hint: single choice
//! - hint `h`: the control type `h-coding` (`drop-down-coding` is an alias of single choice)
//! - a repeating item without children whose kind is still single choice escalates to
//!   multi choice instead of becoming a repeat section

use tracing::debug;

use crate::FormSchemaError;
use crate::field_group::{FieldGroup, FieldGroupId, FieldGroupTree, FieldKind};
use crate::processors::{ItemContext, answer_container, with_rows};
use crate::properties::{FieldOption, Properties, Validator};
use crate::questionnaire::SourceQuestion;
use crate::terminology::{TerminologyError, canonical_url};

pub const VALUE_CODING_KEY: &str = "valueCoding";

/// The one item for which `required` is forced on. Older profile versions declared the
/// setting kind optional although the notification is rejected without it.
pub const REQUIRED_OVERRIDE_LINK_ID: &str = "infectionEnvironmentSettingKind";
pub const REQUIRED_OVERRIDE_VALUE_SET: &str =
    "https://demis.rki.de/fhir/ValueSet/infectionEnvironmentSetting";

/// Items with this linkId take their options from a value set suffixed with the disease
/// code, and are left out when that value set does not exist.
pub const EVIDENCE_LINK_ID: &str = "evidence";

pub fn resolve_kind(question: &SourceQuestion) -> FieldKind {
    let kind = match &question.control_hint {
        Some(hint) => FieldKind::from_control_type(&format!("{hint}-coding")),
        None => FieldKind::SingleChoice,
    };
    if question.repeats && question.children.is_empty() && kind == FieldKind::SingleChoice {
        return FieldKind::MultiChoice;
    }
    kind
}

pub fn is_required(question: &SourceQuestion) -> bool {
    question.required
        || (question.link_id == REQUIRED_OVERRIDE_LINK_ID
            && question.answer_value_set.as_deref() == Some(REQUIRED_OVERRIDE_VALUE_SET))
}

pub fn process(
    tree: &mut FieldGroupTree,
    question: &SourceQuestion,
    parent: FieldGroupId,
    ctx: &ItemContext<'_>,
) -> Result<Vec<FieldGroupId>, FormSchemaError> {
    let value_set = question.answer_value_set.as_deref().ok_or_else(|| {
        FormSchemaError::InvalidQuestionnaire(format!(
            "choice item {} has no answerValueSet",
            question.link_id
        ))
    })?;

    let options = if question.link_id == EVIDENCE_LINK_ID {
        match evidence_options(ctx, value_set) {
            Some(options) => options,
            None => return Ok(Vec::new()),
        }
    } else {
        ctx.value_sets.options(value_set)?
    };

    let kind = resolve_kind(question);
    let repeating = question.repeats && kind != FieldKind::MultiChoice;

    let container = answer_container(tree, question, parent, ctx);
    with_rows(tree, container, repeating, |tree, row_parent| {
        let field = choice_field(question, VALUE_CODING_KEY, kind, options, ctx);
        tree.add_child(row_parent, field)
    });
    Ok(vec![container])
}

/// Disease specific evidence options; `None` when the disease has no evidence value set.
fn evidence_options(ctx: &ItemContext<'_>, value_set: &str) -> Option<Vec<FieldOption>> {
    let disease_value_set = format!("{}{}", canonical_url(value_set), ctx.disease);
    match ctx.value_sets.options(&disease_value_set) {
        Ok(options) if !options.is_empty() => Some(options),
        Ok(_) | Err(TerminologyError::NotFound(_)) => {
            debug!(
                value_set = %disease_value_set,
                "No evidence options for disease '{}', omitting evidence field",
                ctx.disease
            );
            None
        }
    }
}

/// A choice field keyed `key`. The value-coding validator is attached whenever the key
/// addresses a `valueCoding` and the kind is single or multi choice.
pub(crate) fn choice_field(
    question: &SourceQuestion,
    key: &str,
    kind: FieldKind,
    options: Vec<FieldOption>,
    ctx: &ItemContext<'_>,
) -> FieldGroup {
    let required = is_required(question);
    let mut props = Properties::with_optional_label(question.label())
        .required(required)
        .options(options);
    props.clearable = !required;
    props.default_code = question.initial_answer_code.clone();
    props.disabled = question.read_only;

    let multi = kind == FieldKind::MultiChoice;
    let needs_validator = key.contains(VALUE_CODING_KEY) && kind.is_choice();

    let mut field = FieldGroup::keyed(key).with_kind(kind).with_props(props);
    if needs_validator {
        field.validators.push(Validator::ValueCoding);
    }
    ctx.clipboard
        .annotate(&mut field, &question.link_id, "", multi);
    field
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::ClipboardTable;
    use crate::config::FeatureFlags;
    use crate::processors::test_support::*;
    use crate::questionnaire::ItemType;
    use crate::terminology::ValueSetRegistry;

    fn choice(link_id: &str) -> SourceQuestion {
        let mut q = question(link_id, ItemType::Coding);
        q.answer_value_set = Some(COLORS.to_string());
        q
    }

    fn compile(q: &SourceQuestion, registry: &ValueSetRegistry, disease: &str) -> FieldGroupTree {
        let clipboard = ClipboardTable::from_pairs([("color", "C.Color")]);
        let ctx = ItemContext::new(registry, &clipboard, FeatureFlags::default(), disease);
        let mut tree = FieldGroupTree::new();
        let root = tree.root();
        process(&mut tree, q, root, &ctx).unwrap();
        tree
    }

    fn value_field(tree: &FieldGroupTree) -> &FieldGroup {
        let container = tree.children(tree.root())[0];
        tree.get(tree.children(container)[0])
    }

    #[test]
    fn test_repeating_choice_without_children_is_multi() {
        let mut q = choice("color");
        q.repeats = true;
        let tree = compile(&q, &registry(), "");

        let container = tree.children(tree.root())[0];
        assert_eq!(tree.children(tree.root()).len(), 1);
        assert!(tree.get(container).field_array().is_none());
        assert_eq!(tree.children(container).len(), 1);

        let field = value_field(&tree);
        assert_eq!(field.kind, Some(FieldKind::MultiChoice));
        assert_eq!(
            field.props.as_ref().unwrap().options,
            vec![FieldOption::new("a", "A"), FieldOption::new("b", "B")]
        );
        assert_eq!(field.validators, vec![Validator::ValueCoding]);
        assert!(field.props.as_ref().unwrap().import_spec.as_ref().unwrap().multi);
    }

    #[test]
    fn test_kind_from_hint() {
        let mut q = choice("color");
        q.control_hint = Some("radio-button".to_string());
        assert_eq!(resolve_kind(&q), FieldKind::RadioChoice);

        q.control_hint = Some("drop-down".to_string());
        assert_eq!(resolve_kind(&q), FieldKind::SingleChoice);

        q.repeats = true;
        assert_eq!(resolve_kind(&q), FieldKind::MultiChoice);

        q.control_hint = Some("radio-button".to_string());
        assert_eq!(resolve_kind(&q), FieldKind::RadioChoice);
    }

    #[test]
    fn test_repeating_with_children_stays_single() {
        let mut q = choice("color");
        q.repeats = true;
        q.children.push(question("detail", ItemType::String));
        assert_eq!(resolve_kind(&q), FieldKind::SingleChoice);
    }

    #[test]
    fn test_repeating_radio_becomes_repeat_section() {
        let mut q = choice("color");
        q.repeats = true;
        q.control_hint = Some("radio-button".to_string());
        let tree = compile(&q, &registry(), "");

        let container = tree.children(tree.root())[0];
        let node = tree.get(container);
        assert_eq!(node.kind, Some(FieldKind::RepeatSection));
        let template = node.field_array().unwrap().template();
        let row = tree.get(tree.children(template)[0]);
        assert_eq!(row.kind, Some(FieldKind::RadioChoice));
        assert!(row.validators.is_empty());
    }

    #[test]
    fn test_required_override_is_exact() {
        let mut q = question(REQUIRED_OVERRIDE_LINK_ID, ItemType::Coding);
        q.answer_value_set = Some(REQUIRED_OVERRIDE_VALUE_SET.to_string());
        assert!(is_required(&q));

        q.answer_value_set = Some(format!("{REQUIRED_OVERRIDE_VALUE_SET}|1.0.0"));
        assert!(!is_required(&q));

        let mut other = question("infectionEnvironmentSetting", ItemType::Coding);
        other.answer_value_set = Some(REQUIRED_OVERRIDE_VALUE_SET.to_string());
        assert!(!is_required(&other));

        other.required = true;
        assert!(is_required(&other));
    }

    #[test]
    fn test_required_field_is_not_clearable() {
        let mut q = choice("color");
        q.required = true;
        q.initial_answer_code = Some("b".to_string());
        let tree = compile(&q, &registry(), "");
        let props = value_field(&tree).props.clone().unwrap();
        assert!(props.required);
        assert!(!props.clearable);
        assert_eq!(props.default_code.as_deref(), Some("b"));
    }

    #[test]
    fn test_missing_value_set_is_an_error() {
        let mut q = choice("color");
        q.answer_value_set = Some("https://example.org/ValueSet/unknown".to_string());
        let registry = registry();
        let clipboard = ClipboardTable::default();
        let ctx = ItemContext::new(&registry, &clipboard, FeatureFlags::default(), "");
        let mut tree = FieldGroupTree::new();
        let root = tree.root();

        let err = process(&mut tree, &q, root, &ctx).unwrap_err();
        assert!(matches!(err, FormSchemaError::ValueSetNotFound(_)));
        assert!(tree.children(root).is_empty());
    }

    #[test]
    fn test_evidence_uses_disease_value_set() {
        let mut registry = registry();
        registry.insert(
            "https://example.org/ValueSet/evidenceCVDD",
            vec![FieldOption::new("fever", "Fever")],
        );
        let mut q = question(EVIDENCE_LINK_ID, ItemType::Coding);
        q.answer_value_set = Some("https://example.org/ValueSet/evidence".to_string());

        let tree = compile(&q, &registry, "CVDD");
        let props = value_field(&tree).props.clone().unwrap();
        assert_eq!(props.options, vec![FieldOption::new("fever", "Fever")]);
    }

    #[test]
    fn test_versioned_evidence_reference() {
        let mut registry = registry();
        registry.insert(
            "https://example.org/ValueSet/evidence",
            vec![FieldOption::new("generic", "Generic")],
        );
        registry.insert(
            "https://example.org/ValueSet/evidenceCVDD",
            vec![FieldOption::new("pcr", "PCR")],
        );
        let mut q = question(EVIDENCE_LINK_ID, ItemType::Coding);
        q.answer_value_set = Some("https://example.org/ValueSet/evidence|1.0.0".to_string());

        let tree = compile(&q, &registry, "CVDD");
        let props = value_field(&tree).props.clone().unwrap();
        assert_eq!(props.options, vec![FieldOption::new("pcr", "PCR")]);
    }

    #[test]
    fn test_missing_evidence_is_omitted() {
        let mut q = question(EVIDENCE_LINK_ID, ItemType::Coding);
        q.answer_value_set = Some("https://example.org/ValueSet/evidence".to_string());

        let tree = compile(&q, &registry(), "MPVD");
        assert!(tree.children(tree.root()).is_empty());
    }
}
