//! Hospitalization sub-tree.
//!
//! ```text
//! <linkId>.answer                 panel, holds the item's enable-when; a repeat
//! │                               section with one stay per row when the item repeats
//! ├── serviceType.valueCoding     ward, single choice
//! ├── period                      panel {start, end}
//! ├── reason                      textarea, feature flag
//! ├── copyNotifierFacility        checkbox, feature flag
//! └── serviceProvider             organization, built without enable-when
//! ```

use crate::FormSchemaError;
use crate::field_group::{FieldGroup, FieldGroupId, FieldGroupTree, FieldKind};
use crate::processors::reference::organization::{self, OrganizationSlot};
use crate::processors::reference::{Leaf, panel};
use crate::processors::{DATE_PLACEHOLDER, ItemContext, with_rows};
use crate::properties::{Properties, Validator};
use crate::questionnaire::SourceQuestion;

pub const SERVICE_TYPE_VALUE_SET: &str =
    "https://demis.rki.de/fhir/ValueSet/hospitalizationServiceType";

pub const SERVICE_TYPE_KEY: &str = "serviceType.valueCoding";
pub const SERVICE_PROVIDER_KEY: &str = "serviceProvider";

pub fn build(
    tree: &mut FieldGroupTree,
    question: &SourceQuestion,
    parent: FieldGroupId,
    ctx: &mut ItemContext<'_>,
) -> Result<FieldGroupId, FormSchemaError> {
    // Looked up first so a missing value set leaves nothing behind.
    let service_types = ctx.value_sets.options(SERVICE_TYPE_VALUE_SET)?;
    let link_id = question.link_id.as_str();

    let hospitalization = panel(tree, parent, &question.answer_key(), question.label());
    ctx.apply_enable_when(tree, hospitalization, question);

    with_rows(tree, hospitalization, question.repeats, |tree, stay| {
        let mut props = Properties::labelled("Ward").options(service_types);
        props.clearable = true;
        let mut service_type = FieldGroup::keyed(SERVICE_TYPE_KEY)
            .with_kind(FieldKind::SingleChoice)
            .with_class_name("flex-item")
            .with_props(props);
        service_type.validators.push(Validator::ValueCoding);
        ctx.clipboard
            .annotate(&mut service_type, link_id, "serviceType", false);
        tree.add_child(stay, service_type);

        let period = panel(tree, stay, "period", Some("Period of stay"));
        Leaf::input("start", "Admission")
            .placeholder(DATE_PLACEHOLDER)
            .clipboard_field("period.start")
            .add_to(tree, period, link_id, ctx);
        Leaf::input("end", "Discharge")
            .placeholder(DATE_PLACEHOLDER)
            .clipboard_field("period.end")
            .add_to(tree, period, link_id, ctx);

        if ctx.features.hospitalization_reason {
            Leaf::input("reason", "Reason for admission")
                .kind(FieldKind::Textarea)
                .add_to(tree, stay, link_id, ctx);
        }
        if ctx.features.hospitalization_copy_checkboxes {
            tree.add_child(
                stay,
                FieldGroup::keyed("copyNotifierFacility")
                    .with_kind(FieldKind::Checkbox)
                    .with_props(Properties::labelled("Same as notifying facility")),
            );
        }

        let slot = OrganizationSlot {
            key: SERVICE_PROVIDER_KEY.to_string(),
            label: Some("Hospital".to_string()),
            link_id: format!("{link_id}.{SERVICE_PROVIDER_KEY}"),
            required: question.required,
            repeats: false,
        };
        ctx.without_enable_when(|ctx| organization::build(tree, question, stay, &slot, ctx));
    });

    Ok(hospitalization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::ClipboardTable;
    use crate::config::FeatureFlags;
    use crate::processors::reference::{ReferenceKind, process};
    use crate::processors::test_support::*;
    use crate::properties::FieldOption;
    use crate::questionnaire::{ItemType, SourceEnableWhen};
    use crate::terminology::ValueSetRegistry;

    fn with_service_types() -> ValueSetRegistry {
        let mut registry = registry();
        registry.insert(
            SERVICE_TYPE_VALUE_SET,
            vec![FieldOption::new("0100", "Internal medicine")],
        );
        registry
    }

    fn hospitalized() -> SourceQuestion {
        let mut q = question("hospitalizedEncounter", ItemType::Reference);
        q.reference_profile =
            Some("https://demis.rki.de/fhir/StructureDefinition/Hospitalization".to_string());
        q.enable_when.push(SourceEnableWhen {
            target_link_id: "hospitalized".to_string(),
            operator: "=".to_string(),
            answer_code: "yes".to_string(),
        });
        q
    }

    fn build_with(
        features: FeatureFlags,
        clipboard: &ClipboardTable,
    ) -> (FieldGroupTree, FieldGroupId) {
        let registry = with_service_types();
        let mut ctx = ItemContext::new(&registry, clipboard, features, "CVDD");
        let mut tree = FieldGroupTree::new();
        let root = tree.root();
        tree.add_child(root, FieldGroup::keyed("hospitalized.answer"));
        let ids = process(ReferenceKind::Hospitalization, &mut tree, &hospitalized(), root, &mut ctx)
            .unwrap();
        assert!(!ctx.enable_when_suppressed());
        (tree, ids[0])
    }

    fn child_keys(tree: &FieldGroupTree, id: FieldGroupId) -> Vec<String> {
        tree.children(id)
            .iter()
            .filter_map(|c| tree.get(*c).key.clone())
            .collect()
    }

    #[test]
    fn test_feature_flags_gate_optional_fields() {
        let clipboard = ClipboardTable::default();
        let (tree, hosp) = build_with(FeatureFlags::default(), &clipboard);
        assert_eq!(
            child_keys(&tree, hosp),
            [SERVICE_TYPE_KEY, "period", SERVICE_PROVIDER_KEY]
        );

        let all = FeatureFlags {
            hospitalization_reason: true,
            hospitalization_copy_checkboxes: true,
            ..FeatureFlags::default()
        };
        let (tree, hosp) = build_with(all, &clipboard);
        assert_eq!(
            child_keys(&tree, hosp),
            [
                SERVICE_TYPE_KEY,
                "period",
                "reason",
                "copyNotifierFacility",
                SERVICE_PROVIDER_KEY
            ]
        );
        let checkbox = tree.get(tree.children(hosp)[3]);
        assert_eq!(checkbox.kind, Some(FieldKind::Checkbox));
    }

    #[test]
    fn test_conditions_only_on_outer_panel() {
        let clipboard = ClipboardTable::default();
        let (tree, hosp) = build_with(FeatureFlags::default(), &clipboard);

        let outer = tree.get(hosp).props.as_ref().unwrap();
        assert_eq!(outer.enable_when.len(), 1);
        assert_eq!(outer.enable_when[0].path, "parent.fieldGroup.0");

        let provider = *tree.children(hosp).last().unwrap();
        assert!(
            tree.get(provider)
                .props
                .as_ref()
                .is_none_or(|p| p.enable_when.is_empty())
        );
        for id in tree.descendants(provider) {
            assert!(
                tree.get(id)
                    .props
                    .as_ref()
                    .is_none_or(|p| p.enable_when.is_empty())
            );
        }
    }

    #[test]
    fn test_service_provider_uses_nested_clipboard_keys() {
        let clipboard = ClipboardTable::from_pairs([
            ("hospitalizedEncounter.serviceProvider.name", "H.Name"),
            ("hospitalizedEncounter.period.start", "H.Admission"),
        ]);
        let (tree, hosp) = build_with(FeatureFlags::default(), &clipboard);

        let provider = *tree.children(hosp).last().unwrap();
        let name = tree.get(tree.children(provider)[0]);
        assert_eq!(
            name.props.as_ref().unwrap().import_spec.as_ref().unwrap().import_key,
            "H.Name"
        );

        let period = tree.children(hosp)[1];
        let start = tree.get(tree.children(period)[0]);
        let props = start.props.as_ref().unwrap();
        assert_eq!(props.import_spec.as_ref().unwrap().import_key, "H.Admission");
        assert_eq!(props.placeholder.as_deref(), Some(DATE_PLACEHOLDER));
    }

    #[test]
    fn test_repeating_stay_becomes_field_array() {
        let registry = with_service_types();
        let clipboard = ClipboardTable::from_pairs([("hospitalizedEncounter.period.end", "H.End")]);
        let mut ctx = ItemContext::new(&registry, &clipboard, FeatureFlags::default(), "CVDD");
        let mut tree = FieldGroupTree::new();
        let root = tree.root();
        tree.add_child(root, FieldGroup::keyed("hospitalized.answer"));

        let mut q = hospitalized();
        q.repeats = true;
        let hosp = build(&mut tree, &q, root, &mut ctx).unwrap();
        assert!(!ctx.enable_when_suppressed());

        let section = tree.get(hosp);
        assert_eq!(section.kind, Some(FieldKind::RepeatSection));
        assert_eq!(
            section.props.as_ref().unwrap().enable_when[0].path,
            "parent.fieldGroup.0"
        );
        assert!(tree.children(hosp).is_empty());

        let template = section.field_array().unwrap().template();
        assert_eq!(
            child_keys(&tree, template),
            [SERVICE_TYPE_KEY, "period", SERVICE_PROVIDER_KEY]
        );
        let period = tree.children(template)[1];
        let end = tree.get(tree.children(period)[1]);
        assert_eq!(
            end.props.as_ref().unwrap().import_spec.as_ref().unwrap().import_key,
            "H.End"
        );
        let provider = tree.children(template)[2];
        assert!(tree.get(provider).field_array().is_none());
        assert_eq!(tree.get(provider).kind, None);
    }

    #[test]
    fn test_missing_service_types_builds_nothing() {
        let registry = registry();
        let clipboard = ClipboardTable::default();
        let mut ctx = ItemContext::new(&registry, &clipboard, FeatureFlags::default(), "");
        let mut tree = FieldGroupTree::new();
        let root = tree.root();

        let err = build(&mut tree, &hospitalized(), root, &mut ctx).unwrap_err();
        assert!(matches!(err, FormSchemaError::ValueSetNotFound(_)));
        assert!(tree.children(root).is_empty());
    }
}
