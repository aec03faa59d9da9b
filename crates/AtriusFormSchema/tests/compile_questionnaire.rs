use atrius_form_schema::processors::choice::{REQUIRED_OVERRIDE_LINK_ID, REQUIRED_OVERRIDE_VALUE_SET};
use atrius_form_schema::processors::reference::hospitalization::SERVICE_TYPE_VALUE_SET;
use atrius_form_schema::processors::reference::immunization::VACCINE_VALUE_SET_PREFIX;
use atrius_form_schema::questionnaire::REFERENCE_PROFILE_EXTENSION;
use atrius_form_schema::{
    ClipboardKeys, FeatureFlags, FormCompiler, Questionnaire, QuestionnaireRole,
    ValueSetRegistry,
};
use serde_json::{Value, json};

const YES_NO: &str = "https://example.org/ValueSet/yesNoUnknown";
const SYMPTOMS: &str = "https://example.org/ValueSet/symptomsCVDD";
const EVIDENCE: &str = "https://example.org/ValueSet/evidence";

fn terminology() -> ValueSetRegistry {
    let mut registry = ValueSetRegistry::new();
    registry.add_resource(&json!({
        "resourceType": "Bundle",
        "entry": [
            {"resource": {
                "resourceType": "CodeSystem",
                "url": "https://example.org/CodeSystem/yesNoUnknown",
                "concept": [
                    {"code": "yes", "display": "Yes"},
                    {"code": "no", "display": "No"},
                    {"code": "unknown", "display": "Unknown"}
                ]
            }},
            {"resource": {
                "resourceType": "ValueSet",
                "url": YES_NO,
                "compose": {"include": [{"system": "https://example.org/CodeSystem/yesNoUnknown"}]}
            }},
            {"resource": {
                "resourceType": "ValueSet",
                "url": SYMPTOMS,
                "compose": {"include": [{
                    "system": "http://snomed.info/sct",
                    "concept": [
                        {"code": "386661006", "display": "Fever"},
                        {"code": "49727002", "display": "Cough"}
                    ]
                }]}
            }},
            {"resource": {
                "resourceType": "ValueSet",
                "url": format!("{EVIDENCE}CVDD"),
                "expansion": {"contains": [
                    {"system": "http://snomed.info/sct", "code": "840539006", "display": "PCR"}
                ]}
            }},
            {"resource": {
                "resourceType": "ValueSet",
                "url": SERVICE_TYPE_VALUE_SET,
                "expansion": {"contains": [
                    {"code": "0100", "display": "Internal medicine"},
                    {"code": "3600", "display": "Intensive care"}
                ]}
            }},
            {"resource": {
                "resourceType": "ValueSet",
                "url": format!("{VACCINE_VALUE_SET_PREFIX}CVDD"),
                "expansion": {"contains": [
                    {"code": "EU/1/20/1528", "display": "Comirnaty"}
                ]}
            }},
            {"resource": {
                "resourceType": "ValueSet",
                "url": REQUIRED_OVERRIDE_VALUE_SET,
                "expansion": {"contains": [
                    {"code": "hospital", "display": "Hospital"}
                ]}
            }}
        ]
    }));
    registry.finish();
    registry
}

fn clipboard() -> ClipboardKeys {
    ClipboardKeys::from_json(&json!({
        "common": {"notifierFacility.name": "N.Name"},
        "condition": {
            "hospitalizedEncounter.serviceProvider.address.city": "H.City",
            "hospitalizedEncounter.period.start": "H.Start",
            "symptoms": "C.Symptoms"
        }
    }))
    .unwrap()
}

fn condition(target: &str) -> Value {
    json!([{"question": target, "operator": "=", "answerCoding": {"code": "yes"}}])
}

fn disease_questionnaire() -> Questionnaire {
    Questionnaire::from_json(json!({
        "resourceType": "Questionnaire",
        "id": "CVDD",
        "title": "Coronavirus disease",
        "item": [
            {
                "linkId": "clinical",
                "type": "group",
                "text": "Clinical information",
                "item": [
                    {"linkId": "isSymptomatic", "type": "coding", "answerValueSet": YES_NO},
                    {
                        "linkId": "symptoms",
                        "type": "coding",
                        "repeats": true,
                        "answerValueSet": SYMPTOMS,
                        "enableWhen": condition("isSymptomatic")
                    },
                    {"linkId": "evidence", "type": "coding", "answerValueSet": EVIDENCE}
                ]
            },
            {"linkId": "hospitalized", "type": "coding", "answerValueSet": YES_NO},
            {
                "linkId": "hospitalizedGroup",
                "type": "group",
                "repeats": true,
                "enableWhen": condition("hospitalized"),
                "item": [{
                    "linkId": "hospitalizedEncounter",
                    "type": "reference",
                    "enableWhen": condition("hospitalized"),
                    "extension": [{
                        "url": REFERENCE_PROFILE_EXTENSION,
                        "valueCanonical": "https://demis.rki.de/fhir/StructureDefinition/Hospitalization"
                    }]
                }]
            },
            {
                "linkId": "immunization",
                "type": "reference",
                "repeats": true,
                "extension": [{
                    "url": REFERENCE_PROFILE_EXTENSION,
                    "valueCanonical": "https://demis.rki.de/fhir/StructureDefinition/ImmunizationInformationCVDD"
                }]
            },
            {
                "linkId": REQUIRED_OVERRIDE_LINK_ID,
                "type": "coding",
                "answerValueSet": REQUIRED_OVERRIDE_VALUE_SET
            }
        ]
    }))
    .unwrap()
}

fn compile(key: &str, features: FeatureFlags) -> Value {
    let registry = terminology();
    let clipboard = clipboard();
    let compiler = FormCompiler::new(&registry, &clipboard, features);
    compiler
        .compile(key, &disease_questionnaire(), QuestionnaireRole::Condition)
        .to_json()
        .unwrap()
}

fn keys(node: &Value) -> Vec<&str> {
    node["fieldGroup"]
        .as_array()
        .map(|children| children.iter().filter_map(|c| c["key"].as_str()).collect())
        .unwrap_or_default()
}

#[test]
fn test_top_level_layout() {
    let form = compile("CVDD", FeatureFlags::default());
    assert_eq!(
        keys(&form),
        [
            "clinical",
            "hospitalized.answer",
            "hospitalizedGroup",
            "immunization.answer",
            "infectionEnvironmentSettingKind.answer"
        ]
    );
    assert_eq!(
        keys(&form["fieldGroup"][0]),
        ["isSymptomatic.answer", "symptoms.answer", "evidence.answer"]
    );
    assert!(form["fieldGroup"][0].get("wrappers").is_none());
}

#[test]
fn test_choice_fields() {
    let form = compile("CVDD", FeatureFlags::default());
    let clinical = &form["fieldGroup"][0];

    let yes_no = &clinical["fieldGroup"][0]["fieldGroup"][0];
    assert_eq!(yes_no["key"], "valueCoding");
    assert_eq!(yes_no["type"], "autocomplete-coding");
    assert_eq!(yes_no["props"]["options"][2]["code"], "unknown");
    assert_eq!(yes_no["props"]["clearable"], true);

    let symptoms = &clinical["fieldGroup"][1];
    assert_eq!(
        symptoms["props"]["enableWhen"],
        json!([{"path": "parent.fieldGroup.0", "op": "=", "value": "yes"}])
    );
    let symptoms_value = &symptoms["fieldGroup"][0];
    assert_eq!(symptoms_value["type"], "autocomplete-multi-coding");
    assert_eq!(
        symptoms_value["props"]["clipboard"],
        json!({"importKey": "C.Symptoms", "multi": true})
    );
    assert_eq!(
        symptoms_value["validators"],
        json!({"validation": ["valueCodingValidator"]})
    );

    let evidence = &clinical["fieldGroup"][2]["fieldGroup"][0];
    assert_eq!(evidence["props"]["options"][0]["display"], "PCR");

    let setting = &form["fieldGroup"][4]["fieldGroup"][0];
    assert_eq!(setting["props"]["required"], true);
    assert!(setting["props"].get("clearable").is_none());
}

#[test]
fn test_repeating_hospitalization() {
    let form = compile("CVDD", FeatureFlags::default());
    let section = &form["fieldGroup"][2];
    assert_eq!(section["type"], "repeat");
    assert!(section.get("fieldGroup").is_none());
    assert_eq!(section["props"]["enableWhen"][0]["path"], "parent.fieldGroup.1");

    let hospitalization = &section["fieldArray"]["fieldGroup"][0];
    assert_eq!(hospitalization["key"], "hospitalizedEncounter.answer");
    assert_eq!(hospitalization["wrappers"], json!(["panel"]));
    assert_eq!(
        hospitalization["props"]["enableWhen"][0]["path"],
        "parent.parent.parent.parent.fieldGroup.1"
    );
    assert_eq!(
        keys(hospitalization),
        ["serviceType.valueCoding", "period", "serviceProvider"]
    );

    let period_start = &hospitalization["fieldGroup"][1]["fieldGroup"][0];
    assert_eq!(period_start["props"]["placeholder"], "DD.MM.YYYY");
    assert_eq!(period_start["props"]["clipboard"]["importKey"], "H.Start");

    let provider = &hospitalization["fieldGroup"][2];
    assert!(provider["props"].get("enableWhen").is_none());
    assert_eq!(keys(provider), ["name", "address", "contact", "telecom"]);
    let city = &provider["fieldGroup"][1]["fieldGroup"][3];
    assert_eq!(city["key"], "city");
    assert_eq!(city["props"]["clipboard"]["importKey"], "H.City");
}

#[test]
fn test_repeating_immunization() {
    let form = compile("CVDD", FeatureFlags::default());
    let immunization = &form["fieldGroup"][3];
    assert_eq!(immunization["type"], "repeat");

    let row = &immunization["fieldArray"]["fieldGroup"][0];
    assert_eq!(row["key"], "valueReference");
    assert_eq!(
        keys(row),
        ["vaccineCode.valueCoding", "occurrenceDateTime", "note"]
    );
    assert_eq!(row["fieldGroup"][0]["props"]["options"][0]["display"], "Comirnaty");
}

#[test]
fn test_disease_without_optional_value_sets() {
    let form = compile("MSVD", FeatureFlags::default());

    // Evidence is omitted, immunization is dropped because MSVD has no vaccine value set.
    assert_eq!(
        keys(&form),
        [
            "clinical",
            "hospitalized.answer",
            "hospitalizedGroup",
            "infectionEnvironmentSettingKind.answer"
        ]
    );
    assert_eq!(
        keys(&form["fieldGroup"][0]),
        ["isSymptomatic.answer", "symptoms.answer"]
    );
}

#[test]
fn test_feature_flags() {
    let form = compile(
        "CVDD",
        FeatureFlags {
            group_labels_as_panels: true,
            hospitalization_reason: true,
            hospitalization_copy_checkboxes: true,
        },
    );

    let clinical = &form["fieldGroup"][0];
    assert_eq!(clinical["wrappers"], json!(["panel"]));
    assert_eq!(clinical["props"]["label"], "Clinical information");

    let hospitalization = &form["fieldGroup"][2]["fieldArray"]["fieldGroup"][0];
    assert_eq!(
        keys(hospitalization),
        [
            "serviceType.valueCoding",
            "period",
            "reason",
            "copyNotifierFacility",
            "serviceProvider"
        ]
    );
    assert_eq!(hospitalization["fieldGroup"][3]["type"], "checkbox");
}

#[test]
fn test_compilation_is_deterministic() {
    let first = compile("CVDD", FeatureFlags::default());
    let second = compile("CVDD", FeatureFlags::default());
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}
