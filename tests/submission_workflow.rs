use mev_core::{
    ElementKind, InMemoryCatalog, InputValidator, MetadataError, MetadataMerger, OperationRecord,
    OperationRegistry, ReferenceFailure, ResourceInfo, ResourceMetadata, ResourceTypeRegistry,
    UserContext,
};
use serde_json::{json, Map, Value};
use uuid::Uuid;

const USER: &str = "alice";
const WORKSPACE: &str = "ws-rnaseq";

fn deseq_operation() -> OperationRecord {
    serde_json::from_value(json!({
        "name": "DESeq2 differential expression",
        "description": "Runs DESeq2 on a raw count matrix",
        "inputs": {
            "raw_counts": {
                "name": "Count matrix",
                "description": "Integer counts, genes x samples",
                "required": true,
                "spec": {"attribute_type": "ResourceReference", "many": false, "resource_types": ["RNASEQ_COUNT_MTX", "I_MTX"]}
            },
            "base_condition_samples": {
                "name": "Control samples",
                "required": true,
                "spec": {"attribute_type": "ObservationSet"}
            },
            "experimental_condition_samples": {
                "name": "Case samples",
                "required": true,
                "spec": {"attribute_type": "ObservationSet"}
            },
            "fdr": {
                "name": "False discovery rate",
                "spec": {"attribute_type": "BoundedFloat", "min": 0.0, "max": 1.0, "default": 0.05}
            },
            "contrast_name": {
                "spec": {"attribute_type": "String", "default": "case_vs_control"}
            }
        },
        "outputs": {
            "dge_results": {"spec": {"attribute_type": "ResourceReference", "many": false, "resource_types": ["FT"]}},
            "normalized_counts": {"required": false, "spec": {"attribute_type": "ResourceReference", "many": false, "resource_types": ["EXP_MTX"]}}
        }
    }))
    .unwrap()
}

fn sample_set(ids: &[&str], condition: &str) -> Value {
    let elements: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "attributes": {
                    "condition": {"attribute_type": "UnrestrictedString", "value": condition}
                }
            })
        })
        .collect();
    json!({"multiple": true, "elements": elements})
}

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_ingest_validate_and_merge() {
    let registry = ResourceTypeRegistry::default();

    // Catalog with a count matrix and an annotation table in the workspace
    let counts = ResourceInfo::new(Uuid::new_v4(), USER, Some("RNASEQ_COUNT_MTX")).in_workspace(WORKSPACE);
    let annotations = ResourceInfo::new(Uuid::new_v4(), USER, Some("ANN")).in_workspace(WORKSPACE);
    let catalog = InMemoryCatalog::from_resources([counts.clone(), annotations.clone()]);

    catalog.set_metadata(
        counts.id,
        ResourceMetadata::from_value(&json!({
            "observation_set": sample_set(&["ctrl 1", "ctrl 2", "case_1"], "unknown")
        }))
        .unwrap(),
    );
    catalog.set_metadata(
        annotations.id,
        ResourceMetadata::from_value(&json!({
            "observation_set": sample_set(&["ctrl_1", "case_2"], "control")
        }))
        .unwrap(),
    );

    // Ingest
    let operations = OperationRegistry::new();
    let operation = operations.ingest(&deseq_operation(), &registry).unwrap();
    assert_eq!(operations.get(&operation.id).unwrap().inputs.len(), 5);

    // Submit
    let context = UserContext::new(USER, WORKSPACE);
    let validator = InputValidator::new(&catalog);
    let payload = object(json!({
        "raw_counts": counts.id.to_string(),
        "base_condition_samples": sample_set(&["ctrl_1", "ctrl_2"], "control"),
        "experimental_condition_samples": sample_set(&["case_1"], "case"),
        "fdr": 0.1
    }));
    let values = validator
        .validate_submission(&operation, &payload, &context)
        .unwrap();

    let canonical = serde_json::to_value(&values).unwrap();
    assert_eq!(canonical["raw_counts"], json!(counts.id.to_string()));
    assert_eq!(canonical["fdr"], json!(0.1));
    assert_eq!(canonical["contrast_name"], json!("case_vs_control"));
    assert_eq!(
        canonical["base_condition_samples"]["elements"][1]["attributes"]["condition"]["value"],
        json!("control")
    );

    // Merge the workspace annotations; "ctrl 1" was normalized to "ctrl_1"
    let report = MetadataMerger::merge_workspace(&catalog, &WORKSPACE.to_string()).unwrap();
    assert_eq!(
        report.observation_set.ids(),
        vec!["case_1", "case_2", "ctrl_1", "ctrl_2"]
    );
    assert_eq!(report.observation_set.kind(), ElementKind::Observation);
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].element_id, "ctrl_1");
}

#[test]
fn test_rejected_submission_reports_every_field() {
    let registry = ResourceTypeRegistry::default();
    let stranger = ResourceInfo::new(Uuid::new_v4(), "bob", Some("RNASEQ_COUNT_MTX")).in_workspace(WORKSPACE);
    let catalog = InMemoryCatalog::from_resources([stranger.clone()]);

    let operations = OperationRegistry::new();
    let operation = operations.ingest(&deseq_operation(), &registry).unwrap();

    let payload = object(json!({
        "raw_counts": stranger.id.to_string(),
        "base_condition_samples": {"multiple": false, "elements": [{"id": "a", "attributes": {}}, {"id": "b", "attributes": {}}]},
        "experimental_condition_samples": sample_set(&["-bad"], "case"),
        "fdr": 2,
        "seed": 42
    }));

    let errors = InputValidator::new(&catalog)
        .validate_submission(&operation, &payload, &UserContext::new(USER, WORKSPACE))
        .unwrap_err();

    assert_eq!(
        errors.get("raw_counts"),
        Some(&MetadataError::ReferenceResolutionFailed {
            resource_id: stranger.id,
            reason: ReferenceFailure::NotOwned { owner: "bob".to_string() },
        })
    );
    assert!(matches!(
        errors.get("base_condition_samples"),
        Some(MetadataError::CardinalityViolation(_))
    ));
    assert!(matches!(
        errors.get("experimental_condition_samples"),
        Some(MetadataError::InvalidIdentifier { .. })
    ));
    // Integer literal widens to 2.0, which is above the bound
    assert!(matches!(errors.get("fdr"), Some(MetadataError::OutOfBounds(_))));
    assert!(matches!(errors.get("seed"), Some(MetadataError::UnknownType(_))));

    let json = serde_json::to_value(&errors).unwrap();
    assert!(json["seed"].as_str().unwrap().contains("not an input"));
}

#[test]
fn test_outputs_produced_by_job() {
    let registry = ResourceTypeRegistry::default();
    let results = ResourceInfo::new(Uuid::new_v4(), "runner", Some("FT"));
    let catalog = InMemoryCatalog::from_resources([results.clone()]);

    let operations = OperationRegistry::new();
    let operation = operations.ingest(&deseq_operation(), &registry).unwrap();
    let validator = InputValidator::new(&catalog);

    let values = validator
        .validate_outputs(&operation, &object(json!({"dge_results": results.id.to_string()})))
        .unwrap();
    assert!(values.get("normalized_counts").unwrap().is_null());

    let errors = validator
        .validate_outputs(&operation, &object(json!({"normalized_counts": results.id.to_string()})))
        .unwrap_err();
    assert_eq!(errors.get("dge_results"), Some(&MetadataError::MissingRequiredField));
    assert!(matches!(
        errors.get("normalized_counts"),
        Some(MetadataError::ReferenceResolutionFailed {
            reason: ReferenceFailure::DisallowedType { .. },
            ..
        })
    ));
}
