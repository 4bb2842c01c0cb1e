use serde_json::Value;
use tfgen_core::config::PolymorphismPolicy;
use tfgen_core::{
    Config, DocumentModel, EntityError, ErrorPolicy, WarningKind, generate, parse, to_json,
};

const PETSTORE: &str = include_str!("fixtures/petstore.yaml");
const PETSTORE_CONFIG: &str = include_str!("fixtures/petstore-config.yaml");
const SHAPES: &str = include_str!("fixtures/shapes.yaml");
const SHAPES_CONFIG: &str = include_str!("fixtures/shapes-config.yaml");

fn document(yaml: &str) -> DocumentModel {
    DocumentModel::new(parse::from_yaml(yaml).unwrap())
}

fn find<'v>(attributes: &'v Value, name: &str) -> &'v Value {
    attributes
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["name"] == name)
        .unwrap_or_else(|| panic!("attribute {name} missing"))
}

fn names(attributes: &Value) -> Vec<&str> {
    attributes
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect()
}

fn entity<'v>(spec: &'v Value, list: &str, name: &str) -> &'v Value {
    spec[list]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["name"] == name)
        .unwrap_or_else(|| panic!("{list} {name} missing"))
}

fn petstore_spec() -> Value {
    let doc = document(PETSTORE);
    let config = Config::from_yaml(PETSTORE_CONFIG).unwrap();
    let report = generate(&doc, &config);
    assert!(report.warnings.is_empty(), "unexpected warnings: {:?}", report.warnings);
    let spec = report.finish(ErrorPolicy::CollectAll).unwrap();
    serde_json::to_value(&spec).unwrap()
}

#[test]
fn petstore_resource_merges_every_verb() {
    let spec = petstore_spec();
    let pet = entity(&spec, "resources", "pet");
    assert_eq!(pet["schema"]["description"], "Create a pet in the store.");

    let attributes = &pet["schema"]["attributes"];
    assert_eq!(
        names(attributes),
        vec![
            "name", "category", "age", "status", "tags", "owner", "labels", "id", "created_at",
            "pet_id",
        ]
    );

    let name = &find(attributes, "name")["string"];
    assert_eq!(name["computed_optional_required"], "required");
    assert_eq!(name["description"], "Name of the pet");

    assert_eq!(find(attributes, "category")["string"]["computed_optional_required"], "optional");
    assert_eq!(
        find(attributes, "age")["int32"]["deprecation_message"],
        "This attribute is deprecated by the upstream API."
    );

    let status = &find(attributes, "status")["string"];
    assert_eq!(status["computed_optional_required"], "computed_optional");
    assert_eq!(status["default"]["static"], "available");
    assert_eq!(
        status["validators"][0]["custom"]["imports"][0]["path"],
        "github.com/hashicorp/terraform-plugin-framework-validators/stringvalidator"
    );

    assert_eq!(find(attributes, "tags")["set"]["element_type"], serde_json::json!({"string": {}}));
    assert_eq!(find(attributes, "labels")["map"]["element_type"], serde_json::json!({"string": {}}));

    let owner = &find(attributes, "owner")["single_nested"];
    assert_eq!(owner["computed_optional_required"], "optional");
    assert_eq!(names(&owner["attributes"]), vec!["email", "password"]);
    assert_eq!(find(&owner["attributes"], "password")["string"]["sensitive"], true);

    let id = &find(attributes, "id")["string"];
    assert_eq!(id["computed_optional_required"], "computed");
    assert_eq!(id["description"], "Server-assigned pet identifier.");
    assert_eq!(find(attributes, "created_at")["string"]["computed_optional_required"], "computed");
    assert_eq!(
        find(attributes, "pet_id")["string"]["computed_optional_required"],
        "computed_optional"
    );
}

#[test]
fn petstore_data_sources() {
    let spec = petstore_spec();
    let data_sources: Vec<&str> = spec["data_sources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(data_sources, vec!["pets", "pet"]);

    let pets = &entity(&spec, "data_sources", "pets")["schema"]["attributes"];
    assert_eq!(names(pets), vec!["pets", "status"]);
    let list = &find(pets, "pets")["list_nested"];
    assert_eq!(list["computed_optional_required"], "computed");
    let inner = &list["nested_object"]["attributes"];
    assert_eq!(find(inner, "name")["string"]["computed_optional_required"], "computed");
    let filter = &find(pets, "status")["string"];
    assert_eq!(filter["computed_optional_required"], "optional");
    assert_eq!(filter["description"], "Only return pets with this status");
    assert!(filter.get("default").is_none());

    let pet = &entity(&spec, "data_sources", "pet")["schema"]["attributes"];
    assert_eq!(find(pet, "pet_id")["string"]["computed_optional_required"], "required");
    assert_eq!(find(pet, "name")["string"]["computed_optional_required"], "computed");
}

#[test]
fn petstore_provider() {
    let spec = petstore_spec();
    let provider = &spec["provider"];
    assert_eq!(provider["name"], "petstore");
    let attributes = &provider["schema"]["attributes"];
    assert_eq!(names(attributes), vec!["endpoint", "timeout", "api_key", "x_api_version"]);

    let api_key = &find(attributes, "api_key")["string"];
    assert_eq!(api_key["optional_required"], "optional");
    assert_eq!(api_key["sensitive"], true);
    assert!(api_key.get("computed_optional_required").is_none());
    assert_eq!(find(attributes, "timeout")["int64"]["optional_required"], "optional");
}

#[test]
fn output_is_byte_identical_across_runs() {
    let first = {
        let doc = document(PETSTORE);
        let config = Config::from_yaml(PETSTORE_CONFIG).unwrap();
        to_json(&generate(&doc, &config).finish(ErrorPolicy::FailFast).unwrap()).unwrap()
    };
    for _ in 0..3 {
        let doc = document(PETSTORE);
        let config = Config::from_yaml(PETSTORE_CONFIG).unwrap();
        let again =
            to_json(&generate(&doc, &config).finish(ErrorPolicy::FailFast).unwrap()).unwrap();
        assert_eq!(first, again);
    }
}

#[test]
fn verb_declaration_order_does_not_matter() {
    let doc = document(SHAPES);
    let forward = Config::from_yaml(
        "provider: { name: p }\nresources:\n  widget:\n    create: { operation_id: createWidget }\n    read: { operation_id: getWidget }\n",
    )
    .unwrap();
    let backward = Config::from_yaml(
        "provider: { name: p }\nresources:\n  widget:\n    read: { operation_id: getWidget }\n    create: { operation_id: createWidget }\n",
    )
    .unwrap();
    let a = to_json(&generate(&doc, &forward).finish(ErrorPolicy::FailFast).unwrap()).unwrap();
    let b = to_json(&generate(&doc, &backward).finish(ErrorPolicy::FailFast).unwrap()).unwrap();
    assert_eq!(a, b);
}

fn shapes() -> (Value, Vec<EntityError>, Vec<tfgen_core::Warning>) {
    let doc = document(SHAPES);
    let config = Config::from_yaml(SHAPES_CONFIG).unwrap();
    let report = generate(&doc, &config);
    let spec = serde_json::to_value(&report.specification).unwrap();
    (spec, report.errors, report.warnings)
}

#[test]
fn create_and_read_fields_get_expected_computability() {
    let (spec, _, _) = shapes();
    let widget = &entity(&spec, "resources", "widget")["schema"]["attributes"];
    assert_eq!(names(widget), vec!["name", "size", "id"]);
    assert_eq!(find(widget, "name")["string"]["computed_optional_required"], "required");
    assert_eq!(find(widget, "size")["int64"]["computed_optional_required"], "optional");
    assert_eq!(find(widget, "id")["string"]["computed_optional_required"], "computed");
}

#[test]
fn type_conflict_fails_only_its_entity() {
    let (spec, errors, _) = shapes();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        EntityError::TypeConflict {
            entity,
            field_path,
            conflicting_types,
        } => {
            assert_eq!(entity.name, "gadget");
            assert_eq!(field_path, "serial");
            assert_eq!(conflicting_types, &["string", "int64"]);
        }
        other => panic!("expected TypeConflict, got {other:?}"),
    }
    let resources: Vec<&str> = spec["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(resources, vec!["widget", "shape"]);
}

#[test]
fn ignoring_a_dropped_field_only_warns() {
    let (spec, _, warnings) = shapes();
    let shape = &entity(&spec, "resources", "shape")["schema"]["attributes"];
    assert_eq!(names(shape), vec!["label"]);

    let of_kind = |kind: WarningKind| {
        warnings
            .iter()
            .filter(|w| w.kind == kind && w.entity.name == "shape")
            .count()
    };
    assert_eq!(of_kind(WarningKind::UnresolvedPolymorphism), 1);
    assert_eq!(of_kind(WarningKind::IgnoredPathNotFound), 1);
}

#[test]
fn recursive_schema_is_bounded() {
    let (spec, _, warnings) = shapes();
    let node = &entity(&spec, "data_sources", "node")["schema"]["attributes"];
    assert_eq!(names(node), vec!["name", "children"]);

    let children = &find(node, "children")["list_nested"];
    let grandchildren = &children["nested_object"]["attributes"];
    assert_eq!(names(grandchildren), vec!["name"]);

    let recursive: Vec<_> = warnings
        .iter()
        .filter(|w| w.kind == WarningKind::RecursiveSchema)
        .collect();
    assert_eq!(recursive.len(), 1);
    assert_eq!(recursive[0].entity.name, "node");
    assert_eq!(recursive[0].path, "children.children");
}

#[test]
fn polymorphism_policy_is_configurable() {
    let doc = document(SHAPES);
    let mut config = Config::from_yaml(
        "provider: { name: p }\nresources:\n  shape:\n    create: { operation_id: createShape }\n",
    )
    .unwrap();
    config.merge.polymorphism = PolymorphismPolicy::MergeObjects;
    let spec = generate(&doc, &config).finish(ErrorPolicy::FailFast).unwrap();
    let spec = serde_json::to_value(&spec).unwrap();

    let shape = &entity(&spec, "resources", "shape")["schema"]["attributes"];
    let geometry = &find(shape, "geometry")["single_nested"]["attributes"];
    assert_eq!(names(geometry), vec!["radius", "side"]);
    assert_eq!(find(geometry, "radius")["float64"]["computed_optional_required"], "optional");
}
