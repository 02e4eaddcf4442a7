use rdsbroker_core::{Catalog, CatalogError};

const CATALOG_JSON: &str = r#"
{
    "services": [
        {
            "id": "Service-3",
            "name": "Service 3",
            "description": "This is the Service 3",
            "bindable": false,
            "plan_updateable": false,
            "plans": [{ "id": "Plan-3", "name": "Plan 3", "description": "This is the Plan 3" }]
        },
        {
            "id": "Service-1",
            "name": "Service 1",
            "description": "This is the Service 1",
            "bindable": true,
            "plan_updateable": true,
            "tags": ["mysql", "rds"],
            "plans": [{ "id": "Plan-1", "name": "Plan 1", "description": "This is the Plan 1", "free": false }]
        },
        {
            "id": "Service-2",
            "name": "Service 2",
            "description": "This is the Service 2",
            "bindable": true,
            "plan_updateable": false,
            "plans": [{ "id": "Plan-2", "name": "Plan 2", "description": "This is the Plan 2" }]
        }
    ]
}
"#;

fn catalog() -> Catalog {
    serde_json::from_str(CATALOG_JSON).expect("fixture should parse")
}

#[test]
fn sorted_by_id_orders_services() {
    let sorted = catalog().sorted_by_id();
    let ids: Vec<_> = sorted.services.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["Service-1", "Service-2", "Service-3"]);
}

#[test]
fn service_fields_survive_decoding() {
    let sorted = catalog().sorted_by_id();
    let service1 = &sorted.services[0];

    assert_eq!(service1.name, "Service 1");
    assert_eq!(service1.description, "This is the Service 1");
    assert!(service1.bindable);
    assert!(service1.plan_updateable);
    assert_eq!(service1.tags, ["mysql", "rds"]);
    assert_eq!(service1.plans.len(), 1);
    assert_eq!(service1.plans[0].id, "Plan-1");
    assert_eq!(service1.plans[0].name, "Plan 1");
    assert_eq!(service1.plans[0].description, "This is the Plan 1");
    assert_eq!(service1.plans[0].free, Some(false));
}

#[test]
fn encoding_keeps_optional_fields_off_the_wire() {
    let sorted = catalog().sorted_by_id();
    let value = serde_json::to_value(&sorted.services[2]).unwrap();
    let obj = value.as_object().unwrap();

    assert!(!obj.contains_key("tags"));
    assert!(!obj.contains_key("metadata"));
    assert!(!obj["plans"][0].as_object().unwrap().contains_key("free"));
}

#[test]
fn validate_accepts_fixture() {
    assert_eq!(catalog().validate(), Ok(()));
}

#[test]
fn validate_rejects_duplicate_service_ids() {
    let mut catalog = catalog();
    let dup = catalog.services[0].clone();
    catalog.services.push(dup);

    assert_eq!(
        catalog.validate(),
        Err(CatalogError::DuplicateService("Service-3".to_string()))
    );
}

#[test]
fn validate_rejects_duplicate_plan_ids_within_a_service() {
    let mut catalog = catalog();
    let plan = catalog.services[1].plans[0].clone();
    catalog.services[1].plans.push(plan);

    assert_eq!(
        catalog.validate(),
        Err(CatalogError::DuplicatePlan {
            service_id: "Service-1".to_string(),
            plan_id: "Plan-1".to_string(),
        })
    );
}

#[test]
fn same_plan_id_under_different_services_is_allowed() {
    let mut catalog = catalog();
    catalog.services[0].plans[0].id = "Plan-1".to_string();
    assert_eq!(catalog.validate(), Ok(()));
}

#[test]
fn lookups_report_missing_ids() {
    let catalog = catalog();

    assert_eq!(catalog.plan("Service-2", "Plan-2").unwrap().name, "Plan 2");
    assert_eq!(
        catalog.service("Service-9").unwrap_err(),
        CatalogError::ServiceNotFound("Service-9".to_string())
    );
    assert!(matches!(
        catalog.plan("Service-2", "Plan-1"),
        Err(CatalogError::PlanNotFound { .. })
    ));
}

#[test]
fn empty_document_is_an_empty_catalog() {
    let catalog: Catalog = serde_json::from_str("{}").unwrap();
    assert!(catalog.services.is_empty());
}
