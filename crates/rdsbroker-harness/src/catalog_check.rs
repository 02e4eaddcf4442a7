use rdsbroker_core::Catalog;

use crate::error::HarnessError;

/// Compare what the broker serves with what its config declares. Both sides
/// are sorted by service id first, so broker ordering does not matter.
pub fn verify_catalog(actual: &Catalog, expected: &Catalog) -> Result<(), HarnessError> {
    let actual = actual.sorted_by_id();
    let expected = expected.sorted_by_id();

    let mut problems = Vec::new();

    let actual_ids: Vec<&str> = actual.services.iter().map(|s| s.id.as_str()).collect();
    let expected_ids: Vec<&str> = expected.services.iter().map(|s| s.id.as_str()).collect();
    if actual_ids != expected_ids {
        problems.push(format!(
            "services [{}], expected [{}]",
            actual_ids.join(", "),
            expected_ids.join(", ")
        ));
    } else {
        for (got, want) in actual.services.iter().zip(&expected.services) {
            if got != want {
                problems.push(format!("service {} differs", want.id));
            }
        }
    }

    if problems.is_empty() {
        tracing::info!(services = actual.services.len(), "catalog matches");
        Ok(())
    } else {
        Err(HarnessError::CatalogMismatch(problems.join("; ")))
    }
}
