//! Integration tests against real Amazon RDS.
//!
//! These call AWS and require valid credentials in the environment (e.g.
//! `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`). Only read calls and
//! deletes of snapshots that cannot exist are made.
//!
//! Run with: `cargo test -p rdsbroker-backend --test rds_live -- --ignored`

use rdsbroker_backend::{RdsBackend, ResourceBackend};

fn region() -> String {
    std::env::var("AWS_REGION").unwrap_or_else(|_| "eu-west-1".to_string())
}

#[tokio::test]
#[ignore]
async fn ping_reaches_rds() {
    let backend = RdsBackend::from_region(&region()).await;
    backend.ping().await.expect("ping should succeed with credentials");
}

#[tokio::test]
#[ignore]
async fn unknown_instance_has_no_final_snapshot() {
    let backend = RdsBackend::from_region(&region()).await;
    let instance_id = format!("rdsbroker-test-{}", uuid::Uuid::new_v4());

    let record = backend
        .get_final_snapshot(&instance_id)
        .await
        .expect("lookup should succeed");
    assert!(!record.exists_final);

    let deleted = backend
        .delete_final_snapshot(&instance_id)
        .await
        .expect("deleting an absent snapshot should succeed");
    assert!(!deleted);
}
