//! A stateful fake broker and an in-memory backend that share one set of
//! snapshots, so a whole lifecycle can run without a broker or AWS.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{Value, json};

use rdsbroker_backend::{BackendError, BoxFuture, ResourceBackend};
use rdsbroker_client::{BrokerClient, BrokerClientConfig, Credentials, OperationPoller, PollSettings};
use rdsbroker_core::{SnapshotRecord, final_snapshot_id};
use rdsbroker_harness::{HarnessContext, LifecycleSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Provisioning,
    Deprovisioning,
}

#[derive(Debug)]
struct Instance {
    phase: Phase,
    polls_left: u32,
}

/// How the fake broker behaves.
#[derive(Debug, Clone)]
pub struct Behaviour {
    /// `in progress` answers before an operation settles.
    pub polls: u32,
    /// Status for provision requests; anything but 202 is a rejection.
    pub provision_status: u16,
    /// Terminal state reported for provisioning.
    pub provision_outcome: &'static str,
    /// Status for deprovision requests; anything but 202 is a rejection.
    pub deprovision_status: u16,
    /// Leave a final snapshot behind on deprovision.
    pub take_final_snapshot: bool,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            polls: 2,
            provision_status: 202,
            provision_outcome: "succeeded",
            deprovision_status: 202,
            take_final_snapshot: true,
        }
    }
}

pub struct FakeBroker {
    behaviour: Behaviour,
    instances: Mutex<HashMap<String, Instance>>,
    pub snapshots: Arc<Mutex<HashSet<String>>>,
    pub provisions: Mutex<Vec<String>>,
    pub deprovisions: Mutex<Vec<String>>,
}

impl FakeBroker {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            instances: Mutex::new(HashMap::new()),
            snapshots: Arc::new(Mutex::new(HashSet::new())),
            provisions: Mutex::new(Vec::new()),
            deprovisions: Mutex::new(Vec::new()),
        })
    }

    pub async fn serve(self: &Arc<Self>) -> String {
        let app = Router::new()
            .route(
                "/v2/service_instances/{id}",
                put(provision).delete(deprovision),
            )
            .route("/v2/service_instances/{id}/last_operation", get(last_operation))
            .with_state(Arc::clone(self));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    pub fn backend(&self) -> Arc<MemoryBackend> {
        Arc::new(MemoryBackend {
            snapshots: Arc::clone(&self.snapshots),
        })
    }
}

async fn provision(
    State(broker): State<Arc<FakeBroker>>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    broker.provisions.lock().unwrap().push(id.clone());
    let status = StatusCode::from_u16(broker.behaviour.provision_status).unwrap();
    if status != StatusCode::ACCEPTED {
        return (status, Json(json!({"description": "plan not available"})));
    }
    broker.instances.lock().unwrap().insert(
        id.clone(),
        Instance {
            phase: Phase::Provisioning,
            polls_left: broker.behaviour.polls,
        },
    );
    (status, Json(json!({"operation": format!("provision-{id}")})))
}

async fn deprovision(
    State(broker): State<Arc<FakeBroker>>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    broker.deprovisions.lock().unwrap().push(id.clone());
    let status = StatusCode::from_u16(broker.behaviour.deprovision_status).unwrap();
    if status != StatusCode::ACCEPTED {
        return (status, Json(json!({"description": "backend unavailable"})));
    }
    let mut instances = broker.instances.lock().unwrap();
    match instances.get_mut(&id) {
        Some(instance) => {
            instance.phase = Phase::Deprovisioning;
            instance.polls_left = broker.behaviour.polls;
            (StatusCode::ACCEPTED, Json(json!({"operation": "deprovision"})))
        }
        None => (StatusCode::GONE, Json(json!({}))),
    }
}

async fn last_operation(
    State(broker): State<Arc<FakeBroker>>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let mut instances = broker.instances.lock().unwrap();
    let Some(instance) = instances.get_mut(&id) else {
        return (StatusCode::GONE, Json(json!({})));
    };
    if instance.polls_left > 0 {
        instance.polls_left -= 1;
        return (
            StatusCode::OK,
            Json(json!({"state": "in progress", "description": "working"})),
        );
    }
    match instance.phase {
        Phase::Provisioning => (
            StatusCode::OK,
            Json(json!({"state": broker.behaviour.provision_outcome})),
        ),
        Phase::Deprovisioning => {
            instances.remove(&id);
            if broker.behaviour.take_final_snapshot {
                broker
                    .snapshots
                    .lock()
                    .unwrap()
                    .insert(final_snapshot_id(&id));
            }
            (StatusCode::GONE, Json(json!({})))
        }
    }
}

/// Snapshot store shared with the fake broker.
pub struct MemoryBackend {
    pub snapshots: Arc<Mutex<HashSet<String>>>,
}

impl ResourceBackend for MemoryBackend {
    fn ping(&self) -> BoxFuture<'_, Result<(), BackendError>> {
        Box::pin(async { Ok(()) })
    }

    fn get_final_snapshot<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> BoxFuture<'a, Result<SnapshotRecord, BackendError>> {
        Box::pin(async move {
            let id = final_snapshot_id(instance_id);
            if self.snapshots.lock().unwrap().contains(&id) {
                Ok(SnapshotRecord::present(instance_id, Some("available".to_string())))
            } else {
                Ok(SnapshotRecord::absent(instance_id))
            }
        })
    }

    fn delete_final_snapshot<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, BackendError>> {
        Box::pin(async move {
            Ok(self
                .snapshots
                .lock()
                .unwrap()
                .remove(&final_snapshot_id(instance_id)))
        })
    }
}

/// Backend whose snapshot lookup panics, killing the lifecycle task.
pub struct PanickingBackend;

impl ResourceBackend for PanickingBackend {
    fn ping(&self) -> BoxFuture<'_, Result<(), BackendError>> {
        Box::pin(async { Ok(()) })
    }

    fn get_final_snapshot<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> BoxFuture<'a, Result<SnapshotRecord, BackendError>> {
        Box::pin(inventory_unavailable(instance_id))
    }

    fn delete_final_snapshot<'a>(
        &'a self,
        _instance_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, BackendError>> {
        Box::pin(async { Ok(false) })
    }
}

async fn inventory_unavailable(instance_id: &str) -> Result<SnapshotRecord, BackendError> {
    panic!("snapshot inventory unavailable for {instance_id}")
}

pub fn context(url: &str, backend: Arc<dyn ResourceBackend>) -> HarnessContext {
    let client =
        BrokerClient::new(BrokerClientConfig::new(url, Credentials::new("username", "password")))
            .unwrap();
    let poller = OperationPoller::new(
        client.clone(),
        PollSettings::new(Duration::from_millis(10), Duration::from_secs(5)),
    );
    HarnessContext::new(client, poller, backend)
}

pub fn spec() -> LifecycleSpec {
    LifecycleSpec::new("Service-1", "Plan-1")
}
