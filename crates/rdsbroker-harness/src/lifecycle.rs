use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rdsbroker_backend::ResourceBackend;
use rdsbroker_client::{BrokerClient, CancellationToken, OperationAck, OperationPoller};
use rdsbroker_core::{
    LastOperation, LastOperationQuery, OperationState, ProvisionRequest, SnapshotRecord,
};
use tokio::task::JoinSet;

use crate::error::{LifecycleError, Step, StepFailure};

/// Everything one harness run talks to. Built once per run and shared by
/// reference between lifecycles.
pub struct HarnessContext {
    pub client: BrokerClient,
    pub poller: OperationPoller,
    pub backend: Arc<dyn ResourceBackend>,
}

impl HarnessContext {
    pub fn new(
        client: BrokerClient,
        poller: OperationPoller,
        backend: Arc<dyn ResourceBackend>,
    ) -> Self {
        Self {
            client,
            poller,
            backend,
        }
    }
}

/// What to provision and what to expect after deprovisioning it.
#[derive(Debug, Clone)]
pub struct LifecycleSpec {
    pub service_id: String,
    pub plan_id: String,
    pub parameters: serde_json::Map<String, serde_json::Value>,
    /// Fail the lifecycle if no final snapshot exists after deprovision.
    pub expect_final_snapshot: bool,
    /// Delete the final snapshot once it has been checked.
    pub cleanup_final_snapshot: bool,
}

impl LifecycleSpec {
    pub fn new(service_id: impl Into<String>, plan_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            plan_id: plan_id.into(),
            parameters: serde_json::Map::new(),
            expect_final_snapshot: false,
            cleanup_final_snapshot: true,
        }
    }

    fn provision_request(&self) -> ProvisionRequest {
        self.parameters.iter().fold(
            ProvisionRequest::new(&self.service_id, &self.plan_id),
            |req, (key, value)| req.parameter(key, value.clone()),
        )
    }

    fn query(&self, instance_id: &str, operation: Option<String>) -> LastOperationQuery {
        LastOperationQuery::new(instance_id)
            .service_id(&self.service_id)
            .plan_id(&self.plan_id)
            .operation(operation)
    }
}

#[derive(Debug, Clone)]
pub struct LifecycleReport {
    pub instance_id: String,
    pub provision: LastOperation,
    pub deprovision: LastOperation,
    pub final_snapshot: SnapshotRecord,
    pub snapshot_deleted: bool,
    pub elapsed: Duration,
}

/// Provision one instance, wait for it, deprovision it, wait for that, then
/// check and clean up its final snapshot.
///
/// If anything fails after the broker accepted the provision, a single
/// unpolled deprovision is attempted so the instance is not left behind.
/// When that attempt fails too, it is logged and recorded in
/// [`LifecycleError::cleanup`].
pub async fn run_lifecycle(
    ctx: &HarnessContext,
    spec: &LifecycleSpec,
    instance_id: &str,
    cancel: &CancellationToken,
) -> Result<LifecycleReport, LifecycleError> {
    let started = Instant::now();
    tracing::info!(
        instance_id,
        service_id = %spec.service_id,
        plan_id = %spec.plan_id,
        "starting lifecycle"
    );

    let ack = ctx
        .client
        .request_provision(instance_id, &spec.provision_request(), ctx.client.accepts_incomplete())
        .await
        .map_err(|e| LifecycleError::new(Step::Provision, instance_id, e))?;
    let ack = accepted(Step::Provision, instance_id, ack)?;

    let provision = match settle(ctx, spec, instance_id, &ack, cancel).await {
        Ok(op) if op.state == OperationState::Succeeded => op,
        Ok(op) => {
            let cleanup = abandon(ctx, spec, instance_id).await;
            return Err(LifecycleError::new(
                Step::AwaitProvision,
                instance_id,
                StepFailure::UnexpectedState {
                    expected: OperationState::Succeeded,
                    actual: op,
                },
            )
            .with_cleanup(cleanup));
        }
        Err(failure) => {
            let cleanup = abandon(ctx, spec, instance_id).await;
            return Err(
                LifecycleError::new(Step::AwaitProvision, instance_id, failure)
                    .with_cleanup(cleanup),
            );
        }
    };
    tracing::info!(instance_id, "instance provisioned");

    let ack = ctx
        .client
        .request_deprovision(
            instance_id,
            &spec.service_id,
            &spec.plan_id,
            ctx.client.accepts_incomplete(),
        )
        .await
        .map_err(|e| LifecycleError::new(Step::Deprovision, instance_id, e))?;
    let ack = accepted(Step::Deprovision, instance_id, ack)?;

    let deprovision = settle(ctx, spec, instance_id, &ack, cancel)
        .await
        .map_err(|failure| LifecycleError::new(Step::AwaitDeprovision, instance_id, failure))?;
    if !matches!(deprovision.state, OperationState::Gone | OperationState::Succeeded) {
        return Err(LifecycleError::new(
            Step::AwaitDeprovision,
            instance_id,
            StepFailure::UnexpectedState {
                expected: OperationState::Gone,
                actual: deprovision,
            },
        ));
    }
    tracing::info!(instance_id, state = %deprovision.state, "instance deprovisioned");

    let final_snapshot = ctx
        .backend
        .get_final_snapshot(instance_id)
        .await
        .map_err(|e| LifecycleError::new(Step::VerifySnapshot, instance_id, e))?;
    if spec.expect_final_snapshot && !final_snapshot.exists_final {
        return Err(LifecycleError::new(
            Step::VerifySnapshot,
            instance_id,
            StepFailure::MissingSnapshot(final_snapshot.identifier),
        ));
    }

    let snapshot_deleted = if spec.cleanup_final_snapshot && final_snapshot.exists_final {
        ctx.backend
            .delete_final_snapshot(instance_id)
            .await
            .map_err(|e| LifecycleError::new(Step::CleanupSnapshot, instance_id, e))?
    } else {
        false
    };

    let elapsed = started.elapsed();
    tracing::info!(
        instance_id,
        snapshot = %final_snapshot.identifier,
        snapshot_found = final_snapshot.exists_final,
        snapshot_deleted,
        elapsed_secs = elapsed.as_secs_f64(),
        "lifecycle complete"
    );

    Ok(LifecycleReport {
        instance_id: instance_id.to_string(),
        provision,
        deprovision,
        final_snapshot,
        snapshot_deleted,
        elapsed,
    })
}

/// Run `count` lifecycles side by side, each with a fresh random instance
/// id. Results come back in completion order.
pub async fn run_lifecycles(
    ctx: Arc<HarnessContext>,
    spec: &LifecycleSpec,
    count: usize,
    cancel: &CancellationToken,
) -> Vec<(String, Result<LifecycleReport, LifecycleError>)> {
    let mut set = JoinSet::new();
    let mut ids = HashMap::with_capacity(count);

    for _ in 0..count {
        let instance_id = uuid::Uuid::new_v4().to_string();
        let ctx = Arc::clone(&ctx);
        let spec = spec.clone();
        let cancel = cancel.clone();
        let task_instance = instance_id.clone();
        let handle = set.spawn(async move {
            run_lifecycle(&ctx, &spec, &task_instance, &cancel).await
        });
        ids.insert(handle.id(), instance_id);
    }

    let mut results = Vec::with_capacity(count);
    while let Some(joined) = set.join_next_with_id().await {
        match joined {
            Ok((id, result)) => {
                let instance_id = ids.remove(&id).unwrap_or_default();
                if let Err(e) = &result {
                    tracing::error!(instance_id = %instance_id, error = %e, "lifecycle failed");
                }
                results.push((instance_id, result));
            }
            Err(join_err) => {
                let instance_id = ids.remove(&join_err.id()).unwrap_or_default();
                tracing::error!(instance_id = %instance_id, error = %join_err, "lifecycle task aborted");
                let err = LifecycleError::new(
                    Step::Task,
                    &instance_id,
                    StepFailure::Aborted(join_err.to_string()),
                );
                results.push((instance_id, Err(err)));
            }
        }
    }
    results
}

fn accepted(step: Step, instance_id: &str, ack: OperationAck) -> Result<OperationAck, LifecycleError> {
    if ack.is_success() {
        Ok(ack)
    } else {
        Err(LifecycleError::new(
            step,
            instance_id,
            StepFailure::Rejected {
                status: ack.status,
                body: ack.body.unwrap_or_default(),
            },
        ))
    }
}

/// Wait for an acknowledged operation to settle. A synchronous ack is
/// already finished and skips polling.
async fn settle(
    ctx: &HarnessContext,
    spec: &LifecycleSpec,
    instance_id: &str,
    ack: &OperationAck,
    cancel: &CancellationToken,
) -> Result<LastOperation, StepFailure> {
    if !ack.is_async() {
        return Ok(LastOperation {
            state: OperationState::Succeeded,
            description: None,
        });
    }
    let query = spec.query(instance_id, ack.operation.clone());
    Ok(ctx.poller.await_terminal(&query, cancel).await?)
}

/// Send one unpolled deprovision after a failed provision. Returns a
/// description of the failure when the broker did not take it.
async fn abandon(ctx: &HarnessContext, spec: &LifecycleSpec, instance_id: &str) -> Option<String> {
    tracing::warn!(instance_id, "provision did not succeed, requesting deprovision");
    let result = ctx
        .client
        .request_deprovision(
            instance_id,
            &spec.service_id,
            &spec.plan_id,
            ctx.client.accepts_incomplete(),
        )
        .await;

    match result {
        Ok(ack) if ack.is_success() => None,
        Ok(ack) => {
            let body = ack.body.unwrap_or_default();
            tracing::warn!(
                instance_id,
                status = ack.status,
                body = %body,
                "cleanup deprovision rejected, instance may be left behind"
            );
            Some(format!("deprovision rejected with {}: {body}", ack.status))
        }
        Err(e) => {
            tracing::warn!(
                instance_id,
                error = %e,
                "cleanup deprovision failed, instance may be left behind"
            );
            Some(format!("deprovision failed: {e}"))
        }
    }
}
