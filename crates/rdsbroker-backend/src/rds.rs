use aws_sdk_rds::Client;
use tracing::{debug, info};

use rdsbroker_core::{SnapshotRecord, final_snapshot_id};

use crate::error::{BackendError, format_err_chain, is_missing_credentials};
use crate::{BoxFuture, ResourceBackend};

/// [`ResourceBackend`] over Amazon RDS in a single region.
#[derive(Debug, Clone)]
pub struct RdsBackend {
    client: Client,
    region: String,
}

impl RdsBackend {
    pub fn new(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    pub fn from_config(config: &aws_config::SdkConfig) -> Self {
        let region = config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_default();
        Self::new(Client::new(config), region)
    }

    /// Default credential chain, public endpoint.
    pub async fn from_region(region: &str) -> Self {
        let config = crate::config::build_sdk_config(region, None).await;
        Self::from_config(&config)
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    async fn ping_inner(&self) -> Result<(), BackendError> {
        match self
            .client
            .describe_db_engine_versions()
            .max_records(20)
            .send()
            .await
        {
            Ok(_) => {
                debug!(region = %self.region, "RDS reachable");
                Ok(())
            }
            Err(e) if is_missing_credentials(&e) => {
                Err(BackendError::CredentialsUnavailable(format_err_chain(&e)))
            }
            Err(e) => Err(BackendError::Ping(format_err_chain(&e))),
        }
    }

    async fn get_final_snapshot_inner(
        &self,
        instance_id: &str,
    ) -> Result<SnapshotRecord, BackendError> {
        let identifier = final_snapshot_id(instance_id);

        let resp = match self
            .client
            .describe_db_snapshots()
            .db_snapshot_identifier(&identifier)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_db_snapshot_not_found_fault())
                    .unwrap_or(false);
                if not_found {
                    debug!(snapshot = %identifier, "no final snapshot");
                    return Ok(SnapshotRecord::absent(instance_id));
                }
                return Err(BackendError::DescribeSnapshot {
                    identifier,
                    message: format_err_chain(&e),
                });
            }
        };

        let snapshot = resp
            .db_snapshots()
            .iter()
            .find(|s| s.db_snapshot_identifier() == Some(identifier.as_str()));

        Ok(match snapshot {
            Some(s) => SnapshotRecord::present(instance_id, s.status().map(String::from)),
            None => SnapshotRecord::absent(instance_id),
        })
    }

    async fn delete_final_snapshot_inner(&self, instance_id: &str) -> Result<bool, BackendError> {
        let identifier = final_snapshot_id(instance_id);

        match self
            .client
            .delete_db_snapshot()
            .db_snapshot_identifier(&identifier)
            .send()
            .await
        {
            Ok(_) => {
                info!(snapshot = %identifier, "final snapshot deleted");
                Ok(true)
            }
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_db_snapshot_not_found_fault())
                    .unwrap_or(false);
                if not_found {
                    debug!(snapshot = %identifier, "final snapshot already absent");
                    Ok(false)
                } else {
                    Err(BackendError::DeleteSnapshot {
                        identifier,
                        message: format_err_chain(&e),
                    })
                }
            }
        }
    }
}

impl ResourceBackend for RdsBackend {
    fn ping(&self) -> BoxFuture<'_, Result<(), BackendError>> {
        Box::pin(self.ping_inner())
    }

    fn get_final_snapshot<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> BoxFuture<'a, Result<SnapshotRecord, BackendError>> {
        Box::pin(self.get_final_snapshot_inner(instance_id))
    }

    fn delete_final_snapshot<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> BoxFuture<'a, Result<bool, BackendError>> {
        Box::pin(self.delete_final_snapshot_inner(instance_id))
    }
}
