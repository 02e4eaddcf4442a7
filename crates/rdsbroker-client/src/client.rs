use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use rdsbroker_core::{
    Catalog, LastOperation, LastOperationQuery, OperationResponse, ProvisionRequest,
    UpdateRequest,
};

use crate::ack::{ACCEPTED_STATUSES, OperationAck};
use crate::config::{BrokerClientConfig, Credentials};
use crate::error::{ClientError, Operation};
use crate::params::QueryParams;

const API_VERSION_HEADER: &str = "X-Broker-API-Version";

/// Client for the broker's `/v2` API.
///
/// Holds one pooled HTTP client for its whole lifetime. Cloning is cheap and
/// clones share the pool; nothing is written after construction, so a
/// client can be shared freely across tasks.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    accepts_incomplete: bool,
    unauthorized_means_gone: bool,
    api_version: String,
}

impl BrokerClient {
    /// Build a client with its own HTTP connection pool.
    pub fn new(config: BrokerClientConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ClientError::Setup)?;
        Self::with_http_client(config, http)
    }

    /// Build a client on top of an existing HTTP client, e.g. one shared
    /// with other components.
    pub fn with_http_client(
        config: BrokerClientConfig,
        http: reqwest::Client,
    ) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", config.url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.url));
        }

        Ok(Self {
            http,
            base_url,
            credentials: config.credentials,
            accepts_incomplete: config.accepts_incomplete,
            unauthorized_means_gone: config.unauthorized_means_gone,
            api_version: config.api_version,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Configured default for `accepts_incomplete`.
    pub fn accepts_incomplete(&self) -> bool {
        self.accepts_incomplete
    }

    /// `GET /v2/catalog`. Only 200 is success.
    pub async fn fetch_catalog(&self) -> Result<Catalog, ClientError> {
        let op = Operation::Catalog;
        let url = self.endpoint(&["v2", "catalog"], &QueryParams::new())?;

        let resp = self.send(op, None, self.request(Method::GET, url)).await?;
        let status = resp.status();
        let body = read_body(op, None, resp).await?;

        if status != StatusCode::OK {
            return Err(ClientError::Protocol {
                operation: op,
                instance_id: None,
                status: status.as_u16(),
                body,
            });
        }

        decode(op, None, &body)
    }

    /// `PUT /v2/service_instances/{instance_id}`.
    pub async fn request_provision(
        &self,
        instance_id: &str,
        request: &ProvisionRequest,
        accepts_incomplete: bool,
    ) -> Result<OperationAck, ClientError> {
        let op = Operation::Provision;
        let params = QueryParams::new().push_bool("accepts_incomplete", accepts_incomplete);
        let url = self.endpoint(&["v2", "service_instances", instance_id], &params)?;

        let req = self.request(Method::PUT, url).json(request);
        let resp = self.send(op, Some(instance_id), req).await?;
        acknowledge(op, instance_id, resp).await
    }

    /// `PATCH /v2/service_instances/{instance_id}`.
    pub async fn request_update(
        &self,
        instance_id: &str,
        request: &UpdateRequest,
        accepts_incomplete: bool,
    ) -> Result<OperationAck, ClientError> {
        let op = Operation::Update;
        let params = QueryParams::new().push_bool("accepts_incomplete", accepts_incomplete);
        let url = self.endpoint(&["v2", "service_instances", instance_id], &params)?;

        let req = self.request(Method::PATCH, url).json(request);
        let resp = self.send(op, Some(instance_id), req).await?;
        acknowledge(op, instance_id, resp).await
    }

    /// `DELETE /v2/service_instances/{instance_id}`.
    pub async fn request_deprovision(
        &self,
        instance_id: &str,
        service_id: &str,
        plan_id: &str,
        accepts_incomplete: bool,
    ) -> Result<OperationAck, ClientError> {
        let op = Operation::Deprovision;
        let params = QueryParams::new()
            .push_opt("service_id", Some(service_id))
            .push_opt("plan_id", Some(plan_id))
            .push_bool("accepts_incomplete", accepts_incomplete);
        let url = self.endpoint(&["v2", "service_instances", instance_id], &params)?;

        let resp = self
            .send(op, Some(instance_id), self.request(Method::DELETE, url))
            .await?;
        acknowledge(op, instance_id, resp).await
    }

    /// `GET /v2/service_instances/{instance_id}/last_operation`.
    ///
    /// 410 maps to [`OperationState::Gone`](rdsbroker_core::OperationState::Gone).
    /// So does 401 while `unauthorized_means_gone` is set; the body is not
    /// read in that case.
    pub async fn query_last_operation(
        &self,
        query: &LastOperationQuery,
    ) -> Result<LastOperation, ClientError> {
        let op = Operation::LastOperation;
        let instance_id = query.instance_id.as_str();
        let params = QueryParams::new()
            .push_opt("service_id", query.service_id.as_deref())
            .push_opt("plan_id", query.plan_id.as_deref())
            .push_opt("operation", query.operation.as_deref());
        let url = self.endpoint(
            &["v2", "service_instances", instance_id, "last_operation"],
            &params,
        )?;

        let resp = self
            .send(op, Some(instance_id), self.request(Method::GET, url))
            .await?;
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED && self.unauthorized_means_gone {
            debug!(instance_id, "last_operation returned 401, treating instance as gone");
            return Ok(LastOperation::gone());
        }
        if status == StatusCode::GONE {
            debug!(instance_id, "last_operation returned 410");
            return Ok(LastOperation::gone());
        }

        let body = read_body(op, Some(instance_id), resp).await?;
        if status != StatusCode::OK {
            return Err(ClientError::Protocol {
                operation: op,
                instance_id: Some(instance_id.to_string()),
                status: status.as_u16(),
                body,
            });
        }

        decode(op, Some(instance_id), &body)
    }

    fn endpoint(&self, segments: &[&str], params: &QueryParams) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        params.apply(&mut url);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header(API_VERSION_HEADER, &self.api_version)
    }

    async fn send(
        &self,
        operation: Operation,
        instance_id: Option<&str>,
        req: RequestBuilder,
    ) -> Result<Response, ClientError> {
        let resp = req.send().await.map_err(|source| ClientError::Transport {
            operation,
            instance_id: instance_id.map(String::from),
            source,
        })?;

        debug!(
            operation = %operation,
            instance_id = instance_id.unwrap_or_default(),
            path = %resp.url().path(),
            status = resp.status().as_u16(),
            "broker responded"
        );
        Ok(resp)
    }
}

async fn acknowledge(
    operation: Operation,
    instance_id: &str,
    resp: Response,
) -> Result<OperationAck, ClientError> {
    let status = resp.status().as_u16();
    let body = read_body(operation, Some(instance_id), resp).await?;

    if !ACCEPTED_STATUSES.contains(&status) {
        warn!(operation = %operation, instance_id, status, "broker did not accept request");
        return Ok(OperationAck::rejected(status, body));
    }

    let response: OperationResponse = if body.trim().is_empty() {
        OperationResponse::default()
    } else {
        decode(operation, Some(instance_id), &body)?
    };
    Ok(OperationAck::accepted(status, response))
}

async fn read_body(
    operation: Operation,
    instance_id: Option<&str>,
    resp: Response,
) -> Result<String, ClientError> {
    resp.text().await.map_err(|source| ClientError::Transport {
        operation,
        instance_id: instance_id.map(String::from),
        source,
    })
}

fn decode<T: DeserializeOwned>(
    operation: Operation,
    instance_id: Option<&str>,
    body: &str,
) -> Result<T, ClientError> {
    serde_json::from_str(body).map_err(|source| ClientError::Decode {
        operation,
        instance_id: instance_id.map(String::from),
        source,
        body: body.to_string(),
    })
}
