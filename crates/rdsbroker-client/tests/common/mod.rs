//! In-process fake broker for exercising the client over real HTTP.
//!
//! Responses are scripted per `(method, path)`. Each request pops the next
//! scripted response; the last one repeats forever.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use rdsbroker_client::{BrokerClient, BrokerClientConfig, Credentials};

pub const USERNAME: &str = "username";
pub const PASSWORD: &str = "password";

#[derive(Debug, Clone)]
pub struct Scripted {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Scripted {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub api_version: Option<String>,
    pub body: String,
}

#[derive(Default)]
pub struct FakeBroker {
    scripts: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<Recorded>>,
}

impl FakeBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, method: Method, path: &str, responses: Vec<Scripted>) {
        self.scripts
            .lock()
            .unwrap()
            .insert((method, path.to_string()), responses.into());
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.method == method && r.path == path)
            .count()
    }

    /// Bind to an ephemeral port and serve in the background. Returns the
    /// base URL.
    pub async fn serve(self: &Arc<Self>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().fallback(handle).with_state(Arc::clone(self));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn next(&self, method: &Method, path: &str) -> Option<Scripted> {
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.get_mut(&(method.clone(), path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

async fn handle(
    State(broker): State<Arc<FakeBroker>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    broker.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(String::from),
        authorization: header("authorization"),
        api_version: header("x-broker-api-version"),
        body,
    });

    match broker.next(&method, uri.path()) {
        Some(scripted) => {
            if !scripted.delay.is_zero() {
                tokio::time::sleep(scripted.delay).await;
            }
            let status = StatusCode::from_u16(scripted.status).unwrap();
            (status, scripted.body).into_response()
        }
        None => (StatusCode::NOT_FOUND, "no script").into_response(),
    }
}

pub fn client_config(url: &str) -> BrokerClientConfig {
    BrokerClientConfig::new(url, Credentials::new(USERNAME, PASSWORD))
}

pub fn client(url: &str) -> BrokerClient {
    BrokerClient::new(client_config(url)).unwrap()
}

/// `Basic base64(username:password)` for the test credentials.
pub fn expected_authorization() -> String {
    // "username:password"
    "Basic dXNlcm5hbWU6cGFzc3dvcmQ=".to_string()
}

/// URL of a port nothing listens on.
pub async fn closed_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub const CATALOG_JSON: &str = r#"{
    "services": [
        {"id": "Service-2", "name": "Service 2", "description": "This is the Service 2", "bindable": true, "plan_updateable": false,
         "plans": [{"id": "Plan-2", "name": "Plan 2", "description": "This is the Plan 2"}]},
        {"id": "Service-3", "name": "Service 3", "description": "This is the Service 3", "bindable": false, "plan_updateable": false,
         "plans": [{"id": "Plan-3", "name": "Plan 3", "description": "This is the Plan 3"}]},
        {"id": "Service-1", "name": "Service 1", "description": "This is the Service 1", "bindable": true, "plan_updateable": true,
         "plans": [{"id": "Plan-1", "name": "Plan 1", "description": "This is the Plan 1"}]}
    ]
}"#;

pub fn in_progress() -> Scripted {
    Scripted::new(200, r#"{"state":"in progress","description":"Creating"}"#)
}

pub fn succeeded() -> Scripted {
    Scripted::new(200, r#"{"state":"succeeded"}"#)
}
