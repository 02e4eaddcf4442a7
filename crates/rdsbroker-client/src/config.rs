use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_VERSION: &str = "2.13";

/// Static basic-auth credentials for the broker. Never mutated after the
/// client is built.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerClientConfig {
    /// Base URL of the broker, e.g. `http://localhost:8080`.
    pub url: String,
    pub credentials: Credentials,
    /// Value callers pass as `accepts_incomplete` unless they override it.
    #[serde(default = "default_true")]
    pub accepts_incomplete: bool,
    /// Treat a 401 from last_operation as "instance gone".
    ///
    /// This mirrors what the broker's own CI did: a deleted instance record
    /// made the broker answer 401 instead of 410. It conflates a bad password
    /// with a finished deprovision, so switch it off when talking to a broker
    /// that returns 410 properly.
    #[serde(default = "default_true")]
    pub unauthorized_means_gone: bool,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Per-request timeout, in seconds. Zero disables it.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl BrokerClientConfig {
    pub fn new(url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            url: url.into(),
            credentials,
            accepts_incomplete: true,
            unauthorized_means_gone: true,
            api_version: default_api_version(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

fn default_true() -> bool {
    true
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}
