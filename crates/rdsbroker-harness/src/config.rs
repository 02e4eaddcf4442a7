use std::path::{Path, PathBuf};
use std::time::Duration;

use rdsbroker_client::{BrokerClientConfig, Credentials, PollSettings};
use rdsbroker_core::Catalog;
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::lifecycle::LifecycleSpec;

pub const ENV_BROKER_URL: &str = "RDSBROKER_URL";
pub const ENV_BROKER_USERNAME: &str = "RDSBROKER_USERNAME";
pub const ENV_BROKER_PASSWORD: &str = "RDSBROKER_PASSWORD";
pub const ENV_AWS_REGION: &str = "AWS_REGION";

const DEFAULT_REGION: &str = "eu-west-1";

/// Harness settings, read from a JSON file and then overridden from the
/// environment. Every section and field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub broker: BrokerSection,
    pub aws: AwsSection,
    pub polling: PollingSection,
    pub scenario: ScenarioSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSection {
    /// Broker binary to start. Ignored when `url` is set.
    pub binary: PathBuf,
    /// Broker config file, passed to the binary and read for credentials
    /// and the expected catalog.
    pub config: PathBuf,
    /// Already-running broker. When set, no process is started.
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub startup_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub unauthorized_means_gone: bool,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("rds-broker"),
            config: PathBuf::from("./config.json"),
            url: None,
            username: None,
            password: None,
            startup_timeout_secs: 10,
            request_timeout_secs: 30,
            unauthorized_means_gone: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsSection {
    pub region: String,
    /// Alternate RDS endpoint, mostly for local fakes.
    pub endpoint_url: Option<String>,
}

impl Default for AwsSection {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSection {
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for PollingSection {
    fn default() -> Self {
        let defaults = PollSettings::default();
        Self {
            interval_secs: defaults.interval.as_secs(),
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSection {
    pub service_id: String,
    pub plan_id: String,
    pub parameters: serde_json::Map<String, serde_json::Value>,
    /// Number of lifecycles run side by side.
    pub instances: usize,
    pub expect_final_snapshot: bool,
    pub cleanup_final_snapshot: bool,
}

impl Default for ScenarioSection {
    fn default() -> Self {
        Self {
            service_id: "Service-1".to_string(),
            plan_id: "Plan-1".to_string(),
            parameters: serde_json::Map::new(),
            instances: 1,
            expect_final_snapshot: false,
            cleanup_final_snapshot: true,
        }
    }
}

impl HarnessConfig {
    /// Read `path` and apply the process environment on top.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let contents = std::fs::read_to_string(path).map_err(|source| HarnessError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| HarnessError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from `lookup`. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(url) = get(ENV_BROKER_URL) {
            self.broker.url = Some(url);
        }
        if let Some(username) = get(ENV_BROKER_USERNAME) {
            self.broker.username = Some(username);
        }
        if let Some(password) = get(ENV_BROKER_PASSWORD) {
            self.broker.password = Some(password);
        }
        if let Some(region) = get(ENV_AWS_REGION) {
            self.aws.region = region;
        }
    }

    /// Credentials from this config, falling back to the broker's own
    /// config file for whichever half is missing.
    pub fn credentials(&self, broker_file: Option<&BrokerFileConfig>) -> Result<Credentials, HarnessError> {
        let username = self
            .broker
            .username
            .clone()
            .or_else(|| broker_file.map(|f| f.username.clone()));
        let password = self
            .broker
            .password
            .clone()
            .or_else(|| broker_file.map(|f| f.password.clone()));
        match (username, password) {
            (Some(username), Some(password)) => Ok(Credentials::new(username, password)),
            _ => Err(HarnessError::Config(format!(
                "broker credentials missing: set broker.username/broker.password, \
                 {ENV_BROKER_USERNAME}/{ENV_BROKER_PASSWORD}, or provide them in {}",
                self.broker.config.display()
            ))),
        }
    }

    pub fn client_config(&self, url: &str, credentials: Credentials) -> BrokerClientConfig {
        let mut config = BrokerClientConfig::new(url, credentials);
        config.unauthorized_means_gone = self.broker.unauthorized_means_gone;
        config.request_timeout_secs = self.broker.request_timeout_secs;
        config
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings::new(
            Duration::from_secs(self.polling.interval_secs),
            Duration::from_secs(self.polling.timeout_secs),
        )
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.broker.startup_timeout_secs)
    }

    pub fn lifecycle_spec(&self) -> LifecycleSpec {
        LifecycleSpec {
            service_id: self.scenario.service_id.clone(),
            plan_id: self.scenario.plan_id.clone(),
            parameters: self.scenario.parameters.clone(),
            expect_final_snapshot: self.scenario.expect_final_snapshot,
            cleanup_final_snapshot: self.scenario.cleanup_final_snapshot,
        }
    }
}

/// The subset of the broker's own config file the harness reads.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerFileConfig {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub rds_config: Option<RdsFileConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RdsFileConfig {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub catalog: Option<Catalog>,
}

impl BrokerFileConfig {
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let contents = std::fs::read_to_string(path).map_err(|source| HarnessError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| HarnessError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        self.rds_config.as_ref().and_then(|r| r.catalog.as_ref())
    }
}
