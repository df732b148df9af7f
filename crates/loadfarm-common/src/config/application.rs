use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

const DEFAULT_CONFIG: &str = include_str!("default.toml");

/// The prefix of environment variables that override the default configuration.
/// Nested keys are separated by double underscores,
/// e.g. `LOADFARM__CONTROLLER__LISTEN_PORT`.
pub const CONFIG_ENV_PREFIX: &str = "LOADFARM__";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub controller: ControllerConfig,
    pub worker: WorkerConfig,
    pub store: StoreConfig,
    pub local: LocalConfig,
}

impl AppConfig {
    pub fn load() -> CommonResult<Self> {
        Self::figment()
            .extract()
            .map_err(|e| CommonError::InvalidArgument(e.to_string()))
    }

    fn figment() -> Figment {
        Figment::from(Toml::string(DEFAULT_CONFIG)).admerge(
            Env::prefixed(CONFIG_ENV_PREFIX).map(|p| p.as_str().replace("__", ".").into()),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub listen_host: String,
    pub listen_port: u16,
    pub external_host: String,
    /// The port advertised in report callback URLs,
    /// or `0` to use the listen port.
    pub external_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// The worker ID, or an empty string to generate a random ID at startup.
    #[serde(deserialize_with = "deserialize_non_empty_string")]
    pub id: Option<String>,
    pub listen_host: String,
    pub listen_port: u16,
    pub external_host: String,
    /// The port advertised to the controller,
    /// or `0` to use the port the worker server is bound to.
    pub external_port: u16,
    pub controller_host: String,
    pub controller_port: u16,
    pub registration: RegistrationBackoff,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub kind: StoreKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreKind {
    /// An in-process wide-column store.
    Memory,
    /// A store that accepts every batch and keeps nothing.
    Discard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    pub worker_count: usize,
}

/// How a worker retries its registration with the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationBackoff {
    /// The total number of attempts, including the first one.
    pub attempts: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// The factor applied to the delay after each failed attempt.
    pub multiplier: u32,
}

pub fn deserialize_non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if value.is_empty() {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}
