//! Process configuration, loaded once from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `HIERARCHY_ENDPOINT` | `http://localhost:20099/hierarchies/{hierarchy_id}` |
//! | `HIERARCHY_TIMEOUT_SECS` | `30` |
//! | `USE_GZIP` | `false` |
//! | `TEMP_DIR` | the OS temp dir |
//! | `CONSUMER_QUEUE` | `transform-request` |
//!
//! Empty variables count as unset. `CONSUMER_QUEUE` is read by library callers that drain
//! a queue with [`consume_queue`](crate::consumer::consume_queue); the binary takes its jobs
//! from a file or stdin and only logs it.

use crate::error::ConfigError;
use crate::io::compression::OutputEncoding;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Token in the endpoint template replaced by the hierarchy id.
pub const HIERARCHY_ID_PLACEHOLDER: &str = "{hierarchy_id}";

pub const HIERARCHY_ENDPOINT_KEY: &str = "HIERARCHY_ENDPOINT";
pub const HIERARCHY_TIMEOUT_KEY: &str = "HIERARCHY_TIMEOUT_SECS";
pub const USE_GZIP_KEY: &str = "USE_GZIP";
pub const TEMP_DIR_KEY: &str = "TEMP_DIR";
pub const CONSUMER_QUEUE_KEY: &str = "CONSUMER_QUEUE";

const DEFAULT_HIERARCHY_ENDPOINT: &str = "http://localhost:20099/hierarchies/{hierarchy_id}";
const DEFAULT_HIERARCHY_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONSUMER_QUEUE: &str = "transform-request";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Endpoint template containing [`HIERARCHY_ID_PLACEHOLDER`].
    pub hierarchy_endpoint: String,
    pub hierarchy_timeout: Duration,
    /// Gzip the output and store it with `Content-Encoding: gzip`.
    pub use_gzip: bool,
    /// Where temporary output files are created.
    pub temp_dir: PathBuf,
    /// Queue name for [`consume_queue`](crate::consumer::consume_queue) callers.
    pub consumer_queue: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hierarchy_endpoint: DEFAULT_HIERARCHY_ENDPOINT.to_string(),
            hierarchy_timeout: DEFAULT_HIERARCHY_TIMEOUT,
            use_gzip: false,
            temp_dir: std::env::temp_dir(),
            consumer_queue: DEFAULT_CONSUMER_QUEUE.to_string(),
        }
    }
}

impl Config {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// See [`from_vars`](Self::from_vars).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Load from an explicit set of variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unparsable boolean or timeout and
    /// [`ConfigError::MissingPlaceholder`] for an endpoint template without the placeholder.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.is_empty())
            .collect();
        let mut config = Self::default();

        if let Some(endpoint) = vars.get(HIERARCHY_ENDPOINT_KEY) {
            config.hierarchy_endpoint.clone_from(endpoint);
        }
        if !config.hierarchy_endpoint.contains(HIERARCHY_ID_PLACEHOLDER) {
            return Err(ConfigError::MissingPlaceholder {
                key: HIERARCHY_ENDPOINT_KEY.to_string(),
                value: config.hierarchy_endpoint,
                placeholder: HIERARCHY_ID_PLACEHOLDER.to_string(),
            });
        }
        if let Some(secs) = vars.get(HIERARCHY_TIMEOUT_KEY) {
            let secs = secs
                .trim()
                .parse::<u64>()
                .map_err(|_| invalid(HIERARCHY_TIMEOUT_KEY, secs))?;
            config.hierarchy_timeout = Duration::from_secs(secs);
        }
        if let Some(flag) = vars.get(USE_GZIP_KEY) {
            config.use_gzip = parse_bool(flag).ok_or_else(|| invalid(USE_GZIP_KEY, flag))?;
        }
        if let Some(dir) = vars.get(TEMP_DIR_KEY) {
            config.temp_dir = PathBuf::from(dir);
        }
        if let Some(queue) = vars.get(CONSUMER_QUEUE_KEY) {
            config.consumer_queue.clone_from(queue);
        }
        Ok(config)
    }

    #[must_use]
    pub const fn output_encoding(&self) -> OutputEncoding {
        if self.use_gzip {
            OutputEncoding::Gzip
        } else {
            OutputEncoding::Identity
        }
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// The boolean spellings accepted by deployment tooling.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
