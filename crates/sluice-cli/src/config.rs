use std::collections::HashMap;
use std::fmt;

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use sluice_core::app::ConsumerOptions;

pub const ENV_PREFIX: &str = "SLUICE";

#[derive(Deserialize, Serialize, Clone)]
pub struct WorkerConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `json` or `pretty`
    #[serde(default = "default_log_format")]
    pub log_format: String,

    // Queue
    #[serde(default = "default_queue_url")]
    pub queue_url: String,

    /// Batch size per receive
    #[serde(default = "default_max_messages")]
    pub max_messages: u32,

    /// Long-poll wait per receive in seconds
    #[serde(default = "default_wait_time_secs")]
    pub wait_time_secs: u32,

    /// Receive count at which failing messages are released for redrive (0 = never)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Visibility timeout of the local in-memory queue
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: u64,

    // Provider credentials, used by networked transport and store adapters
    #[serde(default = "default_aws_region")]
    pub aws_region: String,

    #[serde(default = "default_aws_access_key_id")]
    pub aws_access_key_id: String,

    #[serde(default = "default_aws_secret_access_key")]
    pub aws_secret_access_key: String,

    #[serde(default = "default_aws_endpoint")]
    pub aws_endpoint: String,

    // Record store
    #[serde(default = "default_events_table")]
    pub events_table: String,

    /// Demo envelopes seeded into the local queue at startup
    #[serde(default)]
    pub demo_messages: usize,
}

fn default_app_name() -> String {
    "sluice".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_queue_url() -> String {
    "http://localhost:4566/000000000000/events-main".to_string()
}

fn default_max_messages() -> u32 {
    5
}

fn default_wait_time_secs() -> u32 {
    10
}

fn default_max_retries() -> u32 {
    5
}

fn default_visibility_timeout_secs() -> u64 {
    30
}

fn default_aws_region() -> String {
    "us-east-1".to_string()
}

fn default_aws_access_key_id() -> String {
    "local_access_key".to_string()
}

fn default_aws_secret_access_key() -> String {
    "local_secret_key".to_string()
}

fn default_aws_endpoint() -> String {
    "http://localhost:4566".to_string()
}

fn default_events_table() -> String {
    sluice_core::domain::EVENTS_TABLE.to_string()
}

const REDACTED: &str = "<redacted>";

// The secret key never reaches the log stream.
impl fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("app_name", &self.app_name)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("queue_url", &self.queue_url)
            .field("max_messages", &self.max_messages)
            .field("wait_time_secs", &self.wait_time_secs)
            .field("max_retries", &self.max_retries)
            .field("visibility_timeout_secs", &self.visibility_timeout_secs)
            .field("aws_region", &self.aws_region)
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field("aws_secret_access_key", &REDACTED)
            .field("aws_endpoint", &self.aws_endpoint)
            .field("events_table", &self.events_table)
            .field("demo_messages", &self.demo_messages)
            .finish()
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(None)
    }

    /// Load from an explicit variable map instead of the process environment.
    pub fn from_source(vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()
    }

    pub fn consumer_options(&self) -> ConsumerOptions {
        ConsumerOptions {
            queue_url: self.queue_url.clone(),
            max_messages: self.max_messages,
            wait_time_secs: self.wait_time_secs,
            max_retries: Some(self.max_retries).filter(|&n| n > 0),
        }
    }
}
