use carton_core::BoxCompute;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub processor: ProcessorConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessorConfig {
    /// Maximum number of requests running at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Requests buffered before senders wait
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Parse, hydrate and plan requests without running any action
    #[serde(default)]
    pub dry_run: bool,
}

fn default_max_concurrent() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            queue_capacity: default_queue_capacity(),
            dry_run: false,
        }
    }
}

/// Values used for boxes the catalog has no explicit record for.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub compute: BoxCompute,
}

fn default_provider() -> String {
    "one".to_string()
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            image: String::new(),
            region: None,
            compute: BoxCompute::default(),
        }
    }
}
