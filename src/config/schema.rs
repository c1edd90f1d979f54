//! Configuration schema
//!
//! Every field is optional; an empty file yields the defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::joke::http::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT, HttpProviderOptions, MAX_RESPONSE_SIZE};
use crate::reveal::RevealTimings;
use crate::reveal::timing::duration_str;

/// Top-level `punchline` configuration.
///
/// ```yaml
/// endpoint: https://official-joke-api.appspot.com/random_joke
/// request_timeout: 10s
/// timings:
///   summon_delay: 2s
///   setup_hold: 3s
///   suspense_hold: 2500ms
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RevealConfig {
    /// Random-joke endpoint
    pub endpoint: String,

    /// Whole-request timeout for the joke fetch
    #[serde(with = "duration_str")]
    pub request_timeout: Duration,

    /// Phase pacing
    pub timings: RevealTimings,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            timings: RevealTimings::default(),
        }
    }
}

impl RevealConfig {
    /// Options for building an [`HttpJokeProvider`](crate::joke::HttpJokeProvider).
    #[must_use]
    pub fn provider_options(&self) -> HttpProviderOptions {
        HttpProviderOptions {
            endpoint: self.endpoint.clone(),
            timeout: self.request_timeout,
            max_response_size: MAX_RESPONSE_SIZE,
        }
    }
}
