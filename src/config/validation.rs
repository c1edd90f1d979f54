//! Configuration validation
//!
//! Semantic checks on a deserialized [`RevealConfig`]. The validator
//! collects every issue rather than stopping at the first one.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Url;

use crate::config::schema::RevealConfig;
use crate::error::{Severity, ValidationIssue};

/// A reveal longer than this is almost certainly a unit mistake.
const MAX_REASONABLE_REVEAL: Duration = Duration::from_secs(5 * 60);

/// Upper bound for a single reveal delay. Longer values are rejected.
pub const MAX_REVEAL_STEP: Duration = Duration::from_secs(60 * 60);

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns the result.
    pub fn validate(&mut self, config: &RevealConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_endpoint(&config.endpoint);
        self.validate_timeout(config.request_timeout);
        self.validate_timings(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn validate_endpoint(&mut self, endpoint: &str) {
        if endpoint.trim().is_empty() {
            self.add_error("endpoint", "Endpoint is required and cannot be empty");
            return;
        }

        match Url::parse(endpoint) {
            Ok(url) => {
                if !matches!(url.scheme(), "http" | "https") {
                    self.add_error(
                        "endpoint",
                        &format!("Unsupported scheme '{}' (expected http or https)", url.scheme()),
                    );
                }
                if url.host_str().is_none_or(str::is_empty) {
                    self.add_error("endpoint", "Endpoint has no host");
                }
                if url.scheme() == "http" && !is_loopback(&url) {
                    self.add_warning("endpoint", "Plain http endpoint outside loopback");
                }
            }
            Err(e) => self.add_error("endpoint", &format!("Invalid URL: {e}")),
        }
    }

    fn validate_timeout(&mut self, timeout: Duration) {
        if timeout.is_zero() {
            self.add_error("request_timeout", "Request timeout must be greater than zero");
        }
    }

    fn validate_timings(&mut self, config: &RevealConfig) {
        let timings = &config.timings;
        for (path, value) in [
            ("timings.summon_delay", timings.summon_delay),
            ("timings.setup_hold", timings.setup_hold),
            ("timings.suspense_hold", timings.suspense_hold),
        ] {
            if value.is_zero() {
                self.add_warning(path, "Zero duration skips this step of the reveal");
            } else if value > MAX_REVEAL_STEP {
                self.add_error(
                    path,
                    &format!(
                        "Delay exceeds the {} limit",
                        humantime::format_duration(MAX_REVEAL_STEP)
                    ),
                );
            }
        }

        if timings.time_to_punchline() > MAX_REASONABLE_REVEAL {
            self.add_warning(
                "timings",
                &format!(
                    "Reveal takes {} from fetch to punchline",
                    humantime::format_duration(timings.time_to_punchline())
                ),
            );
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback()),
        None => false,
    }
}
