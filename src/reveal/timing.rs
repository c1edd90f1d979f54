//! Reveal pacing
//!
//! Fixed delays between phases. Values deserialize from human-readable
//! duration strings (`"2s"`, `"2500ms"`) so they can live in the YAML
//! config.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Delay between a successful fetch and showing the setup line.
pub const DEFAULT_SUMMON_DELAY: Duration = Duration::from_millis(2000);

/// How long the setup line stays up before suspense.
pub const DEFAULT_SETUP_HOLD: Duration = Duration::from_millis(3000);

/// How long suspense lasts before the punchline.
pub const DEFAULT_SUSPENSE_HOLD: Duration = Duration::from_millis(2500);

/// Timer durations driving the reveal sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RevealTimings {
    /// Wait after the joke arrives, still in `Fetching`
    #[serde(with = "duration_str")]
    pub summon_delay: Duration,
    /// Time spent in `SetupReveal`
    #[serde(with = "duration_str")]
    pub setup_hold: Duration,
    /// Time spent in `Suspense`
    #[serde(with = "duration_str")]
    pub suspense_hold: Duration,
}

impl Default for RevealTimings {
    fn default() -> Self {
        Self {
            summon_delay: DEFAULT_SUMMON_DELAY,
            setup_hold: DEFAULT_SETUP_HOLD,
            suspense_hold: DEFAULT_SUSPENSE_HOLD,
        }
    }
}

impl RevealTimings {
    /// Total time from a successful fetch to the punchline, saturating at
    /// `Duration::MAX`.
    #[must_use]
    pub const fn time_to_punchline(&self) -> Duration {
        self.summon_delay
            .saturating_add(self.setup_hold)
            .saturating_add(self.suspense_hold)
    }
}

/// Serde adapter for `Duration` as a humantime string.
pub mod duration_str {
    use super::{Deserialize, Deserializer, Duration, Serializer};

    /// Serializes a duration as e.g. `"2s 500ms"`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    /// Deserializes a humantime string such as `"3s"` or `"2500ms"`.
    ///
    /// # Errors
    ///
    /// Returns a custom error when the string is not a valid duration.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim())
            .map_err(|e| serde::de::Error::custom(format!("invalid duration '{raw}': {e}")))
    }
}
