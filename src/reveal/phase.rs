//! Reveal phases
//!
//! The five discrete steps of a reveal cycle and the static knowledge of
//! which of them advance on their own.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::timing::RevealTimings;

/// One discrete step of the reveal sequence.
///
/// Exactly one phase is active at a time. `Idle` is both the initial state
/// and the state every cycle returns to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for the user to ask for a joke
    #[default]
    Idle,
    /// Joke request in flight, or fetched and waiting out the summon delay
    Fetching,
    /// Setup line on screen
    SetupReveal,
    /// Setup hidden, punchline not yet shown
    Suspense,
    /// Punchline on screen until the user resets
    PunchlineReveal,
}

impl Phase {
    /// Every phase in cycle order.
    pub const ALL: [Self; 5] = [
        Self::Idle,
        Self::Fetching,
        Self::SetupReveal,
        Self::Suspense,
        Self::PunchlineReveal,
    ];

    /// Returns the stable `snake_case` name of this phase.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::SetupReveal => "setup_reveal",
            Self::Suspense => "suspense",
            Self::PunchlineReveal => "punchline_reveal",
        }
    }

    /// Returns whether a joke must be present while in this phase.
    #[must_use]
    pub const fn shows_joke(self) -> bool {
        matches!(
            self,
            Self::SetupReveal | Self::Suspense | Self::PunchlineReveal
        )
    }

    /// Returns the hold duration and successor for phases that advance on
    /// a timer from the moment they are entered.
    ///
    /// `Fetching` is not included: its timer only starts once the fetch
    /// succeeds, see [`RevealTimings::summon_delay`].
    #[must_use]
    pub const fn auto_advance(self, timings: &RevealTimings) -> Option<(Duration, Self)> {
        match self {
            Self::SetupReveal => Some((timings.setup_hold, Self::Suspense)),
            Self::Suspense => Some((timings.suspense_hold, Self::PunchlineReveal)),
            Self::Idle | Self::Fetching | Self::PunchlineReveal => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
