//! Terminal view
//!
//! Pure text rendering of a [`RevealSnapshot`]. Holds no state and makes no
//! decisions; the run loop decides when to redraw and which key does what.

use std::fmt::Write as _;

use crate::reveal::{Phase, RevealNotice, RevealSnapshot};

/// Shown once when an interactive session starts.
pub const BANNER: &str = "WARNING: FLASHING LIGHTS AND EXTREME EFFECTS";

const IDLE_TITLE: &str = "ARE YOU READY?";
const START_PROMPT: &str = "Tell Me A Joke";
const FETCHING_CAPTION: &str = "SUMMONING...";
const SUSPENSE_CAPTION: &str = "WAIT FOR IT...";
const AGAIN_PROMPT: &str = "ANOTHER ONE!";

/// Renders the screen for a snapshot.
///
/// Reveal phases without a joke render nothing; the machine never publishes
/// such a snapshot.
#[must_use]
pub fn render(snapshot: &RevealSnapshot) -> String {
    let mut out = String::new();
    match (snapshot.phase, snapshot.joke.as_ref()) {
        (Phase::Idle, _) => {
            let _ = writeln!(out, "{IDLE_TITLE}");
            let _ = writeln!(out, "[Enter] {START_PROMPT}");
        }
        (Phase::Fetching, _) => {
            let _ = writeln!(out, "{FETCHING_CAPTION}");
        }
        (Phase::SetupReveal, Some(joke)) => {
            let _ = writeln!(out, "{}", joke.setup);
        }
        (Phase::Suspense, Some(_)) => {
            let _ = writeln!(out, "{SUSPENSE_CAPTION}");
        }
        (Phase::PunchlineReveal, Some(joke)) => {
            let _ = writeln!(out, "{}", joke.punchline);
            let _ = writeln!(out, "[Enter] {AGAIN_PROMPT}");
        }
        (Phase::SetupReveal | Phase::Suspense | Phase::PunchlineReveal, None) => {}
    }
    out
}

/// Renders a notice the user has to acknowledge.
#[must_use]
pub fn render_notice(notice: &RevealNotice) -> String {
    format!("!! {} !!\n", notice.message())
}
