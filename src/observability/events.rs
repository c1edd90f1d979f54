//! Structured event stream for `punchline`.
//!
//! Discrete, typed events emitted as the reveal machine moves between
//! phases. Events are serialized as newline-delimited JSON (JSONL) and carry
//! a monotonically increasing sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::reveal::Phase;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a session.
///
/// Each variant is tagged with `"type"` when serialized to JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// `start()` was accepted and a new cycle began.
    CycleStarted {
        /// When the cycle began.
        timestamp: DateTime<Utc>,
        /// Identifier of the new cycle.
        cycle_id: Uuid,
        /// Provider label, e.g. `"http(https://...)"`.
        provider: String,
    },

    /// The machine entered a new phase.
    PhaseEntered {
        /// When the transition occurred.
        timestamp: DateTime<Utc>,
        /// Cycle the transition belongs to, if any.
        cycle_id: Option<Uuid>,
        /// Phase that was left.
        from: Phase,
        /// Phase that was entered.
        to: Phase,
        /// Why the transition happened (`"start"`, `"timer"`, ...).
        reason: String,
    },

    /// A joke arrived and was stored.
    JokeFetched {
        /// When the joke arrived.
        timestamp: DateTime<Utc>,
        /// Cycle the fetch belongs to.
        cycle_id: Uuid,
        /// Provider-assigned joke id.
        joke_id: i64,
        /// Joke category.
        kind: String,
        /// Request latency in milliseconds.
        duration_ms: u64,
    },

    /// The fetch failed and the machine fell back to idle.
    FetchFailed {
        /// When the failure resolved.
        timestamp: DateTime<Utc>,
        /// Cycle the fetch belonged to.
        cycle_id: Uuid,
        /// `"network"` or `"decode"`.
        error_kind: String,
        /// Detailed error message.
        message: String,
    },

    /// `reset()` returned the machine to idle.
    CycleReset {
        /// When the reset happened.
        timestamp: DateTime<Utc>,
        /// Cycle that was abandoned or finished.
        cycle_id: Option<Uuid>,
        /// Phase the reset was issued from.
        from: Phase,
    },

    /// The session ended.
    SessionStopped {
        /// When the session stopped.
        timestamp: DateTime<Utc>,
        /// Human-readable stop reason.
        reason: String,
        /// Number of cycles started during the session.
        cycles: u64,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) increments the sequence counter,
/// serializes the event as a single JSON line, and flushes the underlying
/// writer. Serialization or I/O failures are dropped; observability never
/// interrupts a reveal.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug.
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stderr.
    ///
    /// Stdout belongs to the terminal view.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that silently discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or opened.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
