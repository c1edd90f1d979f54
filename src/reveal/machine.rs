//! Reveal state machine
//!
//! [`RevealStateMachine`] owns the current phase and the fetched joke. It
//! runs one background task per phase entry (the fetch plus summon delay
//! for `Fetching`, a single sleep for `SetupReveal` and `Suspense`) and
//! cancels that task whenever the phase is left by any other route.
//!
//! Every phase entry bumps an epoch. Tasks remember the epoch they were
//! scheduled under and drop their completion if it no longer matches, so a
//! timer that loses the race with its own cancellation still cannot move
//! the machine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::error::{JokeFetchError, RevealError};
use crate::joke::{Joke, JokeProvider};
use crate::observability::metrics;
use crate::observability::{Event, EventEmitter};

use super::phase::Phase;
use super::timing::RevealTimings;

/// Identifier of one pass from `start()` back to `Idle`.
pub type CycleId = Uuid;

/// User-visible text for a failed fetch.
pub const FETCH_FAILED_NOTICE: &str = "THE COMEDY GODS ARE ANGRY! TRY AGAIN!";

/// Point-in-time view of the machine for the rendering surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevealSnapshot {
    /// Active phase
    pub phase: Phase,
    /// Joke for the current cycle, present in every reveal phase
    pub joke: Option<Joke>,
    /// Current cycle, `None` while idle
    pub cycle: Option<CycleId>,
}

/// Notice the user has to acknowledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealNotice {
    /// The joke fetch failed and the machine is back in `Idle`.
    FetchFailed {
        /// Cycle whose fetch failed
        cycle: CycleId,
        /// Underlying failure
        error: JokeFetchError,
    },
}

impl RevealNotice {
    /// Text to show the user.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::FetchFailed { .. } => FETCH_FAILED_NOTICE,
        }
    }
}

/// Mutable machine state, guarded by a single mutex.
#[derive(Debug, Default)]
struct MachineState {
    phase: Phase,
    joke: Option<Joke>,
    cycle: Option<CycleId>,
    /// Bumped on every phase entry
    epoch: u64,
    /// Cancels the task scheduled for the current phase entry
    pending: Option<CancellationToken>,
    cycles_started: u64,
}

impl MachineState {
    fn snapshot(&self) -> RevealSnapshot {
        RevealSnapshot {
            phase: self.phase,
            joke: if self.phase.shows_joke() {
                self.joke.clone()
            } else {
                None
            },
            cycle: self.cycle,
        }
    }
}

struct Shared {
    provider: Arc<dyn JokeProvider>,
    timings: RevealTimings,
    state: Mutex<MachineState>,
    snapshot_tx: watch::Sender<RevealSnapshot>,
    notice_tx: mpsc::UnboundedSender<RevealNotice>,
    notice_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<RevealNotice>>,
    events: Arc<EventEmitter>,
    shutdown: CancellationToken,
}

/// Timed joke-reveal state machine.
///
/// Cloning yields another handle to the same machine.
///
/// ```text
/// Idle --start()--> Fetching
/// Fetching --fetch ok, summon delay--> SetupReveal
/// Fetching --fetch failed--> Idle (+ notice)
/// SetupReveal --setup hold--> Suspense
/// Suspense --suspense hold--> PunchlineReveal
/// any --reset()--> Idle
/// ```
#[derive(Clone)]
pub struct RevealStateMachine {
    shared: Arc<Shared>,
}

impl RevealStateMachine {
    /// Creates an idle machine that discards structured events.
    #[must_use]
    pub fn new(provider: Arc<dyn JokeProvider>, timings: RevealTimings) -> Self {
        Self::with_events(provider, timings, Arc::new(EventEmitter::noop()))
    }

    /// Creates an idle machine that reports to the given event stream.
    #[must_use]
    pub fn with_events(
        provider: Arc<dyn JokeProvider>,
        timings: RevealTimings,
        events: Arc<EventEmitter>,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(RevealSnapshot::default());
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        Self {
            shared: Arc::new(Shared {
                provider,
                timings,
                state: Mutex::new(MachineState::default()),
                snapshot_tx,
                notice_tx,
                notice_rx: tokio::sync::Mutex::new(notice_rx),
                events,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Starts a new reveal cycle.
    ///
    /// Moves to `Fetching` and requests a joke in the background; returns
    /// without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns `RevealError::InvalidTransition` when the machine is not
    /// idle, and `RevealError::Shutdown` after [`shutdown`](Self::shutdown).
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&self) -> Result<CycleId, RevealError> {
        let shared = &self.shared;
        let mut state = shared.lock_state();

        if shared.shutdown.is_cancelled() {
            return Err(RevealError::Shutdown);
        }
        if state.phase != Phase::Idle {
            return Err(RevealError::InvalidTransition {
                from: state.phase,
                action: "start",
            });
        }

        let cycle = Uuid::new_v4();
        let provider = shared.provider.describe();
        state.cycle = Some(cycle);
        state.joke = None;
        state.cycles_started += 1;

        info!(%cycle, %provider, "reveal cycle started");
        metrics::record_cycle_started();
        shared.events.emit(Event::CycleStarted {
            timestamp: Utc::now(),
            cycle_id: cycle,
            provider,
        });

        shared.enter_phase(&mut state, Phase::Fetching, "start");

        let token = shared.shutdown.child_token();
        state.pending = Some(token.clone());
        shared.spawn_fetch(cycle, state.epoch, token);

        Ok(cycle)
    }

    /// Returns the machine to `Idle` from any phase.
    ///
    /// Cancels the pending timer or in-flight fetch and clears the joke.
    /// Does nothing when already idle.
    pub fn reset(&self) {
        let shared = &self.shared;
        let mut state = shared.lock_state();

        if state.phase == Phase::Idle {
            return;
        }

        let from = state.phase;
        let cycle = state.cycle;
        info!(%from, cycle = ?cycle, "reveal reset");
        shared.events.emit(Event::CycleReset {
            timestamp: Utc::now(),
            cycle_id: cycle,
            from,
        });

        shared.enter_phase(&mut state, Phase::Idle, "reset");
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.shared.lock_state().phase
    }

    /// Returns the current `(phase, joke, cycle)`.
    ///
    /// The joke is only exposed in the reveal phases.
    #[must_use]
    pub fn snapshot(&self) -> RevealSnapshot {
        self.shared.lock_state().snapshot()
    }

    /// Subscribes to snapshots; a new value is published on every phase
    /// entry.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RevealSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    /// Waits for the next user notice.
    ///
    /// Only one caller receives each notice.
    pub async fn next_notice(&self) -> Option<RevealNotice> {
        self.shared.notice_rx.lock().await.recv().await
    }

    /// Returns a queued notice without waiting.
    #[must_use]
    pub fn try_next_notice(&self) -> Option<RevealNotice> {
        self.shared.notice_rx.try_lock().ok()?.try_recv().ok()
    }

    /// Number of cycles started so far.
    #[must_use]
    pub fn cycles_started(&self) -> u64 {
        self.shared.lock_state().cycles_started
    }

    /// Configured timings.
    #[must_use]
    pub fn timings(&self) -> &RevealTimings {
        &self.shared.timings
    }

    /// Cancels all pending work. Later `start()` calls fail.
    pub fn shutdown(&self) {
        debug!("reveal machine shutting down");
        self.shared.shutdown.cancel();
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, MachineState> {
        // Phase entry never panics midway, so a poisoned guard is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Leaves the current phase and enters `to`.
    ///
    /// Cancels whatever was scheduled for the previous phase entry, bumps the
    /// epoch, schedules the auto-advance timer for `to` if it has one, and
    /// publishes a snapshot.
    fn enter_phase(self: &Arc<Self>, state: &mut MachineState, to: Phase, reason: &'static str) {
        let from = state.phase;
        let cycle = state.cycle;

        if let Some(token) = state.pending.take() {
            token.cancel();
        }
        state.epoch = state.epoch.wrapping_add(1);
        state.phase = to;
        if to == Phase::Idle {
            state.joke = None;
            state.cycle = None;
        }
        debug_assert!(!to.shows_joke() || state.joke.is_some());

        info!(%from, %to, reason, epoch = state.epoch, "phase transition");
        metrics::record_phase_transition(from, to);
        self.events.emit(Event::PhaseEntered {
            timestamp: Utc::now(),
            cycle_id: cycle,
            from,
            to,
            reason: reason.to_string(),
        });

        if let Some((hold, next)) = to.auto_advance(&self.timings) {
            state.pending = Some(self.schedule_advance(state.epoch, hold, next));
        }

        self.snapshot_tx.send_replace(state.snapshot());
    }

    /// Spawns the auto-advance timer for the phase entered at `epoch`.
    fn schedule_advance(self: &Arc<Self>, epoch: u64, hold: Duration, next: Phase) -> CancellationToken {
        let token = self.shutdown.child_token();
        let task_token = token.clone();
        let shared = Arc::clone(self);
        // Armed now; `sleep` clamps holds past the clock's range instead of overflowing.
        let timer = tokio::time::sleep(hold);

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = task_token.cancelled() => {
                    debug!(epoch, %next, "auto-advance timer cancelled");
                }
                () = timer => {
                    shared.advance(epoch, next, "timer");
                }
            }
        });

        token
    }

    /// Fetches the joke for `cycle`, then waits out the summon delay.
    fn spawn_fetch(self: &Arc<Self>, cycle: CycleId, epoch: u64, token: CancellationToken) {
        let shared = Arc::clone(self);
        let span = info_span!("reveal_cycle", %cycle);

        tokio::spawn(
            async move {
                let started = Instant::now();
                let result = tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        debug!("joke fetch cancelled");
                        return;
                    }
                    result = shared.provider.fetch_random_joke() => result,
                };
                let elapsed = started.elapsed();
                metrics::record_fetch(result.as_ref().err().map(JokeFetchError::kind), elapsed);

                match result {
                    Ok(joke) => {
                        if !shared.store_joke(epoch, cycle, joke, elapsed) {
                            return;
                        }
                        tokio::select! {
                            biased;
                            () = token.cancelled() => {
                                debug!("summon delay cancelled");
                            }
                            () = tokio::time::sleep(shared.timings.summon_delay) => {
                                shared.advance(epoch, Phase::SetupReveal, "summoned");
                            }
                        }
                    }
                    Err(error) => shared.fail_fetch(epoch, cycle, error),
                }
            }
            .instrument(span),
        );
    }

    /// Stores a fetched joke if the fetch still belongs to the live phase
    /// entry. Returns `false` when it is stale.
    fn store_joke(&self, epoch: u64, cycle: CycleId, joke: Joke, elapsed: Duration) -> bool {
        let mut state = self.lock_state();
        if state.epoch != epoch {
            debug!(epoch, current = state.epoch, "dropping stale joke");
            metrics::record_stale_timer();
            return false;
        }

        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        info!(joke_id = joke.id, kind = %joke.kind, duration_ms, "joke fetched");
        self.events.emit(Event::JokeFetched {
            timestamp: Utc::now(),
            cycle_id: cycle,
            joke_id: joke.id,
            kind: joke.kind.clone(),
            duration_ms,
        });
        state.joke = Some(joke);
        true
    }

    /// Falls back to `Idle` and raises a notice, once per failed cycle.
    fn fail_fetch(self: &Arc<Self>, epoch: u64, cycle: CycleId, error: JokeFetchError) {
        let mut state = self.lock_state();
        if state.epoch != epoch {
            debug!(epoch, current = state.epoch, error = %error, "dropping stale fetch failure");
            metrics::record_stale_timer();
            return;
        }

        warn!(error = %error, kind = %error.kind(), "joke fetch failed");
        self.events.emit(Event::FetchFailed {
            timestamp: Utc::now(),
            cycle_id: cycle,
            error_kind: error.kind().to_string(),
            message: error.to_string(),
        });

        self.enter_phase(&mut state, Phase::Idle, "fetch_failed");
        let _ = self.notice_tx.send(RevealNotice::FetchFailed { cycle, error });
    }

    /// Timer-driven transition from the phase entered at `epoch`.
    fn advance(self: &Arc<Self>, epoch: u64, to: Phase, reason: &'static str) {
        let mut state = self.lock_state();
        if state.epoch != epoch {
            debug!(epoch, current = state.epoch, %to, "dropping stale timer");
            metrics::record_stale_timer();
            return;
        }
        self.enter_phase(&mut state, to, reason);
    }
}

impl std::fmt::Debug for RevealStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock_state();
        f.debug_struct("RevealStateMachine")
            .field("phase", &state.phase)
            .field("cycle", &state.cycle)
            .field("epoch", &state.epoch)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joke::StaticJokeProvider;
    use async_trait::async_trait;

    /// Provider that fails every call after an optional delay.
    struct FailingProvider {
        delay: Duration,
    }

    #[async_trait]
    impl JokeProvider for FailingProvider {
        async fn fetch_random_joke(&self) -> Result<Joke, JokeFetchError> {
            tokio::time::sleep(self.delay).await;
            Err(JokeFetchError::Network("connection refused".to_string()))
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    fn sample_joke() -> Joke {
        Joke::new("general", "S", "P", 1)
    }

    fn ok_machine() -> RevealStateMachine {
        RevealStateMachine::new(
            Arc::new(StaticJokeProvider::new(vec![sample_joke()])),
            RevealTimings::default(),
        )
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[test]
    fn test_new_machine_is_idle() {
        let machine = ok_machine();
        assert_eq!(machine.snapshot(), RevealSnapshot::default());
        assert_eq!(machine.cycles_started(), 0);
        assert!(machine.try_next_notice().is_none());
    }

    #[test]
    fn test_reset_when_idle_is_noop() {
        let machine = ok_machine();
        let rx = machine.subscribe();
        machine.reset();
        assert_eq!(machine.phase(), Phase::Idle);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_enters_fetching_immediately() {
        let machine = ok_machine();
        let cycle = machine.start().unwrap();
        let snap = machine.snapshot();
        assert_eq!(snap.phase, Phase::Fetching);
        assert_eq!(snap.cycle, Some(cycle));
        assert!(snap.joke.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_rejected_outside_idle() {
        let machine = ok_machine();
        machine.start().unwrap();
        let err = machine.start().unwrap_err();
        assert_eq!(
            err,
            RevealError::InvalidTransition {
                from: Phase::Fetching,
                action: "start",
            }
        );
        assert_eq!(machine.cycles_started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cycle_timing() {
        let machine = ok_machine();
        machine.start().unwrap();

        sleep_ms(1990).await;
        assert_eq!(machine.phase(), Phase::Fetching);

        sleep_ms(20).await;
        let snap = machine.snapshot();
        assert_eq!(snap.phase, Phase::SetupReveal);
        assert_eq!(snap.joke.as_ref().unwrap().setup, "S");

        sleep_ms(2980).await;
        assert_eq!(machine.phase(), Phase::SetupReveal);

        sleep_ms(20).await;
        assert_eq!(machine.phase(), Phase::Suspense);

        sleep_ms(2480).await;
        assert_eq!(machine.phase(), Phase::Suspense);

        sleep_ms(20).await;
        let snap = machine.snapshot();
        assert_eq!(snap.phase, Phase::PunchlineReveal);
        assert_eq!(snap.joke.as_ref().unwrap().punchline, "P");

        // Punchline holds until reset.
        sleep_ms(60_000).await;
        assert_eq!(machine.phase(), Phase::PunchlineReveal);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_returns_to_idle_with_one_notice() {
        let machine = RevealStateMachine::new(
            Arc::new(FailingProvider {
                delay: Duration::from_millis(50),
            }),
            RevealTimings::default(),
        );
        let cycle = machine.start().unwrap();
        assert_eq!(machine.phase(), Phase::Fetching);

        sleep_ms(100).await;
        let snap = machine.snapshot();
        assert_eq!(snap.phase, Phase::Idle);
        assert!(snap.joke.is_none());
        assert!(snap.cycle.is_none());

        let notice = machine.try_next_notice().unwrap();
        assert_eq!(notice.message(), FETCH_FAILED_NOTICE);
        assert!(matches!(notice, RevealNotice::FetchFailed { cycle: c, .. } if c == cycle));
        assert!(machine.try_next_notice().is_none());

        sleep_ms(10_000).await;
        assert_eq!(machine.phase(), Phase::Idle);
        assert!(machine.try_next_notice().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_during_setup_cancels_timer() {
        let machine = ok_machine();
        machine.start().unwrap();
        sleep_ms(2100).await;
        assert_eq!(machine.phase(), Phase::SetupReveal);

        machine.reset();
        let mut rx = machine.subscribe();
        rx.mark_unchanged();
        assert_eq!(machine.phase(), Phase::Idle);
        assert!(machine.snapshot().joke.is_none());

        sleep_ms(10_000).await;
        assert_eq!(machine.phase(), Phase::Idle);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_during_fetch_discards_late_joke() {
        struct SlowProvider;

        #[async_trait]
        impl JokeProvider for SlowProvider {
            async fn fetch_random_joke(&self) -> Result<Joke, JokeFetchError> {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(Joke::new("general", "late", "too late", 9))
            }

            fn describe(&self) -> String {
                "slow".to_string()
            }
        }

        let machine = RevealStateMachine::new(Arc::new(SlowProvider), RevealTimings::default());
        machine.start().unwrap();
        sleep_ms(100).await;
        machine.reset();

        sleep_ms(5_000).await;
        let snap = machine.snapshot();
        assert_eq!(snap.phase, Phase::Idle);
        assert!(snap.joke.is_none());
        assert!(machine.try_next_notice().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_hold_keeps_state_and_snapshot_in_step() {
        let machine = RevealStateMachine::new(
            Arc::new(StaticJokeProvider::new(vec![sample_joke()])),
            RevealTimings {
                summon_delay: Duration::ZERO,
                setup_hold: Duration::MAX,
                suspense_hold: Duration::MAX,
            },
        );
        let rx = machine.subscribe();
        machine.start().unwrap();

        sleep_ms(10).await;
        assert_eq!(machine.phase(), Phase::SetupReveal);
        assert_eq!(rx.borrow().phase, Phase::SetupReveal);
        assert_eq!(machine.snapshot(), *rx.borrow());

        sleep_ms(86_400_000).await;
        assert_eq!(machine.phase(), Phase::SetupReveal);

        machine.reset();
        assert_eq!(rx.borrow().phase, Phase::Idle);
        machine.start().unwrap();
        assert_eq!(rx.borrow().phase, Phase::Fetching);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_event_keeps_cycle_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let events = Arc::new(EventEmitter::from_file(&path).unwrap());
        let machine = RevealStateMachine::with_events(
            Arc::new(StaticJokeProvider::new(vec![sample_joke()])),
            RevealTimings::default(),
            Arc::clone(&events),
        );
        let cycle = machine.start().unwrap();
        sleep_ms(100).await;
        machine.reset();
        drop(machine);
        drop(events);

        let lines: Vec<serde_json::Value> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let entered_idle = lines
            .iter()
            .find(|e| e["type"] == "PhaseEntered" && e["to"] == "idle")
            .unwrap();
        assert_eq!(entered_idle["reason"], "reset");
        assert_eq!(entered_idle["cycle_id"], cycle.to_string());
        let reset = lines.iter().find(|e| e["type"] == "CycleReset").unwrap();
        assert_eq!(reset["cycle_id"], cycle.to_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_rejects_start() {
        let machine = ok_machine();
        machine.start().unwrap();
        machine.shutdown();
        sleep_ms(10_000).await;
        assert_eq!(machine.phase(), Phase::Fetching);
        machine.reset();
        assert_eq!(machine.start().unwrap_err(), RevealError::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_every_phase() {
        let machine = ok_machine();
        let mut rx = machine.subscribe();
        machine.start().unwrap();

        let mut seen = vec![];
        while seen.last() != Some(&Phase::PunchlineReveal) {
            rx.changed().await.unwrap();
            seen.push(rx.borrow_and_update().phase);
        }
        assert_eq!(
            seen,
            vec![
                Phase::Fetching,
                Phase::SetupReveal,
                Phase::Suspense,
                Phase::PunchlineReveal,
            ]
        );
    }
}
