//! Metrics collection for `punchline`.
//!
//! Prometheus-compatible counters and gauges recorded through the `metrics`
//! facade. Without an installed recorder every call is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{FetchErrorKind, PunchlineError};
use crate::reveal::Phase;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `PunchlineError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), PunchlineError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| PunchlineError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "punchline_cycles_total",
        "Total number of reveal cycles started"
    );
    describe_counter!(
        "punchline_phase_transitions_total",
        "Total number of phase transitions"
    );
    describe_gauge!(
        "punchline_current_phase",
        "Currently active phase (1 = active)"
    );
    describe_counter!(
        "punchline_fetches_total",
        "Joke fetches by outcome (ok, network, decode)"
    );
    describe_histogram!(
        "punchline_fetch_duration_ms",
        "Joke fetch latency in milliseconds"
    );
    describe_counter!(
        "punchline_stale_timers_total",
        "Timer or fetch completions dropped because the phase had moved on"
    );
}

/// Records a newly started cycle.
pub fn record_cycle_started() {
    counter!("punchline_cycles_total").increment(1);
}

/// Records a phase transition and flips the current-phase gauge.
pub fn record_phase_transition(from: Phase, to: Phase) {
    counter!(
        "punchline_phase_transitions_total",
        "from" => from.name(),
        "to" => to.name()
    )
    .increment(1);
    gauge!("punchline_current_phase", "phase" => from.name()).set(0.0);
    gauge!("punchline_current_phase", "phase" => to.name()).set(1.0);
}

/// Records the outcome and latency of a fetch.
///
/// `None` means the fetch succeeded.
pub fn record_fetch(failure: Option<FetchErrorKind>, duration: Duration) {
    let outcome = failure.map_or("ok", FetchErrorKind::as_str);
    counter!("punchline_fetches_total", "outcome" => outcome).increment(1);
    histogram!("punchline_fetch_duration_ms", "outcome" => outcome)
        .record(duration.as_secs_f64() * 1000.0);
}

/// Records a dropped stale completion.
pub fn record_stale_timer() {
    counter!("punchline_stale_timers_total").increment(1);
}
