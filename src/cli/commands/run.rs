//! `run` command
//!
//! Drives a [`RevealStateMachine`] from stdin and redraws the terminal view
//! on every phase change. Enter starts a cycle from `Idle` and resets from
//! the punchline; `q` quits.

use std::io::Write;
use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::cli::args::RunArgs;
use crate::error::PunchlineError;
use crate::observability::{Event, EventEmitter};
use crate::reveal::{Phase, RevealNotice, RevealSnapshot, RevealStateMachine};
use crate::view;

/// Run the interactive joke teller.
///
/// # Errors
///
/// Returns a config error if the source cannot be resolved, an I/O error
/// if the events file or stdout fails, and with `--once` a fetch error if
/// the only cycle failed.
pub async fn run(
    args: &RunArgs,
    quiet: bool,
    cancel: CancellationToken,
) -> Result<(), PunchlineError> {
    if let Some(port) = args.metrics_port {
        crate::observability::init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    let (config, provider) = super::resolve_source(&args.source)?;

    let events = Arc::new(match args.events {
        Some(ref path) => EventEmitter::from_file(path)?,
        None => EventEmitter::noop(),
    });

    let machine = RevealStateMachine::with_events(provider, config.timings, Arc::clone(&events));
    let snapshots = machine.subscribe();

    if !quiet {
        println!("{}", view::BANNER);
    }

    let result = if args.once {
        play_once(&machine, snapshots, &cancel).await
    } else {
        interactive(&machine, snapshots, &cancel).await
    };

    machine.shutdown();
    let reason = match (&result, cancel.is_cancelled()) {
        (_, true) => "signal",
        (Err(_), false) => "error",
        (Ok(()), false) => "finished",
    };
    events.emit(Event::SessionStopped {
        timestamp: Utc::now(),
        reason: reason.to_string(),
        cycles: machine.cycles_started(),
    });
    tracing::info!(reason, cycles = machine.cycles_started(), "session stopped");

    result
}

/// Plays one cycle and returns once the punchline is up or the fetch failed.
async fn play_once(
    machine: &RevealStateMachine,
    mut snapshots: watch::Receiver<RevealSnapshot>,
    cancel: &CancellationToken,
) -> Result<(), PunchlineError> {
    machine.start()?;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            Some(notice) = machine.next_notice() => {
                draw_notice(&notice)?;
                let RevealNotice::FetchFailed { error, .. } = notice;
                return Err(error.into());
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let snapshot = snapshots.borrow_and_update().clone();
                // The failure path lands in Idle before its notice is queued.
                if snapshot.phase == Phase::Idle {
                    continue;
                }
                draw(&snapshot)?;
                if snapshot.phase == Phase::PunchlineReveal {
                    return Ok(());
                }
            }
        }
    }
}

/// Reads commands from stdin until EOF, `q`, or cancellation.
async fn interactive(
    machine: &RevealStateMachine,
    mut snapshots: watch::Receiver<RevealSnapshot>,
    cancel: &CancellationToken,
) -> Result<(), PunchlineError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    draw(&machine.snapshot())?;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            Some(notice) = machine.next_notice() => draw_notice(&notice)?,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let snapshot = snapshots.borrow_and_update().clone();
                draw(&snapshot)?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::debug!("stdin closed");
                    return Ok(());
                };
                match line.trim() {
                    "q" | "quit" | "exit" => return Ok(()),
                    "" => press_enter(machine),
                    other => tracing::debug!(input = other, "ignoring input"),
                }
            }
        }
    }
}

/// Enter starts from idle and resets from the punchline. Mid-reveal it is
/// ignored so the timing stays intact.
fn press_enter(machine: &RevealStateMachine) {
    match machine.phase() {
        Phase::Idle => {
            if let Err(e) = machine.start() {
                tracing::warn!(error = %e, "start rejected");
            }
        }
        Phase::PunchlineReveal => machine.reset(),
        phase => tracing::debug!(%phase, "enter ignored mid-reveal"),
    }
}

fn draw(snapshot: &RevealSnapshot) -> Result<(), PunchlineError> {
    let mut out = std::io::stdout().lock();
    out.write_all(view::render(snapshot).as_bytes())?;
    out.flush()?;
    Ok(())
}

fn draw_notice(notice: &RevealNotice) -> Result<(), PunchlineError> {
    let mut out = std::io::stdout().lock();
    out.write_all(view::render_notice(notice).as_bytes())?;
    out.flush()?;
    Ok(())
}
