// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Refresh clock: derives deadlines from a token lifetime, drives the
//! countdown, and fires one refresh per token generation.
//!
//! Each call to [`RefreshClock::start`] begins a new generation and fully
//! supersedes the previous one. Ticks check their generation under the run
//! lock, so a tick from an older generation can never touch the display or
//! trigger a refresh once `start` has returned.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::display::{rounded_secs, CountdownDisplay, DisplaySurface, Remaining};
use crate::error::ErrorCode;
use crate::event::{emit, ClockEvent};
use crate::grant::{build_refresh_request, invoke_refresh};
use crate::host::{AuthorizeRequester, CredentialSource};

/// Share of the token lifetime after which a refresh is attempted, in
/// thousandths.
pub const REFRESH_PER_MILLE: u64 = 750;

/// Longest token lifetime the clock schedules; longer lifetimes are clamped.
pub const MAX_LIFETIME_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Absolute refresh and expiry deadlines for one token generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    pub refresh_at: Instant,
    pub expires_at: Instant,
}

impl Deadlines {
    /// Deadlines for a token granted at `now` with the given lifetime,
    /// clamped to [`MAX_LIFETIME_SECS`].
    pub fn from_lifetime(now: Instant, expires_in_secs: u64) -> Self {
        let lifetime = expires_in_secs.min(MAX_LIFETIME_SECS);
        let expires_at = now.checked_add(Duration::from_secs(lifetime)).unwrap_or(now);
        let refresh_at = now
            .checked_add(Duration::from_millis(lifetime * REFRESH_PER_MILLE))
            .unwrap_or(expires_at);
        Self { refresh_at, expires_at }
    }

    /// Time left until each deadline, floored at zero.
    pub fn remaining(&self, now: Instant) -> Remaining {
        Remaining {
            refresh: self.refresh_at.saturating_duration_since(now),
            expiry: self.expires_at.saturating_duration_since(now),
        }
    }

    /// Whether the refresh deadline is strictly in the past.
    pub fn refresh_due(&self, now: Instant) -> bool {
        now > self.refresh_at
    }
}

/// Clock state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockPhase {
    /// No active run.
    Idle,
    /// Ticking, refresh not yet triggered.
    Running,
    /// Tick loop stopped, refresh handed to the host.
    Fired,
}

enum TickOutcome {
    Continue,
    Fire,
    Stale,
}

struct ClockRun {
    generation: u64,
    phase: ClockPhase,
    deadlines: Option<Deadlines>,
    cancel: CancellationToken,
    display: CountdownDisplay,
}

struct ClockInner {
    run: Mutex<ClockRun>,
    source: Arc<dyn CredentialSource>,
    requester: Arc<dyn AuthorizeRequester>,
    tick_interval: Duration,
    event_tx: broadcast::Sender<ClockEvent>,
    tick_loops: AtomicUsize,
}

/// Handle to the refresh clock. Clones share one clock.
#[derive(Clone)]
pub struct RefreshClock {
    inner: Arc<ClockInner>,
}

impl RefreshClock {
    pub fn new(
        source: Arc<dyn CredentialSource>,
        requester: Arc<dyn AuthorizeRequester>,
        surface: Box<dyn DisplaySurface>,
        tick_interval: Duration,
        event_tx: broadcast::Sender<ClockEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(ClockInner {
                run: Mutex::new(ClockRun {
                    generation: 0,
                    phase: ClockPhase::Idle,
                    deadlines: None,
                    cancel: CancellationToken::new(),
                    display: CountdownDisplay::new(surface),
                }),
                source,
                requester,
                tick_interval,
                event_tx,
                tick_loops: AtomicUsize::new(0),
            }),
        }
    }

    /// Start a new run, superseding any previous one.
    ///
    /// Ticks once immediately, then every tick interval on the current tokio
    /// runtime.
    pub fn start(&self, deadlines: Deadlines) {
        let now = Instant::now();
        let (generation, cancel) = {
            let mut run = self.inner.run.lock();
            run.cancel.cancel();
            run.cancel = CancellationToken::new();
            run.generation += 1;
            run.phase = ClockPhase::Running;
            run.deadlines = Some(deadlines);
            (run.generation, run.cancel.clone())
        };

        let remaining = deadlines.remaining(now);
        tracing::debug!(
            generation,
            refresh_in_secs = rounded_secs(remaining.refresh),
            expires_in_secs = rounded_secs(remaining.expiry),
            "clock run started"
        );
        emit(
            &self.inner.event_tx,
            ClockEvent::Scheduled {
                refresh_in_secs: rounded_secs(remaining.refresh),
                expires_in_secs: rounded_secs(remaining.expiry),
            },
        );

        let outcome = self.inner.tick(generation, now);
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime, refresh clock will not advance");
            return;
        };
        let inner = Arc::clone(&self.inner);
        match outcome {
            TickOutcome::Continue => {
                handle.spawn(async move { inner.run_ticks(generation, cancel).await });
            }
            TickOutcome::Fire => {
                handle.spawn(async move { inner.refresh().await });
            }
            TickOutcome::Stale => {}
        }
    }

    /// Cancel the active run and remove the countdown.
    pub fn stop(&self) {
        let mut run = self.inner.run.lock();
        run.cancel.cancel();
        run.generation += 1;
        run.phase = ClockPhase::Idle;
        run.deadlines = None;
        run.display.remove();
    }

    pub fn phase(&self) -> ClockPhase {
        self.inner.run.lock().phase
    }

    pub fn deadlines(&self) -> Option<Deadlines> {
        self.inner.run.lock().deadlines
    }

    /// Text currently shown in the countdown slot.
    pub fn display_text(&self) -> Option<String> {
        self.inner.run.lock().display.text().map(str::to_owned)
    }

    /// Number of periodic tick loops still alive.
    pub fn tick_loops(&self) -> usize {
        self.inner.tick_loops.load(Ordering::SeqCst)
    }
}

/// Decrements the live tick-loop count when a loop exits.
struct LoopGuard<'a>(&'a AtomicUsize);

impl<'a> LoopGuard<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ClockInner {
    async fn run_ticks(&self, generation: u64, cancel: CancellationToken) {
        let guard = LoopGuard::enter(&self.tick_loops);
        let mut interval =
            tokio::time::interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            match self.tick(generation, Instant::now()) {
                TickOutcome::Continue => {}
                TickOutcome::Stale => break,
                TickOutcome::Fire => {
                    drop(guard);
                    self.refresh().await;
                    return;
                }
            }
        }
    }

    fn tick(&self, generation: u64, now: Instant) -> TickOutcome {
        let authorized = self.source.authorized().is_some();

        let mut run = self.run.lock();
        if run.generation != generation || run.phase != ClockPhase::Running {
            return TickOutcome::Stale;
        }
        let Some(deadlines) = run.deadlines else {
            return TickOutcome::Stale;
        };

        run.display.update(deadlines.remaining(now), authorized);

        if deadlines.refresh_due(now) {
            run.phase = ClockPhase::Fired;
            run.cancel.cancel();
            return TickOutcome::Fire;
        }
        TickOutcome::Continue
    }

    async fn refresh(&self) {
        emit(&self.event_tx, ClockEvent::RefreshTriggered);

        let Some(credential) = self.source.authorized() else {
            tracing::info!("not authorized, can't refresh token");
            self.aborted(ErrorCode::NotAuthorized, "no authorized credential".to_owned());
            return;
        };

        let request = match build_refresh_request(&credential) {
            Ok(request) => request,
            Err(report) => {
                tracing::warn!(
                    defects = report.defects.len(),
                    "can't refresh token due to the following issues"
                );
                for defect in &report.defects {
                    tracing::warn!("{defect}");
                }
                self.aborted(ErrorCode::InvalidCredential, report.to_string());
                return;
            }
        };

        tracing::info!(name = %request.name, "refreshing token");
        if let Err(e) = invoke_refresh(self.requester.as_ref(), request).await {
            tracing::warn!(err = %e, "token refresh failed");
            self.aborted(ErrorCode::RequestFailed, format!("{e:#}"));
        }
    }

    fn aborted(&self, code: ErrorCode, message: String) {
        emit(&self.event_tx, ClockEvent::RefreshAborted { code, message });
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
