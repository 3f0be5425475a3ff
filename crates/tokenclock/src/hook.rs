// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook installation: wraps the host's authorize entry point so every
//! successful authorization reschedules the refresh clock.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::clock::{Deadlines, RefreshClock};
use crate::credential::Token;
use crate::error::ErrorCode;
use crate::event::{emit, ClockEvent};
use crate::host::{AuthPayload, Authorizer, AuthorizerSlot, CredentialSource};

/// Fixed-interval retry budget for locating the authorize entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Authorizer wrapper installed in place of the host's original.
pub struct RefreshHook {
    original: Arc<dyn Authorizer>,
    clock: RefreshClock,
}

impl RefreshHook {
    pub fn new(original: Arc<dyn Authorizer>, clock: RefreshClock) -> Self {
        Self { original, clock }
    }

    /// Start a new clock run if `token` expires and can be refreshed.
    /// Returns whether a run was started.
    pub fn observe_token(&self, token: &Token) -> bool {
        schedule_refresh(&self.clock, token)
    }
}

/// Start a new run of `clock` if `token` expires and can be refreshed.
pub fn schedule_refresh(clock: &RefreshClock, token: &Token) -> bool {
    let Some(lifetime) = token.refreshable_lifetime() else {
        tracing::debug!("token is not refreshable, no refresh scheduled");
        return false;
    };

    let now = Instant::now();
    let deadlines = Deadlines::from_lifetime(now, lifetime);
    let refresh_in = deadlines.refresh_at - now;
    let expires_in = deadlines.expires_at - now;
    tracing::info!(
        "refreshable token detected, scheduling token refresh in {:.1}min (expires in {:.1}min)",
        refresh_in.as_secs_f64() / 60.0,
        expires_in.as_secs_f64() / 60.0,
    );
    clock.start(deadlines);
    true
}

impl Authorizer for RefreshHook {
    fn authorize_oauth2(&self, payload: AuthPayload) -> anyhow::Result<()> {
        let token = payload.token.clone();
        self.original.authorize_oauth2(payload)?;
        self.observe_token(&token);
        Ok(())
    }
}

/// One-shot installer for [`RefreshHook`].
///
/// `install` consumes the installer, so the hook is installed at most once.
pub struct HookInstaller {
    slot: Arc<dyn AuthorizerSlot>,
    clock: RefreshClock,
    policy: RetryPolicy,
    event_tx: broadcast::Sender<ClockEvent>,
}

impl HookInstaller {
    pub fn new(
        slot: Arc<dyn AuthorizerSlot>,
        clock: RefreshClock,
        policy: RetryPolicy,
        event_tx: broadcast::Sender<ClockEvent>,
    ) -> Self {
        Self { slot, clock, policy, event_tx }
    }

    /// Locate the authorize entry point and replace it with the hook.
    ///
    /// Returns `None` once the retry budget is exhausted or on shutdown.
    pub async fn install(self, shutdown: CancellationToken) -> Option<Arc<RefreshHook>> {
        let max_attempts = self.policy.max_attempts();
        for attempt in 1..=max_attempts {
            if let Some(original) = self.slot.authorizer() {
                tracing::info!(attempt, "installing token refresh hook");
                let hook = Arc::new(RefreshHook::new(original, self.clock.clone()));
                self.slot.set_authorizer(Arc::clone(&hook) as Arc<dyn Authorizer>);
                emit(&self.event_tx, ClockEvent::HookInstalled { attempts: attempt });
                return Some(hook);
            }

            if attempt == max_attempts {
                break;
            }
            tracing::info!(
                attempt,
                retry_in_ms = self.policy.interval.as_millis() as u64,
                "authorize entry point missing, retrying"
            );
            tokio::select! {
                _ = shutdown.cancelled() => return None,
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
        }

        tracing::error!(
            attempts = max_attempts,
            code = %ErrorCode::InstallExhausted,
            "cannot install token refresh hook: authorize entry point never appeared"
        );
        emit(&self.event_tx, ClockEvent::InstallFailed { attempts: max_attempts });
        None
    }
}

/// Schedule from an already-authorized credential, as if its token had just
/// been granted. Does not depend on the hook being installed.
pub fn seed_from_existing(clock: &RefreshClock, source: &dyn CredentialSource) -> bool {
    let Some(token) = source.authorized().and_then(|c| c.token) else {
        tracing::debug!("no existing authorization to seed from");
        return false;
    };
    schedule_refresh(clock, &token)
}

#[cfg(test)]
#[path = "hook_tests.rs"]
mod tests;
