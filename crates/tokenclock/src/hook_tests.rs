// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::sleep;

use super::*;
use crate::clock::ClockPhase;
use crate::event;
use crate::host::{AuthorizeRequest, AuthorizeRequester};
use crate::test_support::{credential, FakeHost, RecordingAuthorizer, RecordingSurface};

const POLICY: RetryPolicy = RetryPolicy { max_retries: 10, interval: Duration::from_secs(1) };

fn clock_for(
    host: &Arc<FakeHost>,
    event_tx: broadcast::Sender<ClockEvent>,
) -> (RefreshClock, RecordingSurface) {
    let surface = RecordingSurface::new();
    let clock = RefreshClock::new(
        host.clone(),
        host.clone(),
        Box::new(surface.clone()),
        Duration::from_millis(500),
        event_tx,
    );
    (clock, surface)
}

fn payload(expires_in: Option<u64>, refresh_token: Option<&str>) -> AuthPayload {
    let auth = credential(expires_in, refresh_token);
    let token = auth.token.clone().unwrap_or_default();
    AuthPayload { auth, token }
}

fn drain(rx: &mut broadcast::Receiver<ClockEvent>) -> Vec<ClockEvent> {
    let mut out = Vec::new();
    while let Ok(e) = rx.try_recv() {
        out.push(e);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn wrapper_forwards_and_schedules() -> anyhow::Result<()> {
    let host = FakeHost::new();
    host.set_credential(Some(credential(Some(3600), Some("rt"))));
    let (tx, _rx) = event::channel();
    let (clock, surface) = clock_for(&host, tx);
    let original = RecordingAuthorizer::new();
    let hook = RefreshHook::new(original.clone(), clock.clone());

    let p = payload(Some(3600), Some("rt"));
    hook.authorize_oauth2(p.clone())?;

    assert_eq!(original.payloads(), vec![p]);
    assert_eq!(clock.phase(), ClockPhase::Running);
    assert!(surface.log().present);
    Ok(())
}

#[yare::parameterized(
    no_lifetime      = { None, Some("rt") },
    zero_lifetime    = { Some(0), Some("rt") },
    no_refresh_token = { Some(3600), None },
)]
fn non_refreshable_token_never_starts_clock(expires_in: Option<u64>, refresh_token: Option<&str>) {
    let host = FakeHost::new();
    host.set_credential(Some(credential(expires_in, refresh_token)));
    let (tx, _rx) = event::channel();
    let (clock, surface) = clock_for(&host, tx);
    let original = RecordingAuthorizer::new();
    let hook = RefreshHook::new(original.clone(), clock.clone());

    let result = hook.authorize_oauth2(payload(expires_in, refresh_token));

    assert!(result.is_ok());
    assert_eq!(original.payloads().len(), 1);
    assert_eq!(clock.phase(), ClockPhase::Idle);
    assert_eq!(surface.log().creates, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_authorization_does_not_schedule() {
    let host = FakeHost::new();
    let (tx, _rx) = event::channel();
    let (clock, _surface) = clock_for(&host, tx);
    let hook = RefreshHook::new(RecordingAuthorizer::failing(), clock.clone());

    let result = hook.authorize_oauth2(payload(Some(3600), Some("rt")));

    assert!(result.is_err());
    assert_eq!(clock.phase(), ClockPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn installs_on_first_attempt() -> anyhow::Result<()> {
    let host = FakeHost::new();
    let (tx, mut rx) = event::channel();
    let (clock, _surface) = clock_for(&host, tx.clone());
    let original = RecordingAuthorizer::new();
    host.provide_authorizer(original.clone(), 0);

    let hook = HookInstaller::new(host.clone(), clock.clone(), POLICY, tx)
        .install(CancellationToken::new())
        .await;
    assert!(hook.is_some());

    // The slot now routes through the hook, which forwards to the original.
    let active = host.authorizer().ok_or_else(|| anyhow::anyhow!("no active authorizer"))?;
    active.authorize_oauth2(payload(Some(60), Some("rt")))?;
    assert_eq!(original.payloads().len(), 1);
    assert_eq!(clock.phase(), ClockPhase::Running);

    assert_eq!(drain(&mut rx)[0], ClockEvent::HookInstalled { attempts: 1 });
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn retries_until_entry_point_appears() {
    let host = FakeHost::new();
    let (tx, mut rx) = event::channel();
    let (clock, _surface) = clock_for(&host, tx.clone());
    host.provide_authorizer(RecordingAuthorizer::new(), 3);

    let started = tokio::time::Instant::now();
    let hook = HookInstaller::new(host.clone(), clock, POLICY, tx)
        .install(CancellationToken::new())
        .await;

    assert!(hook.is_some());
    assert_eq!(started.elapsed(), Duration::from_secs(3));
    assert_eq!(drain(&mut rx), vec![ClockEvent::HookInstalled { attempts: 4 }]);
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_bounded_attempts() {
    let host = FakeHost::new();
    let (tx, mut rx) = event::channel();
    let (clock, _surface) = clock_for(&host, tx.clone());

    let hook = HookInstaller::new(host.clone(), clock, POLICY, tx)
        .install(CancellationToken::new())
        .await;
    assert!(hook.is_none());
    assert_eq!(host.lookups(), 11);

    // Becoming available later does not trigger another installation.
    host.provide_authorizer(RecordingAuthorizer::new(), 0);
    sleep(Duration::from_secs(60)).await;
    assert_eq!(host.lookups(), 11);

    assert_eq!(drain(&mut rx), vec![ClockEvent::InstallFailed { attempts: 11 }]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_retrying_silently() {
    let host = FakeHost::new();
    let (tx, mut rx) = event::channel();
    let (clock, _surface) = clock_for(&host, tx.clone());
    let shutdown = CancellationToken::new();

    let installer = HookInstaller::new(host.clone(), clock, POLICY, tx);
    let task = tokio::spawn(installer.install(shutdown.clone()));
    sleep(Duration::from_millis(2_500)).await;
    shutdown.cancel();

    assert!(matches!(task.await, Ok(None)));
    assert_eq!(host.lookups(), 3);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn seeds_from_existing_authorization() {
    let host = FakeHost::new();
    let (tx, _rx) = event::channel();
    let (clock, _surface) = clock_for(&host, tx);
    let original = RecordingAuthorizer::new();
    host.provide_authorizer(original.clone(), 0);

    assert!(!seed_from_existing(&clock, host.as_ref()));
    assert_eq!(clock.phase(), ClockPhase::Idle);

    host.set_credential(Some(credential(Some(3600), Some("rt"))));
    assert!(seed_from_existing(&clock, host.as_ref()));
    assert_eq!(clock.phase(), ClockPhase::Running);
    // Seeding observes the token without re-dispatching the authorization.
    assert!(original.payloads().is_empty());
}

#[tokio::test(start_paused = true)]
async fn oversized_lifetime_is_clamped() -> anyhow::Result<()> {
    let host = FakeHost::new();
    let (tx, _rx) = event::channel();
    let (clock, surface) = clock_for(&host, tx);
    let original = RecordingAuthorizer::new();
    let hook = RefreshHook::new(original.clone(), clock.clone());

    let auth: crate::credential::Credential = serde_json::from_value(serde_json::json!({
        "schema": { "tokenUrl": "https://auth.example.com/token" },
        "name": "OAuth2",
        "clientId": "client-1",
        "clientSecret": "secret-1",
        "token": {
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 18446744073709551615u64,
        },
    }))?;
    host.set_credential(Some(auth.clone()));
    let token = auth.token.clone().unwrap_or_default();

    hook.authorize_oauth2(AuthPayload { auth, token })?;

    assert_eq!(original.payloads().len(), 1);
    assert_eq!(clock.phase(), ClockPhase::Running);
    let deadlines = clock.deadlines().ok_or_else(|| anyhow::anyhow!("no deadlines"))?;
    assert!(deadlines.refresh_at < deadlines.expires_at);
    assert!(surface.log().present);
    Ok(())
}

/// Requester that answers every refresh by dispatching a fresh token
/// through the host's active authorizer.
struct LoopbackRequester {
    host: Arc<FakeHost>,
    issued: parking_lot::Mutex<u32>,
}

impl AuthorizeRequester for LoopbackRequester {
    fn authorize_request(
        &self,
        request: AuthorizeRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            let n = {
                let mut issued = self.issued.lock();
                *issued += 1;
                *issued
            };
            let authorizer =
                self.host.authorizer().ok_or_else(|| anyhow::anyhow!("no authorizer"))?;
            let token = Token {
                access_token: Some(format!("access-{n}")),
                refresh_token: Some(format!("refresh-{n}")),
                expires_in: Some(4),
                ..Token::default()
            };
            authorizer.authorize_oauth2(AuthPayload { auth: request.auth, token })
        })
    }
}

#[tokio::test(start_paused = true)]
async fn refresh_reenters_hook_and_reschedules() -> anyhow::Result<()> {
    let host = FakeHost::new();
    host.set_credential(Some(credential(Some(4), Some("rt"))));
    let requester = Arc::new(LoopbackRequester {
        host: host.clone(),
        issued: parking_lot::Mutex::new(0),
    });
    let (tx, mut rx) = event::channel();
    let clock = RefreshClock::new(
        host.clone(),
        requester.clone(),
        Box::new(RecordingSurface::new()),
        Duration::from_millis(500),
        tx.clone(),
    );
    let original = RecordingAuthorizer::new();
    host.provide_authorizer(original.clone(), 0);

    HookInstaller::new(host.clone(), clock.clone(), POLICY, tx)
        .install(CancellationToken::new())
        .await
        .ok_or_else(|| anyhow::anyhow!("hook not installed"))?;
    assert!(seed_from_existing(&clock, host.as_ref()));

    // Lifetime 4s: each generation fires on the first tick past 3s.
    sleep(Duration::from_millis(7_750)).await;

    assert_eq!(*requester.issued.lock(), 2);
    assert_eq!(original.payloads().len(), 2);
    assert_eq!(clock.phase(), ClockPhase::Running);
    let scheduled = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, ClockEvent::Scheduled { .. }))
        .count();
    assert_eq!(scheduled, 3);
    Ok(())
}
