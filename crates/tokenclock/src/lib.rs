// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tokenclock: refresh scheduling and countdown for an externally owned
//! OAuth2 credential.

pub mod clock;
pub mod config;
pub mod credential;
pub mod display;
pub mod error;
pub mod event;
pub mod form;
pub mod grant;
pub mod hook;
pub mod host;
pub mod test_support;

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clock::RefreshClock;
use crate::config::{Cli, ClockConfig};
use crate::display::DisplaySurface;
use crate::event::ClockEvent;
use crate::hook::{seed_from_existing, HookInstaller, RefreshHook};
use crate::host::http::HttpHost;
use crate::host::store::CredentialStore;
use crate::host::terminal::{HiddenDisplay, TerminalDisplay};
use crate::host::{AuthorizeRequester, AuthorizerSlot, CredentialSource};

/// The host capabilities the scheduler attaches to.
pub struct Collaborators {
    pub source: Arc<dyn CredentialSource>,
    pub slot: Arc<dyn AuthorizerSlot>,
    pub requester: Arc<dyn AuthorizeRequester>,
    pub surface: Box<dyn DisplaySurface>,
}

/// A scheduler attached to a host.
pub struct Attachment {
    pub clock: RefreshClock,
    pub events: broadcast::Receiver<ClockEvent>,
    /// Resolves to the installed hook, or `None` if installation gave up.
    pub installer: JoinHandle<Option<Arc<RefreshHook>>>,
    /// Resolves to whether an existing authorization was scheduled.
    pub seeder: JoinHandle<bool>,
}

/// Attach the refresh scheduler to a host.
///
/// Spawns the hook installer and, independently, a seeder that waits the
/// initial delay and schedules from any credential the host already holds.
/// Must be called within a tokio runtime.
pub fn attach(config: &ClockConfig, host: Collaborators, shutdown: CancellationToken) -> Attachment {
    let (event_tx, events) = event::channel();
    let clock = RefreshClock::new(
        Arc::clone(&host.source),
        host.requester,
        host.surface,
        config.tick_interval(),
        event_tx.clone(),
    );
    let installer = HookInstaller::new(host.slot, clock.clone(), config.retry_policy(), event_tx);
    let installer = tokio::spawn(installer.install(shutdown.clone()));

    let initial_delay = config.initial_delay();
    let source = host.source;
    let seed_clock = clock.clone();
    let seeder = tokio::spawn(async move {
        tokio::select! {
            _ = shutdown.cancelled() => return false,
            _ = tokio::time::sleep(initial_delay) => {}
        }
        seed_from_existing(&seed_clock, source.as_ref())
    });

    Attachment { clock, events, installer, seeder }
}

/// Run the standalone refresher until Ctrl-C.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let store = CredentialStore::load(&cli.credential).map_err(|e| {
        anyhow::anyhow!("failed to load credential {}: {e:#}", cli.credential.display())
    })?;
    let host = Arc::new(HttpHost::new(Arc::new(store), cli.clock.request_timeout())?);
    let surface: Box<dyn DisplaySurface> =
        if cli.clock.no_countdown { Box::new(HiddenDisplay) } else { Box::new(TerminalDisplay) };

    let shutdown = CancellationToken::new();
    let mut attachment = attach(
        &cli.clock,
        Collaborators {
            source: host.clone(),
            slot: host.clone(),
            requester: host.clone(),
            surface,
        },
        shutdown.clone(),
    );
    tracing::info!(credential = %cli.credential.display(), "tokenclock started");

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break Ok(());
            }
            event = attachment.events.recv() => match event {
                Ok(ClockEvent::InstallFailed { attempts }) => {
                    break Err(anyhow::anyhow!(
                        "refresh hook not installed after {attempts} attempts"
                    ));
                }
                Ok(event) => tracing::debug!(?event, "clock event"),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break Ok(()),
            },
        }
    };

    shutdown.cancel();
    attachment.clock.stop();
    result
}
