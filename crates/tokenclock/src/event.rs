// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events published by the refresh clock and hook installer.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::ErrorCode;

/// Capacity of the lifecycle event channel.
pub const EVENT_CAPACITY: usize = 64;

/// Events emitted while scheduling and driving token refreshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClockEvent {
    /// A refreshable token was observed and a new clock run started.
    Scheduled { refresh_in_secs: u64, expires_in_secs: u64 },
    /// The refresh deadline passed and the refresh path was entered.
    RefreshTriggered,
    /// A refresh attempt ended without issuing (or completing) the request.
    RefreshAborted { code: ErrorCode, message: String },
    /// The authorize entry point was wrapped.
    HookInstalled { attempts: u32 },
    /// The authorize entry point never appeared; no further attempts follow.
    InstallFailed { attempts: u32 },
}

/// Create the lifecycle event channel.
pub fn channel() -> (broadcast::Sender<ClockEvent>, broadcast::Receiver<ClockEvent>) {
    broadcast::channel(EVENT_CAPACITY)
}

/// Publish an event, ignoring the absence of subscribers.
pub(crate) fn emit(tx: &broadcast::Sender<ClockEvent>, event: ClockEvent) {
    let _ = tx.send(event);
}
