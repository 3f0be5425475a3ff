// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes reported on the event channel.
///
/// None of these are fatal to the scheduler: each one ends a single refresh
/// attempt or the hook installation, and the rest of the host keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No authorized credential at refresh time.
    NotAuthorized,
    /// The credential is missing fields required for the refresh grant.
    InvalidCredential,
    /// The host's authorization request failed.
    RequestFailed,
    /// The authorize entry point never appeared within the retry budget.
    InstallExhausted,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAuthorized => "NOT_AUTHORIZED",
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::RequestFailed => "REQUEST_FAILED",
            Self::InstallExhausted => "INSTALL_EXHAUSTED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
