// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory credential store backing the standalone host.

use std::path::Path;

use parking_lot::RwLock;

use crate::credential::Credential;
use crate::host::{AuthPayload, Authorizer, CredentialSource};

/// Holds the single authorized credential.
#[derive(Default)]
pub struct CredentialStore {
    current: RwLock<Option<Credential>>,
}

impl CredentialStore {
    pub fn new(credential: Option<Credential>) -> Self {
        Self { current: RwLock::new(credential) }
    }

    /// Load a credential snapshot from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let credential: Credential = serde_json::from_str(&contents)?;
        Ok(Self::new(Some(credential)))
    }

    /// Forget the authorized credential.
    pub fn logout(&self) {
        *self.current.write() = None;
    }
}

impl CredentialSource for CredentialStore {
    fn authorized(&self) -> Option<Credential> {
        self.current.read().clone()
    }
}

impl Authorizer for CredentialStore {
    /// Store `auth` with its newly granted token.
    ///
    /// Refresh responses may omit the refresh token; the previous one is
    /// kept in that case.
    fn authorize_oauth2(&self, payload: AuthPayload) -> anyhow::Result<()> {
        let AuthPayload { mut auth, mut token } = payload;
        if token.refresh_token.is_none() {
            token.refresh_token = auth.token.as_ref().and_then(|t| t.refresh_token.clone());
        }
        auth.token = Some(token);
        *self.current.write() = Some(auth);
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
