// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory host fakes shared by unit and integration tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::credential::{Credential, Schema, Token};
use crate::display::DisplaySurface;
use crate::host::{
    AuthPayload, AuthorizeRequest, AuthorizeRequester, Authorizer, AuthorizerSlot,
    CredentialSource,
};

/// A credential that passes validation.
pub fn credential(expires_in: Option<u64>, refresh_token: Option<&str>) -> Credential {
    Credential {
        schema: Some(Schema {
            token_url: Some("https://auth.example.com/token".to_owned()),
            ..Schema::default()
        }),
        name: Some("OAuth2".to_owned()),
        client_id: Some("client-1".to_owned()),
        client_secret: Some("secret-1".to_owned()),
        token: Some(Token {
            access_token: Some("access-1".to_owned()),
            refresh_token: refresh_token.map(str::to_owned),
            expires_in,
            token_type: Some("Bearer".to_owned()),
            ..Token::default()
        }),
        ..Credential::default()
    }
}

/// Host fake: credential store, authorizer slot, and request recorder.
#[derive(Default)]
pub struct FakeHost {
    current: Mutex<Option<Credential>>,
    active: Mutex<Option<Arc<dyn Authorizer>>>,
    /// Authorizer lookups remaining before the slot reports one.
    hidden_lookups: AtomicU32,
    lookups: AtomicU32,
    requests: Mutex<Vec<AuthorizeRequest>>,
    fail_requests: AtomicBool,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_credential(&self, credential: Option<Credential>) {
        *self.current.lock() = credential;
    }

    /// Expose `authorizer` through the slot after `hidden` failed lookups.
    pub fn provide_authorizer(&self, authorizer: Arc<dyn Authorizer>, hidden: u32) {
        *self.active.lock() = Some(authorizer);
        self.hidden_lookups.store(hidden, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<AuthorizeRequest> {
        self.requests.lock().clone()
    }

    pub fn fail_requests(&self, fail: bool) {
        self.fail_requests.store(fail, Ordering::SeqCst);
    }
}

impl CredentialSource for FakeHost {
    fn authorized(&self) -> Option<Credential> {
        self.current.lock().clone()
    }
}

impl AuthorizerSlot for FakeHost {
    fn authorizer(&self) -> Option<Arc<dyn Authorizer>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let hidden = self.hidden_lookups.load(Ordering::SeqCst);
        if hidden > 0 {
            self.hidden_lookups.store(hidden - 1, Ordering::SeqCst);
            return None;
        }
        self.active.lock().clone()
    }

    fn set_authorizer(&self, authorizer: Arc<dyn Authorizer>) {
        *self.active.lock() = Some(authorizer);
    }
}

impl AuthorizeRequester for FakeHost {
    fn authorize_request(
        &self,
        request: AuthorizeRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.requests.lock().push(request);
            if self.fail_requests.load(Ordering::SeqCst) {
                anyhow::bail!("token endpoint unavailable");
            }
            Ok(())
        })
    }
}

/// Authorizer fake that records every payload it receives.
#[derive(Default)]
pub struct RecordingAuthorizer {
    payloads: Mutex<Vec<AuthPayload>>,
    fail: AtomicBool,
}

impl RecordingAuthorizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let authorizer = Self::default();
        authorizer.fail.store(true, Ordering::SeqCst);
        Arc::new(authorizer)
    }

    pub fn payloads(&self) -> Vec<AuthPayload> {
        self.payloads.lock().clone()
    }
}

impl Authorizer for RecordingAuthorizer {
    fn authorize_oauth2(&self, payload: AuthPayload) -> anyhow::Result<()> {
        self.payloads.lock().push(payload);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("authorization rejected");
        }
        Ok(())
    }
}

/// Operations observed by a [`RecordingSurface`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SurfaceLog {
    pub creates: u32,
    pub removes: u32,
    pub renders: Vec<String>,
    pub present: bool,
}

impl SurfaceLog {
    pub fn last_render(&self) -> Option<&str> {
        self.renders.last().map(String::as_str)
    }
}

/// Display surface fake. Clones share one log.
#[derive(Clone)]
pub struct RecordingSurface {
    log: Arc<Mutex<SurfaceLog>>,
    anchor: Arc<AtomicBool>,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self { log: Arc::default(), anchor: Arc::new(AtomicBool::new(true)) }
    }
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle whether the authorize control exists.
    pub fn set_anchor(&self, present: bool) {
        self.anchor.store(present, Ordering::SeqCst);
    }

    pub fn log(&self) -> SurfaceLog {
        self.log.lock().clone()
    }
}

impl DisplaySurface for RecordingSurface {
    fn create_slot(&self, _id: &str) -> bool {
        if !self.anchor.load(Ordering::SeqCst) {
            return false;
        }
        let mut log = self.log.lock();
        log.creates += 1;
        log.present = true;
        true
    }

    fn render(&self, _id: &str, text: &str) {
        self.log.lock().renders.push(text.to_owned());
    }

    fn remove_slot(&self, _id: &str) {
        let mut log = self.log.lock();
        log.removes += 1;
        log.present = false;
    }
}
