// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Standalone host: issues authorization requests over HTTP and dispatches
//! the granted token through the active authorizer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use crate::credential::{Credential, Token};
use crate::host::store::CredentialStore;
use crate::host::{
    AuthPayload, AuthorizeRequest, AuthorizeRequester, Authorizer, AuthorizerSlot,
    CredentialSource,
};

pub struct HttpHost {
    store: Arc<CredentialStore>,
    active: RwLock<Option<Arc<dyn Authorizer>>>,
    http: reqwest::Client,
}

impl HttpHost {
    /// Create a host whose initial authorizer writes into `store`.
    pub fn new(store: Arc<CredentialStore>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build token HTTP client: {e}"))?;
        let original: Arc<dyn Authorizer> = Arc::clone(&store) as Arc<dyn Authorizer>;
        Ok(Self { store, active: RwLock::new(Some(original)), http })
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    async fn request_token(&self, url: &str, body: String) -> anyhow::Result<Token> {
        let resp = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("token request failed ({status}): {text}");
        }

        let token: Token = resp.json().await?;
        Ok(token)
    }
}

impl CredentialSource for HttpHost {
    fn authorized(&self) -> Option<Credential> {
        self.store.authorized()
    }
}

impl AuthorizerSlot for HttpHost {
    fn authorizer(&self) -> Option<Arc<dyn Authorizer>> {
        self.active.read().clone()
    }

    fn set_authorizer(&self, authorizer: Arc<dyn Authorizer>) {
        *self.active.write() = Some(authorizer);
    }
}

impl AuthorizeRequester for HttpHost {
    fn authorize_request(
        &self,
        request: AuthorizeRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            let AuthorizeRequest { body, name, url, auth } = request;
            let token = self.request_token(&url, body).await?;
            tracing::debug!(name = %name, "token granted");

            let authorizer = self
                .authorizer()
                .ok_or_else(|| anyhow::anyhow!("no authorizer installed for {name}"))?;
            authorizer.authorize_oauth2(AuthPayload { auth, token })
        })
    }
}
