// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host collaborators: the credential store, the authorize entry point, and
//! the request transport. The scheduler only talks to the host through these
//! traits.

pub mod http;
pub mod store;
pub mod terminal;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::credential::{Credential, Token};

/// Payload of a completed authorization: the credential and the token it
/// was granted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub auth: Credential,
    pub token: Token,
}

/// An authorization request for the host to issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizeRequest {
    /// Form-encoded request body.
    pub body: String,
    /// Security scheme name.
    pub name: String,
    /// Token endpoint.
    pub url: String,
    pub auth: Credential,
}

/// Read access to the currently authorized credential.
pub trait CredentialSource: Send + Sync {
    fn authorized(&self) -> Option<Credential>;
}

/// The host's "perform authorization" entry point.
pub trait Authorizer: Send + Sync {
    fn authorize_oauth2(&self, payload: AuthPayload) -> anyhow::Result<()>;
}

/// Holder of the active [`Authorizer`].
///
/// `authorizer` returns `None` until the host has finished wiring its auth
/// actions.
pub trait AuthorizerSlot: Send + Sync {
    fn authorizer(&self) -> Option<Arc<dyn Authorizer>>;
    fn set_authorizer(&self, authorizer: Arc<dyn Authorizer>);
}

/// The host's "issue authorization request" capability.
pub trait AuthorizeRequester: Send + Sync {
    fn authorize_request(
        &self,
        request: AuthorizeRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;
}
