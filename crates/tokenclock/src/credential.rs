// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential snapshot types and refresh-readiness validation.
//!
//! The host's auth store owns the credential; this crate only reads
//! snapshots of it. Field names follow the host's JSON shape so snapshots
//! round-trip through the host unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Snapshot of the host's authorized OAuth2 state for one security scheme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    /// Security scheme name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Token>,
    /// Host fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The security scheme definition attached to a credential.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Standard OAuth2 token response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Token {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Token {
    /// Lifetime in seconds if the token both expires and can be refreshed.
    pub fn refreshable_lifetime(&self) -> Option<u64> {
        let lifetime = self.expires_in.filter(|&s| s > 0)?;
        self.refresh_token.as_deref().filter(|rt| !rt.is_empty())?;
        Some(lifetime)
    }
}

/// A required field missing from a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Defect {
    MissingSchema,
    MissingTokenUrl,
    MissingName,
    MissingClientId,
    MissingClientSecret,
    MissingToken,
    MissingRefreshToken,
}

impl Defect {
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingSchema => "Invalid auth: missing schema",
            Self::MissingTokenUrl => "Invalid auth schema: missing tokenUrl",
            Self::MissingName => "Invalid auth: missing name",
            Self::MissingClientId => "Invalid auth: missing clientId",
            Self::MissingClientSecret => "Invalid auth: missing clientSecret",
            Self::MissingToken => "Invalid auth: missing token",
            Self::MissingRefreshToken => "Invalid auth: missing refresh token",
        }
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Ordered list of credential defects. Empty means the credential can be
/// used for a refresh grant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub defects: Vec<Defect>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.defects.is_empty()
    }

    pub fn contains(&self, defect: Defect) -> bool {
        self.defects.contains(&defect)
    }

    pub fn messages(&self) -> Vec<&'static str> {
        self.defects.iter().map(Defect::message).collect()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("; "))
    }
}

impl std::error::Error for ValidationReport {}

/// Check a credential for everything a refresh grant needs.
///
/// Every check runs independently; a missing parent reports the parent and
/// its required child. An absent credential reports every defect.
pub fn validate(credential: Option<&Credential>) -> ValidationReport {
    let schema = credential.and_then(|c| c.schema.as_ref());
    let token = credential.and_then(|c| c.token.as_ref());

    let checks = [
        (schema.is_none(), Defect::MissingSchema),
        (schema.and_then(|s| s.token_url.as_ref()).is_none(), Defect::MissingTokenUrl),
        (credential.and_then(|c| c.name.as_ref()).is_none(), Defect::MissingName),
        (credential.and_then(|c| c.client_id.as_ref()).is_none(), Defect::MissingClientId),
        (credential.and_then(|c| c.client_secret.as_ref()).is_none(), Defect::MissingClientSecret),
        (token.is_none(), Defect::MissingToken),
        (token.and_then(|t| t.refresh_token.as_ref()).is_none(), Defect::MissingRefreshToken),
    ];

    ValidationReport {
        defects: checks.into_iter().filter(|(missing, _)| *missing).map(|(_, d)| d).collect(),
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
