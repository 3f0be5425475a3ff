// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Refresh-token grant construction and invocation.

use crate::credential::{validate, Credential, ValidationReport};
use crate::form::{encode_form, FormFields, FormValue};
use crate::host::{AuthorizeRequest, AuthorizeRequester};

/// Build the refresh-token grant request for a credential.
///
/// Fails with the full defect list if the credential cannot be refreshed.
pub fn build_refresh_request(credential: &Credential) -> Result<AuthorizeRequest, ValidationReport> {
    let report = validate(Some(credential));
    if !report.is_ok() {
        return Err(report);
    }
    let (Some(schema), Some(name), Some(client_id), Some(client_secret), Some(token)) = (
        credential.schema.as_ref(),
        credential.name.as_ref(),
        credential.client_id.as_ref(),
        credential.client_secret.as_ref(),
        credential.token.as_ref(),
    ) else {
        return Err(report);
    };
    let (Some(url), Some(refresh_token)) = (schema.token_url.as_ref(), token.refresh_token.as_ref())
    else {
        return Err(report);
    };

    let form: FormFields<'_> = [
        ("grant_type", Some(FormValue::from("refresh_token"))),
        ("refresh_token", Some(FormValue::from(refresh_token.as_str()))),
        ("client_id", Some(FormValue::from(client_id.as_str()))),
        ("client_secret", Some(FormValue::from(client_secret.as_str()))),
    ]
    .into_iter()
    .collect();

    Ok(AuthorizeRequest {
        body: encode_form(&form),
        name: name.clone(),
        url: url.clone(),
        auth: credential.clone(),
    })
}

/// Issue a prepared refresh request through the host. No retries.
pub async fn invoke_refresh(
    requester: &dyn AuthorizeRequester,
    request: AuthorizeRequest,
) -> anyhow::Result<()> {
    let name = request.name.clone();
    requester
        .authorize_request(request)
        .await
        .map_err(|e| anyhow::anyhow!("refresh attempt failed for {name}: {e:#}"))
}

#[cfg(test)]
#[path = "grant_tests.rs"]
mod tests;
