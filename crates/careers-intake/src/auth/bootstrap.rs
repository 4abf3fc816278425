use std::path::Path;

use chrono::Utc;
use serde::Deserialize;

use super::{AuthError, StoredToken, DRIVE_FILE_SCOPE, GMAIL_SEND_SCOPE};
use crate::config::GoogleConfig;

/// Scopes requested during the one-time consent flow.
pub const OAUTH_SCOPES: &[&str] = &[DRIVE_FILE_SCOPE, GMAIL_SEND_SCOPE];

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// One-time authorization-code exchange used by the `authorize` command.
///
/// The code arrives on the `/oauth2callback` redirect; the resulting token
/// pair is persisted for the server to pick up at startup.
#[derive(Debug, Clone)]
pub struct OAuthBootstrap {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    http: reqwest::Client,
}

impl OAuthBootstrap {
    pub fn new(config: &GoogleConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            http: reqwest::Client::new(),
        }
    }

    /// The URL the operator opens in a browser to grant access.
    /// `access_type=offline` with `prompt=consent` forces Google to include
    /// a refresh token in the exchange response.
    pub fn consent_url(&self) -> String {
        let scope = OAUTH_SCOPES.join(" ");
        let url = url::Url::parse_with_params(
            AUTH_ENDPOINT,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .expect("static consent endpoint parses");
        url.into()
    }

    /// Exchange an authorization code for a token pair.
    pub async fn exchange_code(&self, code: &str) -> Result<StoredToken, AuthError> {
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&params)
            .send()
            .await
            .map_err(|err| AuthError::Token(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Token(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|err| AuthError::Token(format!("unreadable token response: {err}")))?;

        let refresh_token = grant.refresh_token.ok_or_else(|| {
            AuthError::Token(
                "token response carried no refresh_token; revoke access and re-run the consent flow"
                    .to_string(),
            )
        })?;

        let expiry_date = grant
            .expires_in
            .map(|seconds| Utc::now().timestamp_millis() + seconds * 1000);

        Ok(StoredToken {
            access_token: Some(grant.access_token),
            refresh_token,
            scope: grant.scope,
            token_type: grant.token_type,
            expiry_date,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
    token_type: Option<String>,
}

/// Write the token pair where the server expects to find it.
pub fn persist_token(token: &StoredToken, path: &Path) -> Result<(), AuthError> {
    let payload = serde_json::to_string_pretty(token).map_err(|err| AuthError::Persist {
        path: path.display().to_string(),
        detail: err.to_string(),
    })?;
    std::fs::write(path, payload).map_err(|err| AuthError::Persist {
        path: path.display().to_string(),
        detail: err.to_string(),
    })
}
