mod bootstrap;

pub use bootstrap::{persist_token, OAuthBootstrap, OAUTH_SCOPES};

use std::sync::RwLock;

use google_drive3::yup_oauth2::authenticator::Authenticator;
use google_drive3::yup_oauth2::authorized_user::AuthorizedUserSecret;
use google_drive3::yup_oauth2::AuthorizedUserAuthenticator;
use google_drive3::{common, hyper_rustls, hyper_util, DriveHub};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::GoogleConfig;

pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";
pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";

/// Connector shared by the Drive hub and the token authenticator.
pub type GoogleConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

/// Token pair persisted by the `authorize` flow (or injected via `TOKEN`).
///
/// The shape matches what the Google token endpoint hands back, with
/// `expiry_date` carried as epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

impl StoredToken {
    /// Resolve the token pair from config: the `TOKEN` env material wins,
    /// otherwise the file written by the `authorize` command is read.
    pub fn resolve(config: &GoogleConfig) -> Result<Self, AuthError> {
        if let Some(raw) = &config.token_json {
            return serde_json::from_str(raw).map_err(|err| {
                AuthError::TokenSource(format!("TOKEN is not a valid token JSON payload: {err}"))
            });
        }

        let raw = std::fs::read_to_string(&config.token_file).map_err(|err| {
            AuthError::TokenSource(format!(
                "unable to read {}: {err}",
                config.token_file.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|err| {
            AuthError::TokenSource(format!(
                "{} is not a valid token JSON payload: {err}",
                config.token_file.display()
            ))
        })
    }
}

/// Process-wide authorization handle for the storage and mail APIs.
///
/// Built once at startup; requests share it for the process lifetime. The
/// underlying SDK refreshes the short-lived access token transparently;
/// rotation is observed through a single-slot last-write-wins cache so it
/// can be logged, never surfaced as an error.
pub struct AuthorizationContext {
    client: common::Client<GoogleConnector>,
    auth: Authenticator<GoogleConnector>,
    last_access_token: RwLock<Option<String>>,
}

impl std::fmt::Debug for AuthorizationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationContext").finish_non_exhaustive()
    }
}

impl AuthorizationContext {
    pub async fn initialize(config: &GoogleConfig) -> Result<Self, AuthError> {
        let token = StoredToken::resolve(config)?;
        let secret = AuthorizedUserSecret {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: token.refresh_token.clone(),
            key_type: "authorized_user".to_string(),
        };

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|err| AuthError::Tls(err.to_string()))?
            .https_only()
            .enable_http2()
            .build();

        let client: common::Client<GoogleConnector> =
            hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
                .build(connector.clone());

        // The authenticator shares the hub's transport instead of building
        // its own TLS stack.
        let auth_client: hyper_util::client::legacy::Client<GoogleConnector, String> =
            hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
                .build(connector);
        let auth = AuthorizedUserAuthenticator::with_client(secret, auth_client)
        .build()
        .await
        .map_err(|err| AuthError::Authenticator(err.to_string()))?;

        Ok(Self {
            client,
            auth,
            last_access_token: RwLock::new(token.access_token),
        })
    }

    /// Build a Drive hub sharing this context's transport and credentials.
    pub fn drive_hub(&self) -> DriveHub<GoogleConnector> {
        DriveHub::new(self.client.clone(), self.auth.clone())
    }

    /// Fetch a bearer token for the given scopes, refreshing if needed.
    pub async fn access_token(&self, scopes: &[&str]) -> Result<String, AuthError> {
        let token = self
            .auth
            .token(scopes)
            .await
            .map_err(|err| AuthError::Token(err.to_string()))?;
        let value = token
            .token()
            .ok_or(AuthError::MissingAccessToken)?
            .to_string();
        self.observe_rotation(&value);
        Ok(value)
    }

    fn observe_rotation(&self, current: &str) {
        let mut slot = self
            .last_access_token
            .write()
            .expect("access token slot poisoned");
        match slot.as_deref() {
            Some(previous) if previous == current => {}
            Some(_) => {
                info!("google access token rotated by provider");
                *slot = Some(current.to_string());
            }
            None => *slot = Some(current.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token material unavailable: {0}")]
    TokenSource(String),
    #[error("tls setup failed: {0}")]
    Tls(String),
    #[error("unable to build authenticator: {0}")]
    Authenticator(String),
    #[error("token exchange failed: {0}")]
    Token(String),
    #[error("provider returned no access token")]
    MissingAccessToken,
    #[error("unable to persist token to {path}: {detail}")]
    Persist { path: String, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn google_config(token_json: Option<String>, token_file: PathBuf) -> GoogleConfig {
        GoogleConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            redirect_uri: "http://localhost:3000/oauth2callback".to_string(),
            token_json,
            token_file,
        }
    }

    #[test]
    fn resolve_prefers_env_token_over_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("token.json");
        std::fs::write(&file, r#"{"refresh_token":"from-file"}"#).expect("write token file");

        let config = google_config(
            Some(r#"{"access_token":"at","refresh_token":"from-env"}"#.to_string()),
            file,
        );
        let token = StoredToken::resolve(&config).expect("env token parses");
        assert_eq!(token.refresh_token, "from-env");
        assert_eq!(token.access_token.as_deref(), Some("at"));
    }

    #[test]
    fn resolve_reads_token_file_when_env_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("token.json");
        std::fs::write(
            &file,
            r#"{"access_token":"at","refresh_token":"rt","expiry_date":1699999999999}"#,
        )
        .expect("write token file");

        let config = google_config(None, file);
        let token = StoredToken::resolve(&config).expect("file token parses");
        assert_eq!(token.refresh_token, "rt");
        assert_eq!(token.expiry_date, Some(1_699_999_999_999));
    }

    #[test]
    fn resolve_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = google_config(None, dir.path().join("absent.json"));
        let err = StoredToken::resolve(&config).expect_err("missing file is fatal");
        assert!(matches!(err, AuthError::TokenSource(_)));
    }

    #[test]
    fn resolve_rejects_malformed_env_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = google_config(Some("not-json".to_string()), dir.path().join("token.json"));
        let err = StoredToken::resolve(&config).expect_err("malformed token is fatal");
        assert!(matches!(err, AuthError::TokenSource(_)));
    }
}
