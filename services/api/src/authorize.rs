use crate::cli::AuthorizeArgs;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use careers_intake::auth::{persist_token, OAuthBootstrap};
use careers_intake::config::AppConfig;
use careers_intake::error::AppError;
use careers_intake::telemetry;
use careers_intake::workflows::intake::notify::message::escape_html;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// One-shot consent flow: print the URL, wait for Google's redirect,
/// exchange the code, and persist the token pair for the server.
pub(crate) async fn run(mut args: AuthorizeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let bootstrap = OAuthBootstrap::new(&config.google);
    println!("Open the following URL in a browser and grant access:");
    println!("{}", bootstrap.consent_url());
    println!();
    println!("Waiting for the redirect on /oauth2callback ...");

    let done = Arc::new(Notify::new());
    let state = Arc::new(AuthorizeState {
        bootstrap,
        token_file: config.google.token_file.clone(),
        done: done.clone(),
    });

    let app = Router::new()
        .route("/oauth2callback", get(callback_endpoint))
        .with_state(state);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            done.notified().await;
        })
        .await?;

    info!(
        path = %config.google.token_file.display(),
        "token stored; authorization complete"
    );
    Ok(())
}

struct AuthorizeState {
    bootstrap: OAuthBootstrap,
    token_file: PathBuf,
    done: Arc<Notify>,
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

async fn callback_endpoint(
    State(state): State<Arc<AuthorizeState>>,
    Query(params): Query<CallbackParams>,
) -> Html<String> {
    if let Some(denial) = params.error {
        warn!(error = %denial, "authorization was denied");
        return Html(format!(
            "<p>Authorization failed: {}.</p>",
            escape_html(&denial)
        ));
    }

    let Some(code) = params.code else {
        return Html("<p>Missing authorization code.</p>".to_string());
    };

    let token = match state.bootstrap.exchange_code(&code).await {
        Ok(token) => token,
        Err(err) => {
            error!(error = %err, "code exchange failed");
            return Html(format!(
                "<p>Could not exchange the authorization code: {}.</p>",
                escape_html(&err.to_string())
            ));
        }
    };

    if let Err(err) = persist_token(&token, &state.token_file) {
        error!(error = %err, "token could not be written");
        return Html(format!(
            "<p>Could not store the token: {}.</p>",
            escape_html(&err.to_string())
        ));
    }

    state.done.notify_one();
    Html("<p>Token stored successfully. You can close this page.</p>".to_string())
}
