use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::message;
use super::{MailRouting, Notifier, NotifyError};
use crate::auth::{AuthorizationContext, GMAIL_SEND_SCOPE};
use crate::workflows::intake::domain::ApplicationSubmission;

const SEND_ENDPOINT: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

/// Provider-native transport: the raw message goes to the mail API using
/// the same authorization context as storage.
pub struct GmailNotifier {
    context: Arc<AuthorizationContext>,
    routing: MailRouting,
    http: reqwest::Client,
}

impl GmailNotifier {
    pub fn new(context: Arc<AuthorizationContext>, routing: MailRouting) -> Self {
        Self {
            context,
            routing,
            http: reqwest::Client::new(),
        }
    }
}

impl std::fmt::Debug for GmailNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailNotifier")
            .field("routing", &self.routing)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Notifier for GmailNotifier {
    async fn deliver(
        &self,
        submission: &ApplicationSubmission,
        cv_link: &str,
    ) -> Result<(), NotifyError> {
        let subject = message::subject(&submission.fields);
        let body = message::render_body(&submission.fields, cv_link);
        let raw = message::encode_raw_message(&message::rfc822_message(
            &self.routing,
            &subject,
            &body,
        ));

        let token = self.context.access_token(&[GMAIL_SEND_SCOPE]).await?;
        let response = self
            .http
            .post(SEND_ENDPOINT)
            .bearer_auth(token)
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await
            .map_err(|err| NotifyError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        info!(to = %self.routing.to, %subject, "notification sent via mail api");
        Ok(())
    }
}
