use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::message;
use super::{MailRouting, Notifier, NotifyError};
use crate::config::ResolvedMail;
use crate::workflows::intake::domain::ApplicationSubmission;

/// SMTP relay transport with submission-independent credentials.
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    routing: MailRouting,
}

impl SmtpNotifier {
    pub fn new(mail: &ResolvedMail) -> Result<Self, NotifyError> {
        let (user, pass) = match (&mail.smtp.user, &mail.smtp.pass) {
            (Some(user), Some(pass)) => (user.clone(), pass.clone()),
            _ => {
                return Err(NotifyError::Transport(
                    "smtp credentials are not configured".to_string(),
                ))
            }
        };

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&mail.smtp.host)
            .map_err(|err| NotifyError::Transport(err.to_string()))?
            .port(mail.smtp.port)
            .credentials(Credentials::new(user, pass))
            .build();

        Ok(Self {
            mailer,
            routing: MailRouting::from(mail),
        })
    }
}

impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("routing", &self.routing)
            .finish_non_exhaustive()
    }
}

fn mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse()
        .map_err(|err| NotifyError::Message(format!("invalid address '{address}': {err}")))
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn deliver(
        &self,
        submission: &ApplicationSubmission,
        cv_link: &str,
    ) -> Result<(), NotifyError> {
        let subject = message::subject(&submission.fields);
        let body = message::render_body(&submission.fields, cv_link);

        let mut builder = Message::builder()
            .from(mailbox(&self.routing.from)?)
            .to(mailbox(&self.routing.to)?);
        if let Some(cc) = &self.routing.cc {
            builder = builder.cc(mailbox(cc)?);
        }

        let email = builder
            .subject(subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|err| NotifyError::Message(err.to_string()))?;

        self.mailer
            .send(email)
            .await
            .map_err(|err| NotifyError::Transport(err.to_string()))?;

        info!(to = %self.routing.to, %subject, "notification sent via smtp relay");
        Ok(())
    }
}
