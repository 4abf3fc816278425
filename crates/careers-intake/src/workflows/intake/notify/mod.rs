pub mod message;

mod gmail;
mod smtp;

pub use gmail::GmailNotifier;
pub use smtp::SmtpNotifier;

use async_trait::async_trait;

use crate::auth::AuthError;
use crate::config::ResolvedMail;
use crate::workflows::intake::domain::ApplicationSubmission;

/// Addressing shared by both transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailRouting {
    pub from: String,
    pub to: String,
    pub cc: Option<String>,
}

impl From<&ResolvedMail> for MailRouting {
    fn from(mail: &ResolvedMail) -> Self {
        Self {
            from: mail.from.clone(),
            to: mail.to.clone(),
            cc: mail.cc.clone(),
        }
    }
}

/// Outbound notification seam; the orchestrator only sees this trait.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Render and dispatch the HR notification for one submission.
    async fn deliver(
        &self,
        submission: &ApplicationSubmission,
        cv_link: &str,
    ) -> Result<(), NotifyError>;
}

/// Transport failures are recoverable from the caller's perspective: the
/// upload already succeeded, so the orchestrator downgrades these.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("unable to assemble message: {0}")]
    Message(String),
    #[error("mail transport failed: {0}")]
    Transport(String),
    #[error("mail gateway rejected the message ({status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error(transparent)]
    Auth(#[from] AuthError),
}
