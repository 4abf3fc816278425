//! Job-application intake: ingestion, CV archival, and HR notification.

pub mod domain;
pub mod notify;
pub mod processor;
pub mod router;
pub mod spool;
pub mod storage;

pub use domain::{ApplicationFields, ApplicationSubmission, CvMetadata};
pub use notify::{GmailNotifier, MailRouting, Notifier, NotifyError, SmtpNotifier};
pub use processor::{IntakeError, IntakeOutcome, IntakeProcessor, NotificationStatus};
pub use router::{intake_router, IntakeRouterState};
pub use spool::SpooledCv;
pub use storage::{view_url, CvStorage, GoogleDriveStorage, StorageError, UploadedAsset};
