use std::sync::Arc;

use tracing::{error, info};

use super::domain::ApplicationSubmission;
use super::notify::Notifier;
use super::spool::SpooledCv;
use super::storage::{CvStorage, StorageError, UploadedAsset};

/// Orchestrates the side-effecting steps for one submission: the CV is
/// archived and made link-shareable before HR is notified, and the local
/// spool is always released.
pub struct IntakeProcessor {
    storage: Arc<dyn CvStorage>,
    notifier: Arc<dyn Notifier>,
}

/// What happened to the HR notification. A failed notification never fails
/// the submission once the upload has succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStatus {
    Delivered,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeOutcome {
    pub asset: UploadedAsset,
    pub notification: NotificationStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("failed to read spooled upload: {0}")]
    Spool(#[from] std::io::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IntakeProcessor {
    pub fn new(storage: Arc<dyn CvStorage>, notifier: Arc<dyn Notifier>) -> Self {
        Self { storage, notifier }
    }

    /// Run the workflow for one submission. The spool is consumed and its
    /// file removed before this returns, on the failure paths included.
    pub async fn process(
        &self,
        submission: ApplicationSubmission,
        spool: SpooledCv,
    ) -> Result<IntakeOutcome, IntakeError> {
        let uploaded = self.archive_cv(&submission, &spool).await;
        drop(spool);

        let asset = uploaded?;
        info!(
            file_id = %asset.file_id,
            link = %asset.view_url,
            applicant = %submission.fields.full_name,
            "cv archived and shared"
        );

        let notification = match self.notifier.deliver(&submission, &asset.view_url).await {
            Ok(()) => NotificationStatus::Delivered,
            Err(err) => {
                error!(error = %err, "notification failed after successful upload");
                NotificationStatus::Failed(err.to_string())
            }
        };

        Ok(IntakeOutcome {
            asset,
            notification,
        })
    }

    async fn archive_cv(
        &self,
        submission: &ApplicationSubmission,
        spool: &SpooledCv,
    ) -> Result<UploadedAsset, IntakeError> {
        let bytes = spool.read().await?;
        let file_id = self
            .storage
            .upload(
                &submission.cv.original_name,
                &submission.cv.content_type,
                bytes,
            )
            .await?;
        self.storage.share_publicly(&file_id).await?;
        Ok(UploadedAsset::from_file_id(file_id))
    }
}

impl std::fmt::Debug for IntakeProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntakeProcessor").finish_non_exhaustive()
    }
}
