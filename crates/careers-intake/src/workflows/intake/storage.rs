use std::io::Cursor;

use async_trait::async_trait;
use google_drive3::api::{File, Permission, Scope};
use google_drive3::DriveHub;

/// Result of a successful upload: the provider-assigned identifier and the
/// public view link derived from it. Never persisted beyond the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub file_id: String,
    pub view_url: String,
}

impl UploadedAsset {
    pub fn from_file_id(file_id: String) -> Self {
        let view_url = view_url(&file_id);
        Self { file_id, view_url }
    }
}

/// The provider's fixed pattern for a browser-viewable link.
pub fn view_url(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{file_id}/view")
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage upload failed: {0}")]
    Upload(String),
    #[error("permission grant failed: {0}")]
    Share(String),
    #[error("storage backend returned no file id")]
    MissingFileId,
}

/// Storage abstraction so the orchestrator can be exercised in isolation.
#[async_trait]
pub trait CvStorage: Send + Sync {
    /// Upload the CV bytes under the original filename and MIME type,
    /// returning the provider's opaque file identifier.
    async fn upload(
        &self,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError>;

    /// Grant public read access (role "reader", anyone with the link).
    async fn share_publicly(&self, file_id: &str) -> Result<(), StorageError>;
}

/// Thin wrapper around the generated google-drive3 client.
pub struct GoogleDriveStorage<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    hub: DriveHub<C>,
}

impl<C> GoogleDriveStorage<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    pub fn new(hub: DriveHub<C>) -> Self {
        Self { hub }
    }
}

impl<C> std::fmt::Debug for GoogleDriveStorage<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDriveStorage").finish_non_exhaustive()
    }
}

#[async_trait]
impl<C> CvStorage for GoogleDriveStorage<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    async fn upload(
        &self,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let metadata = File {
            name: Some(name.to_string()),
            mime_type: Some(content_type.to_string()),
            ..File::default()
        };

        let media_type = content_type
            .parse::<mime::Mime>()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM);

        let result = self
            .hub
            .files()
            .create(metadata)
            .param("fields", "id")
            .supports_all_drives(true)
            .add_scope(Scope::File)
            .upload(Cursor::new(bytes), media_type)
            .await;

        let (_, file) = result.map_err(|err| StorageError::Upload(err.to_string()))?;
        file.id
            .filter(|id| !id.is_empty())
            .ok_or(StorageError::MissingFileId)
    }

    async fn share_publicly(&self, file_id: &str) -> Result<(), StorageError> {
        let grant = Permission {
            role: Some("reader".to_string()),
            type_: Some("anyone".to_string()),
            ..Permission::default()
        };

        self.hub
            .permissions()
            .create(grant, file_id)
            .param("fields", "id")
            .supports_all_drives(true)
            .add_scope(Scope::File)
            .doit()
            .await
            .map_err(|err| StorageError::Share(err.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_url_follows_the_provider_pattern() {
        assert_eq!(
            view_url("abc123"),
            "https://drive.google.com/file/d/abc123/view"
        );
    }

    #[test]
    fn uploaded_asset_derives_its_link_from_the_id() {
        let asset = UploadedAsset::from_file_id("f-42".to_string());
        assert_eq!(asset.file_id, "f-42");
        assert_eq!(asset.view_url, "https://drive.google.com/file/d/f-42/view");
    }
}
