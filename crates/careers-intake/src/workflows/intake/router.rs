use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use tracing::{error, info, warn};

use super::domain::{ApplicationFields, ApplicationSubmission, CvMetadata};
use super::notify::message::escape_html;
use super::processor::{IntakeProcessor, NotificationStatus};
use super::spool::SpooledCv;

/// Accept CVs up to this size; anything larger fails the multipart read.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const FILE_FIELD: &str = "cv";
const FALLBACK_FILENAME: &str = "cv.bin";

#[derive(Clone)]
pub struct IntakeRouterState {
    pub processor: Arc<IntakeProcessor>,
    /// Acknowledge before processing; failures then go to logs only.
    pub ack_early: bool,
}

/// Router builder exposing the submission endpoint.
pub fn intake_router(state: IntakeRouterState) -> Router {
    Router::new()
        .route("/upload", post(upload_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

enum IngestOutcome {
    Ready(ApplicationSubmission, SpooledCv),
    MissingFile,
    Malformed(String),
}

async fn collect_submission(multipart: &mut Multipart) -> std::io::Result<IngestOutcome> {
    let mut fields: Vec<(String, String)> = Vec::new();
    let mut cv: Option<(CvMetadata, axum::body::Bytes)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return Ok(IngestOutcome::Malformed(err.to_string())),
        };

        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == FILE_FIELD {
            let original_name = field
                .file_name()
                .filter(|raw| !raw.trim().is_empty())
                .unwrap_or(FALLBACK_FILENAME)
                .to_string();
            let declared = field.content_type().map(str::to_string);
            let bytes = match field.bytes().await {
                Ok(bytes) => bytes,
                Err(err) => return Ok(IngestOutcome::Malformed(err.to_string())),
            };
            let content_type = declared.unwrap_or_else(|| {
                mime_guess::from_path(&original_name)
                    .first_or_octet_stream()
                    .to_string()
            });
            cv = Some((
                CvMetadata {
                    original_name,
                    content_type,
                    size: bytes.len() as u64,
                },
                bytes,
            ));
        } else {
            match field.text().await {
                Ok(value) => fields.push((name, value)),
                Err(err) => return Ok(IngestOutcome::Malformed(err.to_string())),
            }
        }
    }

    let Some((meta, bytes)) = cv else {
        return Ok(IngestOutcome::MissingFile);
    };

    let spool = SpooledCv::write(&bytes)?;
    Ok(IngestOutcome::Ready(
        ApplicationSubmission {
            fields: ApplicationFields::from_form(fields),
            cv: meta,
        },
        spool,
    ))
}

pub(crate) async fn upload_handler(
    State(state): State<IntakeRouterState>,
    mut multipart: Multipart,
) -> Response {
    let (submission, spool) = match collect_submission(&mut multipart).await {
        Ok(IngestOutcome::Ready(submission, spool)) => (submission, spool),
        Ok(IngestOutcome::MissingFile) => {
            warn!("upload rejected: no cv part attached");
            return fragment(
                StatusCode::BAD_REQUEST,
                "<p>No CV file was attached. Please attach your CV and resubmit.</p>".to_string(),
            );
        }
        Ok(IngestOutcome::Malformed(detail)) => {
            warn!(%detail, "upload rejected: malformed multipart body");
            return fragment(
                StatusCode::BAD_REQUEST,
                "<p>The submission could not be read. Please try again.</p>".to_string(),
            );
        }
        Err(err) => {
            error!(error = %err, "unable to spool uploaded cv");
            return failure_fragment();
        }
    };

    info!(
        applicant = %submission.fields.full_name,
        position = %submission.fields.position,
        file = %submission.cv.original_name,
        size = submission.cv.size,
        "application received"
    );

    if state.ack_early {
        let processor = state.processor.clone();
        tokio::spawn(async move {
            if let Err(err) = processor.process(submission, spool).await {
                error!(error = %err, "detached intake processing failed");
            }
        });
        return fragment(
            StatusCode::OK,
            "<p>Your application was received and is being processed.</p>".to_string(),
        );
    }

    match state.processor.process(submission, spool).await {
        Ok(outcome) => {
            let link = escape_html(&outcome.asset.view_url);
            let body = match outcome.notification {
                NotificationStatus::Delivered => format!(
                    "<p>Application received. Your CV is available at <a href=\"{link}\">{link}</a>.</p>"
                ),
                NotificationStatus::Failed(_) => format!(
                    "<p>Application received and your CV is available at <a href=\"{link}\">{link}</a>, but the notification email could not be sent.</p>"
                ),
            };
            fragment(StatusCode::OK, body)
        }
        Err(err) => {
            error!(error = %err, "intake workflow failed");
            failure_fragment()
        }
    }
}

fn fragment(status: StatusCode, body: String) -> Response {
    (status, Html(body)).into_response()
}

fn failure_fragment() -> Response {
    fragment(
        StatusCode::INTERNAL_SERVER_ERROR,
        "<p>We could not process your application. Please try again later.</p>".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::intake::notify::{Notifier, NotifyError};
    use crate::workflows::intake::storage::{CvStorage, StorageError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::util::ServiceExt;

    #[derive(Default)]
    struct CountingStorage {
        uploads: AtomicUsize,
        fail_upload: bool,
    }

    #[async_trait]
    impl CvStorage for CountingStorage {
        async fn upload(
            &self,
            _name: &str,
            _content_type: &str,
            _bytes: Vec<u8>,
        ) -> Result<String, StorageError> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            if self.fail_upload {
                return Err(StorageError::Upload("backend unavailable".to_string()));
            }
            Ok("file-1".to_string())
        }

        async fn share_publicly(&self, _file_id: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        deliveries: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn deliver(
            &self,
            _submission: &ApplicationSubmission,
            _cv_link: &str,
        ) -> Result<(), NotifyError> {
            self.deliveries.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(NotifyError::Transport("relay refused".to_string()));
            }
            Ok(())
        }
    }

    fn router_with(
        storage: Arc<CountingStorage>,
        notifier: Arc<CountingNotifier>,
        ack_early: bool,
    ) -> Router {
        let processor = Arc::new(IntakeProcessor::new(storage, notifier));
        intake_router(IntakeRouterState {
            processor,
            ack_early,
        })
    }

    const BOUNDARY: &str = "intake-test-boundary";

    fn multipart_request(include_file: bool) -> Request<Body> {
        let mut body = String::new();
        for (name, value) in [
            ("fullName", "Sara Ali"),
            ("email", "sara@x.com"),
            ("position", "Accountant"),
        ] {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        if include_file {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"cv\"; filename=\"resume.pdf\"\r\nContent-Type: application/pdf\r\n\r\n%PDF-1.4 sample\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request builds")
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        String::from_utf8(bytes.to_vec()).expect("body is utf-8")
    }

    #[tokio::test]
    async fn missing_file_is_rejected_without_side_effects() {
        let storage = Arc::new(CountingStorage::default());
        let notifier = Arc::new(CountingNotifier::default());
        let app = router_with(storage.clone(), notifier.clone(), false);

        let response = app
            .oneshot(multipart_request(false))
            .await
            .expect("request completes");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(storage.uploads.load(Ordering::SeqCst), 0);
        assert_eq!(notifier.deliveries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_submission_returns_the_view_link() {
        let storage = Arc::new(CountingStorage::default());
        let notifier = Arc::new(CountingNotifier::default());
        let app = router_with(storage.clone(), notifier.clone(), false);

        let response = app
            .oneshot(multipart_request(true))
            .await
            .expect("request completes");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("https://drive.google.com/file/d/file-1/view"));
        assert_eq!(storage.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.deliveries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn storage_failure_yields_server_error_and_no_mail() {
        let storage = Arc::new(CountingStorage {
            fail_upload: true,
            ..CountingStorage::default()
        });
        let notifier = Arc::new(CountingNotifier::default());
        let app = router_with(storage.clone(), notifier.clone(), false);

        let response = app
            .oneshot(multipart_request(true))
            .await
            .expect("request completes");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(notifier.deliveries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn notify_failure_still_reports_success_with_caveat() {
        let storage = Arc::new(CountingStorage::default());
        let notifier = Arc::new(CountingNotifier {
            fail: true,
            ..CountingNotifier::default()
        });
        let app = router_with(storage.clone(), notifier.clone(), false);

        let response = app
            .oneshot(multipart_request(true))
            .await
            .expect("request completes");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("https://drive.google.com/file/d/file-1/view"));
        assert!(body.contains("could not be sent"));
    }

    #[tokio::test]
    async fn ack_early_mode_responds_before_processing() {
        let storage = Arc::new(CountingStorage::default());
        let notifier = Arc::new(CountingNotifier::default());
        let app = router_with(storage.clone(), notifier.clone(), true);

        let response = app
            .oneshot(multipart_request(true))
            .await
            .expect("request completes");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("being processed"));
    }
}
