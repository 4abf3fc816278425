use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_intake_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use careers_intake::auth::AuthorizationContext;
use careers_intake::config::{AppConfig, ConfigError, MailTransportKind};
use careers_intake::error::AppError;
use careers_intake::workflows::intake::{
    CvStorage, GmailNotifier, GoogleDriveStorage, IntakeProcessor, IntakeRouterState, MailRouting,
    Notifier, SmtpNotifier,
};
use careers_intake::{keepalive, telemetry};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let mail = config.mail.resolve()?;
    let context = Arc::new(AuthorizationContext::initialize(&config.google).await?);
    let storage: Arc<dyn CvStorage> = Arc::new(GoogleDriveStorage::new(context.drive_hub()));

    let routing = MailRouting::from(&mail);
    let notifier: Arc<dyn Notifier> = match mail.transport {
        MailTransportKind::Gmail => Arc::new(GmailNotifier::new(context.clone(), routing)),
        MailTransportKind::Smtp => Arc::new(
            SmtpNotifier::new(&mail)
                .map_err(|err| ConfigError::InvalidSmtpRelay(err.to_string()))?,
        ),
    };
    let processor = Arc::new(IntakeProcessor::new(storage, notifier));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let app = with_intake_routes(IntakeRouterState {
        processor,
        ack_early: config.intake.ack_early,
    })
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    if let Some(url) = config.keepalive_url.clone() {
        keepalive::spawn(url);
    }

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        transport = ?mail.transport,
        ack_early = config.intake.ack_early,
        "careers intake service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
