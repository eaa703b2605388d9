use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryProposalRepository, InMemoryUserDataService};
use crate::routes::with_portal_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use belize_grants::config::AppConfig;
use belize_grants::error::AppError;
use belize_grants::telemetry;
use belize_grants::workflows::proposals::{
    ApplicantContextProvider, FileDraftCache, ProposalSessions, UserDataService,
};
use std::fs::File;
use std::io::BufReader;
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    std::fs::create_dir_all(&config.drafts.directory)?;
    let drafts = Arc::new(FileDraftCache::new(config.drafts.directory.clone()));
    let repository = Arc::new(InMemoryProposalRepository::default());
    let mut sessions = ProposalSessions::new(repository, drafts);
    if let Some(path) = args.profile.as_deref() {
        let service = InMemoryUserDataService::from_reader(BufReader::new(File::open(path)?))?;
        let service: Arc<dyn UserDataService> = Arc::new(service);
        sessions = sessions.with_profiles(Arc::new(ApplicantContextProvider::new(service)));
        info!(profile = %path.display(), "applicant profile prefill enabled");
    }
    let sessions = Arc::new(sessions);

    let app = with_portal_routes(sessions)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        drafts = %config.drafts.directory.display(),
        "grants portal ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
