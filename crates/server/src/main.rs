//! fedidir server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use fedidir_api::{router as api_router, AppState};
use fedidir_common::Config;
use fedidir_core::{
    ChallengeIssuer, DirectoryService, HttpInstanceClient, InstanceProber, MastodonMessenger,
    OnboardingService, ReconciliationService, RemoteInstanceClient,
};
use fedidir_db::repositories::{ApiKeyRepository, InstanceRepository};
use fedidir_queue::{run_scheduler, SchedulerConfig};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upper bound for one HTTP request, including sweeps triggered over HTTP.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fedidir=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting fedidir server...");

    // Load and check configuration before anything binds
    let config = Config::load()?;
    config.validate()?;

    // Connect to database
    let db = Arc::new(fedidir_db::init(&config.database).await?);
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    fedidir_db::migrate(&db).await?;
    info!("Migrations completed");

    // Remote instance client
    let user_agent = format!("fedidir/{} (+{})", env!("CARGO_PKG_VERSION"), config.server.url);
    let remote: Arc<dyn RemoteInstanceClient> =
        Arc::new(HttpInstanceClient::new(config.probe.timeout(), &user_agent)?);

    // Initialize repositories
    let instance_repo = InstanceRepository::new(Arc::clone(&db));
    let api_key_repo = ApiKeyRepository::new(Arc::clone(&db));

    // Initialize services
    let directory = DirectoryService::new(instance_repo, api_key_repo);
    let prober = InstanceProber::new(Arc::clone(&remote), config.probe.timeout());
    let issuer = ChallengeIssuer::new(
        remote,
        config.directory.name.clone(),
        config.directory.verify_url_base.clone(),
    );
    let messenger = MastodonMessenger::new(
        &config.messaging.base_url,
        config.messaging.access_token.clone(),
        config.probe.timeout(),
    )?;

    let onboarding_service =
        OnboardingService::new(prober.clone(), issuer, directory.clone(), Arc::new(messenger));
    let reconciliation_service =
        ReconciliationService::new(directory, prober, config.reconciliation.max_concurrency);

    // Start periodic sweeps
    let scheduler = run_scheduler(
        SchedulerConfig::from(&config.reconciliation),
        Arc::new(reconciliation_service.clone()),
    );

    let state = AppState {
        onboarding_service,
        reconciliation_service,
    };

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for task in scheduler {
        task.abort();
    }

    info!("Server shutdown complete");
    Ok(())
}
