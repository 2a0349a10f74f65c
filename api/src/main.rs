use api::host::{FsContentSource, FsHost};
use api::middleware::log_request;
use api::routes::routes;
use api::state::AppState;
use axum::{Router, middleware::from_fn};
use chrono::Utc;
use migration::Migrator;
use plagiarism::client::{HttpReportingClient, ReportingApi};
use plagiarism::content::ContentRegistry;
use plagiarism::{BatchScheduler, SubmissionLifecycleManager};
use sea_orm_migration::MigratorTrait;
use std::error::Error;
use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing_appender::rolling;
use util::config::AppConfig;
use util::paths;

/// Content categories served from the storage root.
const CONTENT_CATEGORIES: [&str; 4] = ["assignment", "forum", "quiz", "workshop"];

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Could not set up logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn Error>> {
    let db = db::connect(&config.database_path).await?;
    Migrator::up(&db, None).await?;

    let storage_root = paths::ensure_dir(paths::storage_root(&config.storage_root))?;
    let plagiarism_config = Arc::new(config.plagiarism.clone());

    let client = HttpReportingClient::new(&plagiarism_config)?;
    let registry = CONTENT_CATEGORIES
        .into_iter()
        .fold(ContentRegistry::new(), |registry, category| {
            registry.register(category, Arc::new(FsContentSource::new(&storage_root, category)))
        });
    let lifecycle = Arc::new(SubmissionLifecycleManager::new(
        db,
        ReportingApi::new(Arc::new(client)),
        Arc::new(FsHost::new(&storage_root)),
        registry,
        plagiarism_config.clone(),
    ));

    let app_state = AppState::new(lifecycle);
    spawn_scheduler(
        app_state.scheduler_clone(),
        Duration::from_secs(plagiarism_config.tick_seconds.max(1)),
    );

    let app = Router::new()
        .nest("/api", routes(app_state))
        .layer(from_fn(log_request))
        .layer(CorsLayer::very_permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(
        project = %config.project_name,
        env = %config.env,
        %addr,
        storage_root = %storage_root.display(),
        "starting server"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Runs scheduler passes back to back, sleeping `every` between them, so two
/// passes never overlap.
fn spawn_scheduler(scheduler: Arc<BatchScheduler>, every: Duration) {
    tokio::spawn(async move {
        loop {
            scheduler.tick(Utc::now().timestamp()).await;
            tokio::time::sleep(every).await;
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

fn init_logging(
    config: &AppConfig,
) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let log_path = Path::new(&config.log_file);
    let (dir, file_name) = match (log_path.parent(), log_path.file_name()) {
        (Some(dir), Some(name)) if !dir.as_os_str().is_empty() => {
            (dir.to_path_buf(), name.to_owned())
        }
        _ => (Path::new("logs").to_path_buf(), log_path.as_os_str().to_owned()),
    };
    paths::ensure_dir(&dir)?;

    let file_appender = rolling::daily(&dir, &file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = config.log_to_stdout.then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(true)
            .with_thread_ids(true)
    });

    let env_filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("api=info,plagiarism=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(guard)
}
