use std::{process, sync::Arc};

use orderline::{
    application::{
        error::AppError, ingest::IngestionConsumer, lookup::OrderLookup, repos::OrdersRepo,
        restore::CacheRestorer,
    },
    cache::OrderCache,
    config::{self, RestorePolicy},
    infra::{
        db::PostgresOrders,
        error::InfraError,
        http::{HttpState, build_router},
        source::PgChannelSource,
        telemetry,
    },
};
use tokio_util::sync::CancellationToken;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn connect_store(settings: &config::Settings) -> Result<PostgresOrders, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresOrders::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresOrders::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(PostgresOrders::new(pool))
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    connect_store(&settings).await?;
    info!(target = "orderline::startup", "schema is up to date");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let store = connect_store(&settings).await?;
    let repo: Arc<dyn OrdersRepo> = Arc::new(store.clone());
    let cache = Arc::new(OrderCache::new());

    // Restore to completion before the consumer or any reads start; reads
    // racing an empty cache is a startup-order bug, not a tolerable window.
    let restorer = CacheRestorer::new(repo.clone(), cache.clone());
    if let Err(err) = restorer.restore().await {
        match settings.restore.on_failure {
            RestorePolicy::Abort => return Err(AppError::Restore(err)),
            RestorePolicy::Continue => {
                warn!(
                    target = "orderline::startup",
                    error = %err,
                    "cache restoration failed, serving with an empty cache"
                );
            }
        }
    }

    let shutdown = CancellationToken::new();
    let source = PgChannelSource::connect(store.pool(), &settings.ingest.channel)
        .await
        .map_err(|err| AppError::from(InfraError::stream(err.to_string())))?;
    let consumer = IngestionConsumer::new(
        Box::new(source),
        repo.clone(),
        cache.clone(),
        shutdown.clone(),
    );
    let consumer_handle = tokio::spawn(consumer.run());

    let state = HttpState {
        lookup: Arc::new(OrderLookup::new(cache.clone())),
        db: store.clone(),
    };
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "orderline::startup",
        addr = %settings.server.addr,
        channel = %settings.ingest.channel,
        "serving order lookups"
    );

    let result = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")));

    shutdown.cancel();
    if tokio::time::timeout(settings.server.graceful_shutdown, consumer_handle)
        .await
        .is_err()
    {
        warn!(
            target = "orderline::startup",
            "consumer did not stop within the graceful shutdown window"
        );
    }

    result
}

async fn wait_for_shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "orderline::startup",
            error = %err,
            "failed to listen for shutdown signal, shutting down"
        );
    }
}
