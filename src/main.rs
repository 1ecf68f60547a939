use std::{process, sync::Arc};

use hemolist::{
    application::error::AppError,
    application::{
        fetch::FetchOrchestrator,
        list::ListService,
        producers::Producer,
        warm::Warmer,
    },
    cache::{FingerprintGenerator, LayeredStore},
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        telemetry,
        upstream::{self, RestProducer},
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
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
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let client = upstream::build_client(&settings.upstream).map_err(AppError::from)?;
    let producers: Vec<Arc<dyn Producer>> =
        RestProducer::for_all_sets(&client, &settings.upstream.base_url)
            .into_iter()
            .map(|producer| Arc::new(producer) as Arc<dyn Producer>)
            .collect();

    let generator = Arc::new(FingerprintGenerator::new(
        settings.cache.data_fingerprint_ttl(),
    ));
    let store = Arc::new(LayeredStore::new(settings.cache.clone(), generator));
    let fetcher = Arc::new(FetchOrchestrator::new(producers));
    let service = Arc::new(ListService::new(
        Arc::clone(&store),
        Arc::clone(&fetcher),
        settings.cache.clone(),
    ));
    let warmer = Arc::new(Warmer::new(
        Arc::clone(&service),
        settings.cache.warm_timeout(),
        settings.cache.warm_enabled,
    ));

    // Seed the data fingerprint so early requests are not all treated as
    // unverifiable misses.
    spawn_initial_fingerprint_probe(Arc::clone(&fetcher), Arc::clone(&store));

    info!(
        target = "hemolist::serve",
        addr = %settings.server.addr,
        upstream = %settings.upstream.base_url,
        cache_dir = %settings.cache.l2_dir.display(),
        shared_dir = settings
            .cache
            .l3_dir
            .as_ref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default(),
        warm = settings.cache.warm_enabled,
        "starting donor list server"
    );

    serve_http(&settings, HttpState { list: service, warmer }).await
}

fn spawn_initial_fingerprint_probe(fetcher: Arc<FetchOrchestrator>, store: Arc<LayeredStore>) {
    let generator = Arc::clone(store.fingerprints());
    if !generator.try_begin_refresh() {
        return;
    }
    tokio::spawn(async move {
        match fetcher.probe_latest_mutation().await {
            Ok(latest) => generator.record_latest_mutation(latest),
            Err(error) => {
                error!(
                    target = "hemolist::serve",
                    error = %error,
                    "initial data fingerprint probe failed"
                );
            }
        }
        generator.end_refresh();
    });
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal(grace: std::time::Duration) {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(error = %error, "failed to install shutdown handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => error!(error = %error, "failed to install shutdown handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!(
        target = "hemolist::serve",
        grace_seconds = grace.as_secs(),
        "shutdown signal received, draining connections"
    );
}
