use std::{process, sync::Arc};

use revalidator::{
    application::{
        error::AppError, relay::RelayService, revalidate::RevalidationService,
        secret::SharedSecret,
    },
    cache::{CacheConfig, PageCache},
    config,
    infra::{
        error::InfraError,
        http::{self, EndpointState, RelayState},
        telemetry,
    },
};
use tokio::{net::TcpListener, try_join};
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
        config::Command::Endpoint(_) => run_endpoint(settings).await,
        config::Command::Relay(_) => run_relay(settings).await,
        config::Command::Revalidate(args) => run_revalidate(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let endpoint_router = http::build_endpoint_router(endpoint_state(&settings));
    let relay_router = http::build_relay_router(relay_state(&settings)?);

    let endpoint_listener = bind(settings.server.endpoint_addr).await?;
    let relay_listener = bind(settings.server.relay_addr).await?;

    info!(
        target = "revalidator::serve",
        endpoint = %settings.server.endpoint_addr,
        relay = %settings.server.relay_addr,
        "listening"
    );

    let endpoint_server = axum::serve(endpoint_listener, endpoint_router.into_make_service());
    let relay_server = axum::serve(relay_listener, relay_router.into_make_service());

    try_join!(endpoint_server, relay_server)
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn run_endpoint(settings: config::Settings) -> Result<(), AppError> {
    let router = http::build_endpoint_router(endpoint_state(&settings));
    let listener = bind(settings.server.endpoint_addr).await?;

    info!(
        target = "revalidator::serve",
        endpoint = %settings.server.endpoint_addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))
}

async fn run_relay(settings: config::Settings) -> Result<(), AppError> {
    let router = http::build_relay_router(relay_state(&settings)?);
    let listener = bind(settings.server.relay_addr).await?;

    info!(
        target = "revalidator::serve",
        relay = %settings.server.relay_addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))
}

async fn run_revalidate(
    settings: config::Settings,
    args: config::RevalidateArgs,
) -> Result<(), AppError> {
    let path = args.path.filter(|path| !path.is_empty());
    let tag = args.tag.filter(|tag| !tag.is_empty());
    if path.is_none() && tag.is_none() {
        return Err(AppError::validation(
            "revalidate requires at least one of --path or --tag",
        ));
    }

    let relay = RelayService::new(&settings.revalidate)?;
    let upstream = relay.relay(path, tag).await?;
    let status = upstream.status;
    let body = upstream.into_success()?;

    let rendered = serde_json::to_string_pretty(&body)
        .map_err(|err| AppError::unexpected(format!("failed to render response: {err}")))?;
    info!(
        target = "revalidator::revalidate",
        status = status.as_u16(),
        "revalidation relayed"
    );
    println!("{rendered}");
    Ok(())
}

fn endpoint_state(settings: &config::Settings) -> EndpointState {
    let cache = PageCache::new(CacheConfig::from(&settings.cache));
    let secret = SharedSecret::from_config(settings.revalidate.secret.as_ref());
    let revalidation = RevalidationService::new(secret, Arc::new(cache.clone()));

    EndpointState {
        revalidation: Arc::new(revalidation),
        cache,
    }
}

fn relay_state(settings: &config::Settings) -> Result<RelayState, AppError> {
    let relay = RelayService::new(&settings.revalidate)?;
    Ok(RelayState {
        relay: Arc::new(relay),
    })
}

async fn bind(addr: std::net::SocketAddr) -> Result<TcpListener, AppError> {
    TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))
}
