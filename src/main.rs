//! Fitloop - virtual try-on CLI and proxy.

mod adapters;
mod cassette;
mod category;
mod cli;
mod config;
mod context;
mod encode;
mod error;
mod model;
mod output;
mod poll;
mod ports;
mod request;
mod server;

use std::path::Path;
use std::process;

use clap::Parser;

use crate::adapters::live::proxy::ProxyJobService;
use crate::cli::{Cli, Command, HealthArgs, ServeArgs, TryOnArgs};
use crate::config::Config;
use crate::context::{Route, ServiceContext};
use crate::error::{AppError, JobError};
use crate::model::resolve_variant;
use crate::request::TryOnRequest;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config_path = config::discover_config_path(cli.config.as_deref());
    let config = Config::load(&config_path).map_err(AppError::Config)?;

    match cli.command {
        Command::TryOn(args) => try_on(&args, &config).await,
        Command::Serve(args) => serve(&args, &config).await,
        Command::Health(args) => health(&args, &config).await,
    }
}

async fn try_on(args: &TryOnArgs, config: &Config) -> Result<(), AppError> {
    let variant = resolve_variant(&args.model).map_err(AppError::InvalidArgument)?;
    log::debug!("model: {variant:?} (resolved from '{}')", args.model);

    let request = TryOnRequest {
        subject: args.read_person()?,
        garments: args.read_garments()?,
        category: args.category.clone(),
        variant,
        max_dimension: args.max_dimension,
    };
    let options = config.poll_options(args.interval_ms, args.max_attempts);

    let route = if args.direct {
        Route::Direct
    } else {
        Route::Proxy(args.proxy.clone().unwrap_or_else(|| config.proxy_url()))
    };

    // Live / recording / replaying
    let replay_path = std::env::var("FITLOOP_REPLAY").ok();
    let is_recording = std::env::var("FITLOOP_REC").is_ok_and(|v| v == "true" || v == "1");

    let (ctx, recording_session) = if let Some(ref cassette_path) = replay_path {
        log::debug!("replaying from {cassette_path}");
        (ServiceContext::replaying(Path::new(cassette_path))?, None)
    } else if is_recording {
        log::debug!("recording mode enabled");
        let (ctx, session) = ServiceContext::recording(&route, config)?;
        (ctx, Some(session))
    } else {
        (ServiceContext::live(&route, config)?, None)
    };

    let outcome = tokio::select! {
        result = poll::submit_and_await(ctx.jobs.as_ref(), &request, &options) => result,
        _ = tokio::signal::ctrl_c() => Err(JobError::Aborted("interrupted".into())),
    };
    drop(ctx);

    // The cassette is written even when the job failed.
    if let Some(session) = recording_session {
        match session.finish() {
            Ok(path) => log::info!("cassette saved: {}", path.display()),
            Err(e) => log::warn!("failed to save cassette: {e}"),
        }
    }

    let artifact = outcome?;
    for url in &artifact.urls {
        if url.starts_with("data:") {
            println!("{}", output::summarize_data_uri(url));
        } else {
            println!("{url}");
        }
    }

    if args.output.is_some() || args.save {
        let client = reqwest::Client::builder().timeout(config.request_timeout()).build()?;
        let saved = output::save_artifact(
            &client,
            &artifact,
            args.output.as_deref(),
            &args.output_label(),
        )
        .await?;
        for path in saved {
            eprintln!("Saved: {}", path.display());
        }
    }

    Ok(())
}

async fn serve(args: &ServeArgs, config: &Config) -> Result<(), AppError> {
    let host = args.host.as_deref().unwrap_or(&config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    server::serve(config, host, port).await
}

async fn health(args: &HealthArgs, config: &Config) -> Result<(), AppError> {
    let url = args.proxy.clone().unwrap_or_else(|| config.proxy_url());
    let proxy = ProxyJobService::new(&url, config.request_timeout())?;
    let report = proxy.health().await?;

    println!("status: {}", report.status);
    println!("api key configured: {}", if report.api_key_configured { "yes" } else { "no" });
    if !report.api_key_configured {
        log::warn!("the proxy at {url} has no Replicate key; try-on calls will be refused");
    }
    Ok(())
}
