use clap::Parser;
use gibson_bench::cli::Cli;
use gibson_bench::engine::AggregateStats;
use gibson_bench::{metrics, Benchmark, BenchError, Configuration, GibsonConnector};
use gibson_common::{Config, LoggingConfig};
use hyper::{
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server, StatusCode,
};
use std::convert::Infallible;
use std::fs;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries the progress lines and the report
    if logging.json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(io::stderr))
            .init();
    }

    debug!(json = logging.json, "Logging initialized");
}

async fn metrics_handler(
    req: Request<Body>,
    stats: Arc<AggregateStats>,
) -> Result<Response<Body>, Infallible> {
    match req.uri().path() {
        "/health" => Ok(Response::new(Body::from("OK"))),
        "/metrics" => Ok(Response::new(Body::from(metrics::render(&stats.snapshot())))),
        _ => {
            let mut not_found = Response::new(Body::from("Not Found"));
            *not_found.status_mut() = StatusCode::NOT_FOUND;
            Ok(not_found)
        }
    }
}

async fn run_metrics_server(port: u16, stats: Arc<AggregateStats>, shutdown: CancellationToken) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let make_svc = make_service_fn(move |_conn| {
        let stats = Arc::clone(&stats);
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                metrics_handler(req, Arc::clone(&stats))
            }))
        }
    });

    let server = match Server::try_bind(&addr) {
        Ok(builder) => builder
            .serve(make_svc)
            .with_graceful_shutdown(async move { shutdown.cancelled().await }),
        Err(e) => {
            error!(port = port, error = %e, "Could not bind observability server");
            return;
        }
    };

    info!(port = port, "Observability server online");

    if let Err(e) = server.await {
        error!(error = %e, "Observability server failed");
    }
}

fn load_config(cli: &Cli) -> Result<Config, BenchError> {
    let mut config = match &cli.config {
        Some(path) => {
            let data = fs::read_to_string(path).map_err(|source| BenchError::ConfigRead {
                path: path.clone(),
                source,
            })?;
            Config::from_yaml(&data).map_err(|source| BenchError::ConfigParse {
                path: path.clone(),
                source,
            })?
        }
        None => Config::default(),
    };
    cli.apply(&mut config);
    Ok(config)
}

fn progress(message: &str) {
    print!("{}", message);
    let _ = io::stdout().flush();
}

async fn run(config: Config) -> Result<(), BenchError> {
    let configuration = Configuration::from_config(&config.bench)?;
    let connector = GibsonConnector::new(configuration.endpoint.clone(), configuration.timeout);
    let benchmark = Benchmark::new(configuration, connector);
    let shutdown = CancellationToken::new();

    if config.metrics.enabled {
        let port = config.metrics.port;
        let stats = benchmark.stats();
        let token = shutdown.clone();
        tokio::spawn(async move {
            run_metrics_server(port, stats, token).await;
        });
    }

    if benchmark.has_prelude() {
        progress("Executing pre operations ... ");
        benchmark.prelude().await?;
        progress("Done.\n");
    }

    progress("Benchmark running ... ");
    let report = benchmark.run().await;
    println!("Done.\n");
    println!("{}", report);

    shutdown.cancel();
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.logging);

    // Error and timeout counts never change the exit status once a report
    // has been printed.
    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ BenchError::Prelude { .. }) => {
            error!(error = %e, "Benchmark aborted");
            println!("\nERROR: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "Benchmark aborted");
            println!("{}", e);
            ExitCode::FAILURE
        }
    }
}
