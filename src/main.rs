mod cli;

use carton::{
    catalog::InlineCatalog,
    config,
    processor::{Dispatcher, Outcome, RequestProcessor},
};
use carton_core::events::EventBus;
use carton_core::Request;
use carton_pipeline::provision::memory::MemoryProvisioner;
use carton_pipeline::{ProgressWriter, StepOutput};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "carton=trace,carton_pipeline=trace,carton_parser=trace,carton_core=debug".to_string()
        } else {
            "carton=debug,carton_pipeline=debug".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Parse {
            category,
            action,
            target,
            json,
        } => parse_request(&category, &action, &target, json),
        Commands::Run {
            category,
            action,
            target,
            image,
            dry_run,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_request(
                Request::new(target, category, action),
                image,
                dry_run,
                cli.config.as_deref(),
            ))
        }
        Commands::Serve => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve(cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("carton {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn parse_request(category: &str, action: &str, target: &str, json: bool) -> Result<()> {
    let op = carton_parser::parse(category, action, target)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&op)?);
    } else {
        println!("Operation: {}", op.kind());
        println!("Target: {}", op.name());
        println!("Hard: {}", op.hard());
    }

    Ok(())
}

async fn run_request(
    request: Request,
    image: Option<String>,
    dry_run: bool,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    let mut catalog = InlineCatalog::new(config.defaults.clone());
    if let Some(image) = image {
        catalog = catalog.with_image(image);
    }

    tracing::info!("Using in-memory provisioner");
    let dispatcher = Dispatcher::new(Arc::new(catalog), Arc::new(MemoryProvisioner::new()))
        .with_progress(ProgressWriter::new(std::io::stdout()))
        .with_dry_run(dry_run || config.processor.dry_run);

    match dispatcher.dispatch(request).await {
        Outcome::Planned(steps) => {
            println!("\n[DRY RUN] Would execute {} steps", steps.len());
            for (i, step) in steps.iter().enumerate() {
                println!("  {}. {}", i + 1, step);
            }
            Ok(())
        }
        Outcome::Committed(report) => {
            println!("\nRun {} {}", report.run_id, report.state);
            for (i, step) in report.steps.iter().enumerate() {
                println!("  {}. {}: {}", i + 1, step.name, step.summary);
            }
            if let StepOutput::Image(image) = &report.output {
                println!("Image: {image}");
            }
            Ok(())
        }
        Outcome::Rejected(e) => Err(e).context("Request rejected"),
        Outcome::Failed(e) => Err(e).context("Operation failed and was rolled back"),
    }
}

async fn serve(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let events = Arc::new(EventBus::default());

    tracing::info!("Starting carton request processor");
    tracing::info!("Using in-memory provisioner");

    let dispatcher = Dispatcher::new(
        Arc::new(InlineCatalog::new(config.defaults.clone())),
        Arc::new(MemoryProvisioner::new()),
    )
    .with_events(Arc::clone(&events))
    .with_progress(ProgressWriter::new(std::io::stderr()));

    // Log lifecycle events as JSON
    let mut event_rx = events.subscribe();
    let event_handle = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => tracing::info!(target: "carton::events", "{json}"),
                    Err(e) => tracing::warn!("Failed to serialize event: {e}"),
                },
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("Event log lagging, skipped {missed} events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let (request_tx, request_rx) = tokio::sync::mpsc::channel(config.processor.queue_capacity);
    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    let processor = RequestProcessor::new(dispatcher, &config.processor, request_rx, shutdown_rx);
    let processor_handle = tokio::spawn(processor.run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                let _ = shutdown_tx.send(()).await;
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Request>(&line) {
                    Ok(request) => {
                        if request_tx.send(request).await.is_err() {
                            tracing::warn!("Request processor stopped; dropping input");
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Skipping malformed request: {e}"),
                }
            }
        }
    }

    // Closing the queue lets the processor drain and stop.
    drop(request_tx);
    let handled = processor_handle.await?;
    drop(events);
    let _ = event_handle.await;

    tracing::info!("Handled {handled} requests");
    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!(
                "  Processor: {} concurrent, queue {}",
                config.processor.max_concurrent, config.processor.queue_capacity
            );
            println!("  Dry run: {}", config.processor.dry_run);
            println!("  Default provider: {}", config.defaults.provider);
            println!("  Default compute: {}", config.defaults.compute);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Default provider: {}", config.defaults.provider);
        }
    }

    Ok(())
}
