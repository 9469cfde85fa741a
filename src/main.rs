mod cli;
mod estimator;
mod health;
mod ocv;
mod prelude;
mod quantity;
mod render;
mod sample;
mod twin;

use std::{
    fs::File,
    io::{BufRead, BufReader, stdin},
    sync::Arc,
    time::Duration,
};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::{
    cli::{Args, Command, OcvArgs, TrackArgs},
    ocv::provider::OcvProvider,
    prelude::*,
    render::{build_ocv_table, build_summary_table},
    sample::Sample,
    twin::{CellTwin, Estimate},
};

#[tokio::main]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Args::parse().command {
        Command::Track(args) => track(*args).await,
        Command::Ocv(args) => ocv(*args).await,
    }
}

/// Replay the sample stream through the twin, one JSON estimate per line.
///
/// Estimates go to the standard output, logs to the standard error. Broken
/// lines and rejected samples are logged and skipped; the stream keeps going.
async fn track(args: TrackArgs) -> Result {
    let provider =
        Arc::new(OcvProvider::new(args.model.parameter_set, args.cell.rated_capacity()));
    let build = provider.spawn_build(
        args.model.cache_path.clone(),
        Duration::from_secs(args.model.build_timeout_seconds),
    );

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?,
        )),
        None => Box::new(BufReader::new(stdin())),
    };

    let mut twin = CellTwin::new(&args, Arc::clone(&provider));
    let mut last: Option<Estimate> = None;
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.context("failed to read the sample stream")?;
        if line.trim().is_empty() {
            continue;
        }
        let sample: Sample = match serde_json::from_str(&line) {
            Ok(sample) => sample,
            Err(error) => {
                warn!(line_number, %error, "skipping an unparseable sample");
                continue;
            }
        };
        match twin.step(&sample) {
            Ok(estimate) => {
                println!("{}", serde_json::to_string(&estimate)?);
                last = Some(estimate);
            }
            Err(error) => {
                warn!(line_number, error = format!("{error:#}"), "skipping a rejected sample");
            }
        }
    }

    if args.summary {
        println!("{}", build_summary_table(&twin, last.as_ref()));
    }
    build.abort();
    Ok(())
}

/// Build or load the OCV model and render the table.
async fn ocv(args: OcvArgs) -> Result {
    let provider =
        Arc::new(OcvProvider::new(args.model.parameter_set, args.cell.rated_capacity()));
    provider
        .spawn_build(
            args.model.cache_path.clone(),
            Duration::from_secs(args.model.build_timeout_seconds),
        )
        .await
        .context("the model build task failed")?;

    let status = provider.status();
    let points = provider
        .export()
        .with_context(|| format!("the OCV model is not available: {}", status.status))?;
    info!(source = %status.source, n_points = points.len(), "rendering the OCV model");
    println!("{}", build_ocv_table(&points, &status));
    Ok(())
}
