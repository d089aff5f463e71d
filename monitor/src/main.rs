use anyhow::Context;
use clap::Parser;
use display::bridge::DisplayBridge;
use replay::capture::load_capture;
use seisfeed::prelude::{DEFAULT_ENDPOINT, DEFAULT_STATION};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use workflow::config::MonitorConfig;
use workflow::runner::Runner;

mod display;
mod replay;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Follows a live seismic telemetry feed")]
struct Args {
    /// Load the monitor config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    #[arg(long, default_value = DEFAULT_STATION)]
    station: String,
    /// Use a constant reconnect delay instead of exponential backoff
    #[arg(long)]
    fixed_delay_ms: Option<u64>,
    /// Stop after this many seconds
    #[arg(long)]
    duration_secs: Option<u64>,
    /// Expose the latest display model over HTTP
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Replay a JSON-lines capture instead of connecting to the feed
    #[arg(long)]
    replay: Option<PathBuf>,
    /// Append a session summary to this file on exit
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = args.config {
        MonitorConfig::load(path)?
    } else {
        MonitorConfig::from_args(args.endpoint, args.station, args.fixed_delay_ms)
    };
    if args.duration_secs.is_some() {
        config.duration_secs = args.duration_secs;
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if args.report.is_some() {
        config.report = args.report;
    }

    let runner = Runner::new(config.clone());
    let bridge = Arc::new(DisplayBridge::new());

    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime for the feed")?;

    let summary = runtime.block_on(async {
        if args.serve {
            bridge.serve(config.bind)?;
        }
        match args.replay {
            Some(path) => {
                let frames = load_capture(&path)?;
                bridge.publish_status(&format!(
                    "replaying {} frames from {}",
                    frames.len(),
                    path.display()
                ));
                runner.run_replay(frames, bridge.clone()).await
            }
            None => runner.run_live(bridge.clone()).await,
        }
    })?;

    let report = summary.report_line();
    print!("[FEED] session summary: {}", report);
    if let Some(report_path) = config.report {
        if let Some(parent) = report_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&report_path)
            .with_context(|| format!("opening report {}", report_path.display()))?;
        file.write_all(report.as_bytes())?;
    }

    Ok(())
}
