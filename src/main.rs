use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use serpwatch::simulate;
use serpwatch::{MonitorConfig, SerpMonitor};

#[derive(Parser)]
#[command(name = "serpwatch", version, about = "SERP detection and attribution runtime")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a JSON navigation trace through the pipeline and print the
    /// resulting registry of active SERP tabs.
    Simulate {
        /// Path to the trace file.
        trace: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Simulate { trace } => run_simulate(trace).await,
    }
}

async fn run_simulate(trace: PathBuf) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(&trace)
        .with_context(|| format!("reading {}", trace.display()))?;
    let steps = simulate::parse_trace(&json)?;

    let mut monitor = SerpMonitor::new(&MonitorConfig::default());
    monitor.activate();

    let dispatcher = monitor.dispatcher();
    simulate::replay(&dispatcher, &steps)?;

    // Let the ingest loop drain the bus before reading the registry.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut entries = monitor.registry().snapshot();
    entries.sort_by(|(a, _), (b, _)| a.0.cmp(&b.0));
    for (tab, info) in entries {
        println!(
            "{}",
            serde_json::json!({
                "tab": tab.0,
                "url": info.url,
                "code": info.code,
                "sap": info.sap,
            })
        );
    }

    monitor.deactivate().await;
    Ok(())
}
