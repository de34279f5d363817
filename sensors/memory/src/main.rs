//! sketchysensor-memory: Memory usage event provider for SketchyBar.
//!
//! Registers an event with the bar, then triggers it on a fixed interval with
//! `memory_percent`, `used_memory` and `total_memory` fields. Runs until killed.

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use sketchysensor_core::{
    format, parse_interval_seconds, EventSink, OutputMode, Publisher, PublisherConfig, Sampler,
    SketchybarSink, WriterSink,
};
use sketchysensor_memory::MemorySampler;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for the memory event provider.
#[derive(Parser, Debug)]
#[command(name = "sketchysensor-memory")]
#[command(about = "Memory usage event provider for SketchyBar")]
#[command(version)]
#[command(author)]
#[command(override_usage = "sketchysensor-memory [OPTIONS] <EVENT_NAME> <INTERVAL>\n       sketchysensor-memory --check")]
struct Args {
    /// Name of the event registered with and triggered on the bar
    #[arg(required_unless_present = "check", value_name = "EVENT_NAME")]
    event_name: Option<String>,

    /// Seconds between samples (e.g. 2.0)
    #[arg(required_unless_present = "check", value_name = "INTERVAL", value_parser = parse_interval)]
    interval: Option<Duration>,

    /// One-shot mode (register, publish once and exit)
    #[arg(long)]
    once: bool,

    /// Check sensor availability and exit
    #[arg(long)]
    check: bool,

    /// Where to send events (sketchybar, text, json)
    #[arg(short, long, default_value_t = OutputMode::Sketchybar)]
    output: OutputMode,

    /// SketchyBar executable used with `--output sketchybar`
    #[arg(long, value_name = "PROGRAM", default_value = PublisherConfig::DEFAULT_PROGRAM)]
    sketchybar: PathBuf,

    /// Log debug diagnostics to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn parse_interval(s: &str) -> Result<Duration, String> {
    parse_interval_seconds(s).map_err(|e| e.to_string())
}

/// Parse arguments, printing usage to stdout and exiting with status 1 on failure.
fn parse_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let rendered = e.render().to_string();
            print!("{rendered}");
            if !rendered.contains("Usage:") {
                println!("\n{}", Args::command().render_usage());
            }
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .init();
}

/// Main entry point for the memory event provider.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = parse_args();
    init_tracing(args.verbose);

    if args.check {
        let sampler = MemorySampler::from_host().context("Memory sampler is not available")?;
        return match sampler.check_availability() {
            Ok(()) => {
                let snapshot = sampler.snapshot();
                println!(
                    "Memory sampler is available ({} total, {} byte pages)",
                    format::bytes_to_human(snapshot.total_memory_bytes()),
                    snapshot.page_size()
                );
                Ok(())
            }
            Err(e) => {
                eprintln!("Memory sampler is not available: {}", e);
                process::exit(1);
            }
        };
    }

    let (Some(event_name), Some(interval)) = (args.event_name, args.interval) else {
        println!("{}", Args::command().render_usage());
        process::exit(1);
    };

    let config = PublisherConfig::new(event_name, interval)
        .with_output(args.output)
        .with_program(args.sketchybar);
    if let Err(e) = config.validate() {
        println!("{e}");
        process::exit(1);
    }

    let sampler = MemorySampler::from_host().context("Failed to initialize memory sampler")?;

    let sink: Box<dyn EventSink> = match config.output {
        OutputMode::Sketchybar => Box::new(SketchybarSink::new(config.program.clone())),
        mode => Box::new(WriterSink::stdout(mode)),
    };

    tracing::info!(
        event = %config.event_name,
        interval = ?config.update_interval,
        output = %config.output,
        "publishing memory usage"
    );

    let mut publisher = Publisher::new(config.event_name, sampler, sink);
    publisher
        .run(config.update_interval, args.once.then_some(1))
        .await;

    Ok(())
}
