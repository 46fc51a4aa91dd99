//! Snapshot Updater CLI - Main entry point for CLI binary
//!
//! Checks the published dataset version, downloads and verifies new
//! snapshots, and reports what changed between generations.

use anyhow::Context;
use clap::Parser;
use snapshot_updater::engine::{
    cli::{formatter::{format_size, CliFormatter}, Cli, Commands, DiffArgs, OutputFormat},
    report,
    updater::{EventSink, UpdateEvent, Updater},
    DiffReport, SnapshotSchema,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level());

    let json_output = cli.format == OutputFormat::Json;
    let (sink, rx) = EventSink::channel();
    let printer = tokio::spawn(print_events(rx, json_output));

    let outcome = run_cli(cli, sink).await;
    // every sender is gone once run_cli returns, so the printer drains and exits
    let _ = printer.await;

    match outcome {
        Ok(Some(output)) => println!("{}", output),
        Ok(None) => {}
        Err(e) => {
            CliFormatter::error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn print_events(mut rx: UnboundedReceiver<UpdateEvent>, json: bool) {
    while let Some(event) = rx.recv().await {
        if json {
            continue;
        }
        CliFormatter::event(&event);
    }
}

async fn run_cli(cli: Cli, sink: EventSink) -> anyhow::Result<Option<String>> {
    let config = cli.build_config().context("invalid configuration")?;
    let json = cli.format == OutputFormat::Json;
    let mut updater = Updater::new(config)?.with_events(sink);

    match cli.command {
        Commands::Check => {
            let check = updater.check_for_update().await?;
            if json {
                return Ok(Some(serde_json::to_string_pretty(&serde_json::json!({
                    "needUpdate": check.needs_update,
                    "version": check.versions,
                }))?));
            }
            Ok(None)
        }
        Commands::Download { force } => {
            let downloaded = if force {
                updater.download_now().await?;
                true
            } else {
                updater.download().await?
            };
            download_summary(&updater, downloaded, json)
        }
        Commands::Diff(args) => {
            let report = updater.make_diff(args.options())?;
            render_report(&report, &args, json)
        }
        Commands::Update(args) => {
            if !updater.download().await? {
                return download_summary(&updater, false, json);
            }
            let report = updater.make_diff(args.options())?;
            render_report(&report, &args, json)
        }
    }
}

fn download_summary(updater: &Updater, downloaded: bool, json: bool) -> anyhow::Result<Option<String>> {
    let path = updater.next_database();
    if json {
        return Ok(Some(serde_json::to_string_pretty(&serde_json::json!({
            "downloaded": downloaded,
            "path": path,
        }))?));
    }
    if downloaded {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        CliFormatter::kv("snapshot", &path.display().to_string());
        CliFormatter::kv("size", &format_size(size));
    }
    Ok(None)
}

fn render_report(report: &DiffReport, args: &DiffArgs, json: bool) -> anyhow::Result<Option<String>> {
    if let Some(html_path) = &args.html {
        let html = report::render_html(report, &SnapshotSchema::default());
        std::fs::write(html_path, html)
            .with_context(|| format!("failed to write {}", html_path.display()))?;
        if !json {
            CliFormatter::success(&format!("HTML report written to {}", html_path.display()));
        }
    }

    if json {
        Ok(Some(report::render_json(report)?))
    } else {
        Ok(Some(report::render_text(report)))
    }
}
