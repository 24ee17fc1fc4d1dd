use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use sentix_client::{NewsFlow, SentixApi};
use sentix_core::analytics::format::format_window;
use sentix_core::analytics::news::{
    clamp_window, live_summary, LiveSummary, DEFAULT_WINDOW_MINUTES, PRESET_WINDOWS, REFRESH_OPTIONS,
};
use sentix_core::{friendly_error, load_config, load_effective_config};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    name = "sentix-live",
    version,
    about = "Terminal watcher for the live news sentiment snapshot"
)]
struct Args {
    /// API base URL (overrides SENTIX_API_BASE and the config file)
    #[arg(long)]
    base: Option<String>,
    /// Config file (TOML)
    #[arg(long, env = "SENTIX_CONFIG")]
    config: Option<String>,
    /// Window in minutes (5 minutes to 1 year) or a preset such as "6 hours"
    #[arg(long, default_value_t = DEFAULT_WINDOW_MINUTES, value_parser = parse_window)]
    window: u32,
    /// Seconds between refreshes: 15, 30 or 60
    #[arg(long, default_value_t = 30, value_parser = parse_refresh)]
    refresh: u64,
    /// Print the raw items as JSON on every refresh instead of a summary line
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Take one snapshot and exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

fn parse_window(raw: &str) -> Result<u32, String> {
    let raw = raw.trim();
    if let Ok(minutes) = raw.parse::<u32>() {
        return Ok(minutes);
    }
    PRESET_WINDOWS
        .iter()
        .find(|(label, _)| label.eq_ignore_ascii_case(raw))
        .map(|(_, minutes)| *minutes)
        .ok_or_else(|| {
            let labels: Vec<&str> = PRESET_WINDOWS.iter().map(|(l, _)| *l).collect();
            format!("expected minutes or one of: {}", labels.join(", "))
        })
}

fn parse_refresh(raw: &str) -> Result<u64, String> {
    let secs: u64 = raw.parse().map_err(|_| format!("not a number: {raw}"))?;
    if REFRESH_OPTIONS.contains(&secs) {
        Ok(secs)
    } else {
        Err(format!("refresh must be one of {REFRESH_OPTIONS:?}"))
    }
}

fn kpi_line(summary: &LiveSummary, window: u32) -> String {
    let now = Local::now().format("%H:%M:%S");
    let top_source = summary
        .by_source
        .first()
        .map(|s| format!(" top={}({:+.2})", s.source, s.avg))
        .unwrap_or_default();
    format!(
        "[{now}] {} items={} pos={} neu={} neg={} avg={:+.2} ai={}%{}",
        format_window(window),
        summary.total,
        summary.counts.positive,
        summary.counts.neutral,
        summary.counts.negative,
        summary.avg_score,
        summary.ai_pct,
        top_source
    )
}

/// One refresh. Failures are reported and the next tick tries again.
async fn tick(flow: &NewsFlow, args: &Args, window: u32) {
    match flow.live(window).await {
        Ok(items) => {
            if args.json {
                println!("{}", serde_json::to_string(&items).unwrap_or_else(|_| "[]".to_string()));
            } else {
                println!("{}", kpi_line(&live_summary(&items, Utc::now()), window));
            }
        }
        Err(err) => {
            warn!(error = %err, "live snapshot failed");
            eprintln!("[live] {}", friendly_error(&err.to_string()));
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    sentix_otel::init_with_default("warn");
    let args = Args::parse();
    let cfg = match args.config.as_deref() {
        Some(path) => load_config(path).with_context(|| format!("load config {path}"))?,
        None => load_effective_config(),
    };
    let api = SentixApi::from_config(args.base.as_deref(), &cfg).context("build http client")?;
    let flow = NewsFlow::new(Arc::new(api));
    let window = clamp_window(args.window);
    info!(window, refresh = args.refresh, "watching live news");

    // Ticks never overlap; the sleep starts after the snapshot returns.
    loop {
        tick(&flow, &args, window).await;
        if args.once {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = tokio::time::sleep(Duration::from_secs(args.refresh)) => {}
        }
    }
}
