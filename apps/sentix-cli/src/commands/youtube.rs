use std::fmt::Write as _;

use anyhow::{bail, Result};
use clap::Args;
use sentix_client::YoutubeFlow;
use sentix_core::analytics::format::fmt_time;
use sentix_core::analytics::timeline::{
    build_transcript, combined_summary, confidence_by_label, headline, length_histogram, per_minute,
    rolling_band, segment_counts, segment_timeline,
};
use sentix_core::analytics::{clamp01, pct};
use sentix_protocol::{AnalysisResult, YoutubeAnalysis};
use tracing::warn;

use crate::render::{bar, counts_line, print_json, table};
use crate::Ctx;

#[derive(Args, Clone)]
pub struct YoutubeArgs {
    /// Video URL (youtube.com/watch, youtu.be or /shorts/); defaults to the last one used
    pub url: Option<String>,
    /// Also run a deep analysis over the whole transcript
    #[arg(long)]
    pub deep: bool,
    /// Print the assembled transcript
    #[arg(long)]
    pub transcript: bool,
}

pub async fn cmd_youtube(ctx: &Ctx, args: &YoutubeArgs) -> Result<()> {
    let flow = YoutubeFlow::new(ctx.api.clone(), ctx.prefs());
    let Some(url) = args.url.clone().or_else(|| flow.last_url()) else {
        bail!("Please paste a YouTube link.");
    };
    let analysis = flow.fetch(&url).await?;
    let deep = if args.deep {
        match flow.analyze_transcript(&analysis).await {
            Ok(d) => Some(d),
            Err(err) => {
                warn!(error = %err, "transcript deep analysis failed");
                eprintln!("Deep analysis unavailable: {err}");
                None
            }
        }
    } else {
        None
    };

    if ctx.json {
        print_json(&serde_json::json!({ "stream": analysis, "deep": deep }));
        return Ok(());
    }
    print!("{}", report(&analysis, deep.as_ref()));
    if args.transcript {
        println!("\nTranscript:\n{}", build_transcript(&analysis.segments));
    }
    Ok(())
}

fn report(analysis: &YoutubeAnalysis, deep: Option<&AnalysisResult>) -> String {
    let mut out = String::new();
    let head = headline(analysis, deep);
    if let Some(id) = analysis.video_id() {
        let _ = writeln!(out, "Video: {id}");
    }
    let _ = writeln!(out, "Overall: {} ({} confidence)", head.label, pct(head.confidence));
    let _ = writeln!(out, "Segments: {}", counts_line(&segment_counts(&analysis.segments)));

    let points = segment_timeline(analysis);
    let band = rolling_band(&points);
    if let (Some(first), Some(last)) = (band.first(), band.last()) {
        let _ = writeln!(
            out,
            "Rolling mean: {:+.2} at {} → {:+.2} at {}",
            first.mean,
            fmt_time(first.t),
            last.mean,
            fmt_time(last.t)
        );
    }

    let minutes = per_minute(&points);
    if !minutes.is_empty() {
        let rows: Vec<Vec<String>> = minutes
            .iter()
            .map(|m| {
                vec![
                    fmt_time((m.minute * 60) as f64),
                    m.pos.to_string(),
                    m.neu.to_string(),
                    m.neg.to_string(),
                ]
            })
            .collect();
        let _ = writeln!(out, "\nPer minute:\n{}", table(&["minute", "pos", "neu", "neg"], &rows));
    }

    let lengths = length_histogram(&points);
    if let Some(max) = lengths.iter().map(|b| b.count).max().filter(|m| *m > 0) {
        let _ = writeln!(out, "\nSegment length (chars):");
        for b in &lengths {
            let _ = writeln!(
                out,
                "  {:>9} {} {}",
                b.label,
                bar(f64::from(b.count) / f64::from(max), 20),
                b.count
            );
        }
    }

    let by_label = confidence_by_label(&points);
    if !by_label.is_empty() {
        let _ = writeln!(out, "\nConfidence by label:");
        for c in &by_label {
            let _ = writeln!(out, "  {:<8} {} (n={})", c.label.as_str(), pct(clamp01(c.avg)), c.n);
        }
    }

    let _ = writeln!(out, "\n{}", combined_summary(analysis, deep));
    out
}
