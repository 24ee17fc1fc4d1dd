use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand, ValueEnum};
use sentix_client::{IngestOptions, NewsFlow};
use sentix_core::analytics::format::{format_window, relative_time};
use sentix_core::analytics::news::{
    articles_to_csv, clamp_window, filter_articles, live_summary, merge_keywords, rss_overall, search_presets,
    ArticleSort, Bucket, LiveSummary, DEFAULT_WINDOW_MINUTES,
};
use sentix_core::analytics::{clamp01, clamp_text, pct};
use sentix_protocol::{ArticleAnalysis, RssIngestRequest, RssIngestResponse, Sentiment};

use super::LabelArg;
use crate::render::{bar, counts_line, print_json, table};
use crate::Ctx;

#[derive(Subcommand, Clone)]
pub enum NewsCmd {
    /// Ingest RSS feeds and classify their articles
    Rss(RssArgs),
    /// Analyze a single news article
    Article(ArticleArgs),
    /// Live sentiment snapshot over a recent window
    Live(LiveArgs),
}

#[derive(Args, Clone)]
pub struct RssArgs {
    /// Feed URL; repeat for several feeds. Defaults to the built-in feeds
    #[arg(long = "feed")]
    pub feeds: Vec<String>,
    /// Articles per feed
    #[arg(long, default_value_t = RssIngestRequest::DEFAULT_LIMIT_PER_FEED)]
    pub limit: u32,
    /// Ask the backend for a short narrative per article
    #[arg(long)]
    pub narrative: bool,
    /// Comma-separated keywords to filter articles by
    #[arg(long)]
    pub keywords: Option<String>,
    /// Only show articles with this label
    #[arg(long, value_enum)]
    pub label: Option<LabelArg>,
    /// Sort order of the article list
    #[arg(long, value_enum, default_value_t = SortArg::Published)]
    pub sort: SortArg,
    /// Write the (filtered) articles to a CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
    /// List feed presets matching a query and exit
    #[arg(long)]
    pub presets: Option<String>,
}

#[derive(Args, Clone)]
pub struct ArticleArgs {
    pub url: String,
    /// Skip the generated narrative
    #[arg(long)]
    pub no_narrative: bool,
}

#[derive(Args, Clone)]
pub struct LiveArgs {
    /// Window in minutes (5 minutes to 1 year)
    #[arg(long, default_value_t = DEFAULT_WINDOW_MINUTES)]
    pub window: u32,
}

#[derive(ValueEnum, Clone, Copy)]
pub enum SortArg {
    Published,
    ConfDesc,
    ConfAsc,
}

impl From<SortArg> for ArticleSort {
    fn from(s: SortArg) -> Self {
        match s {
            SortArg::Published => ArticleSort::PublishedDesc,
            SortArg::ConfDesc => ArticleSort::ConfidenceDesc,
            SortArg::ConfAsc => ArticleSort::ConfidenceAsc,
        }
    }
}

pub async fn run(ctx: &Ctx, cmd: &NewsCmd) -> Result<()> {
    let flow = NewsFlow::new(ctx.api.clone());
    match cmd {
        NewsCmd::Rss(args) => cmd_rss(ctx, &flow, args).await,
        NewsCmd::Article(args) => {
            let out = flow.article(&args.url, !args.no_narrative).await?;
            if ctx.json {
                print_json(&out);
            } else {
                print!("{}", article_report(&out));
            }
            Ok(())
        }
        NewsCmd::Live(args) => {
            let items = flow.live(args.window).await?;
            if ctx.json {
                print_json(&items);
            } else {
                print!("{}", live_report(&live_summary(&items, Utc::now()), args.window));
            }
            Ok(())
        }
    }
}

async fn cmd_rss(ctx: &Ctx, flow: &NewsFlow, args: &RssArgs) -> Result<()> {
    if let Some(q) = &args.presets {
        for (name, url, tag) in search_presets(q) {
            println!("{name} [{tag}]\n  {url}");
        }
        return Ok(());
    }
    let opts = IngestOptions {
        feeds: args.feeds.clone(),
        limit_per_feed: args.limit,
        narrative: args.narrative,
        keywords: args
            .keywords
            .as_deref()
            .map(|k| merge_keywords(&[], k))
            .unwrap_or_default(),
    };
    let out = flow.ingest(opts).await?;
    let articles = filter_articles(&out.items, args.label.map(Sentiment::from), args.sort.into());

    if let Some(path) = &args.csv {
        let owned: Vec<_> = articles.iter().map(|a| (*a).clone()).collect();
        let csv = articles_to_csv(&owned).context("encode csv")?;
        std::fs::write(path, csv).with_context(|| format!("write {}", path.display()))?;
        eprintln!("wrote {} articles to {}", owned.len(), path.display());
    }
    if ctx.json {
        print_json(&out);
        return Ok(());
    }
    print!("{}", rss_report(&out, articles.len()));
    let now = Utc::now();
    let rows: Vec<Vec<String>> = articles
        .iter()
        .map(|a| {
            vec![
                a.sentiment_label().as_str().to_string(),
                a.confidence.map(|c| pct(clamp01(c))).unwrap_or_else(|| "—".into()),
                relative_time(a.published_at.as_deref(), now),
                clamp_text(a.title.as_deref().unwrap_or("(untitled)"), 70),
            ]
        })
        .collect();
    if !rows.is_empty() {
        println!("\n{}", table(&["label", "conf", "published", "title"], &rows));
    }
    Ok(())
}

fn rss_report(out: &RssIngestResponse, shown: usize) -> String {
    let mut s = String::new();
    let overall = rss_overall(&out.summary.counts);
    let _ = writeln!(s, "{} (score {:+.2})", overall.label, overall.score);
    let _ = writeln!(s, "Counts: {}", counts_line(&out.summary.counts));
    if let Some(model) = out.model_used.as_deref() {
        let _ = writeln!(s, "Model: {model}");
    }
    let _ = writeln!(s, "Articles: {} ingested, {} shown", out.items.len(), shown);
    s
}

fn article_report(a: &ArticleAnalysis) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "{}", a.title());
    if let Some(site) = a.site() {
        let _ = writeln!(s, "{site}");
    }
    if let Some(url) = a.url() {
        let _ = writeln!(s, "{url}");
    }
    let _ = writeln!(s, "\nSentiment: {} ({} confidence)", a.sentiment(), pct(clamp01(a.confidence)));
    for class in Sentiment::ALL {
        let share = a.distribution.share(class);
        let _ = writeln!(s, "  {:<8} {} {}", class.as_str(), bar(share, 24), pct(share));
    }
    if let Some(n) = a.narrative.as_deref().filter(|n| !n.trim().is_empty()) {
        let _ = writeln!(s, "\n{n}");
    }
    s
}

fn live_report(summary: &LiveSummary, window: u32) -> String {
    let mut s = String::new();
    let _ = writeln!(
        s,
        "Last {}: {} items  avg score {:+.2}  AI-analyzed {} ({}%)",
        format_window(clamp_window(window)),
        summary.total,
        summary.avg_score,
        summary.ai_count,
        summary.ai_pct
    );
    let _ = writeln!(s, "Counts: {}", counts_line(&summary.counts));
    if summary.total == 0 {
        return s;
    }
    let section = |s: &mut String, title: &str, buckets: &[Bucket]| {
        let max = buckets.iter().map(|b| b.count).max().unwrap_or(0).max(1);
        let _ = writeln!(s, "\n{title}:");
        for b in buckets {
            let _ = writeln!(
                s,
                "  {:<16} {} {}",
                clamp_text(&b.label, 16),
                bar(f64::from(b.count) / f64::from(max), 16),
                b.count
            );
        }
    };
    section(&mut s, "Score histogram", &summary.histogram);
    section(&mut s, "Recency", &summary.recency);
    section(&mut s, "Top domains", &summary.domains);
    section(&mut s, "Title keywords", &summary.keywords);
    if !summary.by_source.is_empty() {
        let rows: Vec<Vec<String>> = summary
            .by_source
            .iter()
            .map(|a| vec![a.source.clone(), format!("{:+.2}", a.avg), a.n.to_string()])
            .collect();
        let _ = writeln!(s, "\nBy source:\n{}", table(&["source", "avg", "n"], &rows));
    }
    s
}
