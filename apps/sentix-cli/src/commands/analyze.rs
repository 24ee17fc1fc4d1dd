use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use sentix_client::session::SAMPLE_TEXT;
use sentix_client::{AnalysisSession, SingleOutcome, UploadFile};
use sentix_core::analytics::batch::RowFilter;
use sentix_core::upload::upload_preview;
use sentix_protocol::PredictRequest;

use super::LabelArg;
use crate::render::{analysis_report, batch_report, deep_rows_report, print_json};
use crate::Ctx;

const MAX_BATCH_ROWS: usize = 20;

#[derive(Args, Clone)]
pub struct PredictArgs {
    /// Text to classify
    pub text: String,
    /// Model id (defaults to the server default)
    #[arg(long)]
    pub model: Option<String>,
}

#[derive(Args, Clone)]
pub struct AnalyzeArgs {
    /// Text to analyze
    #[arg(conflicts_with_all = ["file", "sample", "reuse_last"])]
    pub text: Option<String>,
    /// CSV/XLSX file to run through /batch
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,
    /// Model id (defaults to the server default)
    #[arg(long)]
    pub model: Option<String>,
    /// Comma-separated models to compare side by side on the uploaded file
    #[arg(long, requires = "file")]
    pub models: Option<String>,
    /// After a batch upload, deep-analyze every row
    #[arg(long, requires = "file")]
    pub deep_all: bool,
    /// Analyze the built-in sample text
    #[arg(long)]
    pub sample: bool,
    /// Analyze the most recent text from history
    #[arg(long)]
    pub reuse_last: bool,
    /// Only list batch rows containing this text
    #[arg(long, requires = "file")]
    pub query: Option<String>,
    /// Only list batch rows whose best label matches
    #[arg(long, value_enum, requires = "file")]
    pub label: Option<LabelArg>,
}

#[derive(Args, Clone)]
pub struct AnalyzeRowArgs {
    /// Row text taken from a batch result
    pub text: String,
    /// Model id (defaults to the server default)
    #[arg(long)]
    pub model: Option<String>,
}

async fn session(ctx: &Ctx, model: Option<&str>) -> AnalysisSession {
    let mut session = AnalysisSession::new(ctx.api.clone(), ctx.history(), ctx.prefs())
        .with_deep_concurrency(ctx.cfg.deep_concurrency());
    match model.or(ctx.cfg.api.model.as_deref()) {
        Some(m) => session.select_model(m),
        None => {
            session.load_models().await;
        }
    }
    session
}

pub async fn cmd_predict(ctx: &Ctx, args: &PredictArgs) -> Result<()> {
    let s = session(ctx, args.model.as_deref()).await;
    let req = PredictRequest::fast(&args.text, s.model());
    let result = ctx
        .api
        .predict(&req, ctx.api.timeouts().predict, None)
        .await
        .context("predict")?;
    if ctx.json {
        print_json(&result);
    } else {
        print!("{}", analysis_report(&result));
    }
    Ok(())
}

pub async fn cmd_analyze(ctx: &Ctx, args: &AnalyzeArgs) -> Result<()> {
    let s = session(ctx, args.model.as_deref()).await;
    if let Some(path) = &args.file {
        return analyze_file(ctx, &s, path, args).await;
    }

    let text = if args.sample {
        SAMPLE_TEXT.to_string()
    } else if args.reuse_last {
        match s.reuse_last() {
            Some(t) => t,
            None => bail!("no previous text in history"),
        }
    } else {
        args.text.clone().unwrap_or_default()
    };

    let outcome = s.analyze_text(&text).await?;
    if ctx.json {
        print_json(outcome.result());
        return Ok(());
    }
    if let SingleOutcome::Fast { note, .. } = &outcome {
        eprintln!("{note}");
    }
    print!("{}", analysis_report(outcome.result()));
    Ok(())
}

async fn analyze_file(ctx: &Ctx, s: &AnalysisSession, path: &Path, args: &AnalyzeArgs) -> Result<()> {
    let file = UploadFile::from_path(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    if !ctx.json {
        for line in upload_preview(&file.file_name, &file.bytes) {
            eprintln!("  {line}");
        }
    }
    let mut batch = match args.models.as_deref().filter(|m| !m.trim().is_empty()) {
        Some(models) => s.compare_models(file, models).await?,
        None => s.analyze_file(file).await?,
    };
    if args.deep_all {
        batch = s.analyze_batch_rows(batch).await?;
    }
    if ctx.json {
        print_json(&batch);
        return Ok(());
    }
    let filter = RowFilter {
        query: args.query.clone().unwrap_or_default(),
        label: args.label.map(Into::into),
    };
    print!("{}", batch_report(&batch, &filter, MAX_BATCH_ROWS));
    if let Some(deep) = &batch.deep_results {
        println!("\nDeep analysis per row:\n{}", deep_rows_report(deep));
    }
    Ok(())
}

pub async fn cmd_analyze_row(ctx: &Ctx, args: &AnalyzeRowArgs) -> Result<()> {
    let s = session(ctx, args.model.as_deref()).await;
    let result = s.analyze_row(&args.text).await?;
    if ctx.json {
        print_json(&result);
    } else {
        print!("{}", analysis_report(&result));
    }
    Ok(())
}
