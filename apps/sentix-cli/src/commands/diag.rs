use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use sentix_core::{config_schema_json, write_schema_file};
use sentix_protocol::{request_schemas, BenchmarkRequest};

use crate::render::print_json;
use crate::Ctx;

#[derive(Args, Clone)]
pub struct SchemaArgs {
    /// Emit the config file schema instead of the request schemas
    #[arg(long)]
    pub config: bool,
    /// Write the config schema to this path instead of stdout
    #[arg(long, requires = "config")]
    pub out: Option<PathBuf>,
}

#[derive(Subcommand, Clone)]
pub enum PrefsCmd {
    /// Print stored preferences
    Show,
    /// Set the sidebar collapsed flag shared with the dashboard
    RailCollapsed {
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
}

pub async fn cmd_models(ctx: &Ctx) -> Result<()> {
    let models = ctx.api.get_models(None).await.context("fetch /models")?;
    if ctx.json {
        print_json(&models);
        return Ok(());
    }
    println!("default: {}", models.default);
    for m in &models.available {
        println!("  {m}");
    }
    Ok(())
}

pub async fn cmd_health(ctx: &Ctx, onnx: bool) -> Result<()> {
    let health = ctx.api.health(None).await.context("fetch /health")?;
    if !onnx {
        print_json(&health);
        return Ok(());
    }
    let debug = ctx.api.debug_onnx(None).await.context("fetch /debug/onnx")?;
    print_json(&serde_json::json!({ "health": health, "onnx": debug }));
    Ok(())
}

pub async fn cmd_warmup(ctx: &Ctx) -> Result<()> {
    ctx.api.warmup().await;
    let bench = ctx
        .api
        .benchmark(&BenchmarkRequest::default(), None)
        .await
        .context("benchmark")?;
    print_json(&bench);
    Ok(())
}

pub fn cmd_prefs(ctx: &Ctx, cmd: &PrefsCmd) -> Result<()> {
    let prefs = ctx.prefs();
    match cmd {
        PrefsCmd::Show => {
            let last = prefs.last_text();
            print_json(&serde_json::json!({
                "railCollapsed": prefs.rail_collapsed(),
                "yt_last_url": prefs.yt_last_url(),
                "lastText": (!last.is_empty()).then_some(last),
            }));
        }
        PrefsCmd::RailCollapsed { value } => {
            prefs.set_rail_collapsed(*value).context("save preference")?;
        }
    }
    Ok(())
}

pub fn cmd_schema(args: &SchemaArgs) -> Result<()> {
    if !args.config {
        println!("{}", serde_json::to_string_pretty(&request_schemas())?);
        return Ok(());
    }
    match &args.out {
        Some(path) => {
            write_schema_file(&path.to_string_lossy())
                .with_context(|| format!("write {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&config_schema_json())?),
    }
    Ok(())
}
