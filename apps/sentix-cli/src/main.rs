use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use sentix_client::SentixApi;
use sentix_core::{default_data_dir, load_config, load_effective_config, Config, FileStore, History, KvStore, Prefs};

mod commands;
mod render;

use commands::{
    AnalyzeArgs, AnalyzeRowArgs, HistoryCmd, NewsCmd, PredictArgs, PrefsCmd, SchemaArgs, YoutubeArgs,
};

#[derive(Parser)]
#[command(name = "sentix", version, about = "Sentiment analysis client for the Sentix API")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
pub(crate) struct GlobalArgs {
    /// API base URL (overrides SENTIX_API_BASE and the config file)
    #[arg(long, global = true)]
    base: Option<String>,
    /// Config file (TOML); defaults to SENTIX_CONFIG or the platform config dir
    #[arg(long, global = true, env = "SENTIX_CONFIG")]
    config: Option<PathBuf>,
    /// Directory holding the local history store
    #[arg(long, global = true, env = "SENTIX_DATA_DIR")]
    data_dir: Option<PathBuf>,
    /// Print raw JSON instead of the formatted report
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the models the API offers
    Models,
    /// Check API health (and ONNX runtime details with --onnx)
    Health {
        #[arg(long)]
        onnx: bool,
    },
    /// Ask the API to load its models
    Warmup,
    /// Fast prediction for one text
    Predict(PredictArgs),
    /// Deep analysis of a text, or batch analysis of a CSV/XLSX file
    Analyze(AnalyzeArgs),
    /// Deep analysis of a single batch row
    AnalyzeRow(AnalyzeRowArgs),
    /// Analysis history
    History {
        #[command(subcommand)]
        cmd: HistoryCmd,
    },
    /// Windowed sentiment of a YouTube video transcript
    Youtube(YoutubeArgs),
    /// News ingest, article analysis and live snapshots
    News {
        #[command(subcommand)]
        cmd: NewsCmd,
    },
    /// Stored UI preferences
    Prefs {
        #[command(subcommand)]
        cmd: PrefsCmd,
    },
    /// Print JSON schemas for request bodies or the config file
    Schema(SchemaArgs),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
struct CompletionsArgs {
    /// Target shell (bash, zsh, fish, powershell, elvish)
    shell: clap_complete::Shell,
    /// Output directory (writes a file). If not set, prints to stdout.
    #[arg(long)]
    out_dir: Option<String>,
}

/// Everything a subcommand needs: config, API client and the local store.
pub(crate) struct Ctx {
    pub cfg: Config,
    pub api: Arc<SentixApi>,
    pub store: Arc<dyn KvStore>,
    pub json: bool,
}

impl Ctx {
    fn build(global: &GlobalArgs) -> Result<Self> {
        let cfg = match &global.config {
            Some(path) => load_config(&path.to_string_lossy())
                .with_context(|| format!("load config {}", path.display()))?,
            None => load_effective_config(),
        };
        let api = SentixApi::from_config(global.base.as_deref(), &cfg).context("build http client")?;
        let dir = global
            .data_dir
            .clone()
            .unwrap_or_else(|| default_data_dir(&cfg));
        let store = FileStore::in_dir(&dir)
            .with_context(|| format!("open store in {}", dir.display()))?;
        tracing::debug!(base = api.http().base(), store = %store.path().display(), "client ready");
        Ok(Self {
            cfg,
            api: Arc::new(api),
            store: Arc::new(store),
            json: global.json,
        })
    }

    pub fn history(&self) -> History {
        History::new(self.store.clone())
    }

    pub fn prefs(&self) -> Prefs {
        Prefs::new(self.store.clone())
    }
}

fn cmd_completions(shell: clap_complete::Shell, out_dir: Option<&str>) -> Result<()> {
    use clap_complete::{generate, generate_to};
    use std::io::stdout;
    let mut cmd = Cli::command();
    let bin = "sentix";
    if let Some(dir) = out_dir {
        let dir_path = std::path::Path::new(dir);
        std::fs::create_dir_all(dir_path).ok();
        let _path = generate_to(shell, &mut cmd, bin, dir_path)?;
    } else {
        generate(shell, &mut cmd, bin, &mut stdout());
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Completions(args) => return cmd_completions(args.shell, args.out_dir.as_deref()),
        Commands::Schema(args) => return commands::diag::cmd_schema(args),
        _ => {}
    }
    let ctx = Ctx::build(&cli.global)?;
    match cli.command {
        Commands::Models => commands::diag::cmd_models(&ctx).await,
        Commands::Health { onnx } => commands::diag::cmd_health(&ctx, onnx).await,
        Commands::Warmup => commands::diag::cmd_warmup(&ctx).await,
        Commands::Predict(args) => commands::analyze::cmd_predict(&ctx, &args).await,
        Commands::Analyze(args) => commands::analyze::cmd_analyze(&ctx, &args).await,
        Commands::AnalyzeRow(args) => commands::analyze::cmd_analyze_row(&ctx, &args).await,
        Commands::History { cmd } => commands::history::run(&ctx, &cmd),
        Commands::Youtube(args) => commands::youtube::cmd_youtube(&ctx, &args).await,
        Commands::News { cmd } => commands::news::run(&ctx, &cmd).await,
        Commands::Prefs { cmd } => commands::diag::cmd_prefs(&ctx, &cmd),
        Commands::Schema(_) | Commands::Completions(_) => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    sentix_otel::init_with_default("warn");
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
