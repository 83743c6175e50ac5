use clap::Parser;
use rpg_server::config::load_catalog;
use rpg_server::narration;
use rpg_server::{ConfigError, GameService, Request, Response, ServerConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "emberfall")]
#[command(about = "Text RPG server speaking line-delimited JSON on stdin/stdout")]
struct Args {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Catalog document replacing the built-in content
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Never call the language model
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rpg_server=info,rpg_rules=info,rpg_narrator=info".into()
            }),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), ConfigError> {
    let mut config = ServerConfig::load(args.config.as_deref())?.with_env()?;
    if args.catalog.is_some() {
        config.catalog_path = args.catalog;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let catalog = Arc::new(load_catalog(config.catalog_path.as_deref())?);
    let backend = narration::backend(&config.llm, args.offline)?;
    let service = GameService::new(catalog, backend, config.seed)
        .with_history_limit(config.history_limit);
    tracing::info!(seed = ?config.seed, "emberfall ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let response = match Request::parse(&line) {
            Ok(request) => service.handle(request).await,
            Err(e) => Response::failure(&e),
        };
        let mut out = match serde_json::to_string(&response) {
            Ok(out) => out,
            Err(e) => {
                tracing::error!(error = %e, "response encoding failed");
                continue;
            }
        };
        out.push('\n');
        if let Err(e) = stdout.write_all(out.as_bytes()).await {
            tracing::error!(error = %e, "stdout write failed");
            break;
        }
        if let Err(e) = stdout.flush().await {
            tracing::error!(error = %e, "stdout flush failed");
            break;
        }
    }
    tracing::info!("input closed, shutting down");
    Ok(())
}
