//! tplprobe - fingerprint which server-side template engine is
//! rendering untrusted input, across several worker languages.

mod db;
mod repl;
mod tables;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tplprobe_core::application::{validate_language, Dispatcher};
use tplprobe_core::port::WorkerHost;
use tplprobe_infra_worker::ProcessSupervisor;

#[derive(Parser)]
#[command(name = "tplprobe")]
#[command(about = "Template engine fingerprinting playground", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Comma-separated target languages (e.g. node,php,ruby,python,java)
    #[arg(short, long, env = "TPLPROBE_LANG", default_value = "node,php,ruby,python,java")]
    lang: String,

    /// Restrict to these template engines (e.g. -e ejs,twig)
    #[arg(short, long)]
    engines: Option<String>,

    /// Run engine discrimination before the REPL
    #[arg(short, long)]
    guess: bool,

    /// Directory holding payloads_<lang>.json databases
    #[arg(long, env = "TPLPROBE_PAYLOAD_DIR", default_value = "payloads")]
    payload_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// List available engines per language without starting workers
    ListEngines,

    /// Cross-validate that every payload triggers only on its assigned
    /// engine(s)
    Validate,
}

fn init_logging() {
    let log_format = std::env::var("TPLPROBE_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("tplprobe=info"))
        .expect("Failed to create env filter");

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact())
                .init();
        }
    }
}

fn split_list(arg: &str) -> Vec<String> {
    arg.split(',')
        .map(|item| item.trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

async fn run_validation(payload_dir: &Path, languages: &[String]) -> Result<()> {
    let host: Arc<dyn WorkerHost> = Arc::new(ProcessSupervisor::with_default_recipes());
    let dispatcher = Dispatcher::new(host);

    // Diagnostic by design: specificity violations are reported, not
    // turned into a failing exit status.
    for language in languages {
        let db = db::load_databases(payload_dir, std::slice::from_ref(language))?;
        let report = validate_language(&dispatcher, &db, language).await?;
        tables::print_validation_report(&report);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let languages = split_list(&cli.lang);
    let engines = cli.engines.as_deref().map(split_list);

    match cli.command {
        Some(Commands::ListEngines) => {
            let db = db::load_available_databases(&cli.payload_dir, &languages)?;
            tables::print_engine_lists(&db, &languages);
        }
        Some(Commands::Validate) => run_validation(&cli.payload_dir, &languages).await?,
        None => {
            info!(languages = ?languages, "starting workers");
            let host: Arc<dyn WorkerHost> = Arc::new(ProcessSupervisor::with_default_recipes());
            repl::run(host, &cli.payload_dir, &languages, engines, cli.guess).await?;
        }
    }
    Ok(())
}
