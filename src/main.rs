use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{error, info};
use trendalert::{
    config::AppConfig,
    web::{WebServer, MISSING_KEYS_WARNING},
    Pipeline,
};

const USAGE: &str = "usage: trendalert [serve | ask <topic...>]";

/// The main entry point of the application.
///
/// `trendalert serve` (the default) starts the web form; `trendalert ask <topic>`
/// answers a single topic in the terminal with the keys from the configuration.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(trendalert::log_filter(
            std::env::var("RUST_LOG").ok().as_deref(),
        ))
        .init();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;
    let pipeline = Pipeline::from_config(&config)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("serve") => {
            let server =
                WebServer::start(pipeline, config.credentials.clone(), &config.bind_addr()).await?;
            info!("Open http://{} in your browser", server.addr());
            server.wait().await?;
        }
        Some("ask") => {
            let question = args[1..].join(" ");
            if question.trim().is_empty() {
                bail!(USAGE);
            }
            ask(&pipeline, &config, &question).await?;
        }
        Some(other) => bail!("unknown command '{other}'\n{USAGE}"),
    }

    Ok(())
}

async fn ask<R, N>(pipeline: &Pipeline<R, N>, config: &AppConfig, question: &str) -> anyhow::Result<()>
where
    R: trendalert::search::Retriever,
    N: trendalert::llm::Narrator,
{
    if !config.credentials.is_complete() {
        bail!(
            "{MISSING_KEYS_WARNING} (set {} and {})",
            trendalert::config::GOOGLE_API_KEY_VAR,
            trendalert::config::TAVILY_API_KEY_VAR
        );
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("🚀 Scanning the web...");

    let result = pipeline.run(&config.credentials, question).await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            println!("\n=== ⚡ The Breakdown ===\n{}\n", report.state.final_story);
            println!("=== 🛠️ Receipts ({} sources) ===", report.sources.len());
            println!("{}", report.state.search_results);
            println!("\nProcessing time: {:.2?}", report.elapsed);
            Ok(())
        }
        Err(e) => {
            error!("Failed to build the breakdown: {}", e);
            bail!("Connection dropped: {e}")
        }
    }
}
