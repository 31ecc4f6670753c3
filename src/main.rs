use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use toplists::api::ListId;
use toplists::app::App;
use toplists::config::Config;
use toplists::pipeline::{LoadOutcome, Pipeline, PipelineEvent};
use toplists::util::strip_control_chars;

/// Get the config directory path (~/.config/toplists/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("toplists"))
}

#[derive(Parser, Debug)]
#[command(name = "toplists", about = "Terminal reader for most-popular article lists")]
struct Args {
    /// Config file (default: ~/.config/toplists/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// List shown first: emailed, shared or viewed
    #[arg(long, value_name = "LIST", default_value = "emailed")]
    list: ListId,

    /// Override the API base URL
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Load one list, print its rows and exit without the UI
    #[arg(long, value_name = "LIST")]
    print: Option<ListId>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }

    let (event_tx, event_rx) = mpsc::channel::<PipelineEvent>(64);
    let pipeline = Arc::new(
        Pipeline::new(&config, event_tx).context("Failed to set up the article pipeline")?,
    );

    if let Some(list) = args.print {
        return print_list(&pipeline, list).await;
    }

    let mut app = App::new(Arc::clone(&pipeline), args.list);
    for warning in app.keybindings.apply_overrides(&config.keybindings) {
        tracing::warn!(warning = %warning, "Ignoring keybinding override");
    }

    toplists::ui::run(&mut app, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}

/// Runs a single load for `list` and prints the committed rows.
async fn print_list(pipeline: &Pipeline, list: ListId) -> Result<()> {
    let controller = pipeline.controller(list);
    match controller.load().await {
        LoadOutcome::Committed { .. } => {
            println!("{}", list.title());
            for (rank, row) in controller.rows().iter().enumerate() {
                println!(
                    "{:>2}. [{}] {}",
                    rank + 1,
                    strip_control_chars(&row.section),
                    strip_control_chars(&row.title)
                );
                if !row.r#abstract.is_empty() {
                    println!("    {}", strip_control_chars(&row.r#abstract));
                }
            }
            Ok(())
        }
        LoadOutcome::Failed(e) => Err(e).with_context(|| format!("Failed to load {}", list.title())),
    }
}
