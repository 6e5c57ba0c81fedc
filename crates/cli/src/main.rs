use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use effects_client::{
    CancelToken, DownloadOutcome, EffectMode, ServiceConfig, StudioClient, WorkflowController,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "chroma-cli")]
#[command(about = "Headless client for the Chroma Studio effects service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Load a ServiceConfig JSON file instead of the defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API host override
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Account identifier override
    #[arg(long, global = true)]
    user_id: Option<String>,

    /// Effect selector override
    #[arg(long, global = true)]
    effect: Option<String>,

    /// Use the video generation endpoints
    #[arg(long, global = true)]
    video: bool,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file, generate, and download the result
    Run {
        /// Source media file
        file: PathBuf,

        /// Directory to save the result into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Upload a file and print its read URL
    Upload {
        /// Source media file
        file: PathBuf,
    },

    /// Generate from an already-uploaded media URL
    Generate {
        /// Read URL of the uploaded media
        #[arg(long)]
        media_url: String,
    },

    /// Download a result URL through the fallback chain
    Download {
        /// Result media URL
        #[arg(long)]
        url: String,

        /// Directory to save into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let config = build_config(&cli)?;
    let mut workflow =
        WorkflowController::new(Box::new(StudioClient::new(config.clone())), &config);

    match cli.command {
        Commands::Run { file, out } => {
            upload(&mut workflow, &file).await?;
            let result_url = generate(&mut workflow).await?;
            info!("result: {result_url}");
            download(&workflow, &out).await?;
        }
        Commands::Upload { file } => {
            let asset = upload(&mut workflow, &file).await?;
            println!("{}", asset.url);
        }
        Commands::Generate { media_url } => {
            workflow.adopt_media(media_url);
            let result_url = generate(&mut workflow).await?;
            println!("{result_url}");
        }
        Commands::Download { url, out } => {
            workflow.adopt_media(url);
            download(&workflow, &out).await?;
        }
    }

    Ok(())
}

fn build_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    if let Some(base) = &cli.api_base {
        config = config.with_api_base(base.clone());
    }
    if let Some(user) = &cli.user_id {
        config = config.with_user_id(user.clone());
    }
    if let Some(effect) = &cli.effect {
        config = config.with_effect(effect.clone());
    }
    if cli.video {
        config = config.with_mode(EffectMode::Video);
    }
    Ok(config)
}

async fn upload(
    workflow: &mut WorkflowController,
    file: &Path,
) -> Result<effects_client::UploadedAsset> {
    let spinner = spinner("Uploading...");
    let outcome = workflow.select_file(file).await;
    spinner.finish_and_clear();
    let asset = outcome.with_context(|| format!("uploading {}", file.display()))?;
    info!("uploaded to {}", asset.url);
    Ok(asset)
}

async fn generate(workflow: &mut WorkflowController) -> Result<String> {
    let spinner = spinner("Submitting job...");
    let cancel = CancelToken::new();
    let progress = {
        let spinner = spinner.clone();
        move |attempt: u32| spinner.set_message(format!("Processing... ({attempt})"))
    };
    let outcome = workflow.generate(&cancel, progress).await;
    spinner.finish_and_clear();
    outcome.context("generation failed")
}

async fn download(workflow: &WorkflowController, out: &Path) -> Result<()> {
    let spinner = spinner("Downloading...");
    let outcome = workflow.download(out).await;
    spinner.finish_and_clear();
    match outcome.context("download failed")? {
        DownloadOutcome::Saved { path } => info!("saved to {}", path.display()),
        DownloadOutcome::Handoff { url } => {
            warn!("could not fetch the result; open it directly: {url}")
        }
    }
    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::default_spinner());
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
