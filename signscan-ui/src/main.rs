//! signscan - traffic sign detection client
//!
//! Submits a still image or a short video to the remote detection service
//! and renders the returned annotations (image flow) or saves the
//! processed media (video flow).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use signscan_common::config::resolve_client_config;
use signscan_common::events::EventBus;
use signscan_common::types::DetectionResult;
use signscan_common::MediaKind;
use signscan_ui::client::{DetectClient, DetectOptions};
use signscan_ui::controller::{ResultUpdate, SubmissionController};
use signscan_ui::present::{decode_annotated_image, present, render_text, VIDEO_DOWNLOAD_NAME};

#[derive(Parser)]
#[command(name = "signscan", version, about = "Traffic sign detection client")]
struct Cli {
    /// Detection server base URL (overrides env and config file)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect traffic signs on a still image
    Image {
        /// Image file to submit
        path: PathBuf,

        /// Confidence threshold override, forwarded to the service
        #[arg(long)]
        conf: Option<f64>,

        /// Inference image size override, forwarded to the service
        #[arg(long)]
        imgsz: Option<u32>,

        /// Save the annotated image here, when the service returns one
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Detect traffic signs on a video
    Video {
        /// Video file to submit
        path: PathBuf,

        /// Save the processed video here (default: detected_video.mp4)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Check detection service health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = resolve_client_config(cli.server.as_deref());
    info!("Detection server: {}", config.server_url);

    let client = DetectClient::new(&config)?;
    let events = EventBus::new(100);

    // Follow controller lifecycle events for debug logging
    let mut event_rx = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            tracing::debug!(?event, "lifecycle event");
        }
    });

    match cli.command {
        Command::Image { path, conf, imgsz, output } => {
            let options = DetectOptions { conf, imgsz };
            run_image(&client, events, &path, &options, output.as_deref()).await
        }
        Command::Video { path, output } => {
            run_video(&client, events, &path, output).await
        }
        Command::Health => {
            let health = client.health().await?;
            println!("status: {}", health.status);
            if let Some(model) = health.model {
                println!("model:  {}", model);
            }
            Ok(())
        }
    }
}

/// Drive one image submission through its controller and render the result
async fn run_image(
    client: &DetectClient,
    events: EventBus,
    path: &std::path::Path,
    options: &DetectOptions,
    output: Option<&std::path::Path>,
) -> Result<()> {
    let (result_tx, mut result_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut controller = SubmissionController::new(MediaKind::Image, events, result_tx);

    controller.select(path).await?;
    controller.load_preview().await?;
    controller.submit(client, options).await?;

    let result = latest_result(&mut result_rx);
    let state = present(result.as_ref());
    render_text(&state, &mut std::io::stdout())?;

    if let (Some(dest), Some(DetectionResult::Image { annotated_image: Some(encoded), .. })) =
        (output, result.as_ref())
    {
        let bytes = decode_annotated_image(encoded)?;
        tokio::fs::write(dest, bytes).await?;
        println!("Annotated image saved to {}", dest.display());
    }

    Ok(())
}

/// Drive one video submission and save the processed media
async fn run_video(
    client: &DetectClient,
    events: EventBus,
    path: &std::path::Path,
    output: Option<PathBuf>,
) -> Result<()> {
    let (result_tx, mut result_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut controller = SubmissionController::new(MediaKind::Video, events, result_tx);

    controller.select(path).await?;
    controller.load_preview().await?;
    controller.submit(client, &DetectOptions::default()).await?;

    let result = latest_result(&mut result_rx);
    let state = present(result.as_ref());
    render_text(&state, &mut std::io::stdout())?;

    if let Some(DetectionResult::Video { processed, .. }) = result.as_ref() {
        let dest = output.unwrap_or_else(|| PathBuf::from(VIDEO_DOWNLOAD_NAME));
        processed.save_to(&dest).await?;
        println!("Processed video saved to {}", dest.display());
    }

    Ok(())
}

/// Read the most recent published result (the parent side of the channel)
fn latest_result(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<ResultUpdate>,
) -> Option<DetectionResult> {
    let mut latest = None;
    while let Ok(update) = rx.try_recv() {
        latest = update.result;
    }
    latest
}
