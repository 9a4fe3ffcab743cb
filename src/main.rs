use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

use lucky_fortune_lib::{
    capture::StreamConstraints,
    presenter, AppConfig, CaptureStatus, ControllerOptions, FortuneController, FortuneStatus,
    GeminiClient, RewardRange, StillImageDevice,
};

#[derive(Parser, Debug)]
#[command(
    name = "lucky-fortune",
    about = "Draws a Tết fortune for the face in a photo"
)]
struct Cli {
    /// Photo to read the fortune from (stands in for the camera).
    image: PathBuf,

    /// Lower bound for the lucky money amount.
    #[arg(long)]
    min: Option<u64>,

    /// Upper bound for the lucky money amount.
    #[arg(long)]
    max: Option<u64>,

    /// JSON config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model name override.
    #[arg(long)]
    model: Option<String>,

    /// Print the final snapshot as JSON instead of the card.
    #[arg(long)]
    json: bool,

    /// Also print the share text.
    #[arg(long)]
    share: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(model) = cli.model.clone() {
        config.model = model;
    }
    let reward_range = RewardRange::new(
        cli.min.unwrap_or(config.reward_range.min),
        cli.max.unwrap_or(config.reward_range.max),
    );

    let client = GeminiClient::new(config.gemini()?)?;
    let controller = FortuneController::new(
        Arc::new(client),
        ControllerOptions {
            reward_range,
            status_interval: config.status_interval(),
            constraints: StreamConstraints::default(),
        },
    );

    info!("Lucky fortune starting up (model {})", config.model);
    draw(&controller, cli.image.clone()).await?;

    let snapshot = controller.snapshot().await;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot).context("snapshot serialization failed")?
        );
    } else {
        println!("{}", presenter::render(&snapshot));
    }

    if cli.share {
        if let Some(result) = &snapshot.state.result {
            println!();
            println!("{}", presenter::share_text(result));
        }
    }

    Ok(ExitCode::from(exit_status(snapshot.state.status)))
}

/// 0 for a drawn fortune, 2 when the fortune teller could not answer.
fn exit_status(status: FortuneStatus) -> u8 {
    match status {
        FortuneStatus::Error => 2,
        _ => 0,
    }
}

async fn draw(controller: &FortuneController, image: PathBuf) -> Result<()> {
    controller.start(Arc::new(StillImageDevice::new(image))).await?;

    match controller.wait_for_camera().await {
        Some(CaptureStatus::Ready) => {}
        Some(CaptureStatus::Failed(err)) => {
            warn!("camera failed: {err}");
            let message = err.user_message();
            controller.cancel().await?;
            bail!("{message}");
        }
        other => bail!("camera did not settle: {other:?}"),
    }

    if !controller.capture().await? {
        bail!("camera stream was not ready");
    }

    let mut updates = controller.subscribe();
    loop {
        let (status, message) = {
            let snapshot = updates.borrow_and_update();
            (
                snapshot.state.status,
                snapshot.state.loading_message.clone(),
            )
        };
        if status.is_settled() {
            break;
        }
        if let Some(message) = message {
            info!("{message}");
        }
        if updates.changed().await.is_err() {
            break;
        }
    }

    if controller.wait_for_outcome().await.is_none() {
        bail!("draw was abandoned before it settled");
    }
    Ok(())
}
