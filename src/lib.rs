pub mod capture;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod llm;
pub mod models;
pub mod session;

use capture::FileDisplayCapture;
use cli::Args;
use config::GhostConfig;
use log::{ error, info, warn };
use session::GhostController;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = GhostConfig::from_args(&args)?;

    info!("--- Core Configuration ---");
    info!("Model: {}", config.llm.model);
    info!("Base URL: {}", config.llm.base_url);
    info!("Capture Interval: {:?}", config.capture_interval);
    info!("Game Context: {}", config.game_context);
    info!("Frame Source: {}", config.frame_path.as_deref().unwrap_or("none (capture unsupported)"));
    info!("Auto Learn: {}", config.auto_learn);
    info!("-------------------------");

    let client = llm::new_client(&config.llm)?;
    let display = Arc::new(FileDisplayCapture::new(config.frame_path.clone()));
    let controller = GhostController::new(client, display, config.game_context.clone())
        .with_capture_interval(config.capture_interval);

    if config.auto_share {
        if let Err(e) = controller.start_screen_capture().await {
            warn!("Auto share failed: {}", e);
        }
    }
    if config.auto_learn {
        controller.toggle_learning().await;
    }

    if let Err(e) = console::run_console(controller.clone()).await {
        error!("Console input failed: {}", e);
    }
    controller.shutdown().await;

    Ok(())
}
