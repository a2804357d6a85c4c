use clap::Parser;
use dotenv::dotenv;
use game_ghost::cli::Args;
use log::error;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(e) = game_ghost::run(args).await {
        error!("{}", e);
        return Err(e);
    }

    Ok(())
}
