use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Inference Args ---
    /// API key for the Gemini API. Required.
    #[arg(long, env = "GEMINI_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    /// Gemini model used for both frame analysis and chat
    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-3-flash-preview")]
    pub model: String,

    /// Base URL of the Gemini REST API
    #[arg(long, env = "GEMINI_BASE_URL", default_value = "https://generativelanguage.googleapis.com/v1beta")]
    pub base_url: String,

    // --- Capture Args ---
    /// Image file treated as the live display stream (e.g. a recorder's screenshot target)
    #[arg(long, env = "FRAME_PATH")]
    pub frame_path: Option<String>,

    /// Milliseconds between capture-and-analyze ticks while learning
    #[arg(long, env = "CAPTURE_INTERVAL_MS", default_value = "4000")]
    pub capture_interval_ms: u64,

    /// Short description of the game, sent along with every analyzed frame
    #[arg(
        long,
        env = "GAME_CONTEXT",
        default_value = "Playing a game like Undertale. Focus on progression, boss patterns, and NPC interactions."
    )]
    pub game_context: String,

    /// Start with automated learning enabled
    #[arg(long, env = "AUTO_LEARN", default_value = "false")]
    pub learn: bool,

    /// Start screen capture immediately instead of waiting for /share
    #[arg(long, env = "AUTO_SHARE", default_value = "false")]
    pub share: bool,
}
