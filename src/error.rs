use thiserror::Error;

#[derive(Debug, Error)]
pub enum GhostError {
    #[error("Gemini API key is required (set GEMINI_API_KEY or pass --api-key)")]
    MissingCredential,

    #[error("Invalid Gemini base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(
        "Screen capture is not supported in this environment. Configure a frame source (FRAME_PATH) pointing at a file your recorder keeps updated."
    )]
    CaptureUnsupported,

    #[error("Screen capture was refused: {0}")]
    CapturePermission(String),

    #[error("Screen capture already active")]
    AlreadyCapturing,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, GhostError>;
