pub mod prompt;

use std::time::Duration;
use url::Url;

use crate::cli::Args;
use crate::error::{ GhostError, Result };
use crate::llm::LlmConfig;

/// Validated runtime configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct GhostConfig {
    pub llm: LlmConfig,
    pub capture_interval: Duration,
    pub game_context: String,
    pub frame_path: Option<String>,
    pub auto_learn: bool,
    pub auto_share: bool,
}

impl GhostConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        let api_key = args.api_key.trim();
        if api_key.is_empty() {
            return Err(GhostError::MissingCredential);
        }

        let base_url = Url::parse(args.base_url.trim()).map_err(|source| {
            GhostError::InvalidBaseUrl {
                url: args.base_url.clone(),
                source,
            }
        })?;

        let frame_path = args.frame_path
            .as_ref()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        Ok(Self {
            llm: LlmConfig {
                api_key: api_key.to_string(),
                model: args.model.clone(),
                base_url,
            },
            capture_interval: Duration::from_millis(args.capture_interval_ms.max(1)),
            game_context: args.game_context.clone(),
            frame_path,
            auto_learn: args.learn,
            auto_share: args.share,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["game-ghost"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn missing_credential_is_a_startup_error() {
        let err = GhostConfig::from_args(&args(&["--api-key", "   "])).unwrap_err();
        assert!(matches!(err, GhostError::MissingCredential));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = GhostConfig::from_args(
            &args(&["--api-key", "k", "--base-url", "not a url"])
        ).unwrap_err();
        assert!(matches!(err, GhostError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn defaults_follow_reference_behavior() {
        let config = GhostConfig::from_args(&args(&["--api-key", "k"])).unwrap();
        assert_eq!(config.capture_interval, Duration::from_secs(4));
        assert_eq!(config.llm.model, "gemini-3-flash-preview");
        assert!(config.frame_path.is_none());
        assert!(!config.auto_learn);
    }
}
