use serde::{ Serialize, Deserialize };

use super::frame::CapturedFrame;

pub const INITIAL_LEARNING: &str = "Ready to start learning...";
pub const INITIAL_ACTION: &str = "Wait for capture";

/// Structured reply of the frame-analysis call. All three fields are required;
/// a body missing any of them does not deserialize.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub learning: String,
    pub action: String,
    pub coaching_tip: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisSnapshot {
    pub learning: String,
    pub action: String,
    pub coaching_tip: Option<String>,
    pub captured_frame: Option<CapturedFrame>,
}

impl AnalysisSnapshot {
    /// Builds the replacement snapshot for a successful cycle.
    pub fn from_analysis(analysis: AnalysisResponse, frame: CapturedFrame) -> Self {
        Self {
            learning: analysis.learning,
            action: analysis.action,
            coaching_tip: Some(analysis.coaching_tip),
            captured_frame: Some(frame),
        }
    }
}

impl Default for AnalysisSnapshot {
    fn default() -> Self {
        Self {
            learning: INITIAL_LEARNING.to_string(),
            action: INITIAL_ACTION.to_string(),
            coaching_tip: None,
            captured_frame: None,
        }
    }
}
