use chrono::{ DateTime, Utc };
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::capture::VideoSource;
use crate::models::analysis::AnalysisSnapshot;
use crate::models::chat::Transcript;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No display stream.
    Idle,
    /// Streaming, learning off.
    Armed,
    /// Streaming and analyzing on every tick.
    Running,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Idle => "idle",
            Phase::Armed => "monitoring",
            Phase::Running => "auto-learn",
        };
        f.write_str(label)
    }
}

/// A granted display stream. Dropping it ends the capture.
pub struct CaptureSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub source: Arc<dyn VideoSource>,
}

impl CaptureSession {
    pub fn new(source: Arc<dyn VideoSource>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            source,
        }
    }
}

/// Handle to the recurring capture task. Dropping it cancels the task.
pub(crate) struct LoopHandle {
    pub(crate) handle: JoinHandle<()>,
    pub(crate) cancel_token: CancellationToken,
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

pub struct SessionState {
    pub(crate) transcript: Transcript,
    pub(crate) snapshot: AnalysisSnapshot,
    pub(crate) capture: Option<CaptureSession>,
    pub(crate) learning: bool,
    pub(crate) error: Option<String>,
    /// Bumped whenever the Running period starts or ends; results tagged with
    /// an older value are dropped.
    pub(crate) generation: u64,
    pub(crate) runner: Option<LoopHandle>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            transcript: Transcript::new(),
            snapshot: AnalysisSnapshot::default(),
            capture: None,
            learning: false,
            error: None,
            generation: 0,
            runner: None,
        }
    }

    pub fn phase(&self) -> Phase {
        match (self.capture.is_some(), self.learning) {
            (false, _) => Phase::Idle,
            (true, false) => Phase::Armed,
            (true, true) => Phase::Running,
        }
    }

    pub(crate) fn accepts(&self, generation: u64) -> bool {
        self.phase() == Phase::Running && self.generation == generation
    }

    pub(crate) fn source(&self) -> Option<Arc<dyn VideoSource>> {
        self.capture.as_ref().map(|c| Arc::clone(&c.source))
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
