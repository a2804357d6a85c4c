use log::{ error, info };
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{ Mutex, Semaphore };
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::capture_loop::{ capture_loop, run_analysis_cycle, AnalysisContext, CycleOutcome };
use super::chat::{ dispatch_message, Dispatch };
use super::state::{ CaptureSession, LoopHandle, Phase, SessionState };
use crate::capture::{ DisplayCapture, FrameSampler };
use crate::config::prompt::{
    CONNECTED_MESSAGE,
    LEARNING_ENGAGED_MESSAGE,
    LEARNING_SUSPENDED_MESSAGE,
};
use crate::error::{ GhostError, Result };
use crate::llm::InferenceClient;
use crate::models::analysis::AnalysisSnapshot;
use crate::models::chat::{ Role, Transcript };

pub const DEFAULT_CAPTURE_INTERVAL: Duration = Duration::from_secs(4);
const MIN_CAPTURE_INTERVAL: Duration = Duration::from_millis(1);

/// Owns the session state and the capture loop. Cloning shares the session.
#[derive(Clone)]
pub struct GhostController {
    state: Arc<Mutex<SessionState>>,
    client: Arc<dyn InferenceClient>,
    display: Arc<dyn DisplayCapture>,
    sampler: FrameSampler,
    capture_interval: Duration,
    game_context: Arc<str>,
    analysis_permit: Arc<Semaphore>,
}

impl GhostController {
    pub fn new(
        client: Arc<dyn InferenceClient>,
        display: Arc<dyn DisplayCapture>,
        game_context: impl Into<String>
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            client,
            display,
            sampler: FrameSampler::default(),
            capture_interval: DEFAULT_CAPTURE_INTERVAL,
            game_context: Arc::from(game_context.into()),
            analysis_permit: Arc::new(Semaphore::new(1)),
        }
    }

    /// Sets the tick interval; anything below one millisecond is raised to it.
    pub fn with_capture_interval(mut self, interval: Duration) -> Self {
        self.capture_interval = interval.max(MIN_CAPTURE_INTERVAL);
        self
    }

    pub fn with_sampler(mut self, sampler: FrameSampler) -> Self {
        self.sampler = sampler;
        self
    }

    // --- read snapshots ---

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase()
    }

    pub async fn snapshot(&self) -> AnalysisSnapshot {
        self.state.lock().await.snapshot.clone()
    }

    pub async fn transcript(&self) -> Transcript {
        self.state.lock().await.transcript.clone()
    }

    pub async fn error(&self) -> Option<String> {
        self.state.lock().await.error.clone()
    }

    pub async fn is_learning(&self) -> bool {
        self.state.lock().await.learning
    }

    pub async fn session_id(&self) -> Option<Uuid> {
        self.state.lock().await.capture.as_ref().map(|c| c.id)
    }

    /// Whether a capture loop task is currently scheduled.
    pub async fn loop_active(&self) -> bool {
        let state = self.state.lock().await;
        state.runner.as_ref().is_some_and(|r| !r.handle.is_finished())
    }

    // --- mutations ---

    /// Asks the display capture for a stream and arms the session. A refusal is
    /// kept as the pending error as well as returned.
    pub async fn start_screen_capture(&self) -> Result<Uuid> {
        {
            let mut state = self.state.lock().await;
            if state.capture.is_some() {
                return Err(GhostError::AlreadyCapturing);
            }
            state.error = None;
        }

        let source = match self.display.acquire().await {
            Ok(source) => source,
            Err(e) => {
                error!("Error starting screen capture: {}", e);
                self.state.lock().await.error = Some(e.to_string());
                return Err(e);
            }
        };

        let mut state = self.state.lock().await;
        if state.capture.is_some() {
            return Err(GhostError::AlreadyCapturing);
        }
        let session = CaptureSession::new(source);
        let id = session.id;
        state.capture = Some(session);
        state.transcript.push(Role::Assistant, CONNECTED_MESSAGE);
        info!("capture session {} started", id);
        self.sync_loop(&mut state);
        Ok(id)
    }

    pub async fn stop_screen_capture(&self) {
        let mut state = self.state.lock().await;
        if let Some(session) = state.capture.take() {
            info!("capture session {} stopped", session.id);
        }
        self.sync_loop(&mut state);
    }

    /// Flips the learning flag and returns the new value.
    pub async fn toggle_learning(&self) -> bool {
        let mut state = self.state.lock().await;
        state.learning = !state.learning;
        let status = if state.learning { LEARNING_ENGAGED_MESSAGE } else { LEARNING_SUSPENDED_MESSAGE };
        state.transcript.push(Role::Assistant, status);
        self.sync_loop(&mut state);
        state.learning
    }

    pub async fn send_message(&self, text: &str) -> Dispatch {
        dispatch_message(&self.state, self.client.as_ref(), self.sampler, text).await
    }

    pub async fn dismiss_error(&self) {
        self.state.lock().await.error = None;
    }

    /// Runs one analysis cycle now without waiting for the next tick. Only
    /// takes effect while Running, and returns `Busy` if a cycle is in flight.
    pub async fn analyze_now(&self) -> CycleOutcome {
        let ctx = {
            let state = self.state.lock().await;
            self.analysis_context(state.generation)
        };
        run_analysis_cycle(&ctx).await
    }

    /// Tears the view down: drops the stream and cancels the loop.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.capture = None;
        state.learning = false;
        self.sync_loop(&mut state);
        info!("session shut down");
    }

    fn analysis_context(&self, generation: u64) -> AnalysisContext {
        AnalysisContext {
            state: Arc::clone(&self.state),
            client: Arc::clone(&self.client),
            sampler: self.sampler,
            game_context: Arc::clone(&self.game_context),
            analysis_permit: Arc::clone(&self.analysis_permit),
            generation,
        }
    }

    /// Starts or stops the capture loop so it runs exactly while the phase is
    /// Running. Called with the state lock held after every flag change.
    fn sync_loop(&self, state: &mut SessionState) {
        let running = state.phase() == Phase::Running;
        match (running, state.runner.is_some()) {
            (true, false) => {
                state.generation += 1;
                let cancel_token = CancellationToken::new();
                let handle = tokio::spawn(
                    capture_loop(
                        self.analysis_context(state.generation),
                        self.capture_interval,
                        cancel_token.clone()
                    )
                );
                state.runner = Some(LoopHandle { handle, cancel_token });
            }
            (false, true) => {
                state.generation += 1;
                // Dropping the handle cancels the token. An in-flight call is
                // left to finish, keeps the analysis permit until then, and
                // its result is rejected by the generation check.
                state.runner = None;
            }
            _ => {}
        }
    }
}
