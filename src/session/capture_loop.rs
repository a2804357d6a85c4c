use log::{ debug, info, warn };
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{ Mutex, Semaphore };
use tokio::time::{ Instant, MissedTickBehavior };
use tokio_util::sync::CancellationToken;

use super::state::SessionState;
use crate::capture::FrameSampler;
use crate::llm::InferenceClient;
use crate::models::analysis::AnalysisSnapshot;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Stream not ready; nothing was sent.
    NoFrame,
    /// Analysis failed; the snapshot was left alone.
    NoOp,
    /// The snapshot was replaced.
    Applied,
    /// The loop that issued the call is no longer current.
    Discarded,
    /// Another cycle still holds the analysis permit; nothing was sent.
    Busy,
}

#[derive(Clone)]
pub(crate) struct AnalysisContext {
    pub(crate) state: Arc<Mutex<SessionState>>,
    pub(crate) client: Arc<dyn InferenceClient>,
    pub(crate) sampler: FrameSampler,
    pub(crate) game_context: Arc<str>,
    /// Single permit shared by every cycle of the session, timer-driven or
    /// manual, across loop restarts.
    pub(crate) analysis_permit: Arc<Semaphore>,
    pub(crate) generation: u64,
}

/// Runs one tick per `interval` until cancelled. Each cycle is awaited before
/// the next tick is taken, and ticks missed meanwhile are skipped. A tick that
/// finds the analysis permit taken (a call from a previous loop or a manual
/// cycle) is skipped as well.
pub(crate) async fn capture_loop(
    ctx: AnalysisContext,
    interval: Duration,
    cancel_token: CancellationToken
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("capture loop started (generation {}, every {:?})", ctx.generation, interval);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                info!("capture loop shutting down (generation {})", ctx.generation);
                break;
            }
            _ = ticker.tick() => {
                let outcome = run_analysis_cycle(&ctx).await;
                debug!("analysis cycle finished: {:?}", outcome);
            }
        }
    }
}

pub(crate) async fn run_analysis_cycle(ctx: &AnalysisContext) -> CycleOutcome {
    let (source, _permit) = {
        let state = ctx.state.lock().await;
        if !state.accepts(ctx.generation) {
            return CycleOutcome::Discarded;
        }
        let Ok(permit) = Arc::clone(&ctx.analysis_permit).try_acquire_owned() else {
            debug!("analysis still in flight, skipping tick");
            return CycleOutcome::Busy;
        };
        let Some(source) = state.source() else {
            return CycleOutcome::NoFrame;
        };
        (source, permit)
    };

    let Some(frame) = ctx.sampler.sample_blocking(source).await else {
        debug!("stream not ready, skipping tick");
        return CycleOutcome::NoFrame;
    };

    let Some(analysis) = ctx.client.analyze_frame(&frame, &ctx.game_context).await.success() else {
        warn!("frame analysis unavailable, keeping previous snapshot");
        return CycleOutcome::NoOp;
    };

    let mut state = ctx.state.lock().await;
    if !state.accepts(ctx.generation) {
        info!("discarding late analysis from generation {}", ctx.generation);
        return CycleOutcome::Discarded;
    }
    state.snapshot = AnalysisSnapshot::from_analysis(analysis, frame);
    CycleOutcome::Applied
}
