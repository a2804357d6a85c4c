pub mod file_source;
pub mod sampler;

use async_trait::async_trait;
use image::DynamicImage;
use std::sync::Arc;

use crate::error::Result;

pub use file_source::FileDisplayCapture;
pub use sampler::FrameSampler;

/// How much of the stream is buffered, ordered like the HTML media ready
/// states. A frame can be sampled from `HaveCurrentData` upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

/// A live video stream bound to the session.
pub trait VideoSource: Send + Sync {
    fn ready_state(&self) -> ReadyState;

    /// The frame currently on screen, at the stream's natural size.
    fn current_frame(&self) -> Option<DynamicImage>;
}

/// Platform hook that asks the user for a display stream.
#[async_trait]
pub trait DisplayCapture: Send + Sync {
    async fn acquire(&self) -> Result<Arc<dyn VideoSource>>;
}
