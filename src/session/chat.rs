use log::{ debug, warn };
use std::sync::Arc;
use tokio::sync::Mutex;

use super::state::SessionState;
use crate::capture::FrameSampler;
use crate::config::prompt::CHAT_FALLBACK_REPLY;
use crate::llm::InferenceClient;
use crate::models::chat::{ Message, Role };

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Blank input; the transcript was not touched.
    Ignored,
    Replied {
        user: Message,
        assistant: Message,
        /// The client produced nothing and the fallback text was used.
        fell_back: bool,
    },
}

pub(crate) async fn dispatch_message(
    state: &Arc<Mutex<SessionState>>,
    client: &dyn InferenceClient,
    sampler: FrameSampler,
    text: &str
) -> Dispatch {
    if text.trim().is_empty() {
        return Dispatch::Ignored;
    }

    let (user, history, source) = {
        let mut guard = state.lock().await;
        let user = guard.transcript.push(Role::User, text);
        (user, guard.transcript.messages().to_vec(), guard.source())
    };

    let frame = match source {
        Some(source) => sampler.sample_blocking(source).await,
        None => None,
    };
    debug!("dispatching chat message {} (frame attached: {})", user.id(), frame.is_some());

    let outcome = client.chat_with_ai(&history, frame.as_ref()).await;
    let fell_back = outcome.is_noop();
    if fell_back {
        warn!("chat reply unavailable, using fallback text");
    }
    let reply = outcome.unwrap_or(CHAT_FALLBACK_REPLY.to_string());

    let assistant = state.lock().await.transcript.push(Role::Assistant, reply);
    Dispatch::Replied { user, assistant, fell_back }
}
