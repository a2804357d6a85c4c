pub mod capture_loop;
pub mod chat;
pub mod controller;
pub mod state;

pub use capture_loop::CycleOutcome;
pub use chat::Dispatch;
pub use controller::{ GhostController, DEFAULT_CAPTURE_INTERVAL };
pub use state::{ CaptureSession, Phase, SessionState };
