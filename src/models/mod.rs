pub mod analysis;
pub mod chat;
pub mod frame;
