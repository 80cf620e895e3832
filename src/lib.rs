pub mod agentic;
pub mod settings;

pub use agentic::{SessionController, SessionEvent};
