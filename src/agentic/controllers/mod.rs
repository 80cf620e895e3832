mod auth_gate;
pub mod session_controller;

pub use session_controller::{SessionController, SessionEvent, SessionPhase};
