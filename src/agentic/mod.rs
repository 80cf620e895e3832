pub mod controllers;
pub mod error;
pub mod models;
pub mod repositories;
pub mod services;
pub mod views;

pub use controllers::{SessionController, SessionEvent, SessionPhase};
pub use error::ChatError;
