pub mod attachment_classification;
pub mod command_line;
pub mod terminal_view;

pub use command_line::{Command, CommandError};
