pub mod error_collector_layer;
pub mod scheduler;
pub mod thinking_simulator;

pub use error_collector_layer::ErrorCollectorLayer;
pub use scheduler::ScheduledTask;
pub use thinking_simulator::{AgentResponder, CannedResponder, ThinkingHost, ThinkingSimulator};
