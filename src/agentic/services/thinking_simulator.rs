//! Simulated agent deliberation
//!
//! A thinking cycle steps through a short list of canned thoughts on a fixed
//! tick, waits a finalize delay, then produces the agent reply. The timer
//! lives in a [`ScheduledTask`]; the state it advances is owned by a
//! [`ThinkingHost`] (the session controller), which answers `Idle` once the
//! cycle is no longer current so stale timers wind down without touching
//! anything.
//!
//! [`AgentResponder`] is the seam where a real agent backend would replace the
//! canned content.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, interval_at};
use tracing::debug;

use super::scheduler::ScheduledTask;
use crate::agentic::models::conversation::UNKNOWN_AGENT_NAME;
use crate::agentic::models::{Agent, Message, ThinkingState, TickOutcome};

pub const CANNED_THOUGHTS: [&str; 3] = [
    "Analyzing the user's query and determining the best approach...",
    "Considering relevant context and domain-specific knowledge...",
    "Cross-referencing with specialized databases and policies...",
];

/// Produces the content of a thinking cycle and the reply that ends it.
pub trait AgentResponder: Send + Sync {
    fn thoughts(&self, agent: Option<&Agent>) -> Vec<String>;

    fn reply(&self, agent: Option<&Agent>) -> String;
}

/// Fixed thoughts and a greeting naming the agent.
#[derive(Clone, Copy, Debug, Default)]
pub struct CannedResponder;

impl AgentResponder for CannedResponder {
    fn thoughts(&self, _agent: Option<&Agent>) -> Vec<String> {
        CANNED_THOUGHTS.iter().map(|t| t.to_string()).collect()
    }

    fn reply(&self, agent: Option<&Agent>) -> String {
        let name = agent.map_or(UNKNOWN_AGENT_NAME, |a| a.name.as_str());
        format!(
            "Hello! I'm your {name}. I'm here to assist you with specialized knowledge and support. How can I help you today?"
        )
    }
}

/// Owner of the thinking state driven by the simulator's timer.
pub trait ThinkingHost: Send + Sync + 'static {
    /// Advance the cycle reserved for `message_id`. Returns `Idle` when that
    /// cycle is gone or superseded.
    fn advance_thinking(&self, message_id: &str, now: Instant) -> TickOutcome;

    /// Called once the finalize delay has elapsed.
    fn finish_thinking(&self, message_id: &str);
}

#[derive(Clone)]
pub struct ThinkingSimulator {
    responder: Arc<dyn AgentResponder>,
    tick: Duration,
    finalize: Duration,
}

impl ThinkingSimulator {
    pub fn new(responder: Arc<dyn AgentResponder>, tick: Duration, finalize: Duration) -> Self {
        Self {
            responder,
            tick,
            finalize,
        }
    }

    pub fn canned(tick: Duration, finalize: Duration) -> Self {
        Self::new(Arc::new(CannedResponder), tick, finalize)
    }

    /// Fresh cycle at its first thought.
    pub fn begin(&self, message_id: String, agent: Option<&Agent>, now: Instant) -> ThinkingState {
        ThinkingState::start(message_id, self.responder.thoughts(agent), now)
    }

    /// The agent reply ending a finished cycle, under the reserved message id.
    pub fn synthesize(&self, state: &ThinkingState, agent: Option<&Agent>) -> Message {
        Message::from_agent(
            state.message_id.clone(),
            self.responder.reply(agent),
            state.completed_thoughts(),
            state.elapsed_secs(),
        )
    }

    /// Drive the cycle for `message_id`. Dropping the returned task stops it,
    /// including a pending finalize.
    pub fn start<H: ThinkingHost>(&self, host: Arc<H>, message_id: String) -> ScheduledTask {
        let tick = self.tick;
        let finalize = self.finalize;

        ScheduledTask::schedule(async move {
            let mut ticks = interval_at(Instant::now() + tick, tick);
            loop {
                let now = ticks.tick().await;
                match host.advance_thinking(&message_id, now) {
                    TickOutcome::Advanced(index) => {
                        debug!(message_id = %message_id, index, "Thinking advanced");
                    }
                    TickOutcome::Finished { elapsed_secs } => {
                        debug!(message_id = %message_id, elapsed_secs, "Thinking done");
                        break;
                    }
                    TickOutcome::Idle => {
                        debug!(message_id = %message_id, "Thinking cycle no longer current");
                        return;
                    }
                }
            }

            tokio::time::sleep(finalize).await;
            host.finish_thinking(&message_id);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agentic::models::AgentIcon;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingHost {
        state: Mutex<Option<ThinkingState>>,
        indices: Mutex<Vec<usize>>,
        finished: Mutex<Vec<String>>,
    }

    impl ThinkingHost for RecordingHost {
        fn advance_thinking(&self, message_id: &str, now: Instant) -> TickOutcome {
            let mut state = self.state.lock();
            match state.as_mut() {
                Some(s) if s.message_id == message_id => {
                    let outcome = s.tick(now);
                    self.indices.lock().push(s.current_thought_index);
                    outcome
                }
                _ => TickOutcome::Idle,
            }
        }

        fn finish_thinking(&self, message_id: &str) {
            self.finished.lock().push(message_id.to_string());
        }
    }

    fn simulator() -> ThinkingSimulator {
        ThinkingSimulator::canned(Duration::from_millis(2000), Duration::from_millis(1000))
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_steps_then_finishes_once() {
        let sim = simulator();
        let host = Arc::new(RecordingHost::default());
        *host.state.lock() = Some(sim.begin("m2".into(), None, Instant::now()));

        let _task = sim.start(host.clone(), "m2".into());

        tokio::time::sleep(Duration::from_millis(6100)).await;
        assert_eq!(*host.indices.lock(), vec![1, 2, 2]);
        assert!(host.finished.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(*host.finished.lock(), vec!["m2".to_string()]);

        let state = host.state.lock().clone().unwrap();
        assert!(state.is_done);
        assert_eq!(state.elapsed_secs(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_task_cancels_finalize() {
        let sim = simulator();
        let host = Arc::new(RecordingHost::default());
        *host.state.lock() = Some(sim.begin("m2".into(), None, Instant::now()));

        let task = sim.start(host.clone(), "m2".into());
        tokio::time::sleep(Duration::from_millis(6500)).await;
        drop(task);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(host.finished.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_cycle_stops_quietly() {
        let sim = simulator();
        let host = Arc::new(RecordingHost::default());
        *host.state.lock() = Some(sim.begin("new".into(), None, Instant::now()));

        let _task = sim.start(host.clone(), "old".into());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(host.finished.lock().is_empty());
        assert!(host.indices.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_names_agent() {
        let sim = simulator();
        let agent = Agent::new("retail", "Retail Agent", "", AgentIcon::ShoppingBag);
        let start = Instant::now();
        let mut state = sim.begin("m2".into(), Some(&agent), start);
        for i in 1..=3 {
            state.tick(start + Duration::from_millis(2000 * i));
        }

        let reply = sim.synthesize(&state, Some(&agent));
        assert_eq!(reply.id, "m2");
        assert!(reply.content.contains("Retail Agent"));
        assert_eq!(reply.thinking.as_ref().map(Vec::len), Some(4));
        assert_eq!(reply.thinking_time, Some(6));
    }
}
