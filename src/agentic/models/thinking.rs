use tokio::time::Instant;

/// Thought appended once the simulated deliberation has finished
pub const DONE_THOUGHT: &str = "Done!";

/// Result of advancing a [`ThinkingState`] by one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Moved on to the thought at this index
    Advanced(usize),
    /// Last thought reached; the reply may be synthesized
    Finished { elapsed_secs: u64 },
    /// Already done or never active
    Idle,
}

/// Progress of the single active thinking cycle.
#[derive(Clone, Debug)]
pub struct ThinkingState {
    /// Id reserved for the agent reply that ends this cycle
    pub message_id: String,
    pub thoughts: Vec<String>,
    pub current_thought_index: usize,
    pub is_active: bool,
    pub is_done: bool,
    pub start_time: Instant,
    pub end_time: Option<Instant>,
}

impl ThinkingState {
    pub fn start(message_id: String, thoughts: Vec<String>, now: Instant) -> Self {
        Self {
            message_id,
            thoughts,
            current_thought_index: 0,
            is_active: true,
            is_done: false,
            start_time: now,
            end_time: None,
        }
    }

    /// Advance one step. The index never moves backwards and stops at the
    /// last thought; the tick after that marks the cycle done.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if !self.is_active || self.is_done {
            return TickOutcome::Idle;
        }

        if self.current_thought_index + 1 < self.thoughts.len() {
            self.current_thought_index += 1;
            return TickOutcome::Advanced(self.current_thought_index);
        }

        self.is_done = true;
        self.end_time = Some(now);
        TickOutcome::Finished {
            elapsed_secs: self.elapsed_secs(),
        }
    }

    /// Whole seconds between start and end, rounded to nearest.
    pub fn elapsed_secs(&self) -> u64 {
        let end = match self.end_time {
            Some(end) => end,
            None => return 0,
        };
        let millis = end.saturating_duration_since(self.start_time).as_millis();
        ((millis + 500) / 1000) as u64
    }

    pub fn current_thought(&self) -> Option<&str> {
        self.thoughts
            .get(self.current_thought_index)
            .map(String::as_str)
    }

    /// Thoughts as stored on the finished reply.
    pub fn completed_thoughts(&self) -> Vec<String> {
        let mut thoughts = self.thoughts.clone();
        thoughts.push(DONE_THOUGHT.to_string());
        thoughts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn three_thoughts() -> Vec<String> {
        vec!["a".into(), "b".into(), "c".into()]
    }

    #[tokio::test(start_paused = true)]
    async fn test_finishes_after_one_tick_per_thought() {
        let start = Instant::now();
        let mut state = ThinkingState::start("m1".into(), three_thoughts(), start);

        let tick = Duration::from_millis(2000);
        assert_eq!(state.tick(start + tick), TickOutcome::Advanced(1));
        assert_eq!(state.tick(start + tick * 2), TickOutcome::Advanced(2));
        assert_eq!(
            state.tick(start + tick * 3),
            TickOutcome::Finished { elapsed_secs: 6 }
        );
        assert!(state.is_done);
        assert_eq!(state.current_thought_index, 2);

        // Further ticks do nothing
        assert_eq!(state.tick(start + tick * 4), TickOutcome::Idle);
        assert_eq!(state.current_thought_index, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_rounds_to_nearest_second() {
        let start = Instant::now();
        let mut state = ThinkingState::start("m1".into(), vec!["only".into()], start);
        assert_eq!(
            state.tick(start + Duration::from_millis(1499)),
            TickOutcome::Finished { elapsed_secs: 1 }
        );

        let mut state = ThinkingState::start("m2".into(), vec!["only".into()], start);
        assert_eq!(
            state.tick(start + Duration::from_millis(1500)),
            TickOutcome::Finished { elapsed_secs: 2 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_thoughts_end_with_done() {
        let state = ThinkingState::start("m1".into(), three_thoughts(), Instant::now());
        let completed = state.completed_thoughts();
        assert_eq!(completed.len(), 4);
        assert_eq!(completed.last().map(String::as_str), Some(DONE_THOUGHT));
        assert_eq!(state.current_thought(), Some("a"));
    }
}
