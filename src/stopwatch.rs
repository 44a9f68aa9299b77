use timer_core::{Scheduler, Stopwatch, StopwatchError, StopwatchSnapshot};

use crate::ui::VISIBLE_LAPS;

const MAX_LAPS: usize = 99;

pub struct StopwatchState {
    pub engine: Stopwatch,
    pub lap_scroll_offset: usize,
}

impl StopwatchState {
    pub fn new(quantum_ms: u64) -> Self {
        Self {
            engine: Stopwatch::new(quantum_ms),
            lap_scroll_offset: 0,
        }
    }

    /// The single start/lap button: starts when halted, otherwise records
    /// a lap and halts. Once the lap list is full it only halts.
    pub fn primary(&mut self, sched: &mut dyn Scheduler) -> Result<(), StopwatchError> {
        if !self.engine.is_running() {
            return self.engine.start(sched);
        }
        if self.engine.laps().len() >= MAX_LAPS {
            self.engine.stop(sched);
        } else {
            self.engine.stop_and_lap(sched)?;
        }
        self.lap_scroll_offset = 0;
        Ok(())
    }

    pub fn scroll_down(&mut self) {
        let hidden = self.engine.laps().len().saturating_sub(VISIBLE_LAPS);
        if self.lap_scroll_offset < hidden {
            self.lap_scroll_offset += 1;
        }
    }

    pub fn scroll_up(&mut self) {
        self.lap_scroll_offset = self.lap_scroll_offset.saturating_sub(1);
    }

    pub fn reset(&mut self, sched: &mut dyn Scheduler) {
        self.engine.reset(sched);
        self.lap_scroll_offset = 0;
    }

    pub fn snapshot(&self) -> StopwatchSnapshot {
        self.engine.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timer_core::TickScheduler;

    fn run(state: &mut StopwatchState, sched: &mut TickScheduler, until_ms: u64) {
        while let Some(handle) = sched.pop_due(until_ms) {
            state.engine.on_fire(handle);
        }
    }

    /// Start, run for `ms`, then lap-and-stop.
    fn lap_after(state: &mut StopwatchState, sched: &mut TickScheduler, now: &mut u64, ms: u64) {
        state.primary(sched).unwrap();
        *now += ms;
        run(state, sched, *now);
        state.primary(sched).unwrap();
    }

    #[test]
    fn test_primary_toggles_start_and_lap_stop() {
        let mut sched = TickScheduler::new(0);
        let mut state = StopwatchState::new(10);

        state.primary(&mut sched).unwrap();
        assert!(state.engine.is_running());
        run(&mut state, &mut sched, 1500);

        state.primary(&mut sched).unwrap();
        assert!(!state.engine.is_running());
        assert_eq!(state.engine.laps().len(), 1);
        assert_eq!(state.engine.laps()[0].cumulative_ms, 1500);
        assert!(sched.is_empty());
    }

    #[test]
    fn test_laps_only_taken_when_stopping() {
        let mut sched = TickScheduler::new(0);
        let mut state = StopwatchState::new(10);
        let mut now = 0;
        lap_after(&mut state, &mut sched, &mut now, 500);
        lap_after(&mut state, &mut sched, &mut now, 700);

        let splits: Vec<u64> = state.engine.laps().iter().map(|l| l.split_ms).collect();
        assert_eq!(splits, vec![500, 700]);
        assert!(!state.engine.is_running());
    }

    #[test]
    fn test_full_lap_list_still_stops() {
        let mut sched = TickScheduler::new(0);
        let mut state = StopwatchState::new(10);
        let mut now = 0;
        for _ in 0..MAX_LAPS {
            lap_after(&mut state, &mut sched, &mut now, 10);
        }
        assert_eq!(state.engine.laps().len(), MAX_LAPS);

        lap_after(&mut state, &mut sched, &mut now, 10);
        assert_eq!(state.engine.laps().len(), MAX_LAPS);
        assert!(!state.engine.is_running());
        assert!(sched.is_empty());
    }

    #[test]
    fn test_scroll_bounded_by_hidden_laps() {
        let mut sched = TickScheduler::new(0);
        let mut state = StopwatchState::new(10);
        let mut now = 0;
        for _ in 0..(VISIBLE_LAPS + 2) {
            lap_after(&mut state, &mut sched, &mut now, 100);
        }
        state.scroll_down();
        state.scroll_down();
        state.scroll_down();
        assert_eq!(state.lap_scroll_offset, 2);
        state.scroll_up();
        assert_eq!(state.lap_scroll_offset, 1);

        state.reset(&mut sched);
        assert_eq!(state.lap_scroll_offset, 0);
        assert!(state.engine.laps().is_empty());
    }
}
