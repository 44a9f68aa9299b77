use timer_core::{
    CountdownTimer, Phase, PickerField, ScheduleHandle, Scheduler, TimerConfig, TimerEvent,
    TimerResult, TimerSnapshot,
};

use crate::ui::FlipBoard;

/// Countdown engine plus what the timer screen needs around it: the picker
/// cursor, the flip board and the completion banner.
pub struct CountdownState {
    pub engine: CountdownTimer,
    pub field: PickerField,
    pub board: FlipBoard,
    pub banner: Option<String>,
}

impl CountdownState {
    pub fn new(preset: TimerConfig, period_ms: u64, hold_ms: u64) -> Self {
        Self {
            engine: CountdownTimer::with_timing(preset, period_ms, hold_ms),
            field: PickerField::Minutes,
            board: FlipBoard::default(),
            banner: None,
        }
    }

    pub fn select_field(&mut self, field: PickerField) {
        self.field = field;
    }

    /// Moves the selected picker field by `delta`, clamped to its range.
    pub fn nudge(&mut self, delta: i32) -> TimerResult<()> {
        let config = self.engine.config().nudge(self.field, delta);
        self.engine.configure(config)
    }

    /// Start when idle, abandon the run otherwise.
    pub fn toggle_run(&mut self, sched: &mut dyn Scheduler) -> TimerResult<()> {
        match self.engine.phase() {
            Phase::Idle => {
                self.engine.start(sched)?;
                self.banner = None;
                self.board.apply(&self.engine.initial_digits());
                Ok(())
            }
            _ => self.engine.stop(sched),
        }
    }

    pub fn toggle_pause(&mut self, sched: &mut dyn Scheduler) -> TimerResult<()> {
        match self.engine.phase() {
            Phase::Paused => self.engine.resume(sched),
            _ => self.engine.pause(sched),
        }
    }

    pub fn reset(&mut self, sched: &mut dyn Scheduler) {
        self.engine.reset(sched);
        self.banner = None;
    }

    /// Feeds a fire to the engine and keeps the board in step with it.
    pub fn on_fire(&mut self, handle: ScheduleHandle, sched: &mut dyn Scheduler) -> TimerEvent {
        let event = self.engine.on_fire(handle, sched);
        match event {
            TimerEvent::Ticked | TimerEvent::Completed => {
                self.board.apply(&self.engine.digit_events());
            }
            TimerEvent::HoldElapsed => self.banner = None,
            TimerEvent::Ignored => {}
        }
        event
    }

    pub fn is_active(&self) -> bool {
        matches!(self.engine.phase(), Phase::Running | Phase::Paused)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.engine.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timer_core::{FlipDigits, TickScheduler, TimerError};

    fn drain(state: &mut CountdownState, sched: &mut TickScheduler, now: u64) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        while let Some(handle) = sched.pop_due(now) {
            events.push(state.on_fire(handle, sched));
        }
        events
    }

    #[test]
    fn test_nudge_only_while_idle() {
        let mut sched = TickScheduler::new(0);
        let mut state = CountdownState::new(TimerConfig::DEFAULT, 1000, 3000);
        state.nudge(2).unwrap();
        assert_eq!(state.engine.config().total_seconds(), 150);

        state.select_field(PickerField::Hours);
        state.nudge(-1).unwrap();
        assert_eq!(state.engine.config().get(PickerField::Hours), 0);

        state.toggle_run(&mut sched).unwrap();
        assert!(matches!(state.nudge(1), Err(TimerError::InvalidTransition { .. })));
    }

    #[test]
    fn test_board_follows_ticks() {
        let mut sched = TickScheduler::new(0);
        let mut state = CountdownState::new(TimerConfig::from_seconds(310), 1000, 3000);
        state.toggle_run(&mut sched).unwrap();
        assert_eq!(state.board.digits(), FlipDigits::from_seconds(310));

        drain(&mut state, &mut sched, 1000);
        assert_eq!(state.board.digits(), FlipDigits::from_seconds(309));
    }

    #[test]
    fn test_completion_then_hold_clears_banner() {
        let mut sched = TickScheduler::new(0);
        let mut state = CountdownState::new(TimerConfig::from_seconds(2), 1000, 3000);
        state.toggle_run(&mut sched).unwrap();

        let events = drain(&mut state, &mut sched, 2000);
        assert_eq!(events, vec![TimerEvent::Ticked, TimerEvent::Completed]);
        state.banner = Some("Timer finished!".to_string());

        let events = drain(&mut state, &mut sched, 5000);
        assert_eq!(events, vec![TimerEvent::HoldElapsed]);
        assert_eq!(state.banner, None);
        assert_eq!(state.engine.phase(), Phase::Idle);
        assert_eq!(state.engine.remaining_seconds(), 2);
    }

    #[test]
    fn test_pause_toggle_and_stop() {
        let mut sched = TickScheduler::new(0);
        let mut state = CountdownState::new(TimerConfig::DEFAULT, 1000, 3000);
        state.toggle_run(&mut sched).unwrap();
        state.toggle_pause(&mut sched).unwrap();
        assert_eq!(state.engine.phase(), Phase::Paused);
        assert!(state.is_active());
        state.toggle_pause(&mut sched).unwrap();
        assert_eq!(state.engine.phase(), Phase::Running);

        state.toggle_run(&mut sched).unwrap();
        assert_eq!(state.engine.phase(), Phase::Idle);
        assert!(sched.is_empty());
    }
}
