//! Countdown state machine.
//!
//! ```text
//! Idle      --configure-->  Idle
//! Idle      --start------>  Running
//! Running   --tick------->  Running | Completed (at zero)
//! Running   --pause------>  Paused
//! Paused    --resume----->  Running
//! Running   --stop------->  Idle
//! Paused    --stop------->  Idle
//! Completed --hold------->  Idle     (last configuration)
//! any       --reset------>  Idle     (default preset)
//! ```
//!
//! Remaining time is a plain decrement per tick. Scheduling jitter skews it
//! against real time and nothing tries to correct for that.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TimerError, TimerResult};
use crate::flip::{self, DigitChangeEvent};
use crate::schedule::{cancel_slot, ScheduleHandle, Scheduler};

pub const DEFAULT_PERIOD_MS: u64 = 1000;
/// How long the finished display is held before the timer resets itself.
pub const DEFAULT_HOLD_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Running,
    Paused,
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Running => "running",
            Phase::Paused => "paused",
            Phase::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// One column of the duration picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickerField {
    Hours,
    Minutes,
    Seconds,
}

impl PickerField {
    pub const ALL: [PickerField; 3] = [
        PickerField::Hours,
        PickerField::Minutes,
        PickerField::Seconds,
    ];

    pub fn max(&self) -> u32 {
        match self {
            PickerField::Hours => 23,
            PickerField::Minutes | PickerField::Seconds => 59,
        }
    }
}

impl fmt::Display for PickerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PickerField::Hours => "hours",
            PickerField::Minutes => "minutes",
            PickerField::Seconds => "seconds",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimerConfig")]
pub struct TimerConfig {
    hours: u32,
    minutes: u32,
    seconds: u32,
}

#[derive(Deserialize)]
struct RawTimerConfig {
    #[serde(default)]
    hours: u32,
    #[serde(default)]
    minutes: u32,
    #[serde(default)]
    seconds: u32,
}

impl TryFrom<RawTimerConfig> for TimerConfig {
    type Error = TimerError;

    fn try_from(raw: RawTimerConfig) -> TimerResult<Self> {
        TimerConfig::new(raw.hours, raw.minutes, raw.seconds)
    }
}

impl TimerConfig {
    /// Thirty seconds, the picker's starting position.
    pub const DEFAULT: TimerConfig = TimerConfig {
        hours: 0,
        minutes: 0,
        seconds: 30,
    };

    pub fn new(hours: u32, minutes: u32, seconds: u32) -> TimerResult<Self> {
        let config = Self {
            hours,
            minutes,
            seconds,
        };
        for field in PickerField::ALL {
            let value = config.get(field);
            if value > field.max() {
                return Err(TimerError::OutOfRange {
                    field,
                    value,
                    max: field.max(),
                });
            }
        }
        Ok(config)
    }

    /// Splits a second count back into picker fields. Values of a day or
    /// more saturate at 23:59:59.
    pub fn from_seconds(total: u32) -> Self {
        let total = total.min(23 * 3600 + 59 * 60 + 59);
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }

    pub fn total_seconds(&self) -> u32 {
        self.hours * 3600 + self.minutes * 60 + self.seconds
    }

    pub fn get(&self, field: PickerField) -> u32 {
        match field {
            PickerField::Hours => self.hours,
            PickerField::Minutes => self.minutes,
            PickerField::Seconds => self.seconds,
        }
    }

    pub fn with(self, field: PickerField, value: u32) -> TimerResult<Self> {
        let mut next = self;
        match field {
            PickerField::Hours => next.hours = value,
            PickerField::Minutes => next.minutes = value,
            PickerField::Seconds => next.seconds = value,
        }
        Self::new(next.hours, next.minutes, next.seconds)
    }

    /// Moves one field by `delta`, clamped to its range like a picker wheel.
    pub fn nudge(self, field: PickerField, delta: i32) -> Self {
        let current = self.get(field) as i64;
        let value = (current + delta as i64).clamp(0, field.max() as i64) as u32;
        match self.with(field, value) {
            Ok(next) => next,
            Err(_) => self,
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for TimerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// What a scheduler fire meant to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Not one of this engine's handles.
    Ignored,
    Ticked,
    /// Reached zero. Reported exactly once per run.
    Completed,
    /// The post-completion hold ran out and the timer is idle again.
    HoldElapsed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    pub remaining_seconds: u32,
    pub previous_remaining_seconds: u32,
    pub phase: Phase,
    pub config: TimerConfig,
}

pub struct CountdownTimer {
    /// Last configuration the user dialed in.
    config: TimerConfig,
    /// What [`CountdownTimer::reset`] goes back to.
    default_config: TimerConfig,
    remaining: u32,
    previous: u32,
    phase: Phase,
    period_ms: u64,
    hold_ms: u64,
    tick: Option<ScheduleHandle>,
    hold: Option<ScheduleHandle>,
}

impl CountdownTimer {
    pub fn new(default_config: TimerConfig) -> Self {
        Self::with_timing(default_config, DEFAULT_PERIOD_MS, DEFAULT_HOLD_MS)
    }

    pub fn with_timing(default_config: TimerConfig, period_ms: u64, hold_ms: u64) -> Self {
        let total = default_config.total_seconds();
        Self {
            config: default_config,
            default_config,
            remaining: total,
            previous: total,
            phase: Phase::Idle,
            period_ms,
            hold_ms,
            tick: None,
            hold: None,
        }
    }

    fn reject(&self, op: &'static str) -> TimerError {
        log::debug!("rejected {} while {}", op, self.phase);
        TimerError::InvalidTransition {
            op,
            phase: self.phase,
        }
    }

    pub fn configure(&mut self, config: TimerConfig) -> TimerResult<()> {
        if self.phase != Phase::Idle {
            return Err(self.reject("configure"));
        }
        self.config = config;
        self.load_config();
        Ok(())
    }

    pub fn start(&mut self, sched: &mut dyn Scheduler) -> TimerResult<()> {
        if self.phase != Phase::Idle {
            return Err(self.reject("start"));
        }
        let total = self.config.total_seconds();
        if total == 0 {
            return Err(TimerError::ZeroDuration);
        }
        self.remaining = total;
        self.previous = total;
        self.phase = Phase::Running;
        self.tick = Some(sched.every(self.period_ms));
        log::debug!("timer started for {}", self.config);
        Ok(())
    }

    pub fn pause(&mut self, sched: &mut dyn Scheduler) -> TimerResult<()> {
        if self.phase != Phase::Running {
            return Err(self.reject("pause"));
        }
        cancel_slot(sched, &mut self.tick);
        self.phase = Phase::Paused;
        log::debug!("timer paused at {}s", self.remaining);
        Ok(())
    }

    pub fn resume(&mut self, sched: &mut dyn Scheduler) -> TimerResult<()> {
        if self.phase != Phase::Paused {
            return Err(self.reject("resume"));
        }
        self.phase = Phase::Running;
        self.tick = Some(sched.every(self.period_ms));
        log::debug!("timer resumed at {}s", self.remaining);
        Ok(())
    }

    /// Abandons the run and returns to configuration.
    pub fn stop(&mut self, sched: &mut dyn Scheduler) -> TimerResult<()> {
        if !matches!(self.phase, Phase::Running | Phase::Paused) {
            return Err(self.reject("stop"));
        }
        cancel_slot(sched, &mut self.tick);
        self.phase = Phase::Idle;
        self.load_config();
        log::debug!("timer stopped");
        Ok(())
    }

    /// Back to the default preset from any phase, including during the hold.
    pub fn reset(&mut self, sched: &mut dyn Scheduler) {
        self.shutdown(sched);
        self.phase = Phase::Idle;
        self.config = self.default_config;
        self.load_config();
    }

    /// Disarms everything this engine has scheduled.
    pub fn shutdown(&mut self, sched: &mut dyn Scheduler) {
        cancel_slot(sched, &mut self.tick);
        cancel_slot(sched, &mut self.hold);
    }

    pub fn on_fire(&mut self, handle: ScheduleHandle, sched: &mut dyn Scheduler) -> TimerEvent {
        if self.tick == Some(handle) && self.phase == Phase::Running {
            self.previous = self.remaining;
            self.remaining = self.remaining.saturating_sub(1);
            if self.remaining == 0 {
                cancel_slot(sched, &mut self.tick);
                self.phase = Phase::Completed;
                self.hold = Some(sched.once(self.hold_ms));
                log::info!("timer for {} completed", self.config);
                return TimerEvent::Completed;
            }
            return TimerEvent::Ticked;
        }
        if self.hold == Some(handle) {
            self.hold = None;
            self.phase = Phase::Idle;
            self.load_config();
            log::debug!("completion hold elapsed, back to {}", self.config);
            return TimerEvent::HoldElapsed;
        }
        TimerEvent::Ignored
    }

    fn load_config(&mut self) {
        self.remaining = self.config.total_seconds();
        self.previous = self.remaining;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> TimerConfig {
        self.config
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining
    }

    pub fn previous_remaining_seconds(&self) -> u32 {
        self.previous
    }

    /// Flip events for the latest tick.
    pub fn digit_events(&self) -> Vec<DigitChangeEvent> {
        flip::diff(self.remaining, self.previous)
    }

    /// Flip events for the clock appearing at the current value.
    pub fn initial_digits(&self) -> Vec<DigitChangeEvent> {
        flip::initial(self.remaining)
    }

    /// Progress through the current run, 0.0 at start and 1.0 when done.
    pub fn progress_fraction(&self) -> f32 {
        let total = self.config.total_seconds();
        if total == 0 {
            return 1.0;
        }
        let done = total.saturating_sub(self.remaining) as f32 / total as f32;
        done.min(1.0)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            remaining_seconds: self.remaining,
            previous_remaining_seconds: self.previous,
            phase: self.phase,
            config: self.config,
        }
    }
}

impl Default for CountdownTimer {
    fn default() -> Self {
        Self::new(TimerConfig::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::TickScheduler;

    fn pump(timer: &mut CountdownTimer, sched: &mut TickScheduler, now: u64) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        while let Some(h) = sched.pop_due(now) {
            events.push(timer.on_fire(h, sched));
        }
        events
    }

    fn secs(h: u32, m: u32, s: u32) -> TimerConfig {
        TimerConfig::new(h, m, s).unwrap()
    }

    #[test]
    fn test_config_to_seconds() {
        assert_eq!(secs(0, 0, 30).total_seconds(), 30);
        assert_eq!(secs(1, 1, 1).total_seconds(), 3661);
        assert_eq!(TimerConfig::from_seconds(3661), secs(1, 1, 1));
    }

    #[test]
    fn test_config_range_checked() {
        assert_eq!(
            TimerConfig::new(24, 0, 0),
            Err(TimerError::OutOfRange { field: PickerField::Hours, value: 24, max: 23 })
        );
        assert!(TimerConfig::new(23, 59, 59).is_ok());
        assert!(TimerConfig::DEFAULT.with(PickerField::Seconds, 60).is_err());
    }

    #[test]
    fn test_nudge_clamps() {
        let c = secs(0, 0, 30);
        assert_eq!(c.nudge(PickerField::Hours, -1), c);
        assert_eq!(c.nudge(PickerField::Seconds, 100).get(PickerField::Seconds), 59);
        assert_eq!(c.nudge(PickerField::Minutes, 2).get(PickerField::Minutes), 2);
    }

    #[test]
    fn test_three_ticks_complete_once() {
        let mut sched = TickScheduler::new(0);
        let mut timer = CountdownTimer::default();
        timer.configure(secs(0, 0, 3)).unwrap();
        timer.start(&mut sched).unwrap();

        let mut phases = Vec::new();
        let mut completions = 0;
        for now in [1000, 2000, 3000] {
            for ev in pump(&mut timer, &mut sched, now) {
                if ev == TimerEvent::Completed {
                    completions += 1;
                }
            }
            phases.push(timer.phase());
        }
        assert_eq!(phases, vec![Phase::Running, Phase::Running, Phase::Completed]);
        assert_eq!(completions, 1);

        // Nothing but the hold remains armed; it fires once more and stops.
        assert_eq!(pump(&mut timer, &mut sched, 10_000), vec![TimerEvent::HoldElapsed]);
        assert!(pump(&mut timer, &mut sched, 60_000).is_empty());
    }

    #[test]
    fn test_hold_restores_last_config() {
        let mut sched = TickScheduler::new(0);
        let mut timer = CountdownTimer::default();
        timer.configure(secs(0, 0, 2)).unwrap();
        timer.start(&mut sched).unwrap();

        pump(&mut timer, &mut sched, 2000);
        assert_eq!(timer.phase(), Phase::Completed);
        assert_eq!(timer.remaining_seconds(), 0);

        pump(&mut timer, &mut sched, 4999);
        assert_eq!(timer.phase(), Phase::Completed);
        pump(&mut timer, &mut sched, 5000);
        assert_eq!(timer.phase(), Phase::Idle);
        assert_eq!(timer.config(), secs(0, 0, 2));
        assert_eq!(timer.remaining_seconds(), 2);
    }

    #[test]
    fn test_reset_cancels_pending_hold() {
        let mut sched = TickScheduler::new(0);
        let mut timer = CountdownTimer::default();
        timer.configure(secs(0, 0, 1)).unwrap();
        timer.start(&mut sched).unwrap();
        pump(&mut timer, &mut sched, 1000);
        assert_eq!(timer.phase(), Phase::Completed);

        timer.reset(&mut sched);
        assert!(sched.is_empty());
        assert_eq!(timer.phase(), Phase::Idle);
        assert_eq!(timer.config(), TimerConfig::DEFAULT);
        assert_eq!(timer.remaining_seconds(), 30);

        // A run started after the reset is not disturbed by the old hold.
        timer.start(&mut sched).unwrap();
        assert!(pump(&mut timer, &mut sched, 4000).iter().all(|e| *e == TimerEvent::Ticked));
        assert_eq!(timer.remaining_seconds(), 27);
    }

    #[test]
    fn test_pause_freezes_and_resume_continues() {
        let mut sched = TickScheduler::new(0);
        let mut timer = CountdownTimer::default();
        timer.start(&mut sched).unwrap();
        pump(&mut timer, &mut sched, 5000);
        assert_eq!(timer.remaining_seconds(), 25);

        timer.pause(&mut sched).unwrap();
        pump(&mut timer, &mut sched, 60_000);
        assert_eq!(timer.remaining_seconds(), 25);
        assert_eq!(timer.phase(), Phase::Paused);

        timer.resume(&mut sched).unwrap();
        pump(&mut timer, &mut sched, 62_000);
        assert_eq!(timer.remaining_seconds(), 23);
        assert_eq!(timer.previous_remaining_seconds(), 24);
    }

    #[test]
    fn test_stop_discards_remaining() {
        let mut sched = TickScheduler::new(0);
        let mut timer = CountdownTimer::default();
        timer.configure(secs(0, 1, 0)).unwrap();
        timer.start(&mut sched).unwrap();
        pump(&mut timer, &mut sched, 10_000);
        timer.pause(&mut sched).unwrap();

        timer.stop(&mut sched).unwrap();
        assert_eq!(timer.phase(), Phase::Idle);
        assert_eq!(timer.remaining_seconds(), 60);
        assert!(sched.is_empty());
        assert!(timer.stop(&mut sched).is_err());
    }

    #[test]
    fn test_invalid_transitions_are_noops() {
        let mut sched = TickScheduler::new(0);
        let mut timer = CountdownTimer::default();
        assert!(matches!(
            timer.pause(&mut sched),
            Err(TimerError::InvalidTransition { op: "pause", .. })
        ));
        assert!(timer.resume(&mut sched).is_err());

        timer.start(&mut sched).unwrap();
        let err = timer.configure(secs(1, 0, 0)).unwrap_err();
        assert_eq!(
            err,
            TimerError::InvalidTransition {
                op: "configure",
                phase: Phase::Running
            }
        );
        assert_eq!(timer.config(), TimerConfig::DEFAULT);
        assert_eq!(timer.remaining_seconds(), 30);
    }

    #[test]
    fn test_zero_duration_rejected() {
        let mut sched = TickScheduler::new(0);
        let mut timer = CountdownTimer::default();
        timer.configure(secs(0, 0, 0)).unwrap();
        assert_eq!(timer.start(&mut sched), Err(TimerError::ZeroDuration));
        assert_eq!(timer.phase(), Phase::Idle);
        assert!(sched.is_empty());
    }

    #[test]
    fn test_start_while_running_keeps_single_schedule() {
        let mut sched = TickScheduler::new(0);
        let mut timer = CountdownTimer::default();
        timer.start(&mut sched).unwrap();
        assert!(timer.start(&mut sched).is_err());
        assert!(timer.start(&mut sched).is_err());
        assert_eq!(sched.len(), 1);

        let ticks = pump(&mut timer, &mut sched, 10_000)
            .into_iter()
            .filter(|e| *e == TimerEvent::Ticked)
            .count();
        assert_eq!(ticks, 10);
        assert_eq!(timer.remaining_seconds(), 20);
    }

    #[test]
    fn test_remaining_monotonic_under_mixed_ops() {
        let mut sched = TickScheduler::new(0);
        let mut timer = CountdownTimer::default();
        timer.configure(secs(0, 2, 0)).unwrap();

        // op: 0 start, 1 pause, 2 resume, 3 stop
        let script = [0, 9, 1, 9, 2, 9, 9, 1, 2, 3, 0, 9, 2, 1, 9, 2, 9, 0];
        let mut now = 0;
        for op in script {
            let before = (timer.phase(), timer.remaining_seconds());
            match op {
                0 => {
                    let _ = timer.start(&mut sched);
                }
                1 => {
                    let _ = timer.pause(&mut sched);
                }
                2 => {
                    let _ = timer.resume(&mut sched);
                }
                3 => {
                    let _ = timer.stop(&mut sched);
                }
                _ => {
                    now += 1700;
                    let mut last = timer.remaining_seconds();
                    while let Some(h) = sched.pop_due(now) {
                        timer.on_fire(h, &mut sched);
                        assert!(timer.remaining_seconds() <= last);
                        last = timer.remaining_seconds();
                    }
                    if before.0 == Phase::Paused {
                        assert_eq!(timer.remaining_seconds(), before.1);
                    }
                }
            }
            assert!(sched.len() <= 1);
        }
    }

    #[test]
    fn test_digit_events_follow_ticks() {
        let mut sched = TickScheduler::new(0);
        let mut timer = CountdownTimer::default();
        timer.configure(secs(0, 5, 10)).unwrap();
        timer.start(&mut sched).unwrap();
        assert_eq!(timer.initial_digits().len(), 4);

        pump(&mut timer, &mut sched, 1000);
        let flips = timer
            .digit_events()
            .into_iter()
            .filter(|e| matches!(e, DigitChangeEvent::Flip { .. }))
            .count();
        assert_eq!(flips, 2);
    }

    #[test]
    fn test_progress_fraction() {
        let mut sched = TickScheduler::new(0);
        let mut timer = CountdownTimer::default();
        timer.configure(secs(0, 0, 10)).unwrap();
        assert_eq!(timer.progress_fraction(), 0.0);
        timer.start(&mut sched).unwrap();
        pump(&mut timer, &mut sched, 5000);
        assert!((timer.progress_fraction() - 0.5).abs() < f32::EPSILON);
    }
}
