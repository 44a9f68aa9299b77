use serde::Serialize;

use crate::error::StopwatchError;
use crate::schedule::{cancel_slot, ScheduleHandle, Scheduler};

/// Milliseconds added per accumulation tick.
pub const DEFAULT_QUANTUM_MS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Lap {
    pub index: u32,
    pub split_ms: u64,
    pub cumulative_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopwatchSnapshot {
    pub elapsed_ms: u64,
    pub running: bool,
    pub laps: Vec<Lap>,
}

/// Free-running accumulator with lap recording.
///
/// Time only moves through [`Stopwatch::on_fire`]: each fire of the
/// engine's own schedule adds one quantum. The display is an approximation
/// of real time, not a measurement of it.
pub struct Stopwatch {
    elapsed_ms: u64,
    running: bool,
    laps: Vec<Lap>,
    quantum_ms: u64,
    tick: Option<ScheduleHandle>,
}

impl Stopwatch {
    pub fn new(quantum_ms: u64) -> Self {
        Self {
            elapsed_ms: 0,
            running: false,
            laps: Vec::new(),
            quantum_ms: quantum_ms.max(1),
            tick: None,
        }
    }

    pub fn start(&mut self, sched: &mut dyn Scheduler) -> Result<(), StopwatchError> {
        if self.running {
            return Err(StopwatchError::AlreadyRunning);
        }
        self.running = true;
        self.tick = Some(sched.every(self.quantum_ms));
        log::debug!("stopwatch started at {} ms", self.elapsed_ms);
        Ok(())
    }

    pub fn stop(&mut self, sched: &mut dyn Scheduler) {
        cancel_slot(sched, &mut self.tick);
        if self.running {
            self.running = false;
            log::debug!("stopwatch stopped at {} ms", self.elapsed_ms);
        }
    }

    /// Records the current elapsed time as a lap. Only valid while running.
    pub fn lap(&mut self) -> Result<Lap, StopwatchError> {
        if !self.running {
            return Err(StopwatchError::NotRunning);
        }
        let cumulative_ms = self.elapsed_ms;
        let split_ms = match self.laps.last() {
            Some(prev) => cumulative_ms.saturating_sub(prev.cumulative_ms),
            None => cumulative_ms,
        };
        let lap = Lap {
            index: self.laps.len() as u32 + 1,
            split_ms,
            cumulative_ms,
        };
        self.laps.push(lap);
        Ok(lap)
    }

    /// The combined "lap" button: record the lap, then halt.
    pub fn stop_and_lap(&mut self, sched: &mut dyn Scheduler) -> Result<Lap, StopwatchError> {
        let lap = self.lap()?;
        self.stop(sched);
        Ok(lap)
    }

    pub fn reset(&mut self, sched: &mut dyn Scheduler) {
        self.stop(sched);
        self.elapsed_ms = 0;
        self.laps.clear();
    }

    /// Returns `true` if the fire belonged to this engine.
    pub fn on_fire(&mut self, handle: ScheduleHandle) -> bool {
        if self.tick != Some(handle) {
            return false;
        }
        if self.running {
            self.elapsed_ms += self.quantum_ms;
        }
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }

    pub fn snapshot(&self) -> StopwatchSnapshot {
        StopwatchSnapshot {
            elapsed_ms: self.elapsed_ms,
            running: self.running,
            laps: self.laps.clone(),
        }
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new(DEFAULT_QUANTUM_MS)
    }
}
