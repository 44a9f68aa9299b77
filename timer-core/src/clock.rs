use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};

/// Source of "now" for every engine.
///
/// Engines only ever see milliseconds on a monotonic axis; the world clock
/// additionally needs wall-clock UTC to localize times of day.
pub trait Clock {
    /// Milliseconds since this clock's epoch. Never decreases.
    fn now_ms(&self) -> u64;

    /// Current wall-clock time.
    fn wall_now(&self) -> DateTime<Utc>;

    fn name(&self) -> &str {
        "Clock"
    }
}

/// Real platform clock.
pub struct SystemClock {
    anchor: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            anchor: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.anchor.elapsed().as_millis() as u64
    }

    fn wall_now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn name(&self) -> &str {
        "SystemClock"
    }
}

struct ManualState {
    now_ms: Cell<u64>,
    wall: Cell<DateTime<Utc>>,
}

/// Clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can hand one clone to
/// the code under test and keep another to drive it.
#[derive(Clone)]
pub struct ManualClock {
    state: Rc<ManualState>,
}

impl ManualClock {
    pub fn new(wall: DateTime<Utc>) -> Self {
        Self {
            state: Rc::new(ManualState {
                now_ms: Cell::new(0),
                wall: Cell::new(wall),
            }),
        }
    }

    /// Moves both the monotonic and the wall-clock axis forward.
    pub fn advance(&self, ms: u64) {
        self.state.now_ms.set(self.state.now_ms.get() + ms);
        let wall = self.state.wall.get() + Duration::milliseconds(ms as i64);
        self.state.wall.set(wall);
    }

    /// Jumps the wall clock without touching the monotonic axis.
    pub fn set_wall(&self, wall: DateTime<Utc>) {
        self.state.wall.set(wall);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.state.now_ms.get()
    }

    fn wall_now(&self) -> DateTime<Utc> {
        self.state.wall.get()
    }

    fn name(&self) -> &str {
        "ManualClock"
    }
}
