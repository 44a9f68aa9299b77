use std::collections::{BTreeMap, HashMap};

/// Identifies one armed schedule.
///
/// Handles are never reused, so a stale handle held by an engine can never
/// alias a schedule armed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduleHandle(u64);

impl ScheduleHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// The scheduling primitive engines arm their ticks with.
pub trait Scheduler {
    /// Fires every `period_ms`, first at now + `period_ms`.
    fn every(&mut self, period_ms: u64) -> ScheduleHandle;

    /// Fires once after `delay_ms`.
    fn once(&mut self, delay_ms: u64) -> ScheduleHandle;

    /// Disarms a schedule. Returns `false` if it was not armed, which makes
    /// repeated cancellation harmless.
    fn cancel(&mut self, handle: ScheduleHandle) -> bool;
}

/// Cancels `slot` if it holds a handle and clears it.
pub fn cancel_slot(sched: &mut dyn Scheduler, slot: &mut Option<ScheduleHandle>) {
    if let Some(handle) = slot.take() {
        sched.cancel(handle);
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    handle: ScheduleHandle,
    period_ms: Option<u64>,
}

/// Virtual-time scheduler driven by a single event loop.
///
/// Entries are kept in the order in which they fire. The loop drains them
/// with [`TickScheduler::pop_due`] one at a time, so any cancellation made
/// while handling one fire is honored before the next due entry is looked at.
#[derive(Debug, Default)]
pub struct TickScheduler {
    /// Keyed by (due time, handle id); the id breaks ties in arming order.
    entries: BTreeMap<(u64, u64), Entry>,
    /// Handle id to its current due time.
    due_by_id: HashMap<u64, u64>,
    /// Logical now. While draining, this is the due time of the entry just
    /// popped, so schedules armed from a handler are relative to the fire.
    cursor_ms: u64,
    last_id: u64,
}

impl TickScheduler {
    pub fn new(now_ms: u64) -> Self {
        Self {
            cursor_ms: now_ms,
            ..Self::default()
        }
    }

    /// Moves logical time forward without firing anything.
    pub fn advance_to(&mut self, now_ms: u64) {
        if now_ms > self.cursor_ms {
            self.cursor_ms = now_ms;
        }
    }

    /// Removes and returns the earliest entry due at or before `now_ms`.
    ///
    /// Periodic entries are re-armed at `due + period`, so a loop that wakes
    /// late still sees every tick it missed.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<ScheduleHandle> {
        let (due, id) = match self.entries.first_key_value() {
            Some((&(due, id), _)) if due <= now_ms => (due, id),
            _ => {
                self.advance_to(now_ms);
                return None;
            }
        };
        let entry = self.entries.remove(&(due, id))?;
        self.cursor_ms = self.cursor_ms.max(due);
        match entry.period_ms {
            Some(period) => {
                let next = due + period;
                self.entries.insert((next, id), entry);
                self.due_by_id.insert(id, next);
            }
            None => {
                self.due_by_id.remove(&id);
            }
        }
        Some(entry.handle)
    }

    /// When the next entry fires, if any is armed.
    pub fn next_due(&self) -> Option<u64> {
        self.entries.keys().next().map(|&(due, _)| due)
    }

    pub fn is_active(&self, handle: ScheduleHandle) -> bool {
        self.due_by_id.contains_key(&handle.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn arm(&mut self, delay_ms: u64, period_ms: Option<u64>) -> ScheduleHandle {
        self.last_id += 1;
        let handle = ScheduleHandle(self.last_id);
        let due = self.cursor_ms + delay_ms;
        self.entries.insert((due, handle.0), Entry { handle, period_ms });
        self.due_by_id.insert(handle.0, due);
        handle
    }
}

impl Scheduler for TickScheduler {
    fn every(&mut self, period_ms: u64) -> ScheduleHandle {
        // A zero period would re-arm at the same instant forever.
        let period = period_ms.max(1);
        self.arm(period, Some(period))
    }

    fn once(&mut self, delay_ms: u64) -> ScheduleHandle {
        self.arm(delay_ms, None)
    }

    fn cancel(&mut self, handle: ScheduleHandle) -> bool {
        match self.due_by_id.remove(&handle.0) {
            Some(due) => {
                self.entries.remove(&(due, handle.0));
                true
            }
            None => false,
        }
    }
}
