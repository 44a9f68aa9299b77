//! Pure timing logic library with no terminal or OS integration.
//! Everything here runs on a virtual clock, so it is testable on host.

pub mod clock;
pub mod countdown;
pub mod error;
pub mod flip;
pub mod schedule;
pub mod stopwatch;
pub mod world;

pub use clock::{Clock, ManualClock, SystemClock};
pub use countdown::{CountdownTimer, Phase, PickerField, TimerConfig, TimerEvent, TimerSnapshot};
pub use error::{StopwatchError, TimerError, TimerResult, WorldClockError};
pub use flip::{DigitChangeEvent, DigitGroup, FlipDigits};
pub use schedule::{ScheduleHandle, Scheduler, TickScheduler};
pub use stopwatch::{Lap, Stopwatch, StopwatchSnapshot};
pub use world::{
    ChronoTzFormatter, CityClock, CityId, ClockEntry, MapDot, MapPosition, WorldClockRegistry,
    WorldSnapshot, ZoneFormatter, PLACEHOLDER_TIME,
};

/// Format seconds as "H:MM:SS"
pub fn format_hms(total_secs: u32) -> String {
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    format!("{}:{:02}:{:02}", h, m, s)
}

/// Format milliseconds as "MM:SS.cs" (centiseconds). Minutes are not
/// wrapped into hours, so a day-long run reads "1440:00.00".
pub fn format_stopwatch(ms: u64) -> String {
    let total_secs = ms / 1000;
    let m = total_secs / 60;
    let s = total_secs % 60;
    let cs = (ms % 1000) / 10;
    format!("{:02}:{:02}.{:02}", m, s, cs)
}
