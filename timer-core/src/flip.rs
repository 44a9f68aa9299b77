//! Flip-clock digit diffing.
//!
//! The countdown keeps the value it showed on the previous tick next to the
//! current one. Comparing the two decompositions tells the display which
//! cards have to flip; everything else stays still.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DigitGroup {
    Hours,
    Minutes,
    SecondsTens,
    SecondsOnes,
}

impl DigitGroup {
    pub const ALL: [DigitGroup; 4] = [
        DigitGroup::Hours,
        DigitGroup::Minutes,
        DigitGroup::SecondsTens,
        DigitGroup::SecondsOnes,
    ];
}

impl fmt::Display for DigitGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DigitGroup::Hours => "hours",
            DigitGroup::Minutes => "minutes",
            DigitGroup::SecondsTens => "seconds-tens",
            DigitGroup::SecondsOnes => "seconds-ones",
        };
        f.write_str(name)
    }
}

/// A remaining-seconds value split the way the flip clock shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FlipDigits {
    pub hours: u32,
    pub minutes: u32,
    pub seconds_tens: u32,
    pub seconds_ones: u32,
}

impl FlipDigits {
    pub fn from_seconds(total: u32) -> Self {
        let seconds = total % 60;
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds_tens: seconds / 10,
            seconds_ones: seconds % 10,
        }
    }

    pub fn get(&self, group: DigitGroup) -> u32 {
        match group {
            DigitGroup::Hours => self.hours,
            DigitGroup::Minutes => self.minutes,
            DigitGroup::SecondsTens => self.seconds_tens,
            DigitGroup::SecondsOnes => self.seconds_ones,
        }
    }

    pub fn set(&mut self, group: DigitGroup, value: u32) {
        match group {
            DigitGroup::Hours => self.hours = value,
            DigitGroup::Minutes => self.minutes = value,
            DigitGroup::SecondsTens => self.seconds_tens = value,
            DigitGroup::SecondsOnes => self.seconds_ones = value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DigitChangeEvent {
    /// Whether the hours card (and its separator) is shown.
    HoursVisibility(bool),
    /// Animate this card to a new value.
    Flip { group: DigitGroup, value: u32 },
    /// Show a value without animating, used when the clock first appears.
    Set { group: DigitGroup, value: u32 },
}

/// Events needed to move the display from `prev` to `curr` seconds.
///
/// Hours stay visible while either side has hours, so the card is not
/// hidden in the middle of flipping down to zero.
pub fn diff(curr: u32, prev: u32) -> Vec<DigitChangeEvent> {
    let now = FlipDigits::from_seconds(curr);
    let before = FlipDigits::from_seconds(prev);
    let hours_visible = now.hours > 0 || before.hours > 0;

    let mut events = vec![DigitChangeEvent::HoursVisibility(hours_visible)];
    for group in DigitGroup::ALL {
        if group == DigitGroup::Hours && !hours_visible {
            continue;
        }
        let value = now.get(group);
        if value != before.get(group) {
            events.push(DigitChangeEvent::Flip { group, value });
        }
    }
    events
}

/// The frame shown when the flip clock first appears.
pub fn initial(curr: u32) -> Vec<DigitChangeEvent> {
    let now = FlipDigits::from_seconds(curr);
    let hours_visible = now.hours > 0;

    let mut events = vec![DigitChangeEvent::HoursVisibility(hours_visible)];
    events.extend(
        DigitGroup::ALL
            .into_iter()
            .filter(|&group| hours_visible || group != DigitGroup::Hours)
            .map(|group| DigitChangeEvent::Set {
                group,
                value: now.get(group),
            }),
    );
    events
}
