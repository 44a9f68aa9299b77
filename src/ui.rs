use std::io::{self, Write};

use timer_core::{
    format_hms, format_stopwatch, CityClock, DigitChangeEvent, DigitGroup, FlipDigits, Phase,
    PickerField, StopwatchSnapshot, TimerSnapshot, WorldSnapshot,
};

use crate::alerts::AlertConfig;

pub const TABS: [&str; 3] = ["Stopwatch", "Timer", "World Clock"];

/// How many laps fit on screen; older ones scroll off the bottom.
pub const VISIBLE_LAPS: usize = 8;

const PROGRESS_WIDTH: usize = 20;

/// Mirror of what the flip clock shows.
///
/// Never reads the countdown directly: it only learns about values through
/// the digit-change events the engine hands out.
#[derive(Debug, Default, Clone)]
pub struct FlipBoard {
    digits: FlipDigits,
    hours_visible: bool,
    /// Cards that flipped on the last update, drawn highlighted.
    flipping: Vec<DigitGroup>,
}

impl FlipBoard {
    pub fn apply(&mut self, events: &[DigitChangeEvent]) {
        self.flipping.clear();
        for event in events {
            match *event {
                DigitChangeEvent::HoursVisibility(visible) => self.hours_visible = visible,
                DigitChangeEvent::Flip { group, value } => {
                    self.digits.set(group, value);
                    self.flipping.push(group);
                }
                DigitChangeEvent::Set { group, value } => self.digits.set(group, value),
            }
        }
    }

    pub fn digits(&self) -> FlipDigits {
        self.digits
    }

    pub fn hours_visible(&self) -> bool {
        self.hours_visible
    }

    fn card(&self, group: DigitGroup, text: String) -> String {
        if self.flipping.contains(&group) {
            format!("▼{}▼", text)
        } else {
            format!("[{}]", text)
        }
    }

    pub fn render(&self) -> String {
        let mut line = String::new();
        if self.hours_visible {
            line.push_str(&self.card(DigitGroup::Hours, self.digits.hours.to_string()));
            line.push(':');
        }
        line.push_str(&self.card(DigitGroup::Minutes, format!("{:02}", self.digits.minutes)));
        line.push(':');
        line.push_str(&self.card(DigitGroup::SecondsTens, self.digits.seconds_tens.to_string()));
        line.push_str(&self.card(DigitGroup::SecondsOnes, self.digits.seconds_ones.to_string()));
        line
    }
}

pub fn clear_screen(out: &mut dyn Write) -> io::Result<()> {
    write!(out, "\x1b[2J\x1b[H")
}

fn footer(out: &mut dyn Write, hint: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", hint)?;
    out.flush()
}

pub fn draw_mode_select(out: &mut dyn Write, cursor: usize) -> io::Result<()> {
    clear_screen(out)?;
    writeln!(out, "TIMEPIECE")?;
    writeln!(out)?;
    for (i, tab) in TABS.iter().enumerate() {
        let marker = if i == cursor { "> " } else { "  " };
        writeln!(out, "{}{}", marker, tab)?;
    }
    footer(out, "j/k=move  ENTER=open  s=settings  ?=help  q=quit")
}

pub fn draw_help(out: &mut dyn Write, help_text: &str) -> io::Result<()> {
    clear_screen(out)?;
    for line in help_text.lines() {
        writeln!(out, "{}", line)?;
    }
    footer(out, "Press any key to close")
}

pub fn draw_confirm_exit(out: &mut dyn Write) -> io::Result<()> {
    clear_screen(out)?;
    writeln!(out, "Timer Running")?;
    writeln!(out)?;
    writeln!(out, "A timer is still running.")?;
    writeln!(out, "Quit anyway?")?;
    footer(out, "y=quit  n=cancel")
}

pub fn draw_stopwatch(
    out: &mut dyn Write,
    snap: &StopwatchSnapshot,
    lap_scroll: usize,
) -> io::Result<()> {
    clear_screen(out)?;
    writeln!(out, "STOPWATCH")?;
    writeln!(out)?;
    writeln!(out, "    {}", format_stopwatch(snap.elapsed_ms))?;
    writeln!(out)?;

    // Newest lap first.
    for lap in snap.laps.iter().rev().skip(lap_scroll).take(VISIBLE_LAPS) {
        writeln!(
            out,
            "  Lap {:<3} {:>10} {:>10}",
            lap.index,
            format_stopwatch(lap.split_ms),
            format_stopwatch(lap.cumulative_ms)
        )?;
    }
    let primary = if snap.running { "lap" } else { "start" };
    footer(out, &format!("ENTER={}  j/k=scroll  r=reset  q=back", primary))
}

pub fn draw_timer(
    out: &mut dyn Write,
    snap: &TimerSnapshot,
    board: &FlipBoard,
    field: PickerField,
    progress: f32,
    banner: Option<&str>,
) -> io::Result<()> {
    clear_screen(out)?;
    writeln!(out, "TIMER")?;
    writeln!(out)?;

    match snap.phase {
        Phase::Idle => {
            let mut picker = String::new();
            for f in PickerField::ALL {
                let value = snap.config.get(f);
                if f == field {
                    picker.push_str(&format!(" >{:02}<", value));
                } else {
                    picker.push_str(&format!("  {:02} ", value));
                }
            }
            writeln!(out, "   h    m    s")?;
            writeln!(out, "{}", picker)?;
            writeln!(out)?;
            writeln!(out, "    {}", format_hms(snap.remaining_seconds))?;
        }
        Phase::Running | Phase::Paused | Phase::Completed => {
            writeln!(out, "    {}", board.render())?;
            writeln!(out, "    {}", progress_bar(progress))?;
            if snap.phase == Phase::Paused {
                writeln!(out, "    (paused)")?;
            }
        }
    }

    if let Some(banner) = banner {
        writeln!(out)?;
        writeln!(out, "  *** {} ***", banner)?;
    }

    let hint = match snap.phase {
        Phase::Idle => "h/m/s=field  j/k=adjust  ENTER=start  r=reset  q=back",
        Phase::Running => "ENTER=stop  p=pause  r=reset  q=back",
        Phase::Paused => "ENTER=stop  p=resume  r=reset  q=back",
        Phase::Completed => "r=reset  q=back",
    };
    footer(out, hint)
}

fn progress_bar(fraction: f32) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * PROGRESS_WIDTH as f32).round() as usize;
    format!(
        "[{}{}]",
        "#".repeat(filled),
        ".".repeat(PROGRESS_WIDTH - filled)
    )
}

pub fn draw_world(out: &mut dyn Write, snap: &WorldSnapshot) -> io::Result<()> {
    clear_screen(out)?;
    writeln!(out, "WORLD CLOCK                       local {}", snap.local_time)?;
    writeln!(out)?;
    writeln!(out, "    {}  {}", snap.main.time, snap.main.city)?;
    writeln!(out, "           {}", snap.main.country)?;
    writeln!(out)?;
    for (i, entry) in snap.additional.iter().enumerate() {
        writeln!(out, "  {}. {:<16} {}", i + 1, entry.city, entry.time)?;
    }
    if !snap.dots.is_empty() {
        writeln!(out)?;
        let dots: Vec<String> = snap
            .dots
            .iter()
            .map(|d| {
                let mark = if d.active { '●' } else { '○' };
                format!("{}{} ({:.0}%,{:.0}%)", mark, d.city, d.position.x, d.position.y)
            })
            .collect();
        writeln!(out, "  map: {}", dots.join("  "))?;
    }
    footer(out, "a=add city  1-9=remove  n/b=next/prev dot  x=drop dot  q=back")
}

pub fn draw_city_search(
    out: &mut dyn Write,
    term: &str,
    results: &[&CityClock],
) -> io::Result<()> {
    clear_screen(out)?;
    writeln!(out, "ADD CITY")?;
    writeln!(out)?;
    writeln!(out, "  search: {}_", term)?;
    writeln!(out)?;
    if results.is_empty() {
        writeln!(out, "  No cities found")?;
    }
    for (i, city) in results.iter().take(9).enumerate() {
        writeln!(out, "  {}. {:<16} {}", i + 1, city.city, city.country)?;
    }
    footer(out, "type to filter  1-9=add  ENTER=set main  <=erase  .=close")
}

pub fn draw_settings(out: &mut dyn Write, config: &AlertConfig, cursor: usize) -> io::Result<()> {
    clear_screen(out)?;
    writeln!(out, "SETTINGS")?;
    writeln!(out)?;
    let items = [("Notification", config.notification), ("Audio", config.audio)];
    for (i, (name, on)) in items.iter().enumerate() {
        let marker = if i == cursor { "> " } else { "  " };
        let state = if *on { "ON" } else { "OFF" };
        writeln!(out, "{}{:<14} {}", marker, name, state)?;
    }
    footer(out, "j/k=move  ENTER=toggle  q=back")
}
