mod alerts;
mod config;
mod countdown;
mod stopwatch;
mod ui;
mod world;

use std::fmt::Display;
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use num_traits::FromPrimitive;
use timer_core::schedule::cancel_slot;
use timer_core::{
    ChronoTzFormatter, Clock, PickerField, ScheduleHandle, Scheduler, SystemClock, TickScheduler,
    TimerEvent, WorldClockError, WorldClockRegistry,
};

use crate::alerts::{
    fire_alert, AlertConfig, AudioCue, Notifier, TerminalBell, TerminalNotifier, TIMER_COMPLETE,
};
use crate::config::AppConfig;
use crate::countdown::CountdownState;
use crate::stopwatch::StopwatchState;
use crate::world::WorldState;

const APP_NAME: &str = "Timepiece";

enum AppOp {
    /// One line of terminal input; each char is a key, an empty line is Enter.
    Keys(String),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, num_derive::FromPrimitive)]
enum Tab {
    Stopwatch = 0,
    Timer,
    WorldClock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    ModeSelect,
    Stopwatch,
    Timer,
    WorldClock,
    CitySearch,
    Settings,
}

fn log_rejected<T, E: Display>(result: Result<T, E>) {
    if let Err(e) = result {
        log::debug!("ignored: {}", e);
    }
}

fn help_text(mode: AppMode) -> &'static str {
    match mode {
        AppMode::ModeSelect => {
            "TIMEPIECE HELP\n\n\
             j/k    Move cursor\n\
             Enter  Open tab\n\
             s      Settings\n\
             q      Quit"
        }
        AppMode::Stopwatch => {
            "STOPWATCH HELP\n\n\
             Enter  Start, or lap and stop\n\
             j/k    Scroll laps\n\
             r      Reset\n\
             q      Back"
        }
        AppMode::Timer => {
            "TIMER HELP\n\n\
             h/m/s  Pick hours, minutes, seconds\n\
             +/-    Adjust (also k/j)\n\
             Enter  Start/Stop\n\
             p      Pause/Resume\n\
             r      Reset to default\n\
             q      Back"
        }
        AppMode::WorldClock | AppMode::CitySearch => {
            "WORLD CLOCK HELP\n\n\
             a      Search cities\n\
             1-9    Remove additional clock\n\
             n/b    Next/previous map dot\n\
             x      Remove the next map dot\n\
             q      Back\n\n\
             In search: type to filter, 1-9 adds,\n\
             Enter sets main, < erases, . closes"
        }
        AppMode::Settings => {
            "SETTINGS HELP\n\n\
             j/k    Move cursor\n\
             Enter  Toggle\n\
             q      Back"
        }
    }
}

struct TimepieceApp {
    clock: Box<dyn Clock>,
    sched: TickScheduler,
    out: Box<dyn Write>,
    notifier: Box<dyn Notifier>,
    audio: Box<dyn AudioCue>,
    formatter: ChronoTzFormatter,

    mode: AppMode,
    mode_cursor: usize,
    settings_cursor: usize,
    alert_config: AlertConfig,

    stopwatch: StopwatchState,
    countdown: CountdownState,
    world: WorldState,

    pump_interval_ms: u64,
    pump: Option<ScheduleHandle>,
    dirty: bool,
    help_visible: bool,
    confirm_exit: bool,
    quit: bool,
}

impl TimepieceApp {
    fn new(
        config: AppConfig,
        clock: Box<dyn Clock>,
        out: Box<dyn Write>,
        notifier: Box<dyn Notifier>,
        audio: Box<dyn AudioCue>,
    ) -> Result<Self, WorldClockError> {
        let registry = WorldClockRegistry::new(config.cities, &config.main_city)?
            .with_refresh_period(config.world_refresh_ms);
        log::debug!("timing from {}", clock.name());
        let sched = TickScheduler::new(clock.now_ms());

        Ok(Self {
            clock,
            sched,
            out,
            notifier,
            audio,
            formatter: ChronoTzFormatter,
            mode: AppMode::ModeSelect,
            mode_cursor: 0,
            settings_cursor: 0,
            alert_config: config.alerts,
            stopwatch: StopwatchState::new(config.stopwatch_quantum_ms),
            countdown: CountdownState::new(
                config.default_preset,
                config.countdown_period_ms,
                config.completion_hold_ms,
            ),
            world: WorldState::new(registry),
            pump_interval_ms: config.display_pump_ms,
            pump: None,
            dirty: true,
            help_visible: false,
            confirm_exit: false,
            quit: false,
        })
    }

    fn redraw(&mut self) {
        self.dirty = false;
        let out = self.out.as_mut();

        let result = if self.help_visible {
            ui::draw_help(out, help_text(self.mode))
        } else if self.confirm_exit {
            ui::draw_confirm_exit(out)
        } else {
            match self.mode {
                AppMode::ModeSelect => ui::draw_mode_select(out, self.mode_cursor),
                AppMode::Stopwatch => ui::draw_stopwatch(
                    out,
                    &self.stopwatch.snapshot(),
                    self.stopwatch.lap_scroll_offset,
                ),
                AppMode::Timer => ui::draw_timer(
                    out,
                    &self.countdown.snapshot(),
                    &self.countdown.board,
                    self.countdown.field,
                    self.countdown.engine.progress_fraction(),
                    self.countdown.banner.as_deref(),
                ),
                AppMode::WorldClock => {
                    let snap = self.world.refresh(self.clock.wall_now(), &self.formatter);
                    ui::draw_world(out, snap)
                }
                AppMode::CitySearch => {
                    let results = self.world.results();
                    let cities: Vec<_> = results.iter().map(|(_, c)| *c).collect();
                    ui::draw_city_search(out, &self.world.search_term, &cities)
                }
                AppMode::Settings => {
                    ui::draw_settings(out, &self.alert_config, self.settings_cursor)
                }
            }
        };
        if let Err(e) = result {
            log::warn!("redraw failed: {}", e);
        }
    }

    fn start_pump(&mut self) {
        if self.pump.is_none() {
            self.pump = Some(self.sched.every(self.pump_interval_ms));
        }
    }

    fn stop_pump(&mut self) {
        cancel_slot(&mut self.sched, &mut self.pump);
    }

    /// Arms the redraw pump and the world refresh only while their screen
    /// is showing.
    fn sync_schedules(&mut self) {
        if self.mode == AppMode::Stopwatch && self.stopwatch.engine.is_running() {
            self.start_pump();
        } else {
            self.stop_pump();
        }
        if self.mode == AppMode::WorldClock {
            self.world.registry.start_refresh(&mut self.sched);
        } else {
            self.world.registry.stop_refresh(&mut self.sched);
        }
    }

    /// Runs every schedule entry that is due, in order, then redraws once.
    fn handle_pump(&mut self) {
        let now = self.clock.now_ms();
        while let Some(handle) = self.sched.pop_due(now) {
            self.dispatch(handle);
        }
        if self.dirty {
            self.redraw();
        }
    }

    fn dispatch(&mut self, handle: ScheduleHandle) {
        if self.stopwatch.engine.on_fire(handle) {
            return;
        }
        match self.countdown.on_fire(handle, &mut self.sched) {
            TimerEvent::Completed => {
                self.countdown.banner = fire_alert(
                    &self.alert_config,
                    self.notifier.as_ref(),
                    self.audio.as_ref(),
                    &TIMER_COMPLETE,
                );
                self.dirty = true;
                return;
            }
            TimerEvent::Ticked | TimerEvent::HoldElapsed => {
                self.dirty |= self.mode == AppMode::Timer;
                return;
            }
            TimerEvent::Ignored => {}
        }
        if self.world.registry.on_fire(handle) {
            self.dirty |= self.mode == AppMode::WorldClock;
            return;
        }
        if self.pump == Some(handle) {
            self.dirty = true;
            return;
        }
        log::debug!("stale schedule fire {}", handle.id());
    }

    fn handle_line(&mut self, line: &str) {
        if line.is_empty() {
            self.handle_key('\n');
        } else {
            for key in line.chars() {
                self.handle_key(key);
                if self.quit {
                    break;
                }
            }
        }
        self.sync_schedules();
        self.redraw();
    }

    fn handle_key(&mut self, key: char) {
        // Any key dismisses the help screen
        if self.help_visible {
            self.help_visible = false;
            return;
        }

        if self.confirm_exit {
            match key {
                'y' => self.quit = true,
                'n' => self.confirm_exit = false,
                _ => {}
            }
            return;
        }

        if key == '?' && self.mode != AppMode::CitySearch {
            self.help_visible = true;
            return;
        }

        match self.mode {
            AppMode::ModeSelect => self.handle_key_mode_select(key),
            AppMode::Stopwatch => self.handle_key_stopwatch(key),
            AppMode::Timer => self.handle_key_timer(key),
            AppMode::WorldClock => self.handle_key_world(key),
            AppMode::CitySearch => self.handle_key_city_search(key),
            AppMode::Settings => self.handle_key_settings(key),
        }
    }

    fn any_timer_running(&self) -> bool {
        self.stopwatch.engine.is_running() || self.countdown.is_active()
    }

    fn handle_key_mode_select(&mut self, key: char) {
        match key {
            'k' => {
                self.mode_cursor = self.mode_cursor.saturating_sub(1);
            }
            'j' => {
                if self.mode_cursor + 1 < ui::TABS.len() {
                    self.mode_cursor += 1;
                }
            }
            '\r' | '\n' => {
                self.mode = match Tab::from_usize(self.mode_cursor) {
                    Some(Tab::Stopwatch) => AppMode::Stopwatch,
                    Some(Tab::Timer) => AppMode::Timer,
                    Some(Tab::WorldClock) => AppMode::WorldClock,
                    None => AppMode::ModeSelect,
                };
            }
            's' => {
                self.mode = AppMode::Settings;
                self.settings_cursor = 0;
            }
            'q' => {
                if self.any_timer_running() {
                    self.confirm_exit = true;
                } else {
                    self.quit = true;
                }
            }
            _ => {}
        }
    }

    fn handle_key_stopwatch(&mut self, key: char) {
        match key {
            '\r' | '\n' => log_rejected(self.stopwatch.primary(&mut self.sched)),
            'j' => self.stopwatch.scroll_down(),
            'k' => self.stopwatch.scroll_up(),
            'r' => self.stopwatch.reset(&mut self.sched),
            'q' => self.mode = AppMode::ModeSelect,
            _ => {}
        }
    }

    fn handle_key_timer(&mut self, key: char) {
        match key {
            'h' => self.countdown.select_field(PickerField::Hours),
            'm' => self.countdown.select_field(PickerField::Minutes),
            's' => self.countdown.select_field(PickerField::Seconds),
            '+' | 'k' => log_rejected(self.countdown.nudge(1)),
            '-' | 'j' => log_rejected(self.countdown.nudge(-1)),
            '\r' | '\n' => log_rejected(self.countdown.toggle_run(&mut self.sched)),
            'p' => log_rejected(self.countdown.toggle_pause(&mut self.sched)),
            'r' => self.countdown.reset(&mut self.sched),
            'q' => self.mode = AppMode::ModeSelect,
            _ => {}
        }
    }

    fn handle_key_world(&mut self, key: char) {
        match key {
            'a' => {
                self.world.clear_search();
                self.mode = AppMode::CitySearch;
            }
            'n' => log_rejected(self.world.cycle_dot(true)),
            'b' => log_rejected(self.world.cycle_dot(false)),
            'x' => {
                self.world.remove_next_dot();
            }
            'q' => self.mode = AppMode::ModeSelect,
            _ => {
                if let Some(n) = key.to_digit(10) {
                    self.world.remove_additional(n as usize);
                }
            }
        }
    }

    fn handle_key_city_search(&mut self, key: char) {
        match key {
            '\r' | '\n' => match self.world.select_first_result() {
                Ok(true) => self.mode = AppMode::WorldClock,
                Ok(false) => {}
                Err(e) => log::warn!("could not select city: {}", e),
            },
            '+' => {
                if self.world.add_result(1) {
                    self.mode = AppMode::WorldClock;
                }
            }
            '<' => self.world.erase_char(),
            '.' => self.mode = AppMode::WorldClock,
            _ => {
                if let Some(n) = key.to_digit(10) {
                    if self.world.add_result(n as usize) {
                        self.mode = AppMode::WorldClock;
                    }
                } else {
                    let mut buf = [0u8; 4];
                    self.world.type_chars(key.encode_utf8(&mut buf));
                }
            }
        }
    }

    fn handle_key_settings(&mut self, key: char) {
        match key {
            'k' => {
                self.settings_cursor = self.settings_cursor.saturating_sub(1);
            }
            'j' => {
                if self.settings_cursor < 1 {
                    self.settings_cursor += 1;
                }
            }
            '\r' | '\n' => match self.settings_cursor {
                0 => self.alert_config.notification = !self.alert_config.notification,
                1 => self.alert_config.audio = !self.alert_config.audio,
                _ => {}
            },
            'q' => self.mode = AppMode::ModeSelect,
            _ => {}
        }
    }

    /// Waits for input or the next due schedule, whichever comes first.
    fn run(&mut self, rx: Receiver<AppOp>) {
        self.redraw();
        while !self.quit {
            let op = match self.sched.next_due() {
                Some(due) => {
                    let wait = due.saturating_sub(self.clock.now_ms());
                    match rx.recv_timeout(Duration::from_millis(wait)) {
                        Ok(op) => Some(op),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => Some(AppOp::Quit),
                    }
                }
                None => Some(rx.recv().unwrap_or(AppOp::Quit)),
            };
            match op {
                None => self.handle_pump(),
                Some(AppOp::Keys(line)) => {
                    self.handle_pump();
                    self.handle_line(&line);
                }
                Some(AppOp::Quit) => break,
            }
        }
        self.shutdown();
    }

    /// Disarms every schedule owned by the engines and the app.
    fn shutdown(&mut self) {
        self.stop_pump();
        self.stopwatch.engine.stop(&mut self.sched);
        self.countdown.engine.shutdown(&mut self.sched);
        self.world.registry.stop_refresh(&mut self.sched);
        log::info!("{} exiting", APP_NAME);
    }
}

fn input_thread(tx: Sender<AppOp>) {
    for line in io::stdin().lock().lines() {
        match line {
            Ok(line) => {
                if tx.send(AppOp::Keys(line)).is_err() {
                    return;
                }
            }
            Err(e) => {
                log::error!("stdin read failed: {}", e);
                break;
            }
        }
    }
    tx.send(AppOp::Quit).ok();
}

fn init_logging() {
    let mut builder = env_logger::Builder::new();
    if let Ok(filter) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filter);
    } else {
        builder.filter_level(log::LevelFilter::Info);
    }
    builder.init();
}

fn main() {
    init_logging();
    log::info!("{} starting", APP_NAME);

    let config = match config::load_from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    let notifier = TerminalNotifier::new(io::stderr().is_terminal());

    let mut app = match TimepieceApp::new(
        config,
        Box::new(SystemClock::new()),
        Box::new(io::stdout()),
        Box::new(notifier),
        Box::new(TerminalBell),
    ) {
        Ok(app) => app,
        Err(e) => {
            log::error!("Failed to set up world clock: {}", e);
            std::process::exit(1);
        }
    };

    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || input_thread(tx));

    app.run(rx);
}
