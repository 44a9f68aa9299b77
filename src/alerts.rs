use std::io::{IsTerminal, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertConfig {
    pub notification: bool,
    pub audio: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            notification: true,
            audio: true,
        }
    }
}

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Notifications are not permitted")]
    NotPermitted,

    #[error("Audio output unavailable")]
    AudioUnavailable,

    #[error("Alert output failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Desktop-style notification side channel.
pub trait Notifier {
    fn notify(&self, title: &str, body: &str) -> Result<(), AlertError>;
}

/// Short audible cue.
pub trait AudioCue {
    fn beep(&self, frequency_hz: u32, duration_ms: u64) -> Result<(), AlertError>;
}

/// Posts notifications through the OSC 9 escape, which most graphical
/// terminals turn into a desktop notification.
pub struct TerminalNotifier {
    permitted: bool,
}

impl TerminalNotifier {
    pub fn new(permitted: bool) -> Self {
        Self { permitted }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<(), AlertError> {
        if !self.permitted {
            return Err(AlertError::NotPermitted);
        }
        let mut err = std::io::stderr().lock();
        write!(err, "\x1b]9;{}: {}\x07", title, body)?;
        err.flush()?;
        Ok(())
    }
}

/// Rings the terminal bell. Pitch and length are up to the terminal.
pub struct TerminalBell;

impl AudioCue for TerminalBell {
    fn beep(&self, _frequency_hz: u32, _duration_ms: u64) -> Result<(), AlertError> {
        let mut err = std::io::stderr().lock();
        if !err.is_terminal() {
            return Err(AlertError::AudioUnavailable);
        }
        err.write_all(b"\x07")?;
        err.flush()?;
        Ok(())
    }
}

pub struct Alert<'a> {
    pub title: &'a str,
    pub body: &'a str,
    /// Shown in-app when no notification could be posted.
    pub fallback: &'a str,
}

pub const TIMER_COMPLETE: Alert<'static> = Alert {
    title: "Timer Complete!",
    body: "Your timer has finished.",
    fallback: "Timer finished!",
};

const BEEP_HZ: u32 = 800;
const BEEP_MS: u64 = 500;

/// Plays the cue and posts the notification as configured.
///
/// Returns the fallback message when the notification is disabled or could
/// not be delivered, so the caller can show it instead. Audio failures are
/// dropped.
pub fn fire_alert(
    config: &AlertConfig,
    notifier: &dyn Notifier,
    audio: &dyn AudioCue,
    alert: &Alert,
) -> Option<String> {
    if config.audio {
        if let Err(e) = audio.beep(BEEP_HZ, BEEP_MS) {
            log::debug!("Audio not supported: {}", e);
        }
    }
    if config.notification {
        match notifier.notify(alert.title, alert.body) {
            Ok(()) => return None,
            Err(e) => log::info!("Notification failed, falling back: {}", e),
        }
    }
    Some(alert.fallback.to_string())
}


#[cfg(test)]
mod tests {
    use super::testing::Recorder;
    use super::*;

    #[test]
    fn test_delivered_notification_has_no_fallback() {
        let notifier = Recorder::default();
        let audio = Recorder::default();
        let shown = fire_alert(&AlertConfig::default(), &notifier, &audio, &TIMER_COMPLETE);
        assert_eq!(shown, None);
        assert_eq!(notifier.count(), 1);
        assert_eq!(audio.count(), 1);
    }

    #[test]
    fn test_failed_notification_falls_back() {
        let notifier = Recorder::failing();
        let audio = Recorder::failing();
        let shown = fire_alert(&AlertConfig::default(), &notifier, &audio, &TIMER_COMPLETE);
        assert_eq!(shown.as_deref(), Some("Timer finished!"));
        assert_eq!(audio.count(), 1);
    }

    #[test]
    fn test_disabled_channels_skipped() {
        let notifier = Recorder::default();
        let audio = Recorder::default();
        let config = AlertConfig {
            notification: false,
            audio: false,
        };
        let shown = fire_alert(&config, &notifier, &audio, &TIMER_COMPLETE);
        assert_eq!(shown.as_deref(), Some("Timer finished!"));
        assert_eq!(notifier.count(), 0);
        assert_eq!(audio.count(), 0);
    }

    #[test]
    fn test_unpermitted_terminal_notifier() {
        let notifier = TerminalNotifier::new(false);
        assert!(matches!(notifier.notify("a", "b"), Err(AlertError::NotPermitted)));
    }
}
