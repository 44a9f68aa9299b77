use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::WorldClockError;
use crate::schedule::{cancel_slot, ScheduleHandle, Scheduler};

/// Shown in place of a time that could not be resolved.
pub const PLACEHOLDER_TIME: &str = "--:--";

pub const DEFAULT_REFRESH_MS: u64 = 1000;

/// Position of a city's dot on the world map, in percent of the map size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPosition {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityClock {
    pub city: String,
    #[serde(rename = "timezone")]
    pub timezone_id: String,
    pub country: String,
    pub position: MapPosition,
}

impl CityClock {
    fn matches(&self, needle: &str) -> bool {
        self.city.to_lowercase().contains(needle) || self.country.to_lowercase().contains(needle)
    }
}

/// Index of a city in the registry's catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CityId(usize);

/// Localizes a UTC instant to an IANA timezone.
pub trait ZoneFormatter {
    /// 24-hour `HH:MM` in the given zone.
    fn format_hm(&self, timezone_id: &str, now: DateTime<Utc>) -> Result<String, WorldClockError>;

    /// 24-hour `HH:MM` in the host's local zone.
    fn format_local(&self, now: DateTime<Utc>) -> String;
}

/// [`ZoneFormatter`] backed by the `chrono-tz` database.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChronoTzFormatter;

impl ZoneFormatter for ChronoTzFormatter {
    fn format_hm(&self, timezone_id: &str, now: DateTime<Utc>) -> Result<String, WorldClockError> {
        let tz: Tz = timezone_id
            .parse()
            .map_err(|_| WorldClockError::UnknownTimezone(timezone_id.to_string()))?;
        Ok(now.with_timezone(&tz).format("%H:%M").to_string())
    }

    fn format_local(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&Local).format("%H:%M").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClockEntry {
    pub city: String,
    pub country: String,
    pub timezone_id: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapDot {
    pub city: String,
    pub timezone_id: String,
    pub position: MapPosition,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub local_time: String,
    pub main: ClockEntry,
    pub additional: Vec<ClockEntry>,
    pub dots: Vec<MapDot>,
}

/// Reference list of cities plus the user's selections.
///
/// The main city and the additional cities are indices into the catalog;
/// the catalog itself never changes after construction.
pub struct WorldClockRegistry {
    catalog: Vec<CityClock>,
    main: CityId,
    additional: Vec<CityId>,
    /// Map dots placed so far. A dot stays once placed, even after the main
    /// selection moves elsewhere.
    dots: Vec<CityId>,
    period_ms: u64,
    refresh: Option<ScheduleHandle>,
}

impl WorldClockRegistry {
    pub fn new(catalog: Vec<CityClock>, main_timezone: &str) -> Result<Self, WorldClockError> {
        let main = catalog
            .iter()
            .position(|c| c.timezone_id == main_timezone)
            .map(CityId)
            .ok_or_else(|| WorldClockError::UnknownCity(main_timezone.to_string()))?;
        Ok(Self {
            catalog,
            main,
            additional: Vec::new(),
            dots: vec![main],
            period_ms: DEFAULT_REFRESH_MS,
            refresh: None,
        })
    }

    pub fn with_refresh_period(mut self, period_ms: u64) -> Self {
        self.period_ms = period_ms;
        self
    }

    pub fn main(&self) -> &CityClock {
        &self.catalog[self.main.0]
    }

    pub fn additional(&self) -> impl Iterator<Item = &CityClock> {
        self.additional.iter().map(|id| &self.catalog[id.0])
    }

    pub fn select_main(&mut self, id: CityId) -> Result<(), WorldClockError> {
        let city = self
            .catalog
            .get(id.0)
            .ok_or_else(|| WorldClockError::UnknownCity(format!("#{}", id.0)))?;
        if !self.has_dot(&city.timezone_id) {
            self.dots.push(id);
        }
        log::debug!("main city is now {}", city.city);
        self.main = id;
        Ok(())
    }

    /// Selects the first catalog city in `timezone_id`, as a map-dot click does.
    pub fn select_main_by_timezone(&mut self, timezone_id: &str) -> Result<(), WorldClockError> {
        let id = self
            .catalog
            .iter()
            .position(|c| c.timezone_id == timezone_id)
            .map(CityId)
            .ok_or_else(|| WorldClockError::UnknownCity(timezone_id.to_string()))?;
        self.select_main(id)
    }

    /// Adds a city to the additional list. Returns `false` (and changes
    /// nothing) if its timezone is already there or the id is unknown.
    pub fn add_additional(&mut self, id: CityId) -> bool {
        let Some(city) = self.catalog.get(id.0) else {
            return false;
        };
        if self.has_additional(&city.timezone_id) {
            return false;
        }
        self.additional.push(id);
        true
    }

    pub fn remove_additional(&mut self, timezone_id: &str) -> bool {
        let before = self.additional.len();
        let catalog = &self.catalog;
        self.additional.retain(|id| catalog[id.0].timezone_id != timezone_id);
        self.additional.len() != before
    }

    fn has_additional(&self, timezone_id: &str) -> bool {
        self.additional().any(|c| c.timezone_id == timezone_id)
    }

    fn has_dot(&self, timezone_id: &str) -> bool {
        self.dots.iter().any(|id| self.catalog[id.0].timezone_id == timezone_id)
    }

    /// Removes a placed dot. The main city's dot cannot be removed.
    pub fn remove_dot(&mut self, timezone_id: &str) -> bool {
        if self.main().timezone_id == timezone_id {
            return false;
        }
        let before = self.dots.len();
        let catalog = &self.catalog;
        self.dots.retain(|id| catalog[id.0].timezone_id != timezone_id);
        self.dots.len() != before
    }

    /// Cities whose name or country contains `term`, ignoring case, minus
    /// those whose timezone is already tracked as an additional clock.
    pub fn search(&self, term: &str) -> Vec<(CityId, &CityClock)> {
        let needle = term.to_lowercase();
        self.catalog
            .iter()
            .enumerate()
            .filter(|(_, c)| c.matches(&needle) && !self.has_additional(&c.timezone_id))
            .map(|(i, c)| (CityId(i), c))
            .collect()
    }

    fn entry(city: &CityClock, now: DateTime<Utc>, fmt: &dyn ZoneFormatter) -> ClockEntry {
        let time = match fmt.format_hm(&city.timezone_id, now) {
            Ok(time) => time,
            Err(e) => {
                log::warn!("Error getting time for {}: {}", city.city, e);
                PLACEHOLDER_TIME.to_string()
            }
        };
        ClockEntry {
            city: city.city.clone(),
            country: city.country.clone(),
            timezone_id: city.timezone_id.clone(),
            time,
        }
    }

    /// Formats every displayed clock at `now`. One entry failing does not
    /// affect the others.
    pub fn refresh(&self, now: DateTime<Utc>, fmt: &dyn ZoneFormatter) -> WorldSnapshot {
        let main_tz = &self.main().timezone_id;
        WorldSnapshot {
            local_time: fmt.format_local(now),
            main: Self::entry(self.main(), now, fmt),
            additional: self.additional().map(|c| Self::entry(c, now, fmt)).collect(),
            dots: self
                .dots
                .iter()
                .map(|id| {
                    let city = &self.catalog[id.0];
                    MapDot {
                        city: city.city.clone(),
                        timezone_id: city.timezone_id.clone(),
                        position: city.position,
                        active: &city.timezone_id == main_tz,
                    }
                })
                .collect(),
        }
    }

    pub fn start_refresh(&mut self, sched: &mut dyn Scheduler) {
        if self.refresh.is_none() {
            self.refresh = Some(sched.every(self.period_ms));
        }
    }

    pub fn stop_refresh(&mut self, sched: &mut dyn Scheduler) {
        cancel_slot(sched, &mut self.refresh);
    }

    /// Returns `true` if the fire was this registry's refresh tick.
    pub fn on_fire(&self, handle: ScheduleHandle) -> bool {
        self.refresh == Some(handle)
    }
}
