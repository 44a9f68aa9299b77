use chrono::{DateTime, Utc};
use timer_core::{
    CityClock, CityId, WorldClockError, WorldClockRegistry, WorldSnapshot, ZoneFormatter,
};

/// Results past this many are not reachable by number key.
pub const MAX_RESULTS: usize = 9;

pub struct WorldState {
    pub registry: WorldClockRegistry,
    pub search_term: String,
    /// Last formatted view, redrawn without reformatting on key presses.
    pub snapshot: Option<WorldSnapshot>,
}

impl WorldState {
    pub fn new(registry: WorldClockRegistry) -> Self {
        Self {
            registry,
            search_term: String::new(),
            snapshot: None,
        }
    }

    pub fn refresh(&mut self, now: DateTime<Utc>, fmt: &dyn ZoneFormatter) -> &WorldSnapshot {
        self.snapshot.insert(self.registry.refresh(now, fmt))
    }

    pub fn type_chars(&mut self, text: &str) {
        self.search_term.push_str(text);
    }

    pub fn erase_char(&mut self) {
        self.search_term.pop();
    }

    pub fn clear_search(&mut self) {
        self.search_term.clear();
    }

    pub fn results(&self) -> Vec<(CityId, &CityClock)> {
        let mut found = self.registry.search(&self.search_term);
        found.truncate(MAX_RESULTS);
        found
    }

    /// Adds the `n`th result (1-based) as an additional clock.
    pub fn add_result(&mut self, n: usize) -> bool {
        let Some(id) = self.nth_result(n) else {
            return false;
        };
        let added = self.registry.add_additional(id);
        if added {
            self.clear_search();
        }
        added
    }

    /// Makes the first result the main city.
    pub fn select_first_result(&mut self) -> Result<bool, WorldClockError> {
        let Some(id) = self.nth_result(1) else {
            return Ok(false);
        };
        self.registry.select_main(id)?;
        self.clear_search();
        Ok(true)
    }

    fn nth_result(&self, n: usize) -> Option<CityId> {
        let index = n.checked_sub(1)?;
        self.results().get(index).map(|(id, _)| *id)
    }

    /// Removes the `n`th additional clock (1-based).
    pub fn remove_additional(&mut self, n: usize) -> bool {
        let Some(tz) = n
            .checked_sub(1)
            .and_then(|i| self.registry.additional().nth(i))
            .map(|c| c.timezone_id.clone())
        else {
            return false;
        };
        self.registry.remove_additional(&tz)
    }

    /// Removes the dot that follows the main city's dot. The main city's own
    /// dot always stays.
    pub fn remove_next_dot(&mut self) -> bool {
        let Some(snapshot) = &mut self.snapshot else {
            return false;
        };
        let dots = &snapshot.dots;
        if dots.len() < 2 {
            return false;
        }
        let active = dots.iter().position(|d| d.active).unwrap_or(0);
        let tz = dots[(active + 1) % dots.len()].timezone_id.clone();
        if !self.registry.remove_dot(&tz) {
            return false;
        }
        snapshot.dots.retain(|d| d.timezone_id != tz);
        true
    }

    /// Makes the next (or previous) placed map dot the main city.
    pub fn cycle_dot(&mut self, forward: bool) -> Result<(), WorldClockError> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };
        let dots = &snapshot.dots;
        if dots.len() < 2 {
            return Ok(());
        }
        let active = dots.iter().position(|d| d.active).unwrap_or(0);
        let next = if forward {
            (active + 1) % dots.len()
        } else {
            (active + dots.len() - 1) % dots.len()
        };
        let tz = dots[next].timezone_id.clone();
        self.registry.select_main_by_timezone(&tz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use timer_core::{ChronoTzFormatter, MapPosition};

    fn city(name: &str, tz: &str, country: &str) -> CityClock {
        CityClock {
            city: name.to_string(),
            timezone_id: tz.to_string(),
            country: country.to_string(),
            position: MapPosition { x: 10.0, y: 20.0 },
        }
    }

    fn state() -> WorldState {
        let catalog = vec![
            city("Kathmandu", "Asia/Kathmandu", "Nepal"),
            city("London", "Europe/London", "UK"),
            city("Tokyo", "Asia/Tokyo", "Japan"),
            city("Toronto", "America/Toronto", "Canada"),
        ];
        WorldState::new(WorldClockRegistry::new(catalog, "Asia/Kathmandu").unwrap())
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_search_then_add_clears_term() {
        let mut world = state();
        world.type_chars("to");
        let names: Vec<&str> = world.results().iter().map(|(_, c)| c.city.as_str()).collect();
        assert_eq!(names, vec!["Tokyo", "Toronto"]);

        assert!(world.add_result(1));
        assert_eq!(world.search_term, "");
        world.type_chars("to");
        let names: Vec<&str> = world.results().iter().map(|(_, c)| c.city.as_str()).collect();
        assert_eq!(names, vec!["Toronto"]);
    }

    #[test]
    fn test_add_out_of_range_result() {
        let mut world = state();
        world.type_chars("lond");
        assert!(!world.add_result(0));
        assert!(!world.add_result(2));
        world.erase_char();
        assert_eq!(world.search_term, "lon");
    }

    #[test]
    fn test_remove_numbered_additional() {
        let mut world = state();
        world.type_chars("London");
        assert!(world.add_result(1));
        world.type_chars("Tokyo");
        assert!(world.add_result(1));

        assert!(world.remove_additional(1));
        let left: Vec<&str> = world.registry.additional().map(|c| c.city.as_str()).collect();
        assert_eq!(left, vec!["Tokyo"]);
        assert!(!world.remove_additional(5));
    }

    #[test]
    fn test_remove_next_dot_keeps_main() {
        let mut world = state();
        assert!(!world.remove_next_dot());

        for name in ["London", "Tokyo"] {
            world.type_chars(name);
            assert!(world.select_first_result().unwrap());
        }
        world.refresh(noon(), &ChronoTzFormatter);

        // Dots: Kathmandu, London, Tokyo (main). The next one wraps round.
        assert!(world.remove_next_dot());
        let snap = world.refresh(noon(), &ChronoTzFormatter);
        let left: Vec<&str> = snap.dots.iter().map(|d| d.city.as_str()).collect();
        assert_eq!(left, vec!["London", "Tokyo"]);

        assert!(world.remove_next_dot());
        assert!(!world.remove_next_dot());
        let snap = world.refresh(noon(), &ChronoTzFormatter);
        assert_eq!(snap.dots.len(), 1);
        assert!(snap.dots[0].active);
    }

    #[test]
    fn test_cycle_dots_moves_main() {
        let mut world = state();
        world.type_chars("Tokyo");
        assert!(world.select_first_result().unwrap());
        assert_eq!(world.registry.main().city, "Tokyo");

        let snap = world.refresh(noon(), &ChronoTzFormatter);
        assert_eq!(snap.main.time, "21:00");
        assert_eq!(snap.dots.len(), 2);

        world.cycle_dot(true).unwrap();
        assert_eq!(world.registry.main().city, "Kathmandu");
        world.refresh(noon(), &ChronoTzFormatter);
        world.cycle_dot(false).unwrap();
        assert_eq!(world.registry.main().city, "Tokyo");
    }
}
