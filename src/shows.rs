use serde::Serialize;

/// Number of days fetched and rendered, today included.
pub const DAYS_AHEAD: usize = 7;

/// External search pages built from the film title and release marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchLinks {
    pub trailer: String,
    pub sens_critique: String,
    pub rotten_tomatoes: String,
}

/// One film at one cinema on one day, with every field ready for display.
///
/// `label` and `showtimes_text` carry `<br>` separators and are meant to be
/// inserted as-is into the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilmShow {
    pub label: String,
    pub cinema_name: String,
    /// Provider page of the film.
    pub source_url: String,
    /// Provider page of the cinema.
    pub theater_url: String,
    /// Remote URL until the poster is mirrored, then `../pic/<file>`.
    pub poster_url: String,
    pub synopsis: String,
    pub tags: String,
    pub search: SearchLinks,
    pub showtimes_text: String,
}

/// One city's week. Index 0 is today.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CityShows {
    pub city: String,
    pub days: [Vec<FilmShow>; DAYS_AHEAD],
}

impl CityShows {
    pub fn new(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            days: Default::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Vec::is_empty)
    }

    /// Day offsets that have at least one show.
    pub fn active_days(&self) -> impl Iterator<Item = (usize, &[FilmShow])> {
        self.days
            .iter()
            .enumerate()
            .filter(|(_, shows)| !shows.is_empty())
            .map(|(i, shows)| (i, shows.as_slice()))
    }
}

/// Showtimes of the coming week, grouped by city in first-insertion order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ShowsByCity {
    cities: Vec<CityShows>,
}

impl ShowsByCity {
    pub fn new() -> Self {
        Self::default()
    }

    /// The week of `city`, created with empty days if absent.
    pub fn city_mut(&mut self, city: &str) -> &mut CityShows {
        let idx = match self.cities.iter().position(|c| c.city == city) {
            Some(idx) => idx,
            None => {
                self.cities.push(CityShows::new(city));
                self.cities.len() - 1
            }
        };
        &mut self.cities[idx]
    }

    /// Panics if `day >= DAYS_AHEAD`.
    pub fn push(&mut self, city: &str, day: usize, show: FilmShow) {
        self.city_mut(city).days[day].push(show);
    }

    pub fn get(&self, city: &str) -> Option<&CityShows> {
        self.cities.iter().find(|c| c.city == city)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CityShows> {
        self.cities.iter()
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn shows_mut(&mut self) -> impl Iterator<Item = &mut FilmShow> {
        self.cities
            .iter_mut()
            .flat_map(|c| c.days.iter_mut())
            .flat_map(|day| day.iter_mut())
    }

    pub fn total_shows(&self) -> usize {
        self.cities
            .iter()
            .flat_map(|c| c.days.iter())
            .map(Vec::len)
            .sum()
    }

    /// Append every show of `other`, day by day.
    pub fn merge(&mut self, other: ShowsByCity) {
        for city in other.cities {
            let target = self.city_mut(&city.city);
            for (day, shows) in city.days.into_iter().enumerate() {
                target.days[day].extend(shows);
            }
        }
    }

    /// Keep only the named city.
    pub fn retain_city(&mut self, city: &str) {
        self.cities.retain(|c| c.city == city);
    }
}
