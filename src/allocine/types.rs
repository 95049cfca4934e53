//! Payload of the Allociné showtimes endpoint.
//!
//! The provider is inconsistent: fields go missing, turn `null` or change
//! type, credits come either as a list or wrapped in `{"nodes": [...]}`,
//! showtime tags are not always a list of strings. Every leaf is parsed
//! leniently here, a value of the wrong shape becomes its default and a
//! malformed list item is dropped on its own. Values are read back through
//! the accessors below, so the rest of the crate never looks at the raw shape.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

const LANGUAGE_TAG_PREFIX: &str = "Localization.Language.";

const SHOWTIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Any value that does not fit `T` (null included) becomes `T::default()`.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(items_of(Value::deserialize(deserializer)?))
}

/// Items of a JSON array that parse as `T`. Anything but an array is empty.
fn items_of<T: DeserializeOwned>(value: Value) -> Vec<T> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!(error = %e, "malformed list item skipped");
                None
            }
        })
        .collect()
}

/// Version name to raw slots. Versions whose value is not a list are empty.
fn showtime_groups<'de, D>(deserializer: D) -> Result<HashMap<String, Vec<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(groups) = Value::deserialize(deserializer)? else {
        return Ok(HashMap::new());
    };
    Ok(groups
        .into_iter()
        .map(|(version, slots)| match slots {
            Value::Array(slots) => (version, slots),
            _ => (version, Vec::new()),
        })
        .collect())
}

#[derive(Debug, Deserialize)]
pub struct ShowtimesPage {
    #[serde(default, deserialize_with = "lenient_list")]
    pub results: Vec<MovieShowtimes>,
}

#[derive(Debug, Deserialize)]
pub struct MovieShowtimes {
    /// `None` when the provider lists showtimes not linked to any film.
    #[serde(default, deserialize_with = "lenient")]
    pub movie: Option<Movie>,
    /// Raw showtimes by version (dubbed, original, local, ...), parsed one
    /// by one in [`MovieShowtimes::all_showtimes`].
    #[serde(default, deserialize_with = "showtime_groups")]
    pub showtimes: HashMap<String, Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Showtime {
    #[serde(rename = "startsAt", default, deserialize_with = "lenient")]
    pub starts_at: Option<String>,
    #[serde(default)]
    pub tags: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct Movie {
    #[serde(rename = "internalId", default)]
    pub internal_id: Value,
    #[serde(default, deserialize_with = "lenient")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub releases: Vec<Release>,
    #[serde(default)]
    pub credits: Credits,
    #[serde(rename = "relatedTags", default, deserialize_with = "lenient_list")]
    pub related_tags: Vec<Tag>,
    #[serde(default, deserialize_with = "lenient")]
    pub poster: Option<Poster>,
    #[serde(rename = "synopsisFull", default, deserialize_with = "lenient")]
    pub synopsis_full: Option<String>,
    #[serde(default)]
    pub runtime: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct Release {
    #[serde(rename = "releaseDate", default, deserialize_with = "lenient")]
    pub release_date: Option<ReleaseDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReleaseDate {
    #[serde(default, deserialize_with = "lenient")]
    pub date: Option<String>,
}

/// Credited persons, as a bare list or wrapped in a `nodes` object.
#[derive(Debug)]
pub enum Credits {
    List(Vec<Credit>),
    Nodes { nodes: Vec<Credit> },
}

impl Default for Credits {
    fn default() -> Self {
        Credits::List(Vec::new())
    }
}

impl<'de> Deserialize<'de> for Credits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Object(mut wrapper) => Credits::Nodes {
                nodes: items_of(wrapper.remove("nodes").unwrap_or_default()),
            },
            other => Credits::List(items_of(other)),
        })
    }
}

impl Credits {
    pub fn as_slice(&self) -> &[Credit] {
        match self {
            Credits::List(credits) | Credits::Nodes { nodes: credits } => credits,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Credit {
    #[serde(default, deserialize_with = "lenient")]
    pub person: Option<Person>,
    #[serde(default, deserialize_with = "lenient")]
    pub position: Option<Position>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Person {
    #[serde(rename = "lastName", default, deserialize_with = "lenient")]
    pub last_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Position {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Tag {
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Poster {
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
}

/// Version of a screening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// Dubbed in French.
    Vf,
    /// Original version, also used when the language is unknown.
    Vo,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Vf => "VF",
            Language::Vo => "VO",
        }
    }
}

impl Showtime {
    pub fn language(&self) -> Language {
        let first = self
            .tags
            .as_array()
            .and_then(|tags| tags.first())
            .and_then(|tag| tag.as_str());
        match first {
            Some(tag) if tag.trim_start_matches(LANGUAGE_TAG_PREFIX) == "French" => Language::Vf,
            _ => Language::Vo,
        }
    }

    /// Wall-clock start as published by the provider, offset ignored.
    pub fn start(&self) -> Option<NaiveDateTime> {
        let raw = self.starts_at.as_deref()?.trim();
        SHOWTIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .or_else(|| {
                chrono::DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.naive_local())
            })
    }

    /// `H:MM (VF)` with the hour not zero-padded.
    pub fn display(&self) -> Option<String> {
        let start = self.start()?;
        Some(format!(
            "{}:{:02} ({})",
            start.hour(),
            start.minute(),
            self.language().as_str()
        ))
    }
}

impl MovieShowtimes {
    /// Every slot across versions, each parsed on its own. A slot that is
    /// not a showtime object comes out as `Err` with its raw value.
    pub fn all_showtimes(&self) -> impl Iterator<Item = Result<Showtime, &Value>> {
        self.showtimes
            .values()
            .flatten()
            .map(|raw| Showtime::deserialize(raw).map_err(|_| raw))
    }

    /// The film, unless missing or untitled.
    pub fn titled_movie(&self) -> Option<&Movie> {
        self.movie
            .as_ref()
            .filter(|movie| !movie.title.trim().is_empty())
    }
}

fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

impl Movie {
    /// `DD/MM` for a film released during `current_year`, the bare year
    /// otherwise, empty when no release carries a date.
    ///
    /// Releases are listed newest first: the scan starts from the end and the
    /// first dated entry wins.
    pub fn release_marker(&self, current_year: i32) -> String {
        let first_dated = self.releases.iter().rev().find_map(|release| {
            release
                .release_date
                .as_ref()
                .and_then(|d| d.date.as_deref())
                .and_then(parse_release_date)
        });
        match first_dated {
            Some(date) if date.year() == current_year => date.format("%d/%m").to_string(),
            Some(date) => date.year().to_string(),
            None => String::new(),
        }
    }

    /// Last names of the directors, comma separated.
    pub fn directors(&self) -> String {
        self.credits
            .as_slice()
            .iter()
            .filter(|credit| {
                credit
                    .position
                    .as_ref()
                    .and_then(|p| p.name.as_deref())
                    == Some("DIRECTOR")
            })
            .map(|credit| {
                credit
                    .person
                    .as_ref()
                    .and_then(|p| p.last_name.clone())
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Short genre labels: `"Science Fiction / Aventure"`.
    pub fn tags(&self) -> String {
        self.related_tags
            .iter()
            .map(|tag| {
                let head = tag.name.split('/').next().unwrap_or("");
                head.split('-').next().unwrap_or("").trim().to_string()
            })
            .collect::<Vec<_>>()
            .join(" / ")
    }

    pub fn poster_url(&self) -> String {
        self.poster
            .as_ref()
            .and_then(|p| p.url.clone())
            .unwrap_or_default()
    }

    pub fn synopsis(&self) -> Option<&str> {
        self.synopsis_full
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    /// Runtime as published, `None` when missing, empty or zero.
    pub fn runtime(&self) -> Option<String> {
        match &self.runtime {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_json::Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn internal_id(&self) -> String {
        match &self.internal_id {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(json: serde_json::Value) -> Movie {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn release_marker_scans_from_the_oldest_entry() {
        let m = movie(serde_json::json!({
            "title": "Dune",
            "releases": [
                {"releaseDate": {"date": "2024-09-10"}},
                {"releaseDate": {"date": "2024-03-01"}},
                {"releaseDate": null}
            ]
        }));
        assert_eq!(m.release_marker(2024), "01/03");
        assert_eq!(m.release_marker(2025), "2024");
    }

    #[test]
    fn release_marker_is_empty_without_dates() {
        let m = movie(serde_json::json!({
            "title": "Dune",
            "releases": [{"releaseDate": null}, {}]
        }));
        assert_eq!(m.release_marker(2024), "");
        let m = movie(serde_json::json!({"title": "Dune", "releases": null}));
        assert_eq!(m.release_marker(2024), "");
    }

    #[test]
    fn directors_accepts_both_credit_shapes() {
        let credits = serde_json::json!([
            {"person": {"lastName": "Coen"}, "position": {"name": "DIRECTOR"}},
            {"person": {"lastName": "Bridges"}, "position": {"name": "ACTOR"}},
            {"person": {"firstName": "Ethan"}, "position": {"name": "DIRECTOR"}},
            {"person": {"lastName": "Nobody"}}
        ]);
        let listed = movie(serde_json::json!({"credits": credits.clone()}));
        let wrapped = movie(serde_json::json!({"credits": {"nodes": credits}}));

        assert_eq!(listed.directors(), "Coen, ");
        assert_eq!(listed.directors(), wrapped.directors());
    }

    #[test]
    fn missing_credits_yield_no_director() {
        assert_eq!(movie(serde_json::json!({"credits": null})).directors(), "");
        assert_eq!(movie(serde_json::json!({})).directors(), "");
    }

    #[test]
    fn tags_keep_the_first_segment() {
        let m = movie(serde_json::json!({
            "relatedTags": [
                {"name": "Science Fiction / Fantastique"},
                {"name": "Aventure-Action"},
                {"name": " Drame "}
            ]
        }));
        assert_eq!(m.tags(), "Science Fiction / Aventure / Drame");
    }

    #[test]
    fn optional_fields_fall_back() {
        let m = movie(serde_json::json!({
            "internalId": 232669,
            "poster": null,
            "synopsisFull": "  ",
            "runtime": 0
        }));
        assert_eq!(m.internal_id(), "232669");
        assert_eq!(m.poster_url(), "");
        assert_eq!(m.synopsis(), None);
        assert_eq!(m.runtime(), None);

        let m = movie(serde_json::json!({
            "poster": {"url": "https://img/p.jpg"},
            "runtime": "2h 46min"
        }));
        assert_eq!(m.poster_url(), "https://img/p.jpg");
        assert_eq!(m.runtime().as_deref(), Some("2h 46min"));
    }

    #[test]
    fn showtime_language_and_display() {
        let st: Showtime = serde_json::from_value(serde_json::json!({
            "startsAt": "2024-03-01T09:05:00",
            "tags": ["Localization.Language.French", "Format.Projection.Digital"]
        }))
        .unwrap();
        assert_eq!(st.language(), Language::Vf);
        assert_eq!(st.display().as_deref(), Some("9:05 (VF)"));

        for tags in [
            serde_json::json!(["Localization.Language.English"]),
            serde_json::json!([]),
            serde_json::json!(null),
            serde_json::json!("French"),
            serde_json::json!([42]),
        ] {
            let st: Showtime = serde_json::from_value(serde_json::json!({
                "startsAt": "2024-03-01T20:00",
                "tags": tags
            }))
            .unwrap();
            assert_eq!(st.display().as_deref(), Some("20:00 (VO)"));
        }
    }

    #[test]
    fn showtime_with_offset_keeps_wall_clock() {
        let st: Showtime = serde_json::from_value(serde_json::json!({
            "startsAt": "2024-03-01T21:30:00+01:00"
        }))
        .unwrap();
        assert_eq!(st.display().as_deref(), Some("21:30 (VO)"));
    }

    #[test]
    fn non_list_showtime_groups_are_ignored() {
        let entry: MovieShowtimes = serde_json::from_value(serde_json::json!({
            "movie": null,
            "showtimes": {
                "dubbed": [{"startsAt": "2024-03-01T20:00:00", "tags": []}],
                "local": {"unexpected": true},
                "original": null
            }
        }))
        .unwrap();
        assert!(entry.movie.is_none());
        assert_eq!(entry.all_showtimes().count(), 1);
    }

    #[test]
    fn showtime_formats_with_fraction_or_space() {
        for raw in [
            "2024-03-01T20:00:00.000",
            "2024-03-01 20:00:00",
            "2024-03-01 20:00",
        ] {
            let st = Showtime {
                starts_at: Some(raw.to_string()),
                ..Default::default()
            };
            assert_eq!(st.display().as_deref(), Some("20:00 (VO)"), "{raw}");
        }
    }

    #[test]
    fn slots_are_parsed_one_by_one() {
        let entry: MovieShowtimes = serde_json::from_value(serde_json::json!({
            "movie": {"title": "Dune"},
            "showtimes": {"dubbed": [{"startsAt": "2024-03-01T20:00:00"}, null, 7]}
        }))
        .unwrap();
        let (ok, bad): (Vec<_>, Vec<_>) = entry.all_showtimes().partition(Result::is_ok);
        assert_eq!((ok.len(), bad.len()), (1, 2));
    }

    #[test]
    fn wrongly_typed_fields_fall_back_to_defaults() {
        let m = movie(serde_json::json!({
            "title": ["Dune"],
            "poster": "none",
            "synopsisFull": {"text": "?"},
            "releases": [{"releaseDate": "2024-03-01"}, {"releaseDate": {"date": 2024}}]
        }));
        assert_eq!(m.title, "");
        assert_eq!(m.poster_url(), "");
        assert_eq!(m.synopsis(), None);
        assert_eq!(m.release_marker(2024), "");

        let entry: MovieShowtimes =
            serde_json::from_value(serde_json::json!({"movie": "Dune", "showtimes": []})).unwrap();
        assert!(entry.titled_movie().is_none());
    }
}
