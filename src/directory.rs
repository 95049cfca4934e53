//! The cinema list: which cinemas exist, in which city, and which provider
//! serves their showtimes.
//!
//! The source is a small CSV file with one header row:
//!
//! ```text
//! name;city;type;code;website
//! Kinepolis;Lyon;allocine;C0159;
//! ```
//!
//! Either `;` or `,` may be used as delimiter, the header line decides.

use crate::error::CinemaError;
use serde::Serialize;
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Where a cinema's showtimes come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Allocine,
    Besancon,
    Other(String),
}

impl ProviderKind {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_lowercase();
        match raw.as_str() {
            "allocine" => ProviderKind::Allocine,
            "besancon" => ProviderKind::Besancon,
            _ => ProviderKind::Other(raw),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Allocine => f.write_str("allocine"),
            ProviderKind::Besancon => f.write_str("besancon"),
            ProviderKind::Other(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cinema {
    pub name: String,
    /// Identifier of the cinema at its provider (e.g. `C0159` for Allociné).
    pub code: String,
    pub city: String,
    pub provider: ProviderKind,
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct City {
    pub name: String,
    pub cinemas: Vec<Cinema>,
}

/// Cities in order of first appearance in the source, each with its cinemas
/// in source order. Read-only once loaded.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CinemaDirectory {
    cities: Vec<City>,
}

impl CinemaDirectory {
    pub fn load(path: &Path) -> Result<Self, CinemaError> {
        let file = std::fs::File::open(path).map_err(|source| CinemaError::ConfigNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, path)
    }

    /// Parse a cinema list. `origin` is only used in error messages.
    pub fn from_reader<R: Read>(mut reader: R, origin: &Path) -> Result<Self, CinemaError> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::InvalidData => CinemaError::ConfigFormat {
                    path: origin.to_path_buf(),
                    line: 0,
                    detail: "not valid UTF-8".to_string(),
                },
                _ => CinemaError::ConfigNotFound {
                    path: origin.to_path_buf(),
                    source,
                },
            })?;

        let header = content.lines().next().unwrap_or("");
        let delimiter = if header.contains(';') { b';' } else { b',' };

        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut directory = CinemaDirectory::default();
        // header row is skipped whatever it contains
        for record in csv_reader.records().skip(1) {
            let record = record.map_err(|e| CinemaError::ConfigFormat {
                path: origin.to_path_buf(),
                line: e.position().map(|p| p.line()).unwrap_or(0),
                detail: e.to_string(),
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            if !(4..=5).contains(&record.len()) {
                return Err(CinemaError::ConfigFormat {
                    path: origin.to_path_buf(),
                    line,
                    detail: format!(
                        "expected 4 or 5 columns (name, city, type, code, website), found {}",
                        record.len()
                    ),
                });
            }

            let field = |i: usize| record.get(i).unwrap_or("").trim().to_string();
            let website = field(4);
            directory.push(Cinema {
                name: field(0),
                city: field(1),
                provider: ProviderKind::parse(&field(2)),
                code: field(3),
                website: (!website.is_empty()).then_some(website),
            });
        }

        Ok(directory)
    }

    fn push(&mut self, cinema: Cinema) {
        match self.cities.iter_mut().find(|c| c.name == cinema.city) {
            Some(city) => city.cinemas.push(cinema),
            None => self.cities.push(City {
                name: cinema.city.clone(),
                cinemas: vec![cinema],
            }),
        }
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn city(&self, name: &str) -> Option<&City> {
        self.cities.iter().find(|c| c.name == name)
    }

    pub fn cinema_count(&self) -> usize {
        self.cities.iter().map(|c| c.cinemas.len()).sum()
    }

    /// All cinemas served by `kind`, in directory order.
    pub fn cinemas_of<'a>(&'a self, kind: &'a ProviderKind) -> impl Iterator<Item = &'a Cinema> + 'a {
        self.cities
            .iter()
            .flat_map(|c| c.cinemas.iter())
            .filter(move |c| &c.provider == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Result<CinemaDirectory, CinemaError> {
        CinemaDirectory::from_reader(src.as_bytes(), Path::new("cinemas.csv"))
    }

    #[test]
    fn groups_by_city_in_source_order() {
        let dir = parse(
            "name;city;type;code\n\
             Pathé;Lyon;allocine;C0159\n\
             Victor Hugo;Besançon;allocine;C0069\n\
             Comoedia;Lyon;allocine;C0086\n\
             Petit Kursaal;Besançon;besancon;pk\n",
        )
        .unwrap();

        assert_eq!(dir.cinema_count(), 4);
        let names: Vec<_> = dir.cities().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Lyon", "Besançon"]);

        let lyon = dir.city("Lyon").unwrap();
        assert_eq!(lyon.cinemas[0].name, "Pathé");
        assert_eq!(lyon.cinemas[1].code, "C0086");

        let besancon = dir.city("Besançon").unwrap();
        assert_eq!(besancon.cinemas[1].provider, ProviderKind::Besancon);
    }

    #[test]
    fn header_is_skipped_even_when_it_looks_like_data() {
        let dir = parse("A;B;allocine;X\nPathé;Lyon;allocine;C0159\n").unwrap();
        assert_eq!(dir.cinema_count(), 1);
        assert!(dir.city("B").is_none());
    }

    #[test]
    fn comma_delimiter_and_optional_website() {
        let dir = parse(
            "name,city,type,code,website\n\
             Pathé,Lyon,allocine,C0159,https://pathe.fr\n\
             Comoedia,Lyon,allocine,C0086,\n",
        )
        .unwrap();
        let lyon = dir.city("Lyon").unwrap();
        assert_eq!(lyon.cinemas[0].website.as_deref(), Some("https://pathe.fr"));
        assert_eq!(lyon.cinemas[1].website, None);
    }

    #[test]
    fn wrong_column_count_aborts_the_load() {
        let err = parse("name;city;type;code\nPathé;Lyon;allocine;C0159\nbroken;row\n").unwrap_err();
        match err {
            CinemaError::ConfigFormat { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_config_not_found() {
        let err = CinemaDirectory::load(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, CinemaError::ConfigNotFound { .. }));
    }

    #[test]
    fn provider_kind_is_case_insensitive() {
        assert_eq!(ProviderKind::parse(" AlloCine "), ProviderKind::Allocine);
        assert_eq!(
            ProviderKind::parse("cineville"),
            ProviderKind::Other("cineville".to_string())
        );
        assert_eq!(ProviderKind::Allocine.to_string(), "allocine");
    }

    #[test]
    fn cinemas_of_filters_by_provider() {
        let dir = parse(
            "name;city;type;code\n\
             Pathé;Lyon;allocine;C0159\n\
             Petit Kursaal;Besançon;besancon;pk\n",
        )
        .unwrap();
        let codes: Vec<_> = dir
            .cinemas_of(&ProviderKind::Allocine)
            .map(|c| c.code.as_str())
            .collect();
        assert_eq!(codes, ["C0159"]);
    }

    #[test]
    fn latin1_file_is_a_format_error() {
        // "Besançon" encoded as Latin-1
        let bytes: &[u8] = b"name;city;type;code\nVictor Hugo;Besan\xe7on;allocine;C0069\n";
        let err = CinemaDirectory::from_reader(bytes, Path::new("cinemas.csv")).unwrap_err();
        assert!(matches!(err, CinemaError::ConfigFormat { .. }), "{err}");
    }
}
