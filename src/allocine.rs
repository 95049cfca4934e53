//! Showtimes from Allociné's internal JSON endpoint.
//! Listing: https://www.allocine.fr/_/showtimes/theater-C0159/d-2024-03-01/
//! Film page: https://www.allocine.fr/film/fichefilm_gen_cfilm=232669.html

pub mod types;

use crate::directory::{Cinema, ProviderKind};
use crate::error::CinemaError;
use crate::http::HttpSource;
use crate::provider::ShowProvider;
use crate::shows::{FilmShow, SearchLinks};
use chrono::{Datelike, Local, NaiveDate};
use std::collections::BTreeSet;
use tracing::{debug, warn};
use types::{MovieShowtimes, ShowtimesPage};

pub const API_BASE: &str = "https://www.allocine.fr/_";
pub const SITE_BASE: &str = "https://www.allocine.fr";
const SYNOPSIS_UNAVAILABLE: &str = "Synopsis indisponible";
const UNKNOWN_RUNTIME: &str = "??";

pub struct AllocineProvider<H> {
    http: H,
    api_base: String,
    site_base: String,
    current_year: i32,
}

impl<H: HttpSource> AllocineProvider<H> {
    pub fn new(http: H, api_base: impl Into<String>, site_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        let site_base: String = site_base.into();
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            site_base: site_base.trim_end_matches('/').to_string(),
            current_year: Local::now().year(),
        }
    }

    /// Year compared against release dates to pick `DD/MM` over the bare year.
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    pub fn showtimes_url(&self, cinema_code: &str, date: NaiveDate) -> String {
        format!(
            "{}/showtimes/theater-{}/d-{}/",
            self.api_base,
            cinema_code,
            date.format("%Y-%m-%d")
        )
    }

    fn to_film_show(&self, entry: &MovieShowtimes, cinema: &Cinema) -> Option<FilmShow> {
        let movie = entry.titled_movie()?;

        let release = movie.release_marker(self.current_year);
        let directors = movie.directors();

        // BTreeSet both drops slots listed under several versions and sorts
        // the rendered strings ("10:00" < "9:05").
        let slots: BTreeSet<String> = entry
            .all_showtimes()
            .filter_map(|slot| match slot {
                Ok(showtime) => {
                    let shown = showtime.display();
                    if shown.is_none() {
                        warn!(film = %movie.title, starts_at = ?showtime.starts_at, "unparseable showtime dropped");
                    }
                    shown
                }
                Err(raw) => {
                    warn!(film = %movie.title, %raw, "malformed showtime dropped");
                    None
                }
            })
            .collect();
        let runtime = movie.runtime().unwrap_or_else(|| UNKNOWN_RUNTIME.to_string());
        let showtimes_text = format!(
            "{}<br><br>{}",
            slots.into_iter().collect::<Vec<_>>().join("<br>"),
            runtime
        );

        Some(FilmShow {
            label: format!("{}<br>({})<br>{}", movie.title, release, directors),
            cinema_name: cinema.name.clone(),
            source_url: format!(
                "{}/film/fichefilm_gen_cfilm={}.html",
                self.site_base,
                movie.internal_id()
            ),
            theater_url: format!(
                "{}/seance/salle_gen_csalle={}.html",
                self.site_base, cinema.code
            ),
            poster_url: movie.poster_url(),
            synopsis: movie
                .synopsis()
                .unwrap_or(SYNOPSIS_UNAVAILABLE)
                .to_string(),
            tags: movie.tags(),
            search: search_links(&movie.title, &release),
            showtimes_text,
        })
    }
}

/// Search pages for `"{title} {release}"` on YouTube, SensCritique and Rotten Tomatoes.
pub fn search_links(title: &str, release: &str) -> SearchLinks {
    let query: String =
        url::form_urlencoded::byte_serialize(format!("{title} {release}").as_bytes()).collect();
    SearchLinks {
        trailer: format!("https://www.youtube.com/results?search_query=trailer+{query}"),
        sens_critique: format!("https://www.senscritique.com/search?query={query}"),
        rotten_tomatoes: format!("https://www.rottentomatoes.com/search?search={query}"),
    }
}

#[async_trait::async_trait]
impl<H: HttpSource> ShowProvider for AllocineProvider<H> {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Allocine
    }

    async fn fetch_day(
        &self,
        cinema: &Cinema,
        date: NaiveDate,
    ) -> Result<Vec<FilmShow>, CinemaError> {
        let resource = self.showtimes_url(&cinema.code, date);

        let resp = self
            .http
            .get(&resource)
            .await
            .map_err(|e| CinemaError::RemoteFetch {
                resource: resource.clone(),
                detail: e.to_string(),
            })?;

        if !resp.is_success() {
            return Err(CinemaError::RemoteFetch {
                resource,
                detail: format!("HTTP {}: {}", resp.status, resp.body_preview(200)),
            });
        }

        let page: ShowtimesPage =
            serde_json::from_slice(&resp.body).map_err(|e| CinemaError::RemoteFetch {
                resource: resource.clone(),
                detail: format!("invalid JSON response: {e}"),
            })?;

        let shows: Vec<FilmShow> = page
            .results
            .iter()
            .filter_map(|entry| {
                let show = self.to_film_show(entry, cinema);
                if show.is_none() {
                    // showtimes not linked to any titled film
                    debug!(cinema = %cinema.name, %date, "entry without movie skipped");
                }
                show
            })
            .collect();

        Ok(shows)
    }
}
