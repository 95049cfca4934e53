//! Static site output.
//!
//! ```text
//! html_out/
//! ├── index.html            # redirects to the main city
//! ├── lyon/index.html       # one page per city, one tab per day
//! ├── besancon/index.html
//! ├── pic/                  # mirrored posters + link icons
//! └── css/                  # copied from the assets directory
//! ```
//!
//! Pages are built with [maud](https://maud.lambda.xyz/). Show labels and
//! showtimes already carry `<br>` separators and go in unescaped, everything
//! else is escaped.

use crate::directory::CinemaDirectory;
use crate::error::CinemaError;
use crate::shows::{CityShows, FilmShow, ShowsByCity};
use chrono::{Datelike, Days, NaiveDate};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;
use walkdir::WalkDir;

static FR_WEEKDAY: [&str; 7] = [
    "lundi", "mardi", "mercredi", "jeudi", "vendredi", "samedi", "dimanche",
];

/// Icons referenced by every row, expected under `<assets>/pic/`.
const ICONS: [&str; 4] = ["allocine", "sc", "rottent", "yt"];

/// Where and how the site is written. Nothing is read from the process
/// environment.
#[derive(Debug, Clone)]
pub struct SiteOptions {
    pub output: PathBuf,
    /// Holds `pic/*.ico` and `css/`.
    pub assets: PathBuf,
    /// City the root page redirects to.
    pub main_city: String,
}

#[derive(Debug, Default)]
pub struct RenderReport {
    pub pages: Vec<PathBuf>,
    pub assets_copied: usize,
}

/// Directory name of a city page: accents folded, lowercase, dashes for spaces.
pub fn normalize_city(name: &str) -> String {
    name.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// `"mercredi 06/03"`
pub fn day_label(date: NaiveDate) -> String {
    let wd = date.weekday().num_days_from_monday() as usize;
    format!("{} {}", FR_WEEKDAY[wd], date.format("%d/%m"))
}

pub fn render_site(
    directory: &CinemaDirectory,
    shows: &ShowsByCity,
    options: &SiteOptions,
    today: NaiveDate,
) -> Result<RenderReport, CinemaError> {
    fs::create_dir_all(&options.output)?;
    let mut report = RenderReport::default();

    for city in shows.iter() {
        let dir = options.output.join(normalize_city(&city.city));
        fs::create_dir_all(&dir)?;
        let path = dir.join("index.html");
        fs::write(&path, city_page(city, directory, shows, today).into_string())?;
        info!(city = %city.city, path = %path.display(), "page written");
        report.pages.push(path);
    }

    let root = options.output.join("index.html");
    fs::write(&root, root_page(&options.main_city).into_string())?;
    report.pages.push(root);

    report.assets_copied = copy_static_assets(&options.assets, &options.output)?;
    Ok(report)
}

fn city_page(
    city: &CityShows,
    directory: &CinemaDirectory,
    shows: &ShowsByCity,
    today: NaiveDate,
) -> Markup {
    html! {
        (DOCTYPE)
        html lang="fr" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Séances · " (city.city) }
                link rel="stylesheet" href="../css/style.css";
            }
            body {
                nav.cities {
                    ul {
                        // only cities that get a page
                        @for other in directory.cities().iter().filter(|c| shows.get(&c.name).is_some()) {
                            li class=[(other.name == city.city).then_some("current")] {
                                a href={ "../" (normalize_city(&other.name)) "/index.html" } { (other.name) }
                                span.cinemas {
                                    (other.cinemas.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", "))
                                }
                            }
                        }
                    }
                }
                main.week {
                    @if city.is_empty() {
                        p.no-show { "Aucune séance cette semaine." }
                    }
                    @for (pos, (offset, day_shows)) in city.active_days().enumerate() {
                        @let date = today + Days::new(offset as u64);
                        input.day-tab type="radio" name="day" id={ "day-" (offset) } checked[pos == 0];
                        label.day-label for={ "day-" (offset) } { (day_label(date)) }
                        section.day id={ "day-content-" (offset) } {
                            table {
                                tbody {
                                    @for show in day_shows {
                                        (show_row(show))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn show_row(show: &FilmShow) -> Markup {
    html! {
        tr {
            td.poster {
                @if !show.poster_url.is_empty() {
                    img src=(show.poster_url) alt="" loading="lazy";
                }
            }
            td.film {
                a href=(show.source_url) { (PreEscaped(&show.label)) }
                div.tags { (show.tags) }
            }
            td.cinema {
                a href=(show.theater_url) { (show.cinema_name) }
            }
            td.showtimes { (PreEscaped(&show.showtimes_text)) }
            td.synopsis { (show.synopsis) }
            td.links {
                a href=(show.source_url) title="Allociné" { img src="../pic/allocine.ico" alt="Allociné"; }
                a href=(show.search.trailer) title="Bande-annonce" { img src="../pic/yt.ico" alt="YouTube"; }
                a href=(show.search.sens_critique) title="SensCritique" { img src="../pic/sc.ico" alt="SensCritique"; }
                a href=(show.search.rotten_tomatoes) title="Rotten Tomatoes" { img src="../pic/rottent.ico" alt="Rotten Tomatoes"; }
            }
        }
    }
}

fn root_page(main_city: &str) -> Markup {
    let target = format!("{}/index.html", normalize_city(main_city));
    html! {
        (DOCTYPE)
        html lang="fr" {
            head {
                meta charset="UTF-8";
                meta http-equiv="refresh" content={ "0; url=" (target) };
                title { "Séances" }
            }
            body {
                a href=(target) { (main_city) }
            }
        }
    }
}

/// Copy icons and stylesheets that are not in the output yet. Missing sources
/// only produce a warning.
fn copy_static_assets(assets: &Path, output: &Path) -> Result<usize, CinemaError> {
    let mut copied = 0;

    for icon in ICONS {
        let rel = Path::new("pic").join(format!("{icon}.ico"));
        let target = output.join(&rel);
        if target.is_file() {
            continue;
        }
        let source = assets.join(&rel);
        if !source.is_file() {
            warn!(path = %source.display(), "icon missing from assets");
            continue;
        }
        fs::create_dir_all(output.join("pic"))?;
        fs::copy(&source, &target)?;
        copied += 1;
    }

    let css_target = output.join("css");
    if !css_target.exists() {
        let css_source = assets.join("css");
        if css_source.is_dir() {
            copied += copy_dir(&css_source, &css_target)?;
        } else {
            warn!(path = %css_source.display(), "stylesheet directory missing from assets");
        }
    }

    Ok(copied)
}

fn copy_dir(src: &Path, dst: &Path) -> Result<usize, CinemaError> {
    let mut copied = 0;
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(std::io::Error::from)?;
        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}
