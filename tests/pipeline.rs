use chrono::NaiveDate;
use image::{DynamicImage, ImageFormat, RgbImage};
use seances::allocine::{API_BASE, AllocineProvider, SITE_BASE};
use seances::http::{HttpResponse, HttpSource};
use seances::posters::{PosterMirror, ThumbnailBounds, local_filename};
use seances::render::{SiteOptions, render_site};
use seances::{CinemaDirectory, CinemaError, fetch_shows};
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

const POSTER: &str = "https://fr.web.img6.acsta.net/pictures/24/01/dune.png";

/// Serves canned bodies by URL. Unknown URLs get an empty showtimes page.
#[derive(Default)]
struct FakeAllocine {
    responses: HashMap<String, HttpResponse>,
    requests: Mutex<Vec<String>>,
}

impl FakeAllocine {
    fn serve(mut self, url: impl Into<String>, status: u16, body: Vec<u8>) -> Self {
        self.responses.insert(url.into(), HttpResponse { status, body });
        self
    }

    fn hits(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    fn total(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl HttpSource for FakeAllocine {
    async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(self.responses.get(url).cloned().unwrap_or(HttpResponse {
            status: 200,
            body: br#"{"results": []}"#.to_vec(),
        }))
    }
}

fn showtimes_url(code: &str, date: &str) -> String {
    format!("{API_BASE}/showtimes/theater-{code}/d-{date}/")
}

fn dune_page(poster: Option<&str>) -> Vec<u8> {
    serde_json::json!({
        "results": [{
            "movie": {
                "internalId": 232669,
                "title": "Dune",
                "releases": [{"releaseDate": {"date": "2024-03-01"}}],
                "credits": [
                    {"person": {"lastName": "Villeneuve"}, "position": {"name": "DIRECTOR"}}
                ],
                "poster": poster.map(|url| serde_json::json!({"url": url})),
                "synopsisFull": "Paul rejoint les Fremen."
            },
            "showtimes": {
                "dubbed": [
                    {"startsAt": "2024-03-01T20:00:00", "tags": ["Localization.Language.French"]}
                ],
                "local": [
                    {"startsAt": "2024-03-01T20:00:00", "tags": ["Localization.Language.French"]}
                ]
            }
        }]
    })
    .to_string()
    .into_bytes()
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn directory(csv: &str) -> CinemaDirectory {
    CinemaDirectory::from_reader(csv.as_bytes(), Path::new("cinemas.csv")).unwrap()
}

// Friday
fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn provider(http: &FakeAllocine) -> AllocineProvider<&FakeAllocine> {
    AllocineProvider::new(http, API_BASE, SITE_BASE).with_current_year(2024)
}

#[test]
fn directory_counts_every_data_row() {
    let dir = directory(
        "nom;ville;type;code;site\n\
         Pathé Bellecour;Lyon;allocine;C0159;\n\
         Petit Kursaal;Besançon;besancon;pk;https://www.petitkursaal.com\n\
         Victor Hugo;Besançon;allocine;C0069;\n",
    );
    assert_eq!(dir.cinema_count(), 3);
    assert_eq!(dir.cities().len(), 2);
}

#[tokio::test]
async fn one_showtime_in_lyon() {
    let http = FakeAllocine::default().serve(showtimes_url("C0159", "2024-03-01"), 200, dune_page(None));
    let dir = directory("name;city;type;code\nPathé Bellecour;Lyon;allocine;C0159\n");

    let shows = fetch_shows(&dir, &provider(&http), today()).await.unwrap();
    assert_eq!(http.total(), 7);

    let lyon = shows.get("Lyon").unwrap();
    assert_eq!(lyon.days[0].len(), 1);
    assert!(lyon.days[1..].iter().all(Vec::is_empty));

    let dune = &lyon.days[0][0];
    assert!(dune.label.starts_with("Dune<br>(01/03)<br>Villeneuve"));
    assert_eq!(dune.showtimes_text, "20:00 (VF)<br><br>??");
    assert_eq!(dune.poster_url, "");
    assert_eq!(dune.cinema_name, "Pathé Bellecour");
}

#[tokio::test]
async fn failure_in_a_later_city_aborts_the_run() {
    let http = FakeAllocine::default()
        .serve(showtimes_url("C0159", "2024-03-01"), 200, dune_page(None))
        .serve(showtimes_url("C0069", "2024-03-03"), 500, b"Internal Server Error".to_vec());
    let dir = directory(
        "name;city;type;code\n\
         Pathé Bellecour;Lyon;allocine;C0159\n\
         Victor Hugo;Besançon;allocine;C0069\n",
    );

    let err = fetch_shows(&dir, &provider(&http), today()).await.unwrap_err();
    match err {
        CinemaError::RemoteFetch { resource, detail } => {
            assert_eq!(resource, showtimes_url("C0069", "2024-03-03"));
            assert!(detail.starts_with("HTTP 500"));
        }
        other => panic!("unexpected error: {other}"),
    }
    // Lyon's week plus three Besançon days, nothing after the failure
    assert_eq!(http.total(), 7 + 3);
}

#[tokio::test]
async fn build_writes_pages_and_mirrors_posters_once() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("html_out");
    let assets = tmp.path().join("templates");
    fs::create_dir_all(assets.join("css")).unwrap();
    fs::write(assets.join("css/style.css"), "body {}").unwrap();

    let http = FakeAllocine::default()
        .serve(showtimes_url("C0159", "2024-03-01"), 200, dune_page(Some(POSTER)))
        .serve(POSTER, 200, png(600, 800));
    let dir = directory(
        "name;city;type;code\n\
         Pathé Bellecour;Lyon;allocine;C0159\n\
         Petit Kursaal;Besançon;besancon;pk\n",
    );
    let mirror =
        PosterMirror::new(&http, output.join("pic")).with_thumbnail(Some(ThumbnailBounds::default()));
    let options = SiteOptions {
        output: output.clone(),
        assets,
        main_city: "Lyon".to_string(),
    };

    for _ in 0..2 {
        let mut shows = fetch_shows(&dir, &provider(&http), today()).await.unwrap();
        let stats = mirror.mirror_all(&mut shows).await.unwrap();
        assert_eq!(stats.failed, 0);
        render_site(&dir, &shows, &options, today()).unwrap();
    }
    assert_eq!(http.hits(POSTER), 1);

    let stored = output.join("pic").join(local_filename(POSTER));
    assert_eq!(image::image_dimensions(&stored).unwrap(), (120, 160));

    let lyon = fs::read_to_string(output.join("lyon/index.html")).unwrap();
    assert!(lyon.contains("Dune<br>(01/03)<br>Villeneuve"));
    assert!(lyon.contains("20:00 (VF)<br><br>??"));
    assert!(lyon.contains(&format!("../pic/{}", local_filename(POSTER))));
    assert!(lyon.contains("vendredi 01/03"));
    assert_eq!(lyon.matches("type=\"radio\"").count(), 1);

    // no Allociné cinema in Besançon, so no page either
    assert!(!output.join("besancon").exists());
    let root = fs::read_to_string(output.join("index.html")).unwrap();
    assert!(root.contains("url=lyon/index.html"));
    assert!(output.join("css/style.css").is_file());
}
