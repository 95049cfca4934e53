//! Local copies of poster images.
//!
//! Each poster is stored once under `pic/<md5 of url><ext>` and the show is
//! pointed at `../pic/<file>`, relative to a city page. A file already on disk
//! is never fetched again. Failures here only cost a picture: they are logged
//! and the run goes on.

use crate::error::{CinemaError, PosterError};
use crate::http::HttpSource;
use crate::shows::{FilmShow, ShowsByCity};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use md5::{Digest, Md5};
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Path of the pictures directory as seen from a city page.
pub const LOCAL_PREFIX: &str = "../pic/";

/// Box a poster is shrunk into, aspect ratio kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailBounds {
    pub width: u32,
    pub height: u32,
}

impl Default for ThumbnailBounds {
    fn default() -> Self {
        Self {
            width: 120,
            height: 160,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    NoPoster,
    Cached,
    Downloaded,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MirrorStats {
    pub downloaded: u32,
    pub cached: u32,
    pub without_poster: u32,
    pub failed: u32,
}

impl MirrorStats {
    fn record(&mut self, outcome: MirrorOutcome) {
        match outcome {
            MirrorOutcome::NoPoster => self.without_poster += 1,
            MirrorOutcome::Cached => self.cached += 1,
            MirrorOutcome::Downloaded => self.downloaded += 1,
        }
    }
}

impl fmt::Display for MirrorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} downloaded, {} cached, {} without poster, {} failed",
            self.downloaded, self.cached, self.without_poster, self.failed
        )
    }
}

/// `<md5 hex of url><extension>`, the extension taken from the URL path.
pub fn local_filename(url: &str) -> String {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    let ext = Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("{:x}{}", Md5::digest(url.as_bytes()), ext)
}

pub struct PosterMirror<H> {
    http: H,
    pic_dir: PathBuf,
    thumbnail: Option<ThumbnailBounds>,
}

impl<H: HttpSource> PosterMirror<H> {
    pub fn new(http: H, pic_dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            pic_dir: pic_dir.into(),
            thumbnail: Some(ThumbnailBounds::default()),
        }
    }

    /// Shrink freshly downloaded posters into `bounds`, or keep them as-is with `None`.
    pub fn with_thumbnail(mut self, bounds: Option<ThumbnailBounds>) -> Self {
        self.thumbnail = bounds;
        self
    }

    pub fn pic_dir(&self) -> &Path {
        &self.pic_dir
    }

    /// Make sure the poster of `show` is on disk and point the show at it.
    ///
    /// On a download failure `show.poster_url` keeps its remote value.
    pub async fn mirror(&self, show: &mut FilmShow) -> Result<MirrorOutcome, PosterError> {
        let url = show.poster_url.trim();
        if url.is_empty() {
            // old or foreign films often have none
            return Ok(MirrorOutcome::NoPoster);
        }
        if url.starts_with(LOCAL_PREFIX) {
            return Ok(MirrorOutcome::Cached);
        }

        let filename = local_filename(url);
        let path = self.pic_dir.join(&filename);

        let outcome = if path.is_file() {
            debug!(url, file = %filename, "poster already mirrored");
            MirrorOutcome::Cached
        } else {
            self.download(url, &path).await?;
            if let Some(bounds) = self.thumbnail
                && let Err(e) = shrink(&path, bounds)
            {
                warn!("{e}");
            }
            MirrorOutcome::Downloaded
        };

        show.poster_url = format!("{LOCAL_PREFIX}{filename}");
        Ok(outcome)
    }

    async fn download(&self, url: &str, path: &Path) -> Result<(), PosterError> {
        let resp = self
            .http
            .get(url)
            .await
            .map_err(|e| PosterError::Download {
                url: url.to_string(),
                detail: e.to_string(),
            })?;
        if !resp.is_success() {
            return Err(PosterError::Download {
                url: url.to_string(),
                detail: format!("HTTP {}", resp.status),
            });
        }
        write_atomically(path, &resp.body).map_err(|source| PosterError::Store {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Mirror every poster of the week. Poster errors are logged and counted.
    pub async fn mirror_all(&self, shows: &mut ShowsByCity) -> Result<MirrorStats, CinemaError> {
        info!("Downloading missing posters...");
        fs::create_dir_all(&self.pic_dir)?;

        let mut stats = MirrorStats::default();
        for show in shows.shows_mut() {
            match self.mirror(show).await {
                Ok(outcome) => stats.record(outcome),
                Err(e) => {
                    warn!("{e}");
                    stats.failed += 1;
                }
            }
        }

        info!(%stats, "Posters done");
        Ok(stats)
    }
}

/// Write `bytes` next to `path` under a `.part` name, then rename it into
/// place. A file at `path` is always complete.
fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    if let Err(e) = fs::write(&part, bytes).and_then(|()| fs::rename(&part, path)) {
        let _ = fs::remove_file(&part);
        return Err(e);
    }
    Ok(())
}

/// Scale the image at `path` down into `bounds`, in place. Smaller images are
/// left alone.
fn shrink(path: &Path, bounds: ThumbnailBounds) -> Result<(), PosterError> {
    let resize_err = |detail: String| PosterError::Resize {
        path: path.to_path_buf(),
        detail,
    };

    let img = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| resize_err(e.to_string()))?
        .decode()
        .map_err(|e| resize_err(e.to_string()))?;
    if img.width() <= bounds.width && img.height() <= bounds.height {
        return Ok(());
    }

    let format = ImageFormat::from_path(path).map_err(|e| resize_err(e.to_string()))?;
    let mut thumb = img.resize(bounds.width, bounds.height, FilterType::Lanczos3);
    if format == ImageFormat::Jpeg && thumb.color().has_alpha() {
        thumb = DynamicImage::ImageRgb8(thumb.to_rgb8());
    }

    // encode in memory first so a failure leaves the original untouched
    let mut buf = Cursor::new(Vec::new());
    thumb
        .write_to(&mut buf, format)
        .map_err(|e| resize_err(e.to_string()))?;
    write_atomically(path, &buf.into_inner()).map_err(|source| PosterError::Store {
        path: path.to_path_buf(),
        source,
    })
}
