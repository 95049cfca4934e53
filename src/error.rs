use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop the run. Nothing is retried.
#[derive(Debug, Error)]
pub enum CinemaError {
    #[error("cannot read cinema list {}: {source}", path.display())]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed cinema list {} (line {line}): {detail}", path.display())]
    ConfigFormat {
        path: PathBuf,
        line: u64,
        detail: String,
    },

    #[error("invalid settings file {}: {detail}", path.display())]
    Settings { path: PathBuf, detail: String },

    #[error("Cannot fetch remote resource {resource}: {detail}.")]
    RemoteFetch { resource: String, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Poster problems. These are logged and never abort the run.
#[derive(Debug, Error)]
pub enum PosterError {
    #[error("cannot download poster {url}: {detail}")]
    Download { url: String, detail: String },

    #[error("cannot store poster {}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot resize poster {}: {detail}", path.display())]
    Resize { path: PathBuf, detail: String },
}
