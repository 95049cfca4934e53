pub mod allocine;
pub mod directory;
pub mod error;
pub mod http;
pub mod permissions;
pub mod posters;
pub mod provider;
pub mod render;
pub mod settings;
pub mod shows;

pub use directory::{Cinema, CinemaDirectory, City, ProviderKind};
pub use error::{CinemaError, PosterError};
pub use provider::{ShowProvider, fetch_shows};
pub use shows::{CityShows, DAYS_AHEAD, FilmShow, SearchLinks, ShowsByCity};
