use crate::directory::{Cinema, CinemaDirectory, ProviderKind};
use crate::error::CinemaError;
use crate::shows::{DAYS_AHEAD, FilmShow, ShowsByCity};
use chrono::{Days, NaiveDate};
use tracing::info;

/// A source of showtimes for the cinemas of one [`ProviderKind`].
#[async_trait::async_trait]
pub trait ShowProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Every film shown at `cinema` on `date`.
    async fn fetch_day(&self, cinema: &Cinema, date: NaiveDate)
    -> Result<Vec<FilmShow>, CinemaError>;
}

/// Fetch the coming week for every cinema handled by `provider`.
///
/// Requests are issued one at a time, city by city, cinema by cinema, day by
/// day. The first error aborts the whole fetch and nothing fetched so far is
/// returned.
pub async fn fetch_shows<P: ShowProvider + ?Sized>(
    directory: &CinemaDirectory,
    provider: &P,
    today: NaiveDate,
) -> Result<ShowsByCity, CinemaError> {
    let kind = provider.kind();
    let mut shows = ShowsByCity::new();

    for city in directory.cities() {
        let cinemas: Vec<&Cinema> = city.cinemas.iter().filter(|c| c.provider == kind).collect();
        if cinemas.is_empty() {
            continue;
        }

        let week = shows.city_mut(&city.name);
        for cinema in cinemas {
            for offset in 0..DAYS_AHEAD {
                info!("Fetching {} shows day today+{}...", cinema.name, offset);
                let date = today + Days::new(offset as u64);
                let day_shows = provider.fetch_day(cinema, date).await?;
                week.days[offset].extend(day_shows);
            }
        }
        info!(
            city = %city.name,
            shows = week.days.iter().map(Vec::len).sum::<usize>(),
            "... done!"
        );
    }

    Ok(shows)
}
