use chrono::Local;
use clap::{Args, Parser, Subcommand};
use seances::allocine::AllocineProvider;
use seances::http::ReqwestSource;
use seances::posters::PosterMirror;
use seances::settings::{Overrides, Settings};
use seances::{CinemaDirectory, CinemaError, ProviderKind, ShowsByCity, fetch_shows, permissions, render};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seances")]
#[command(about = "Weekly cinema showtimes as a static site")]
struct Cli {
    /// Settings file (defaults to ./seances.toml when present)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(flatten)]
    overrides: OverrideArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct OverrideArgs {
    /// Cinema list (CSV: name, city, type, code, website)
    #[arg(long, global = true)]
    cinemas: Option<PathBuf>,

    /// Output directory of the site
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Directory holding pic/*.ico and css/
    #[arg(long, global = true)]
    assets: Option<PathBuf>,

    /// City the root page redirects to
    #[arg(long, global = true)]
    main_city: Option<String>,

    /// Keep remote poster URLs instead of mirroring them
    #[arg(long, global = true)]
    no_posters: bool,

    /// Store posters at their original size
    #[arg(long, global = true)]
    no_resize: bool,

    /// Apply the configured mode and ownership to the output tree
    #[arg(long, global = true)]
    fix_permissions: bool,
}

impl From<OverrideArgs> for Overrides {
    fn from(args: OverrideArgs) -> Self {
        Overrides {
            cinemas: args.cinemas,
            output: args.output,
            assets: args.assets,
            main_city: args.main_city,
            no_posters: args.no_posters,
            no_resize: args.no_resize,
            fix_permissions: args.fix_permissions,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the week, mirror posters and write the site
    Build,
    /// Fetch the week and print it as JSON
    Fetch {
        /// Only print this city
        #[arg(long)]
        city: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("seances=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CinemaError> {
    let mut settings = Settings::load(cli.settings.as_deref())?;
    settings.apply_overrides(cli.overrides.into());

    let directory = CinemaDirectory::load(&settings.cinemas)?;
    info!(
        cities = directory.cities().len(),
        cinemas = directory.cinema_count(),
        "cinema list loaded"
    );
    for cinema in directory.cities().iter().flat_map(|c| c.cinemas.iter()) {
        if cinema.provider != ProviderKind::Allocine {
            warn!(cinema = %cinema.name, provider = %cinema.provider, "no fetcher for this provider, skipped");
        }
    }

    let http = Arc::new(ReqwestSource::new().map_err(|e| CinemaError::RemoteFetch {
        resource: settings.allocine.api_base.clone(),
        detail: format!("cannot build HTTP client: {e}"),
    })?);
    let today = Local::now().date_naive();

    let provider = AllocineProvider::new(
        Arc::clone(&http),
        settings.allocine.api_base.clone(),
        settings.allocine.site_base.clone(),
    );
    let mut shows: ShowsByCity = fetch_shows(&directory, &provider, today).await?;

    match cli.command {
        Command::Fetch { city } => {
            if let Some(city) = city {
                shows.retain_city(&city);
            }
            let json = serde_json::to_string_pretty(&shows)
                .map_err(|e| CinemaError::Io(std::io::Error::other(e)))?;
            println!("{json}");
        }
        Command::Build => {
            if settings.posters.enabled {
                let mirror = PosterMirror::new(Arc::clone(&http), settings.pic_dir())
                    .with_thumbnail(settings.thumbnail());
                mirror.mirror_all(&mut shows).await?;
            }

            let report = render::render_site(&directory, &shows, &settings.site_options(), today)?;
            info!(
                pages = report.pages.len(),
                assets = report.assets_copied,
                output = %settings.output.display(),
                "site written"
            );

            if let Some(policy) = settings.ownership() {
                permissions::apply(&settings.output, &policy)?;
            }
        }
    }

    Ok(())
}
