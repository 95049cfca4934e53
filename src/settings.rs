use crate::allocine;
use crate::error::CinemaError;
use crate::permissions::OwnershipPolicy;
use crate::posters::ThumbnailBounds;
use crate::render::SiteOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings file looked up in the working directory when none is given.
pub const DEFAULT_SETTINGS_FILE: &str = "seances.toml";

/// Everything a run needs, loaded from an optional TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub cinemas: PathBuf,
    pub output: PathBuf,
    pub assets: PathBuf,
    pub main_city: String,
    pub allocine: AllocineSettings,
    pub posters: PosterSettings,
    pub permissions: PermissionSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllocineSettings {
    pub api_base: String,
    pub site_base: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PosterSettings {
    pub enabled: bool,
    pub resize: bool,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PermissionSettings {
    pub enabled: bool,
    pub mode: u32,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cinemas: PathBuf::from("cinemas.csv"),
            output: PathBuf::from("html_out"),
            assets: PathBuf::from("templates"),
            main_city: "Besançon".to_string(),
            allocine: AllocineSettings::default(),
            posters: PosterSettings::default(),
            permissions: PermissionSettings::default(),
        }
    }
}

impl Default for AllocineSettings {
    fn default() -> Self {
        Self {
            api_base: allocine::API_BASE.to_string(),
            site_base: allocine::SITE_BASE.to_string(),
        }
    }
}

impl Default for PosterSettings {
    fn default() -> Self {
        let bounds = ThumbnailBounds::default();
        Self {
            enabled: true,
            resize: true,
            width: bounds.width,
            height: bounds.height,
        }
    }
}

impl Default for PermissionSettings {
    fn default() -> Self {
        let policy = OwnershipPolicy::default();
        Self {
            enabled: false,
            mode: policy.mode,
            uid: policy.uid,
            gid: policy.gid,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub cinemas: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub assets: Option<PathBuf>,
    pub main_city: Option<String>,
    pub no_posters: bool,
    pub no_resize: bool,
    pub fix_permissions: bool,
}

impl Settings {
    /// Load `path`, or `seances.toml` if it exists, or the defaults.
    ///
    /// An explicitly given file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, CinemaError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_SETTINGS_FILE);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|e| CinemaError::Settings {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        Self::parse(&content, &path)
    }

    pub fn parse(content: &str, origin: &Path) -> Result<Self, CinemaError> {
        toml::from_str(content).map_err(|e| CinemaError::Settings {
            path: origin.to_path_buf(),
            detail: e.to_string(),
        })
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(cinemas) = overrides.cinemas {
            self.cinemas = cinemas;
        }
        if let Some(output) = overrides.output {
            self.output = output;
        }
        if let Some(assets) = overrides.assets {
            self.assets = assets;
        }
        if let Some(main_city) = overrides.main_city {
            self.main_city = main_city;
        }
        if overrides.no_posters {
            self.posters.enabled = false;
        }
        if overrides.no_resize {
            self.posters.resize = false;
        }
        if overrides.fix_permissions {
            self.permissions.enabled = true;
        }
    }

    pub fn site_options(&self) -> SiteOptions {
        SiteOptions {
            output: self.output.clone(),
            assets: self.assets.clone(),
            main_city: self.main_city.clone(),
        }
    }

    pub fn pic_dir(&self) -> PathBuf {
        self.output.join("pic")
    }

    pub fn thumbnail(&self) -> Option<ThumbnailBounds> {
        self.posters.resize.then_some(ThumbnailBounds {
            width: self.posters.width,
            height: self.posters.height,
        })
    }

    pub fn ownership(&self) -> Option<OwnershipPolicy> {
        self.permissions.enabled.then_some(OwnershipPolicy {
            mode: self.permissions.mode,
            uid: self.permissions.uid,
            gid: self.permissions.gid,
        })
    }
}
