//! Ownership and mode fix-up of the generated tree, run once after rendering
//! so a web server account can read it.

use crate::error::CinemaError;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipPolicy {
    pub mode: u32,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

impl Default for OwnershipPolicy {
    fn default() -> Self {
        Self {
            mode: 0o755,
            uid: None,
            gid: None,
        }
    }
}

/// Apply `policy` to `root` and everything below it. Returns the number of
/// entries touched.
#[cfg(unix)]
pub fn apply(root: &Path, policy: &OwnershipPolicy) -> Result<usize, CinemaError> {
    use std::fs::{self, Permissions};
    use std::os::unix::fs::{PermissionsExt, chown};
    use tracing::debug;
    use walkdir::WalkDir;

    let mut touched = 0;
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        fs::set_permissions(path, Permissions::from_mode(policy.mode))?;
        if policy.uid.is_some() || policy.gid.is_some() {
            chown(path, policy.uid, policy.gid)?;
        }
        debug!(path = %path.display(), "permissions set");
        touched += 1;
    }

    info!(root = %root.display(), entries = touched, mode = %format!("{:o}", policy.mode), "permissions fixed");
    Ok(touched)
}

#[cfg(not(unix))]
pub fn apply(root: &Path, _policy: &OwnershipPolicy) -> Result<usize, CinemaError> {
    info!(root = %root.display(), "permission fix-up is only supported on unix");
    Ok(0)
}
