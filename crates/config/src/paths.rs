use std::path::{Path, PathBuf};

const TRACKING_RELATIVE: &str = "config/app.db";
const AUTOMATED_DIR: &str = "calibre-web-automated";

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Expand a leading `~` to the current user's home directory.
///
/// `~user` forms are left alone, as is everything when the home directory
/// cannot be determined.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Candidate tracking database locations, in lookup order:
///
/// 1. `config/app.db` relative to the working directory,
/// 2. `~/calibre-web-automated/config/app.db`,
/// 3. `config/app.db` next to the executable.
pub fn tracking_candidates() -> Vec<PathBuf> {
    let cwd = std::env::current_dir().map(|dir| dir.join(TRACKING_RELATIVE)).unwrap_or_else(|_| TRACKING_RELATIVE.into());
    let home = home_dir().map(|home| home.join(AUTOMATED_DIR).join(TRACKING_RELATIVE));
    let exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(TRACKING_RELATIVE)));
    let mut candidates = vec![cwd];
    candidates.extend(home);
    candidates.extend(exe);
    candidates.dedup();
    candidates
}

/// A resolved tracking database path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingLocation {
    pub path: PathBuf,
    /// Whether the file existed when the location was resolved. A dry run
    /// must not create it.
    pub exists: bool,
}
impl TrackingLocation {
    pub fn at(path: PathBuf) -> Self {
        let exists = path.is_file();
        Self { path, exists }
    }

    /// First existing candidate, or the first candidate when none exist.
    pub fn search(candidates: &[PathBuf]) -> Self {
        if let Some(found) = candidates.iter().find(|candidate| candidate.is_file()) {
            tracing::debug!(path = %found.display(), "Found existing tracking database");
            return Self { path: found.clone(), exists: true };
        }
        let path = candidates.first().cloned().unwrap_or_else(|| TRACKING_RELATIVE.into());
        Self { path, exists: false }
    }
}
