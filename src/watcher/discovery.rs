//! Log path discovery.
//!
//! Checks the conventional install locations of the game client on
//! Windows drives, Wine/Lutris prefixes and CrossOver bottles.

use std::path::{Path, PathBuf};

const LOG_FILE: &str = "Game.log";

/// Install-relative log locations under a Windows drive root.
const WINDOWS_RELATIVE: &[&str] = &[
    "Program Files/Roberts Space Industries/StarCitizen/LIVE",
    "Program Files/Roberts Space Industries/StarCitizen/PTU",
    "Program Files/Roberts Space Industries/StarCitizen/EPTU",
    "Program Files/Roberts Space Industries/StarCitizen/TECH-PREVIEW",
    "Program Files/Roberts Space Industries/Star Citizen/LIVE",
    "Program Files/Roberts Space Industries/Star Citizen/PTU",
    "Roberts Space Industries/StarCitizen/LIVE",
    "StarCitizen/LIVE",
];

const WINDOWS_DRIVES: &[&str] = &["C:/", "D:/", "E:/", "F:/"];

/// Home-relative locations used by compatibility layers.
const HOME_RELATIVE: &[&str] = &[
    ".wine/drive_c/Program Files/Roberts Space Industries/Star Citizen/LIVE",
    "Games/star-citizen/drive_c/Program Files/Roberts Space Industries/Star Citizen/LIVE",
    ".local/share/lutris/runners/wine/star-citizen",
    "Library/Application Support/CrossOver/Bottles/Star Citizen/drive_c/Program Files/Roberts Space Industries/Star Citizen/LIVE",
];

/// Every location checked, in priority order.
#[must_use]
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = WINDOWS_DRIVES
        .iter()
        .flat_map(|drive| {
            WINDOWS_RELATIVE
                .iter()
                .map(move |rel| Path::new(drive).join(rel).join(LOG_FILE))
        })
        .collect();

    if let Some(home) = dirs::home_dir() {
        candidates.extend(HOME_RELATIVE.iter().map(|rel| home.join(rel).join(LOG_FILE)));
    }

    // Working directory fallback for development captures.
    candidates.push(PathBuf::from(LOG_FILE));
    candidates
}

/// First candidate that is an existing file.
#[must_use]
pub fn find_first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.is_file()).cloned()
}

/// Locate the game log, or `None` if no known location has one.
#[must_use]
pub fn find_log_file() -> Option<PathBuf> {
    let found = find_first_existing(&candidate_paths());
    match &found {
        Some(path) => tracing::debug!(path = %path.display(), "Found game log"),
        None => tracing::debug!("No game log in known locations"),
    }
    found
}
