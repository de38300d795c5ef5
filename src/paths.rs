//! Data directory and backing-file resolution.

use std::path::{Path, PathBuf};

use crate::settings::SETTINGS_FILE;
use crate::store::STORE_FILE;

const APP_DIR: &str = "evidence-notary";
const HOME_APP_DIR: &str = ".evidence-notary";

/// Platform-local data directory for the store and settings files.
pub(crate) fn data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_local_dir() {
        return dir.join(APP_DIR);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(HOME_APP_DIR);
    }
    PathBuf::from(".").join(HOME_APP_DIR)
}

/// Use an explicit override when given, otherwise `<data dir>/<file>`.
fn resolve(explicit: Option<&Path>, file: &str) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => data_dir().join(file),
    }
}

pub(crate) fn store_path(explicit: Option<&Path>) -> PathBuf {
    resolve(explicit, STORE_FILE)
}

pub(crate) fn settings_path(explicit: Option<&Path>) -> PathBuf {
    resolve(explicit, SETTINGS_FILE)
}
