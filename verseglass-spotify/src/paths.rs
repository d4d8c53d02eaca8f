//! Credential file location under the shared config directory.

use std::path::PathBuf;

pub const SPOTIFY_CREDENTIALS_FILE_NAME: &str = ".spotify_credentials.json";

/// Path to the persisted Spotify credentials.
#[must_use]
pub fn credentials_path() -> PathBuf {
    verseglass_core::config_dir().join(SPOTIFY_CREDENTIALS_FILE_NAME)
}
