pub mod banner;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod lyrics;
pub mod paths;
pub mod playback;
pub mod provider;
pub mod resolver;
pub mod time;

pub use config::{Config, SpotifyConfig, SyncConfig};
pub use engine::SyncEngine;
pub use error::CoreError;
pub use events::{DisplayEvent, EventBus, PlayerEvent};
pub use lyrics::{active_line_index, parse_synced, LyricLine};
pub use paths::{config_dir, config_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME};
pub use playback::{PlaybackState, TrackInfo};
pub use provider::{LyricsProvider, LyricsQuery};
pub use resolver::LyricsResolver;
pub use time::DurationExt;
