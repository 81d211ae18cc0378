//! Core library for the Music Bridge virtual streaming service.
//!
//! The crate simulates a remote music account entirely in process: a
//! searchable catalog with library and per-account playlists, a signed-in
//! session, and synthetic stereo streams that many callers can open and read
//! concurrently. [`AccountService`] is the entry point; the [`boundary`]
//! module flattens its results for hosts that work with caller-owned buffers.

pub mod account;
pub mod analysis;
pub mod audio;
pub mod boundary;
pub mod catalog;
pub mod config;
pub mod error;
pub mod session;

pub use account::{AccountService, AccountSettings, COMPONENT_NAME, SETTINGS_WINDOW_TITLE};
pub use analysis::{ChannelTone, ToneAnalyser, ToneSummary};
pub use audio::{SignalGenerator, CHANNELS, SAMPLE_RATE};
pub use catalog::{Catalog, Playlist, PlaylistSummary, PlaylistView, TrackRecord};
pub use config::{AccountConfig, AppConfig, LoggingConfig};
pub use error::{BridgeError, LookupKind, Result};
pub use session::{SessionRegistry, StreamHandle};
