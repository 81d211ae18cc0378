//! Flat projections for a host bridging layer.
//!
//! Hosts call list operations twice: once without a buffer to learn the
//! total, then again with a buffer sized to that total. Every list operation
//! fills `min(buffer.len(), total)` slots and always returns the total, so
//! a caller detects truncation by comparing the two. Lookup and
//! authentication failures become a zero count; nothing here returns an
//! error. All values are owned copies.

use serde::{Deserialize, Serialize};

use crate::{
    AccountService, BridgeError, PlaylistSummary, PlaylistView, Result, TrackRecord,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_seconds: u32,
}

impl From<&TrackRecord> for TrackInfo {
    fn from(track: &TrackRecord) -> Self {
        Self {
            id: track.id.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            duration_seconds: whole_seconds(track.duration_seconds),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub name: String,
    pub description: String,
    pub track_count: u32,
}

impl From<&PlaylistSummary> for PlaylistInfo {
    fn from(summary: &PlaylistSummary) -> Self {
        Self {
            name: summary.name.clone(),
            description: summary.description.clone(),
            track_count: u32::try_from(summary.track_count).unwrap_or(u32::MAX),
        }
    }
}

/// Account settings with empty strings reported as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsInfo {
    pub account_name: Option<String>,
    pub session_token: Option<String>,
    pub last_login_utc: Option<String>,
    pub remember_me: bool,
    pub auto_login: bool,
    pub logged_in: bool,
}

/// Copies `items` into `out` and returns the total number available.
pub fn fill<'a, T, U>(items: &'a [T], out: Option<&mut [U]>) -> usize
where
    U: From<&'a T>,
{
    if let Some(out) = out {
        for (slot, item) in out.iter_mut().zip(items) {
            *slot = U::from(item);
        }
    }
    items.len()
}

pub fn search_tracks(
    service: &AccountService,
    query: Option<&str>,
    out: Option<&mut [TrackInfo]>,
) -> usize {
    let results = service.search(query.unwrap_or_default());
    fill(&results, out)
}

/// Like [`search_tracks`] but skips tracks the host already has locally.
pub fn search_remote_tracks(
    service: &AccountService,
    query: Option<&str>,
    local_ids: &[&str],
    out: Option<&mut [TrackInfo]>,
) -> usize {
    let results = service.search_missing(query.unwrap_or_default(), local_ids);
    fill(&results, out)
}

pub fn list_playlists(service: &AccountService, out: Option<&mut [PlaylistInfo]>) -> usize {
    fill(&service.list_playlists(), out)
}

pub fn list_user_playlists(service: &AccountService, out: Option<&mut [PlaylistInfo]>) -> usize {
    fill(&service.list_user_playlists(), out)
}

pub fn load_playlist(
    service: &AccountService,
    name: Option<&str>,
    out: Option<&mut [TrackInfo]>,
) -> usize {
    fill_view(name.map(|name| service.load_playlist(name)), out)
}

pub fn load_user_playlist(
    service: &AccountService,
    name: Option<&str>,
    out: Option<&mut [TrackInfo]>,
) -> usize {
    fill_view(name.map(|name| service.load_user_playlist(name)), out)
}

fn fill_view(view: Option<Result<PlaylistView>>, out: Option<&mut [TrackInfo]>) -> usize {
    match view {
        Some(Ok(view)) => fill(&view.tracks, out),
        Some(Err(err)) => {
            log_lookup_failure(&err);
            0
        }
        None => 0,
    }
}

fn log_lookup_failure(err: &BridgeError) {
    tracing::debug!(error = %err, "boundary lookup failed");
}

/// Absent credentials are treated as empty strings and rejected.
pub fn login(service: &AccountService, username: Option<&str>, password: Option<&str>) -> bool {
    service.login(username.unwrap_or_default(), password.unwrap_or_default())
}

pub fn logout(service: &AccountService) {
    service.logout();
}

pub fn update_settings(service: &AccountService, remember_me: bool, auto_login: bool) {
    service.set_remember_me(remember_me);
    service.set_auto_login(auto_login);
}

pub fn settings(service: &AccountService) -> SettingsInfo {
    let state = service.settings();
    SettingsInfo {
        account_name: non_empty(state.account_name),
        session_token: non_empty(state.session_token),
        last_login_utc: non_empty(service.last_login_timestamp()),
        remember_me: state.remember_me,
        auto_login: state.auto_login,
        logged_in: state.logged_in,
    }
}

pub fn last_error(service: &AccountService) -> Option<String> {
    service.last_error().and_then(non_empty)
}

/// Opens a stream and returns its session id, or 0 on failure.
pub fn open_stream(service: &AccountService, track_id: Option<&str>) -> u64 {
    let Some(track_id) = track_id else {
        return 0;
    };
    match service.start_stream(track_id) {
        Ok(handle) => handle.id(),
        Err(err) => {
            log_lookup_failure(&err);
            0
        }
    }
}

/// Reads up to `frame_capacity` interleaved stereo frames. Returns 0 at end
/// of stream or for an unknown session. A session that has run out is
/// released here, so closing it afterwards is optional.
pub fn read_stream(
    service: &AccountService,
    session_id: u64,
    out: Option<&mut [f32]>,
    frame_capacity: usize,
) -> usize {
    let Some(out) = out else {
        return 0;
    };
    let Some(stream) = service.get_stream(session_id) else {
        return 0;
    };
    let read = stream.read_frames(out, frame_capacity);
    if read == 0 && stream.finished() {
        service.stop_stream(session_id);
    }
    read
}

/// Closes a session. Closing an unknown or already closed id does nothing.
pub fn close_stream(service: &AccountService, session_id: u64) {
    service.stop_stream(session_id);
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn whole_seconds(duration_seconds: f64) -> u32 {
    if duration_seconds.is_finite() && duration_seconds > 0.0 {
        duration_seconds.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}
