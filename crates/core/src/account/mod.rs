//! Account facade over the catalog and the stream registry.
//!
//! [`AccountService`] is an explicitly owned context: construct it once at
//! startup, share it by reference (or behind an `Arc`) with every caller and
//! drop it on shutdown. Account settings and the catalog sit behind a single
//! service lock. Stream reads never touch it; the only operation that uses
//! both the service lock and the registry lock is
//! [`AccountService::start_stream`], which releases the first before taking
//! the second.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    catalog::demo, AccountConfig, BridgeError, Catalog, PlaylistSummary, PlaylistView, Result,
    SessionRegistry, StreamHandle, TrackRecord,
};

pub const COMPONENT_NAME: &str = "Apple Music Bridge";
pub const SETTINGS_WINDOW_TITLE: &str = "Apple Music Account";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Snapshot of the account state exposed to settings screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSettings {
    pub account_name: String,
    pub session_token: String,
    pub last_login: Option<DateTime<Utc>>,
    pub remember_me: bool,
    pub auto_login: bool,
    pub logged_in: bool,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            account_name: String::new(),
            session_token: String::new(),
            last_login: None,
            remember_me: true,
            auto_login: false,
            logged_in: false,
        }
    }
}

#[derive(Debug)]
struct ServiceState {
    catalog: Catalog,
    settings: AccountSettings,
    display_name: String,
    last_error: Option<String>,
}

impl ServiceState {
    fn require_login(&self) -> Result<()> {
        if self.settings.logged_in {
            Ok(())
        } else {
            Err(BridgeError::NotAuthenticated)
        }
    }
}

#[derive(Debug)]
pub struct AccountService {
    state: Mutex<ServiceState>,
    streams: SessionRegistry,
}

impl Default for AccountService {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountService {
    /// Creates a signed-out service over the demo catalog.
    pub fn new() -> Self {
        Self::with_catalog(Catalog::demo())
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            state: Mutex::new(ServiceState {
                catalog,
                settings: AccountSettings::default(),
                display_name: String::new(),
                last_error: None,
            }),
            streams: SessionRegistry::new(),
        }
    }

    /// Creates a service and applies account preferences, signing in right
    /// away when auto-login is configured with credentials.
    pub fn with_config(config: &AccountConfig) -> Self {
        let service = Self::new();
        service.set_remember_me(config.remember_me);
        service.set_auto_login(config.auto_login);
        tracing::debug!(
            remember_me = config.remember_me,
            auto_login = config.auto_login,
            "applied account config"
        );

        if let Some((username, password)) = config.auto_login_credentials() {
            service.login(username, password);
        }
        service
    }

    /// Signs in. Empty credentials are rejected without touching the account
    /// state; the reason is available from [`AccountService::last_error`].
    pub fn login(&self, username: &str, password: &str) -> bool {
        if username.is_empty() || password.is_empty() {
            tracing::warn!("rejected login with missing credentials");
            self.lock().last_error = Some(BridgeError::InvalidCredentials.to_string());
            return false;
        }

        let token = session_token(username, password);
        let now = Utc::now();

        let mut state = self.lock();
        state.settings.account_name = username.to_string();
        state.settings.session_token = token;
        state.settings.last_login = Some(now);
        state.settings.logged_in = true;
        state.display_name = username.to_string();
        state.last_error = None;
        state
            .catalog
            .replace_user_playlists(demo::user_playlists(username));

        tracing::info!(account = username, "logged in");
        true
    }

    /// Signs out. The account name and preferences are kept so that a
    /// remembered account can be offered again.
    pub fn logout(&self) {
        let mut state = self.lock();
        state.settings.logged_in = false;
        state.settings.session_token.clear();
        state.display_name.clear();
        state.catalog.replace_user_playlists(Vec::new());
        state.last_error = None;
        tracing::info!("logged out");
    }

    pub fn set_remember_me(&self, value: bool) {
        self.lock().settings.remember_me = value;
    }

    pub fn set_auto_login(&self, value: bool) {
        self.lock().settings.auto_login = value;
    }

    pub fn search(&self, query: &str) -> Vec<TrackRecord> {
        self.lock().catalog.search(query)
    }

    /// Searches for tracks that are not already in the caller's local
    /// library.
    pub fn search_missing<S: AsRef<str>>(&self, query: &str, local_ids: &[S]) -> Vec<TrackRecord> {
        self.lock().catalog.search_excluding(query, local_ids)
    }

    pub fn list_playlists(&self) -> Vec<PlaylistSummary> {
        self.lock().catalog.list_playlists()
    }

    /// Lists the account's playlists; empty while signed out.
    pub fn list_user_playlists(&self) -> Vec<PlaylistSummary> {
        let state = self.lock();
        if !state.settings.logged_in {
            return Vec::new();
        }
        state.catalog.list_user_playlists()
    }

    pub fn load_playlist(&self, name: &str) -> Result<PlaylistView> {
        self.lock().catalog.load_playlist(name)
    }

    pub fn load_user_playlist(&self, name: &str) -> Result<PlaylistView> {
        let state = self.lock();
        state.require_login()?;
        state.catalog.load_user_playlist(name)
    }

    /// Opens a stream for `track_id`.
    pub fn start_stream(&self, track_id: &str) -> Result<StreamHandle> {
        let track = {
            let state = self.lock();
            state.require_login()?;
            state.catalog.track_by_id(track_id)?
        };

        let handle = self.streams.start(track);
        tracing::info!(session = handle.id(), track = track_id, "started stream");
        Ok(handle)
    }

    pub fn get_stream(&self, id: u64) -> Option<StreamHandle> {
        self.streams.get(id)
    }

    pub fn stop_stream(&self, id: u64) {
        if self.streams.stop(id) {
            tracing::debug!(session = id, "stopped stream");
        }
    }

    pub fn active_streams(&self) -> usize {
        self.streams.active_count()
    }

    pub fn settings(&self) -> AccountSettings {
        self.lock().settings.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.lock().settings.logged_in
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Last successful login as an ISO-8601 UTC string, or empty if the
    /// account never signed in.
    pub fn last_login_timestamp(&self) -> String {
        self.lock()
            .settings
            .last_login
            .map(|at| at.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default()
    }

    pub fn account_display_name(&self) -> String {
        self.lock().display_name.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Deterministic token for a credential pair: uppercase hex SHA-256 of
/// `username::password`.
fn session_token(username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(b"::");
    hasher.update(password.as_bytes());
    hex::encode_upper(hasher.finalize())
}
