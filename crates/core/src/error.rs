use std::fmt;

/// Result alias that carries the custom [`BridgeError`] type.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// What kind of entity a failed lookup was searching for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Track,
    Playlist,
    UserPlaylist,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Track => "track",
            Self::Playlist => "playlist",
            Self::UserPlaylist => "user playlist",
        };
        f.write_str(label)
    }
}

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A track identifier or playlist name did not resolve.
    #[error("unknown {kind} `{key}`")]
    NotFound { kind: LookupKind, key: String },
    /// The operation requires a logged-in account.
    #[error("account is not authenticated")]
    NotAuthenticated,
    /// Login was attempted with an empty username or password. Only ever
    /// surfaced through the service's last-error message.
    #[error("Username and password are required")]
    InvalidCredentials,
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("{0}")]
    Fft(#[from] realfft::FftError),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    pub fn not_found(kind: LookupKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Returns true for lookup failures, which boundary callers translate
    /// into empty results.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_kind_and_key() {
        let err = BridgeError::not_found(LookupKind::UserPlaylist, "bob Commute");
        assert_eq!(err.to_string(), "unknown user playlist `bob Commute`");
        assert!(err.is_not_found());
        assert!(!BridgeError::NotAuthenticated.is_not_found());
    }
}
