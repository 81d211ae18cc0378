//! The fixed demo catalog served by the virtual account.

use super::{Catalog, Playlist, TrackRecord};

const DEMO_TRACKS: [(&str, &str, &str, &str, f64); 8] = [
    ("am_001", "Shimmering Lights", "Aurora Bloom", "Skyline Echoes", 210.0),
    ("am_002", "Neon Rain", "Midnight City", "Urban Nights", 198.0),
    ("am_003", "Gravity", "The Wanderers", "Celestial", 248.0),
    ("am_004", "Above the Clouds", "Featherfall", "Horizons", 230.0),
    ("am_005", "Wildfire", "Nova Pulse", "Ignite", 205.0),
    ("am_006", "Reflections", "Analog Dreams", "Fragments", 242.0),
    ("am_007", "Aurora Trails", "Lumen", "Northern Skies", 225.0),
    ("am_008", "Midnight Drive", "City Nights", "Highways", 215.0),
];

impl Catalog {
    /// Builds the demo catalog: eight tracks and three library playlists.
    /// The user collection starts empty until an account signs in.
    pub fn demo() -> Self {
        let mut catalog = Catalog::new();
        for (id, title, artist, album, duration) in DEMO_TRACKS {
            catalog.insert_track(TrackRecord::new(id, title, artist, album, duration));
        }

        catalog.insert_playlist(Playlist::new(
            "Morning Boost",
            "Upbeat tracks to start your day",
            ["am_001", "am_005", "am_008"],
        ));
        catalog.insert_playlist(Playlist::new(
            "Night Shift",
            "Late-night ambient electronics",
            ["am_002", "am_003", "am_006", "am_007"],
        ));
        catalog.insert_playlist(Playlist::new(
            "Focus Flow",
            "Instrumental cues for deep work",
            ["am_004", "am_006", "am_007"],
        ));
        catalog
    }
}

/// The per-account playlists generated for `listener` on sign-in.
pub fn user_playlists(listener: &str) -> Vec<Playlist> {
    vec![
        Playlist::new(
            format!("{listener} Favorites"),
            "Songs you have favourited recently",
            ["am_001", "am_003", "am_005"],
        ),
        Playlist::new(
            format!("{listener} Chill Mix"),
            "Laid-back selections based on your play history",
            ["am_004", "am_006", "am_007"],
        ),
        Playlist::new(
            format!("{listener} Commute"),
            "Energetic tunes curated from your library",
            ["am_002", "am_005", "am_008"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_demo_playlist_resolves() {
        let mut catalog = Catalog::demo();
        catalog.replace_user_playlists(user_playlists("Guest Listener"));

        for summary in catalog.list_playlists() {
            let view = catalog.load_playlist(&summary.name).unwrap();
            assert_eq!(view.tracks.len(), summary.track_count);
        }
        for summary in catalog.list_user_playlists() {
            let view = catalog.load_user_playlist(&summary.name).unwrap();
            assert_eq!(view.tracks.len(), 3);
        }
    }
}
