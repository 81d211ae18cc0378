//! In-memory catalog of tracks and the two playlist collections.
//!
//! Playlists only store track identifiers. Every read that hands a playlist's
//! contents to a caller resolves those identifiers against the catalog, and a
//! dangling identifier fails the whole read instead of being dropped.

pub mod demo;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{error::LookupKind, BridgeError, Result};

const CLOSENESS_WEIGHT: f64 = 0.6;
const COVERAGE_WEIGHT: f64 = 0.4;
/// Scores closer than one step of this grid rank as equal.
const SCORE_STEPS: f64 = 1e9;

fn rank(scored: &mut [(f64, &TrackRecord)]) {
    scored.sort_by(|(lhs_score, lhs), (rhs_score, rhs)| {
        score_key(*rhs_score)
            .cmp(&score_key(*lhs_score))
            .then_with(|| lhs.title.cmp(&rhs.title))
    });
}

/// Quantises a score onto a fixed grid so ranking is a total order.
fn score_key(score: f64) -> i64 {
    (score * SCORE_STEPS).round() as i64
}

/// Canonical metadata for one streamable track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_seconds: f64,
}

impl TrackRecord {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        duration_seconds: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            duration_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    pub description: String,
    pub track_ids: Vec<String>,
}

impl Playlist {
    pub fn new<I, S>(name: impl Into<String>, description: impl Into<String>, track_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: description.into(),
            track_ids: track_ids.into_iter().map(Into::into).collect(),
        }
    }

    fn summary(&self) -> PlaylistSummary {
        PlaylistSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            track_count: self.track_ids.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub name: String,
    pub description: String,
    pub track_count: usize,
}

/// A playlist with every track identifier resolved to a record copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistView {
    pub name: String,
    pub description: String,
    pub tracks: Vec<TrackRecord>,
}

/// Name-indexed playlist storage that preserves insertion order.
#[derive(Debug, Default, Clone)]
struct PlaylistCollection {
    playlists: Vec<Playlist>,
    index: HashMap<String, usize>,
}

impl PlaylistCollection {
    fn from_playlists(playlists: Vec<Playlist>) -> Self {
        let mut collection = Self::default();
        for playlist in playlists {
            collection.insert(playlist);
        }
        collection
    }

    fn insert(&mut self, playlist: Playlist) {
        match self.index.get(&playlist.name) {
            Some(&slot) => self.playlists[slot] = playlist,
            None => {
                self.index.insert(playlist.name.clone(), self.playlists.len());
                self.playlists.push(playlist);
            }
        }
    }

    fn get(&self, name: &str) -> Option<&Playlist> {
        self.index.get(name).map(|&slot| &self.playlists[slot])
    }

    fn summaries(&self) -> Vec<PlaylistSummary> {
        self.playlists.iter().map(Playlist::summary).collect()
    }
}

#[derive(Debug, Default, Clone)]
pub struct Catalog {
    tracks: Vec<TrackRecord>,
    track_index: HashMap<String, usize>,
    library: PlaylistCollection,
    user: PlaylistCollection,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a track, replacing any existing record with the same identifier.
    pub fn insert_track(&mut self, track: TrackRecord) {
        match self.track_index.get(&track.id) {
            Some(&slot) => self.tracks[slot] = track,
            None => {
                self.track_index.insert(track.id.clone(), self.tracks.len());
                self.tracks.push(track);
            }
        }
    }

    /// Adds a library playlist, replacing any existing one with the same name.
    pub fn insert_playlist(&mut self, playlist: Playlist) {
        self.library.insert(playlist);
    }

    /// Swaps out the whole user collection in one step.
    pub fn replace_user_playlists(&mut self, playlists: Vec<Playlist>) {
        self.user = PlaylistCollection::from_playlists(playlists);
    }

    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    pub fn track_by_id(&self, id: &str) -> Result<TrackRecord> {
        self.track(id).cloned()
    }

    fn track(&self, id: &str) -> Result<&TrackRecord> {
        self.track_index
            .get(id)
            .map(|&slot| &self.tracks[slot])
            .ok_or_else(|| BridgeError::not_found(LookupKind::Track, id))
    }

    /// Ranks every track against `query`.
    ///
    /// A track is kept when at least one of title, artist or album contains
    /// the query (case-insensitively). Results are ordered by descending best
    /// field score, with equal scores ordered by title. An empty query keeps
    /// every track with a score of zero.
    pub fn search(&self, query: &str) -> Vec<TrackRecord> {
        let mut scored: Vec<(f64, &TrackRecord)> = self
            .tracks
            .iter()
            .filter_map(|track| {
                let best = [&track.title, &track.artist, &track.album]
                    .into_iter()
                    .map(|field| match_score(field, query))
                    .fold(f64::NEG_INFINITY, f64::max);
                (best >= 0.0).then_some((best, track))
            })
            .collect();

        rank(&mut scored);
        scored.into_iter().map(|(_, track)| track.clone()).collect()
    }

    /// Same as [`Catalog::search`] with the listed identifiers filtered out.
    pub fn search_excluding<S: AsRef<str>>(&self, query: &str, excluded_ids: &[S]) -> Vec<TrackRecord> {
        let mut results = self.search(query);
        if excluded_ids.is_empty() {
            return results;
        }

        let excluded: HashSet<&str> = excluded_ids.iter().map(|id| id.as_ref()).collect();
        results.retain(|track| !excluded.contains(track.id.as_str()));
        results
    }

    pub fn list_playlists(&self) -> Vec<PlaylistSummary> {
        self.library.summaries()
    }

    pub fn list_user_playlists(&self) -> Vec<PlaylistSummary> {
        self.user.summaries()
    }

    pub fn load_playlist(&self, name: &str) -> Result<PlaylistView> {
        let playlist = self
            .library
            .get(name)
            .ok_or_else(|| BridgeError::not_found(LookupKind::Playlist, name))?;
        self.hydrate(playlist)
    }

    pub fn load_user_playlist(&self, name: &str) -> Result<PlaylistView> {
        let playlist = self
            .user
            .get(name)
            .ok_or_else(|| BridgeError::not_found(LookupKind::UserPlaylist, name))?;
        self.hydrate(playlist)
    }

    fn hydrate(&self, playlist: &Playlist) -> Result<PlaylistView> {
        let tracks = playlist
            .track_ids
            .iter()
            .map(|id| self.track_by_id(id))
            .collect::<Result<Vec<_>>>()?;

        Ok(PlaylistView {
            name: playlist.name.clone(),
            description: playlist.description.clone(),
            tracks,
        })
    }
}

/// Scores one field against a query. Returns -1.0 when the field does not
/// contain the query, otherwise a value in (0, 1] that favours early matches
/// and queries covering more of the field. Positions and lengths are counted
/// in characters of the lowercased strings.
pub fn match_score(field: &str, query: &str) -> f64 {
    if query.is_empty() {
        return 0.0;
    }

    let field = field.to_lowercase();
    let query = query.to_lowercase();
    let Some(byte_pos) = field.find(&query) else {
        return -1.0;
    };

    let pos = field[..byte_pos].chars().count() as f64;
    let denominator = field.chars().count() as f64 + 1.0;
    let closeness = 1.0 - pos / denominator;
    let coverage = query.chars().count() as f64 / denominator;
    closeness * CLOSENESS_WEIGHT + coverage * COVERAGE_WEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(tracks: &[TrackRecord]) -> Vec<&str> {
        tracks.iter().map(|track| track.id.as_str()).collect()
    }

    fn best_score(track: &TrackRecord, query: &str) -> f64 {
        [&track.title, &track.artist, &track.album]
            .into_iter()
            .map(|field| match_score(field, query))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    #[test]
    fn scores_prefix_matches_above_later_matches() {
        let prefix = match_score("Neon Rain", "neon");
        let later = match_score("Midnight Neon", "neon");
        assert!(prefix > later);
        assert!(prefix > 0.0 && prefix <= 1.0);
        assert_eq!(match_score("Gravity", "xyz"), -1.0);
        assert_eq!(match_score("Gravity", ""), 0.0);
    }

    #[test]
    fn full_match_scores_close_to_one() {
        let score = match_score("ab", "AB");
        let expected = 0.6 + 0.4 * (2.0 / 3.0);
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn every_result_contains_the_query() {
        let catalog = Catalog::demo();
        for query in ["a", "ni", "NIGHT", "lights", "o"] {
            let lowered = query.to_lowercase();
            for track in catalog.search(query) {
                let hit = [&track.title, &track.artist, &track.album]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&lowered));
                assert!(hit, "{} does not contain {query}", track.id);
            }
        }
    }

    #[test]
    fn results_are_ordered_by_score_then_title() {
        let catalog = Catalog::demo();
        for query in ["a", "e", "ni", "r"] {
            let results = catalog.search(query);
            assert!(!results.is_empty());
            for pair in results.windows(2) {
                let lhs = score_key(best_score(&pair[0], query));
                let rhs = score_key(best_score(&pair[1], query));
                if lhs != rhs {
                    assert!(lhs > rhs);
                } else {
                    assert!(pair[0].title <= pair[1].title);
                }
            }
        }
    }

    #[test]
    fn near_equal_scores_rank_consistently() {
        let tracks: Vec<TrackRecord> = (0..64)
            .map(|n| TrackRecord::new(format!("t{n}"), format!("Song {:02}", 63 - n), "A", "B", 60.0))
            .collect();
        let mut scored: Vec<(f64, &TrackRecord)> = tracks
            .iter()
            .enumerate()
            .map(|(n, track)| (0.5 + n as f64 * 0.6 * f64::EPSILON, track))
            .collect();
        scored.push((0.75, &tracks[0]));

        rank(&mut scored);
        assert_eq!(scored[0].0, 0.75);
        let titles: Vec<&str> = scored[1..].iter().map(|(_, track)| track.title.as_str()).collect();
        let mut sorted = titles.clone();
        sorted.sort_unstable();
        assert_eq!(titles, sorted);
    }

    // An empty query matches everything rather than being rejected. Callers
    // that want to reject it must do so before reaching the catalog.
    #[test]
    fn empty_query_returns_all_tracks_by_title() {
        let catalog = Catalog::demo();
        let results = catalog.search("");
        assert_eq!(results.len(), catalog.tracks().len());
        let titles: Vec<&str> = results.iter().map(|t| t.title.as_str()).collect();
        let mut sorted = titles.clone();
        sorted.sort();
        assert_eq!(titles, sorted);
        assert_eq!(titles[0], "Above the Clouds");
    }

    #[test]
    fn finds_artist_match() {
        let catalog = Catalog::demo();
        let results = catalog.search("Nova");
        assert_eq!(ids(&results), vec!["am_005"]);
        assert_eq!(results[0].title, "Wildfire");
        assert_eq!(results[0].duration_seconds, 205.0);
    }

    #[test]
    fn exclusion_preserves_order() {
        let catalog = Catalog::demo();
        let full = catalog.search("i");
        let excluded = vec![full[0].id.clone(), "am_404".to_string()];

        let filtered = catalog.search_excluding("i", &excluded);
        let expected: Vec<&str> = ids(&full).into_iter().skip(1).collect();
        assert_eq!(ids(&filtered), expected);

        let none: [&str; 0] = [];
        assert_eq!(catalog.search_excluding("i", &none), full);
    }

    #[test]
    fn lists_library_playlists_in_storage_order() {
        let catalog = Catalog::demo();
        let names: Vec<String> = catalog
            .list_playlists()
            .into_iter()
            .map(|summary| summary.name)
            .collect();
        assert_eq!(names, vec!["Morning Boost", "Night Shift", "Focus Flow"]);
    }

    #[test]
    fn loads_playlist_with_hydrated_tracks() {
        let catalog = Catalog::demo();
        let view = catalog.load_playlist("Night Shift").unwrap();
        assert_eq!(ids(&view.tracks), vec!["am_002", "am_003", "am_006", "am_007"]);
        assert_eq!(view.description, "Late-night ambient electronics");
    }

    #[test]
    fn unknown_playlist_is_not_found() {
        let catalog = Catalog::demo();
        let err = catalog.load_playlist("Nope").unwrap_err();
        assert!(err.is_not_found());
        assert!(catalog.load_user_playlist("Morning Boost").is_err());
    }

    #[test]
    fn dangling_track_id_fails_the_load() {
        let mut catalog = Catalog::demo();
        catalog.insert_playlist(Playlist::new("Broken", "", ["am_001", "am_999"]));
        let err = catalog.load_playlist("Broken").unwrap_err();
        assert!(matches!(
            err,
            BridgeError::NotFound { kind: LookupKind::Track, ref key } if key == "am_999"
        ));
    }

    #[test]
    fn duplicate_ids_replace_in_place() {
        let mut catalog = Catalog::new();
        catalog.insert_track(TrackRecord::new("t1", "One", "A", "X", 10.0));
        catalog.insert_track(TrackRecord::new("t2", "Two", "B", "Y", 10.0));
        catalog.insert_track(TrackRecord::new("t1", "Uno", "A", "X", 12.0));

        assert_eq!(catalog.tracks().len(), 2);
        assert_eq!(catalog.track_by_id("t1").unwrap().title, "Uno");
        assert_eq!(catalog.tracks()[0].id, "t1");
    }

    #[test]
    fn playlists_may_repeat_tracks() {
        let mut catalog = Catalog::demo();
        catalog.insert_playlist(Playlist::new("Loop", "", ["am_001", "am_001", "am_002"]));
        let view = catalog.load_playlist("Loop").unwrap();
        assert_eq!(ids(&view.tracks), vec!["am_001", "am_001", "am_002"]);
    }

    #[test]
    fn replacing_user_playlists_swaps_the_collection() {
        let mut catalog = Catalog::demo();
        catalog.replace_user_playlists(demo::user_playlists("carol"));
        assert_eq!(catalog.list_user_playlists().len(), 3);

        catalog.replace_user_playlists(Vec::new());
        assert!(catalog.list_user_playlists().is_empty());
        assert!(catalog.load_user_playlist("carol Commute").is_err());
    }
}
