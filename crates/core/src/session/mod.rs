use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use crate::{SignalGenerator, TrackRecord};

/// Thread-safe map of live stream sessions keyed by session id.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<u64, StreamHandle>>,
    next_id: AtomicU64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Opens a new session for `track`. Ids start at 1 and are never reused.
    pub fn start(&self, track: TrackRecord) -> StreamHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = StreamHandle::new(SignalGenerator::new(track, id));

        self.lock().insert(id, handle.clone());
        tracing::debug!(session = id, "registered stream session");
        handle
    }

    pub fn get(&self, id: u64) -> Option<StreamHandle> {
        self.lock().get(&id).cloned()
    }

    /// Removes a session. Handles already held by readers stay usable.
    /// Returns whether a session was removed; unknown ids are ignored.
    pub fn stop(&self, id: u64) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, StreamHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared view over one session's generator.
///
/// Each handle guards its own generator, so readers of different sessions
/// never contend with each other or with the registry.
#[derive(Clone)]
pub struct StreamHandle {
    id: u64,
    shared: Arc<Mutex<SignalGenerator>>,
}

impl StreamHandle {
    pub(crate) fn new(generator: SignalGenerator) -> Self {
        Self {
            id: generator.id(),
            shared: Arc::new(Mutex::new(generator)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// See [`SignalGenerator::read_frames`].
    pub fn read_frames(&self, destination: &mut [f32], frame_capacity: usize) -> usize {
        self.lock().read_frames(destination, frame_capacity)
    }

    pub fn finished(&self) -> bool {
        self.lock().finished()
    }

    pub fn total_frames(&self) -> u64 {
        self.lock().total_frames()
    }

    pub fn frames_produced(&self) -> u64 {
        self.lock().frames_produced()
    }

    pub fn position_seconds(&self) -> f64 {
        self.lock().position_seconds()
    }

    pub fn frequencies(&self) -> (f64, f64) {
        self.lock().frequencies()
    }

    pub fn track(&self) -> TrackRecord {
        self.lock().track().clone()
    }

    fn lock(&self) -> MutexGuard<'_, SignalGenerator> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    fn track(id: &str, duration_seconds: f64) -> TrackRecord {
        TrackRecord::new(id, "Title", "Artist", "Album", duration_seconds)
    }

    #[test]
    fn allocates_increasing_ids() {
        let registry = SessionRegistry::new();
        let first = registry.start(track("a", 1.0));
        let second = registry.start(track("b", 1.0));

        assert_eq!(first.id(), 1);
        assert!(second.id() > first.id());
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn stop_removes_only_the_named_session() {
        let registry = SessionRegistry::new();
        let first = registry.start(track("a", 1.0));
        let second = registry.start(track("b", 1.0));

        assert!(registry.stop(first.id()));
        assert!(registry.get(first.id()).is_none());
        assert!(registry.get(second.id()).is_some());

        assert!(!registry.stop(first.id()));
        assert!(!registry.stop(9_999));
    }

    #[test]
    fn ids_are_not_reused_after_stop() {
        let registry = SessionRegistry::new();
        let first = registry.start(track("a", 1.0));
        registry.stop(first.id());
        let next = registry.start(track("a", 1.0));
        assert!(next.id() > first.id());
    }

    #[test]
    fn held_handle_survives_removal() {
        let registry = SessionRegistry::new();
        let handle = registry.start(track("a", 1.0));
        registry.stop(handle.id());

        let mut buffer = vec![0.0_f32; 256];
        assert_eq!(handle.read_frames(&mut buffer, 128), 128);
        assert_eq!(handle.frames_produced(), 128);
    }

    #[test]
    fn get_returns_shared_instance() {
        let registry = SessionRegistry::new();
        let handle = registry.start(track("a", 1.0));
        let mut buffer = vec![0.0_f32; 200];
        handle.read_frames(&mut buffer, 100);

        let fetched = registry.get(handle.id()).unwrap();
        assert_eq!(fetched.frames_produced(), 100);
    }

    #[test]
    fn concurrent_sessions_read_independently() {
        let registry = Arc::new(SessionRegistry::new());
        let workers: Vec<_> = (0..8)
            .map(|index| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let handle = registry.start(track(&format!("t{index}"), 0.25));
                    let id = handle.id();
                    let mut buffer = vec![0.0_f32; 2 * 512];
                    let mut total = 0u64;
                    loop {
                        let session = registry.get(id).expect("session should be live");
                        let read = session.read_frames(&mut buffer, 512);
                        if read == 0 {
                            break;
                        }
                        total += read as u64;
                    }
                    assert!(handle.finished());
                    registry.stop(id);
                    (id, total, handle.total_frames())
                })
            })
            .collect();

        let mut ids = Vec::new();
        for worker in workers {
            let (id, total, expected) = worker.join().unwrap();
            assert_eq!(total, expected);
            ids.push(id);
        }

        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        assert_eq!(registry.active_count(), 0);
    }
}
