//! Dashboard view activation.
//!
//! Activation runs two steps in order:
//!
//! 1. `SessionGate`: no session marker means redirect to `/` (replace).
//! 2. `CacheController`: a hit pushes the cached payloads through the
//!    state setters and asks for `/dashboard/attendance`; a miss hands the
//!    setters to the fetch collaborator.
//!
//! Nothing here navigates or waits. The caller gets an `Activation` and
//! applies its navigation; fetched data arrives later on the setters'
//! channel.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::auth::{GateDecision, SessionGate};
use crate::cache::{CacheController, CacheOutcome, MissReason};
use crate::routes::{Navigation, Route};
use crate::storage::{KeyValueStore, StorageError};

/// State changes delivered to the view.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardUpdate {
    Attendance(Value),
    FullAttendance(Value),
    Timetable(Value),
    /// The fetch collaborator finished and refreshed the cache
    FetchComplete,
    /// The fetch collaborator gave up
    Error(String),
}

/// The three state setters (attendance, full attendance, timetable).
///
/// Cloneable and non-blocking; every call becomes a `DashboardUpdate` on
/// an unbounded channel drained by the view.
#[derive(Debug, Clone)]
pub struct StateSetters {
    tx: mpsc::UnboundedSender<DashboardUpdate>,
}

impl StateSetters {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DashboardUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn set_attendance(&self, value: Value) {
        self.send(DashboardUpdate::Attendance(value));
    }

    pub fn set_full_attendance(&self, value: Value) {
        self.send(DashboardUpdate::FullAttendance(value));
    }

    pub fn set_timetable(&self, value: Value) {
        self.send(DashboardUpdate::Timetable(value));
    }

    pub fn complete(&self) {
        self.send(DashboardUpdate::FetchComplete);
    }

    pub fn fail(&self, message: impl Into<String>) {
        self.send(DashboardUpdate::Error(message.into()));
    }

    fn send(&self, update: DashboardUpdate) {
        if self.tx.send(update).is_err() {
            warn!("Dashboard update dropped - view is gone");
        }
    }
}

/// Something that fetches fresh payloads and feeds them to the setters.
///
/// Fire-and-forget: `fetch` must return promptly; the work happens
/// elsewhere and its outcome is only visible through the setters.
pub trait FetchCollaborator: Send + Sync {
    fn fetch(&self, setters: StateSetters);
}

/// What activation decided. Carries the navigation for the caller to
/// perform, if any.
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// No session; go to root, replacing history
    Redirect(Navigation),
    /// Served from cache; go to the default tab
    Loaded(Navigation),
    /// Cache unusable; the fetch collaborator was started
    Fetching(MissReason),
}

impl Activation {
    pub fn navigation(&self) -> Option<Navigation> {
        match self {
            Activation::Redirect(nav) | Activation::Loaded(nav) => Some(*nav),
            Activation::Fetching(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Dashboard {
    cache: CacheController,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the session gate, then the cache controller.
    pub fn activate<S, F>(
        &self,
        store: &S,
        now_ms: i64,
        setters: &StateSetters,
        fetcher: &F,
    ) -> Result<Activation, StorageError>
    where
        S: KeyValueStore + ?Sized,
        F: FetchCollaborator + ?Sized,
    {
        if let GateDecision::Redirect(nav) = SessionGate::check(store)? {
            return Ok(Activation::Redirect(nav));
        }

        match self.cache.evaluate(store, now_ms)? {
            CacheOutcome::Hit(payloads) => {
                debug!("Serving dashboard from cache");
                setters.set_attendance(payloads.attendance);
                setters.set_full_attendance(payloads.full_attendance);
                setters.set_timetable(payloads.timetable);
                Ok(Activation::Loaded(Navigation::push(Route::DEFAULT_DASHBOARD)))
            }
            CacheOutcome::Miss(reason) => {
                info!(%reason, "Cache unusable, fetching");
                fetcher.fetch(setters.clone());
                Ok(Activation::Fetching(reason))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FRESHNESS_WINDOW_MS;
    use crate::routes::Tab;
    use crate::storage::{keys, MemoryStore};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const NOW: i64 = 1_700_000_000_000;

    #[derive(Default)]
    struct RecordingFetcher {
        calls: AtomicUsize,
    }

    impl RecordingFetcher {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl FetchCollaborator for RecordingFetcher {
        fn fetch(&self, setters: StateSetters) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            setters.set_attendance(json!("fetched"));
        }
    }

    fn signed_in_store(timestamp: Option<i64>) -> MemoryStore {
        let store = MemoryStore::with_entries([
            (keys::UID, "20BCS1234"),
            (keys::ATTENDANCE, r#"["a"]"#),
            (keys::FULL_ATTENDANCE, r#"["fa"]"#),
            (keys::TIMETABLE, r#"["t"]"#),
        ]);
        if let Some(ts) = timestamp {
            store.set(keys::TIMESTAMP, &ts.to_string()).unwrap();
        }
        store
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<DashboardUpdate>) -> Vec<DashboardUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        updates
    }

    #[test]
    fn test_missing_session_redirects_without_loading() {
        let store = signed_in_store(Some(NOW));
        store.remove(keys::UID).unwrap();
        let (setters, mut rx) = StateSetters::channel();
        let fetcher = RecordingFetcher::default();

        let activation = Dashboard::new().activate(&store, NOW, &setters, &fetcher).unwrap();

        assert_eq!(activation, Activation::Redirect(Navigation::replace(Route::Root)));
        assert_eq!(activation.navigation().unwrap().route.path(), "/");
        assert!(drain(&mut rx).is_empty());
        assert_eq!(fetcher.calls(), 0);
    }

    #[test]
    fn test_fresh_cache_loads_without_fetching() {
        let store = signed_in_store(Some(NOW - 10_000));
        let (setters, mut rx) = StateSetters::channel();
        let fetcher = RecordingFetcher::default();

        let activation = Dashboard::new().activate(&store, NOW, &setters, &fetcher).unwrap();

        assert_eq!(
            activation,
            Activation::Loaded(Navigation::push(Route::Dashboard(Tab::Attendance)))
        );
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(
            drain(&mut rx),
            vec![
                DashboardUpdate::Attendance(json!(["a"])),
                DashboardUpdate::FullAttendance(json!(["fa"])),
                DashboardUpdate::Timetable(json!(["t"])),
            ]
        );
    }

    #[test]
    fn test_any_missing_key_invokes_fetcher() {
        for missing in [
            keys::ATTENDANCE,
            keys::FULL_ATTENDANCE,
            keys::TIMETABLE,
            keys::TIMESTAMP,
        ] {
            let store = signed_in_store(Some(NOW));
            store.remove(missing).unwrap();
            let (setters, mut rx) = StateSetters::channel();
            let fetcher = RecordingFetcher::default();

            let activation = Dashboard::new().activate(&store, NOW, &setters, &fetcher).unwrap();

            assert!(matches!(activation, Activation::Fetching(_)), "{}", missing);
            assert_eq!(activation.navigation(), None);
            assert_eq!(fetcher.calls(), 1);
            // Only what the fetcher pushed, nothing from the cache
            assert_eq!(drain(&mut rx), vec![DashboardUpdate::Attendance(json!("fetched"))]);
        }
    }

    #[test]
    fn test_boundary_fresh_and_one_past_stale() {
        let fetcher = RecordingFetcher::default();
        let (setters, _rx) = StateSetters::channel();

        let at_boundary = signed_in_store(Some(NOW - FRESHNESS_WINDOW_MS));
        let activation = Dashboard::new()
            .activate(&at_boundary, NOW, &setters, &fetcher)
            .unwrap();
        assert!(matches!(activation, Activation::Loaded(_)));
        assert_eq!(fetcher.calls(), 0);

        let past = signed_in_store(Some(NOW - FRESHNESS_WINDOW_MS - 1));
        let activation = Dashboard::new().activate(&past, NOW, &setters, &fetcher).unwrap();
        assert_eq!(
            activation,
            Activation::Fetching(MissReason::Stale {
                age_ms: FRESHNESS_WINDOW_MS + 1
            })
        );
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn test_malformed_cache_refetches() {
        let store = signed_in_store(Some(NOW));
        store.set(keys::TIMETABLE, "{oops").unwrap();
        let (setters, _rx) = StateSetters::channel();
        let fetcher = RecordingFetcher::default();

        let activation = Dashboard::new().activate(&store, NOW, &setters, &fetcher).unwrap();
        assert_eq!(activation, Activation::Fetching(MissReason::Malformed(keys::TIMETABLE)));
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn test_setters_survive_dropped_receiver() {
        let (setters, rx) = StateSetters::channel();
        drop(rx);
        // Must not panic
        setters.set_timetable(json!({}));
        setters.fail("gone");
    }
}
