//! The fetch collaborator backed by the UIMS API.
//!
//! `HttpFetcher::fetch` spawns a Tokio task and returns immediately. The
//! task requests the three payloads concurrently, pushes each one that
//! arrives through the state setters, and refreshes the cache only when
//! all three succeeded, so the cache never holds a mixed generation.
//! Results that come back after the UID signed out are dropped unseen.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{error, info, warn};

use crate::api::{ApiClient, ApiError, Credentials};
use crate::auth::Session;
use crate::cache::{CacheController, CachedPayloads};
use crate::dashboard::{FetchCollaborator, StateSetters};
use crate::storage::KeyValueStore;

pub struct HttpFetcher {
    api: ApiClient,
    credentials: Credentials,
    store: Arc<dyn KeyValueStore>,
    cache: CacheController,
    runtime: Handle,
}

impl HttpFetcher {
    /// Must be called from within a Tokio runtime.
    pub fn new(api: ApiClient, credentials: Credentials, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_runtime(api, credentials, store, Handle::current())
    }

    pub fn with_runtime(
        api: ApiClient,
        credentials: Credentials,
        store: Arc<dyn KeyValueStore>,
        runtime: Handle,
    ) -> Self {
        Self {
            api,
            credentials,
            store,
            cache: CacheController::new(),
            runtime,
        }
    }

    async fn run(
        api: ApiClient,
        credentials: Credentials,
        store: Arc<dyn KeyValueStore>,
        cache: CacheController,
        setters: StateSetters,
    ) {
        info!(uid = %credentials.uid, "Fetching dashboard data");

        let (attendance, full_attendance, timetable) = tokio::join!(
            api.fetch_attendance(&credentials),
            api.fetch_full_attendance(&credentials),
            api.fetch_timetable(&credentials),
        );

        // The session may have ended or changed hands while requests were
        // in flight; those results belong to nobody now.
        if !still_signed_in(store.as_ref(), &credentials.uid) {
            info!(uid = %credentials.uid, "Session ended during fetch, discarding results");
            return;
        }

        let outcome = deliver(&setters, attendance, full_attendance, timetable);
        match outcome {
            Ok(payloads) => {
                let now_ms = Utc::now().timestamp_millis();
                if let Err(e) = cache.refresh(store.as_ref(), &payloads, now_ms) {
                    warn!(error = %e, "Failed to write cache");
                }
                info!("Dashboard data refreshed");
                setters.complete();
            }
            Err(message) => setters.fail(message),
        }
    }
}

impl FetchCollaborator for HttpFetcher {
    fn fetch(&self, setters: StateSetters) {
        let api = self.api.clone();
        let credentials = self.credentials.clone();
        let store = Arc::clone(&self.store);
        let cache = self.cache;

        self.runtime.spawn(async move {
            Self::run(api, credentials, store, cache, setters).await;
        });
    }
}

fn still_signed_in(store: &dyn KeyValueStore, uid: &str) -> bool {
    match Session::uid(store) {
        Ok(current) => current.as_deref() == Some(uid),
        Err(e) => {
            warn!(error = %e, "Failed to read session");
            false
        }
    }
}

/// Push whatever arrived through the setters. Returns the complete set,
/// or the first failure as a user-facing message.
fn deliver(
    setters: &StateSetters,
    attendance: Result<Value>,
    full_attendance: Result<Value>,
    timetable: Result<Value>,
) -> Result<CachedPayloads, String> {
    let mut first_error: Option<String> = None;
    let mut record = |name: &str, e: anyhow::Error| {
        error!(error = %e, "{} fetch failed", name);
        if first_error.is_none() {
            first_error = Some(describe(&e));
        }
    };

    let attendance = match attendance {
        Ok(v) => {
            setters.set_attendance(v.clone());
            Some(v)
        }
        Err(e) => {
            record("Attendance", e);
            None
        }
    };
    let full_attendance = match full_attendance {
        Ok(v) => {
            setters.set_full_attendance(v.clone());
            Some(v)
        }
        Err(e) => {
            record("Full attendance", e);
            None
        }
    };
    let timetable = match timetable {
        Ok(v) => {
            setters.set_timetable(v.clone());
            Some(v)
        }
        Err(e) => {
            record("Timetable", e);
            None
        }
    };

    match (attendance, full_attendance, timetable) {
        (Some(attendance), Some(full_attendance), Some(timetable)) => Ok(CachedPayloads {
            attendance,
            full_attendance,
            timetable,
        }),
        _ => Err(first_error.unwrap_or_else(|| "Update failed".to_string())),
    }
}

fn describe(e: &anyhow::Error) -> String {
    match e.downcast_ref::<ApiError>() {
        Some(api_error) => api_error.user_message(),
        None => format!("Update failed: {}", e),
    }
}
