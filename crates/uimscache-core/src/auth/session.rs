use tracing::{debug, info};

use crate::cache::CacheController;
use crate::routes::{Navigation, Route};
use crate::storage::{keys, KeyValueStore, StorageError};

/// Result of checking the session marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    /// Logged out. Leave for the given navigation (always a replace).
    Redirect(Navigation),
}

/// Presence check of the session marker.
///
/// Absence is the normal logged-out case, not an error. The redirect
/// replaces history so going back cannot land on the gated view.
pub struct SessionGate;

impl SessionGate {
    pub fn check<S>(store: &S) -> Result<GateDecision, StorageError>
    where
        S: KeyValueStore + ?Sized,
    {
        if store.get_present(keys::UID)?.is_some() {
            Ok(GateDecision::Proceed)
        } else {
            debug!("No session marker, redirecting to root");
            Ok(GateDecision::Redirect(Navigation::replace(Route::Root)))
        }
    }
}

/// Writes and clears the session marker.
pub struct Session;

impl Session {
    /// Persist the marker for `uid`.
    pub fn sign_in<S>(store: &S, uid: &str) -> Result<(), StorageError>
    where
        S: KeyValueStore + ?Sized,
    {
        store.set(keys::UID, uid)?;
        info!("Session started");
        Ok(())
    }

    /// Remove the marker together with everything cached for it, so the
    /// next user cannot be served the previous user's payloads.
    pub fn sign_out<S>(store: &S) -> Result<(), StorageError>
    where
        S: KeyValueStore + ?Sized,
    {
        CacheController::new().clear(store)?;
        store.remove(keys::UID)?;
        info!("Session ended");
        Ok(())
    }

    /// The signed-in UID, if any.
    pub fn uid<S>(store: &S) -> Result<Option<String>, StorageError>
    where
        S: KeyValueStore + ?Sized,
    {
        store.get_present(keys::UID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_gate_redirects_without_marker() {
        let store = MemoryStore::new();
        let decision = SessionGate::check(&store).unwrap();
        assert_eq!(
            decision,
            GateDecision::Redirect(Navigation {
                route: Route::Root,
                replace: true
            })
        );
    }

    #[test]
    fn test_gate_redirects_on_empty_marker() {
        let store = MemoryStore::with_entries([(keys::UID, "")]);
        assert!(matches!(
            SessionGate::check(&store).unwrap(),
            GateDecision::Redirect(_)
        ));
    }

    #[test]
    fn test_gate_never_parses_marker() {
        let store = MemoryStore::with_entries([(keys::UID, "{garbage")]);
        assert_eq!(SessionGate::check(&store).unwrap(), GateDecision::Proceed);
    }

    #[test]
    fn test_sign_in_and_out() {
        let store = MemoryStore::new();
        Session::sign_in(&store, "20BCS1234").unwrap();
        assert_eq!(SessionGate::check(&store).unwrap(), GateDecision::Proceed);
        assert_eq!(Session::uid(&store).unwrap().as_deref(), Some("20BCS1234"));

        store.set(keys::ATTENDANCE, "[]").unwrap();
        store.set(keys::TIMESTAMP, "1").unwrap();
        Session::sign_out(&store).unwrap();
        assert!(store.is_empty());
        assert!(matches!(
            SessionGate::check(&store).unwrap(),
            GateDecision::Redirect(_)
        ));
    }
}
