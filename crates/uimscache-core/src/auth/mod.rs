//! Authentication module for the session marker and credentials.
//!
//! This module provides:
//! - `SessionGate`: presence check of the `uid` marker on view activation
//! - `Session`: sign-in/sign-out, the only writer of the marker
//! - `CredentialStore`: secure OS-level credential storage via keyring
//!
//! The marker value is never parsed; it only has to be there.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{GateDecision, Session, SessionGate};
