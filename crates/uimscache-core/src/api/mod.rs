//! HTTP client for the UIMS backend.
//!
//! This module provides the `ApiClient` that signs in with a UID and
//! password and retrieves the three dashboard payloads (attendance, full
//! attendance, timetable) as raw JSON.

pub mod client;
pub mod error;

pub use client::{ApiClient, Credentials};
pub use error::ApiError;
