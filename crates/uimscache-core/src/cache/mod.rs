//! Local caching of dashboard payloads.
//!
//! This module provides the `CacheController` that decides whether the
//! locally stored attendance, full attendance and timetable payloads can
//! be trusted, and writes them back after a fetch. Cached data is
//! considered stale after 5 minutes.
//!
//! The three payload keys and the timestamp key form one unit: a hit
//! requires all of them.

pub mod controller;
pub mod stamp;

pub use controller::{
    parse_timestamp, CacheController, CacheOutcome, CachedPayloads, MissReason,
    FRESHNESS_WINDOW_MS,
};
pub use stamp::CacheStamp;
