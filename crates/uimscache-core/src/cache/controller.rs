use serde_json::Value;
use tracing::{debug, warn};

use crate::storage::{keys, KeyValueStore, StorageError};

/// Consider cache stale after 5 minutes.
pub const FRESHNESS_WINDOW_MS: i64 = 5 * 60 * 1000;

/// The three dashboard payloads, as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPayloads {
    pub attendance: Value,
    pub full_attendance: Value,
    pub timetable: Value,
}

/// Why the cache could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// One of the payload keys is absent or empty.
    MissingPayload(&'static str),
    /// The timestamp key is absent or does not start with digits.
    MissingTimestamp,
    /// All keys present but older than the freshness window.
    Stale { age_ms: i64 },
    /// A payload key holds text that is not JSON.
    Malformed(&'static str),
}

impl std::fmt::Display for MissReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissReason::MissingPayload(key) => write!(f, "no cached {}", key),
            MissReason::MissingTimestamp => write!(f, "no cache timestamp"),
            MissReason::Stale { age_ms } => write!(f, "cache is {}s old", age_ms / 1000),
            MissReason::Malformed(key) => write!(f, "cached {} is corrupt", key),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheOutcome {
    Hit(CachedPayloads),
    Miss(MissReason),
}

#[cfg(test)]
impl CacheOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheOutcome::Hit(_))
    }
}

/// Parse a stored timestamp the lenient way: skip leading whitespace,
/// accept an optional sign, then take the longest run of decimal digits.
/// Anything after the digits is ignored. No digits means no timestamp.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    // Saturate absurdly long digit runs rather than rejecting them
    let magnitude = rest[..digits_len].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Decides between serving cached payloads and refetching.
#[derive(Debug, Clone, Copy)]
pub struct CacheController {
    window_ms: i64,
}

impl Default for CacheController {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheController {
    pub fn new() -> Self {
        Self {
            window_ms: FRESHNESS_WINDOW_MS,
        }
    }

    /// Whether data written at `timestamp_ms` is still fresh at `now_ms`.
    /// The boundary is inclusive. A timestamp in the future yields a
    /// negative age and counts as fresh.
    pub fn is_fresh(&self, timestamp_ms: i64, now_ms: i64) -> bool {
        now_ms.saturating_sub(timestamp_ms) <= self.window_ms
    }

    /// Read the cache and decide. Storage errors propagate; everything
    /// else about the cached content is a miss.
    pub fn evaluate<S>(&self, store: &S, now_ms: i64) -> Result<CacheOutcome, StorageError>
    where
        S: KeyValueStore + ?Sized,
    {
        let mut raw: [String; 3] = Default::default();
        for (slot, key) in raw.iter_mut().zip(keys::PAYLOADS) {
            match store.get_present(key)? {
                Some(value) => *slot = value,
                None => {
                    debug!(key, "Cache miss: payload absent");
                    return Ok(CacheOutcome::Miss(MissReason::MissingPayload(key)));
                }
            }
        }

        let timestamp = store
            .get(keys::TIMESTAMP)?
            .as_deref()
            .and_then(parse_timestamp);
        let Some(timestamp) = timestamp else {
            debug!("Cache miss: no usable timestamp");
            return Ok(CacheOutcome::Miss(MissReason::MissingTimestamp));
        };

        if !self.is_fresh(timestamp, now_ms) {
            let age_ms = now_ms.saturating_sub(timestamp);
            debug!(age_ms, window_ms = self.window_ms, "Cache miss: stale");
            return Ok(CacheOutcome::Miss(MissReason::Stale { age_ms }));
        }

        let mut parsed: [Value; 3] = Default::default();
        for ((slot, key), text) in parsed.iter_mut().zip(keys::PAYLOADS).zip(&raw) {
            match serde_json::from_str::<Value>(text) {
                Ok(value) => *slot = value,
                Err(e) => {
                    warn!(key, error = %e, "Cached payload is not valid JSON, refetching");
                    return Ok(CacheOutcome::Miss(MissReason::Malformed(key)));
                }
            }
        }
        let [attendance, full_attendance, timetable] = parsed;

        debug!(age_ms = now_ms.saturating_sub(timestamp), "Cache hit");
        Ok(CacheOutcome::Hit(CachedPayloads {
            attendance,
            full_attendance,
            timetable,
        }))
    }

    /// Write freshly fetched payloads. The timestamp goes last so that a
    /// reader racing this write sees either the old stamp or a complete
    /// new set.
    pub fn refresh<S>(
        &self,
        store: &S,
        payloads: &CachedPayloads,
        now_ms: i64,
    ) -> Result<(), StorageError>
    where
        S: KeyValueStore + ?Sized,
    {
        store.set(keys::ATTENDANCE, &serde_json::to_string(&payloads.attendance)?)?;
        store.set(
            keys::FULL_ATTENDANCE,
            &serde_json::to_string(&payloads.full_attendance)?,
        )?;
        store.set(keys::TIMETABLE, &serde_json::to_string(&payloads.timetable)?)?;
        store.set(keys::TIMESTAMP, &now_ms.to_string())?;
        debug!(now_ms, "Cache refreshed");
        Ok(())
    }

    /// Remove payloads and timestamp.
    pub fn clear<S>(&self, store: &S) -> Result<(), StorageError>
    where
        S: KeyValueStore + ?Sized,
    {
        for key in keys::PAYLOADS {
            store.remove(key)?;
        }
        store.remove(keys::TIMESTAMP)
    }
}

// ============================================================================
// Tests
// ============================================================================
