use crate::storage::{keys, KeyValueStore, StorageError};

use super::controller::parse_timestamp;

const MINUTE_MS: i64 = 60_000;
const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;

/// When the cached payloads were last written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStamp {
    pub written_at_ms: i64,
}

impl CacheStamp {
    pub fn new(written_at_ms: i64) -> Self {
        Self { written_at_ms }
    }

    /// Read the stamp from storage, if there is a usable one.
    pub fn load<S>(store: &S) -> Result<Option<Self>, StorageError>
    where
        S: KeyValueStore + ?Sized,
    {
        Ok(store
            .get(keys::TIMESTAMP)?
            .as_deref()
            .and_then(parse_timestamp)
            .map(Self::new))
    }

    pub fn age_minutes(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.written_at_ms) / MINUTE_MS
    }

    /// Coarse age for the status bar: minutes under an hour, then hours
    /// and days rounded to the nearest whole unit. A stamp in the future
    /// reads "just now".
    pub fn age_display(&self, now_ms: i64) -> String {
        match self.age_minutes(now_ms) {
            m if m < 1 => "just now".to_string(),
            m if m < MINUTES_PER_HOUR => format!("{}m ago", m),
            m if m < MINUTES_PER_DAY => format!("{}h ago", round_div(m, MINUTES_PER_HOUR)),
            m => format!("{}d ago", round_div(m, MINUTES_PER_DAY)),
        }
    }
}

/// `value / unit`, halves rounding up.
fn round_div(value: i64, unit: i64) -> i64 {
    (value + unit / 2) / unit
}
