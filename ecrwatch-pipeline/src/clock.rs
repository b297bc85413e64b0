//! Wall-clock source for version tags.

use chrono::{Local, NaiveDateTime};

/// Timestamp layout of version tags: sortable, second granularity.
pub const VERSION_TIMESTAMP_FORMAT: &str = "%Y-%m-%dt%H%M%S";

pub trait Clock {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Format `at` as the tag part of a version tag, e.g. `2024-01-01t000000`.
pub fn version_timestamp(at: NaiveDateTime) -> String {
    at.format(VERSION_TIMESTAMP_FORMAT).to_string()
}
