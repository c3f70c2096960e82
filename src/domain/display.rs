// Display mode domain model
use chrono::{DateTime, Days, Local, LocalResult, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of the enforced-realtime window.
pub const ENFORCEMENT_WINDOW_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Realtime,
    Today,
    Day,
    Range,
}

impl DisplayMode {
    pub fn is_historical(self) -> bool {
        !matches!(self, DisplayMode::Realtime)
    }

    /// Value of the backend's `type` query parameter.
    pub fn as_query_type(self) -> &'static str {
        match self {
            DisplayMode::Realtime => "realtime",
            DisplayMode::Today => "today",
            DisplayMode::Day => "day",
            DisplayMode::Range => "range",
        }
    }
}

/// Time window shown by a historical mode, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRange {
    pub from_ms: i64,
    pub to_ms: i64,
}

impl DisplayRange {
    /// User supplied range; `from_ms` must precede `to_ms`.
    pub fn new(from_ms: i64, to_ms: i64) -> Result<Self, ModeError> {
        if from_ms >= to_ms {
            return Err(ModeError::InvalidRange { from_ms, to_ms });
        }
        Ok(Self { from_ms, to_ms })
    }

    /// Local midnight up to `now_ms`.
    pub fn today(now_ms: i64) -> Self {
        Self {
            from_ms: local_midnight(local_date(now_ms)),
            to_ms: now_ms,
        }
    }

    /// The whole local calendar day.
    pub fn day(date: NaiveDate) -> Self {
        let from_ms = local_midnight(date);
        let to_ms = match date.checked_add_days(Days::new(1)) {
            Some(next) => local_midnight(next),
            None => from_ms + 24 * 60 * 60 * 1000,
        };
        Self { from_ms, to_ms }
    }
}

/// A mode selection coming from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRequest {
    Realtime,
    Today,
    Day(NaiveDate),
    Range { from_ms: i64, to_ms: i64 },
}

impl ModeRequest {
    pub fn mode(&self) -> DisplayMode {
        match self {
            ModeRequest::Realtime => DisplayMode::Realtime,
            ModeRequest::Today => DisplayMode::Today,
            ModeRequest::Day(_) => DisplayMode::Day,
            ModeRequest::Range { .. } => DisplayMode::Range,
        }
    }

    /// Resolve the window for a historical request. `None` for realtime.
    pub fn resolve_range(&self, now_ms: i64) -> Result<Option<DisplayRange>, ModeError> {
        match *self {
            ModeRequest::Realtime => Ok(None),
            ModeRequest::Today => Ok(Some(DisplayRange::today(now_ms))),
            ModeRequest::Day(date) => Ok(Some(DisplayRange::day(date))),
            ModeRequest::Range { from_ms, to_ms } => DisplayRange::new(from_ms, to_ms).map(Some),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModeError {
    #[error("realtime view is enforced until one hour of history is available")]
    RealtimeEnforced,
    #[error("invalid range: from {from_ms} must be before to {to_ms}")]
    InvalidRange { from_ms: i64, to_ms: i64 },
}

/// Enforced-realtime policy state, owned by the mode controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnforcementState {
    pub enforced: bool,
    pub start_ms: i64,
    pub duration_ms: i64,
}

impl Default for EnforcementState {
    fn default() -> Self {
        Self {
            enforced: false,
            start_ms: 0,
            duration_ms: ENFORCEMENT_WINDOW_MS,
        }
    }
}

impl EnforcementState {
    pub fn begin(&mut self, now_ms: i64) {
        self.enforced = true;
        self.start_ms = now_ms;
    }

    pub fn clear(&mut self) {
        self.enforced = false;
    }

    pub fn window_elapsed(&self, now_ms: i64) -> bool {
        now_ms - self.start_ms >= self.duration_ms
    }
}

pub fn local_date(ms: i64) -> NaiveDate {
    match Local.timestamp_millis_opt(ms) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.date_naive(),
        LocalResult::None => DateTime::from_timestamp_millis(ms)
            .map(|dt| dt.date_naive())
            .unwrap_or_default(),
    }
}

/// Start of local wall-clock `hour` on `date`. `None` when a DST jump skips it.
pub fn local_hour_start(date: NaiveDate, hour: u32) -> Option<i64> {
    let naive = date.and_hms_opt(hour, 0, 0)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

pub fn local_midnight(date: NaiveDate) -> i64 {
    let naive = date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.timestamp_millis(),
        // Midnight skipped by a DST jump
        LocalResult::None => naive.and_utc().timestamp_millis(),
    }
}
