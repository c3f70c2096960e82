// Feed adapter - Normalizes push payloads into readings
use crate::application::power_cache::PowerCache;
use crate::application::scheduler::Clock;
use crate::domain::telemetry::Reading;
use chrono::DateTime;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Power fields, checked in order; the first one holding a number wins.
/// New feed shapes are supported by extending this list.
pub const POWER_FIELDS: &[&str] = &["ups_realpower", "ups_power", "power"];

/// Load fields, checked in order. Load is best-effort and defaults to 0.
pub const LOAD_FIELDS: &[&str] = &["ups_load", "load_percent", "load"];

const TIMESTAMP_FIELDS: &[&str] = &["timestamp", "ts"];

/// Feed timestamps further than this from the local clock are replaced by it.
const MAX_CLOCK_SKEW_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unrecognized payload shape: {0}")]
    Shape(String),
    #[error("payload has no ups_realpower, ups_power or power field")]
    MissingPower,
    #[error("feed transport unavailable: {0}")]
    Transport(String),
}

/// Outbound half of the push transport.
pub trait FeedTransport: Send + Sync {
    /// Ask for an immediate reading instead of waiting for the next push.
    fn request_snapshot(&self) -> Result<(), FeedError>;
}

/// Inbound events produced by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Message(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

pub struct FeedAdapter {
    transport: Box<dyn FeedTransport>,
    cache: Arc<dyn PowerCache>,
    clock: Arc<dyn Clock>,
    state: ConnectionState,
    attached: bool,
    last_timestamp: Option<i64>,
    attach_count: u64,
    detach_count: u64,
}

impl FeedAdapter {
    pub fn new(
        transport: Box<dyn FeedTransport>,
        cache: Arc<dyn PowerCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            cache,
            clock,
            state: ConnectionState::Disconnected,
            attached: false,
            last_timestamp: None,
            attach_count: 0,
            detach_count: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn attach_count(&self) -> u64 {
        self.attach_count
    }

    pub fn detach_count(&self) -> u64 {
        self.detach_count
    }

    /// Start emitting readings. Requests a snapshot right away when connected.
    pub fn attach(&mut self) {
        if self.attached {
            return;
        }
        self.attached = true;
        self.attach_count += 1;
        if self.state == ConnectionState::Connected {
            self.request_snapshot();
        }
    }

    pub fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        self.detach_count += 1;
    }

    /// Returns false if the transport refused the request.
    pub fn request_snapshot(&self) -> bool {
        match self.transport.request_snapshot() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Snapshot request failed: {}", e);
                false
            }
        }
    }

    /// Process one transport event. Yields at most one reading, and only
    /// while attached.
    pub fn handle(&mut self, event: TransportEvent) -> Option<Reading> {
        match event {
            TransportEvent::Connected => {
                self.transition(ConnectionState::Connected);
                None
            }
            TransportEvent::Disconnected => {
                self.transition(ConnectionState::Disconnected);
                None
            }
            TransportEvent::Message(payload) => match self.normalize(&payload) {
                Ok(reading) => {
                    self.cache.store(reading.power_watts);
                    self.attached.then_some(reading)
                }
                Err(e) => {
                    tracing::warn!("Skipping feed payload: {}", e);
                    None
                }
            },
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        self.state = next;
        match next {
            ConnectionState::Connected => {
                tracing::info!("Telemetry feed connected, requesting snapshot");
                self.request_snapshot();
            }
            ConnectionState::Disconnected => {
                tracing::warn!("Telemetry feed disconnected");
            }
        }
    }

    /// Build a reading from a `[header, payload]` pair or a bare object.
    /// Timestamps are kept non-decreasing; implausible ones fall back to the
    /// clock.
    pub fn normalize(&mut self, raw: &Value) -> Result<Reading, FeedError> {
        let payload = extract_payload(raw)?;
        let power = first_number(payload, POWER_FIELDS).ok_or(FeedError::MissingPower)?;
        let load = first_number(payload, LOAD_FIELDS).unwrap_or(0.0);

        let now = self.clock.now_ms();
        let mut timestamp = match first_number(payload, TIMESTAMP_FIELDS) {
            Some(ts) => plausible_timestamp(ts, now).unwrap_or_else(|| {
                tracing::debug!("Ignoring implausible feed timestamp {}", ts);
                now
            }),
            None => now,
        };
        if let Some(last) = self.last_timestamp {
            timestamp = timestamp.max(last);
        }
        self.last_timestamp = Some(timestamp);

        Ok(Reading::new(timestamp, power, load))
    }
}

fn plausible_timestamp(ts: f64, now_ms: i64) -> Option<i64> {
    // `as` saturates, so out-of-range values land far from `now_ms`
    let ts = ts as i64;
    DateTime::from_timestamp_millis(ts)?;
    (ts.abs_diff(now_ms) <= MAX_CLOCK_SKEW_MS).then_some(ts)
}

fn extract_payload(raw: &Value) -> Result<&Map<String, Value>, FeedError> {
    match raw {
        Value::Array(items) if items.len() == 2 => items[1].as_object().ok_or_else(|| {
            FeedError::Shape(format!("tuple payload is not an object: {}", items[1]))
        }),
        Value::Object(map) => Ok(map),
        other => Err(FeedError::Shape(truncate(&other.to_string()))),
    }
}

fn first_number(payload: &Map<String, Value>, fields: &[&str]) -> Option<f64> {
    fields
        .iter()
        .filter_map(|field| payload.get(*field))
        .find_map(as_number)
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn truncate(text: &str) -> String {
    text.chars().take(120).collect()
}
