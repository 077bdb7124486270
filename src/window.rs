//! Bounded time-window sample store.
//!
//! `SampleWindow` keeps the samples observed during the last [`HORIZON_MINUTES`]
//! in insertion order. Both the proxy server and the client hold one. The
//! server appends every fetched quote, the client applies the debounce rule
//! first and can restore itself from a persisted snapshot.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Sample;

/// Retention horizon shared by the server and the client.
pub const HORIZON_MINUTES: i64 = 180;

/// Minimum change, in GWEI, in at least one tier for the client to keep a new sample.
pub const DEBOUNCE_GWEI: f64 = 1.0;

pub fn horizon() -> Duration {
    Duration::minutes(HORIZON_MINUTES)
}

#[derive(thiserror::Error, Debug)]
pub enum PersistedStateError {
    #[error("malformed persisted window: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Durable form of the client window: save time in epoch millis plus the samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedWindow {
    pub timestamp: i64,
    pub data: Vec<Sample>,
}

impl PersistedWindow {
    pub fn parse(raw: &str) -> Result<Self, PersistedStateError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Age of the snapshot relative to `now`, `None` when the saved
    /// timestamp is too far out to express as a duration.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        let millis = now.timestamp_millis().checked_sub(self.timestamp)?;
        Duration::try_milliseconds(millis)
    }
}

#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: Vec<Sample>,
    horizon: Duration,
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleWindow {
    pub fn new() -> Self {
        Self::with_horizon(horizon())
    }

    pub fn with_horizon(horizon: Duration) -> Self {
        Self {
            samples: Vec::new(),
            horizon,
        }
    }

    pub fn horizon(&self) -> Duration {
        self.horizon
    }

    pub fn append(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Appends `sample` and evicts against `now` in one step.
    /// Returns how many samples were evicted.
    pub fn record(&mut self, sample: Sample, now: DateTime<Utc>) -> usize {
        self.append(sample);
        self.evict(now)
    }

    /// Appends `sample` unless every tier is within [`DEBOUNCE_GWEI`] of the last retained sample.
    pub fn append_if_changed(&mut self, sample: Sample) -> bool {
        if let Some(last) = self.samples.last() {
            if !differs(last, &sample) {
                return false;
            }
        }
        self.samples.push(sample);
        true
    }

    /// Drops every sample older than `now - horizon`. Returns how many were dropped.
    pub fn evict(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.horizon;
        let before = self.samples.len();
        self.samples.retain(|s| s.timestamp >= cutoff);
        let evicted = before - self.samples.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.samples.len(), "evicted expired samples");
        }
        evicted
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.clone()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn persist(&self, now: DateTime<Utc>) -> PersistedWindow {
        PersistedWindow {
            timestamp: now.timestamp_millis(),
            data: self.snapshot(),
        }
    }

    /// Replaces the window with the persisted samples if the snapshot was saved
    /// less than one horizon before `now`, otherwise leaves it empty.
    /// Samples are taken as-is, without a per-sample age check.
    pub fn restore(&mut self, persisted: PersistedWindow, now: DateTime<Utc>) -> bool {
        self.samples.clear();
        match persisted.age(now) {
            Some(age) if age < self.horizon => {
                self.samples = persisted.data;
                true
            }
            Some(_) => false,
            None => {
                tracing::warn!(
                    saved_at = persisted.timestamp,
                    "ignoring stored gas data with out of range timestamp"
                );
                false
            }
        }
    }

    /// Like [`SampleWindow::restore`] but from the raw stored record.
    /// Malformed records are logged and treated as no prior data.
    pub fn restore_json(&mut self, raw: &str, now: DateTime<Utc>) -> bool {
        match PersistedWindow::parse(raw) {
            Ok(persisted) => self.restore(persisted, now),
            Err(err) => {
                tracing::warn!("ignoring stored gas data: {}", err);
                self.samples.clear();
                false
            }
        }
    }
}

fn differs(prev: &Sample, next: &Sample) -> bool {
    (next.low - prev.low).abs() >= DEBOUNCE_GWEI
        || (next.average - prev.average).abs() >= DEBOUNCE_GWEI
        || (next.high - prev.high).abs() >= DEBOUNCE_GWEI
}
