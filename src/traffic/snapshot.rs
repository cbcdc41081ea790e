// SPDX-License-Identifier: MPL-2.0

//! Counter snapshots and rate samples
//!
//! A [`CounterSnapshot`] is one reading of an interface's cumulative counters.
//! A [`RateSample`] is what the estimator derives from two of them.

use crate::units::KIB;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Point-in-time reading of cumulative counters for one interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Interface name. Empty means "auto-select" / nothing found.
    pub interface: String,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub packets_received: Option<u64>,
    pub packets_sent: Option<u64>,
    /// Receive + transmit errors
    pub errors: Option<u64>,
    /// Receive + transmit drops
    pub drops: Option<u64>,
    /// When the counters were read. `None` means "when the estimator sees it".
    pub captured_at: Option<DateTime<Utc>>,
}

impl CounterSnapshot {
    /// Zero-valued snapshot carrying only an interface name.
    pub fn empty(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            ..Default::default()
        }
    }

    /// Byte counters only, no capture time.
    pub fn new(interface: impl Into<String>, bytes_received: u64, bytes_sent: u64) -> Self {
        Self {
            interface: interface.into(),
            bytes_received,
            bytes_sent,
            ..Default::default()
        }
    }

    pub fn captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.captured_at = Some(at);
        self
    }

    /// Total bytes in both directions, used for auto-selection.
    pub fn total_bytes(&self) -> u64 {
        self.bytes_received.saturating_add(self.bytes_sent)
    }
}

/// Throughput derived from two snapshots. Rates are bytes per second.
///
/// Every rate is finite and non-negative; the estimator resets to zero rather
/// than emit anything else.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSample {
    pub interface: String,
    pub download_rate: f64,
    pub upload_rate: f64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packets_received_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packets_sent_rate: Option<f64>,
    pub computed_at: DateTime<Utc>,
}

impl RateSample {
    /// Zero-rate sample for `snapshot`, emitted whenever there is no usable baseline.
    pub fn zero(snapshot: &CounterSnapshot, computed_at: DateTime<Utc>) -> Self {
        Self {
            interface: snapshot.interface.clone(),
            download_rate: 0.0,
            upload_rate: 0.0,
            bytes_received: snapshot.bytes_received,
            bytes_sent: snapshot.bytes_sent,
            packets_received_rate: snapshot.packets_received.map(|_| 0.0),
            packets_sent_rate: snapshot.packets_sent.map(|_| 0.0),
            computed_at,
        }
    }

    /// Download rate in KB/s for display.
    pub fn download_kbps(&self) -> f64 {
        self.download_rate / KIB
    }

    /// Upload rate in KB/s for display.
    pub fn upload_kbps(&self) -> f64 {
        self.upload_rate / KIB
    }
}
