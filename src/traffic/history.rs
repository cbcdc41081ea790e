// SPDX-License-Identifier: MPL-2.0

//! Rolling rate history for the traffic chart

use super::snapshot::RateSample;
use serde::Serialize;

/// Chart length of the dashboard widget.
pub const DASHBOARD_CAPACITY: usize = 20;

/// Chart length of the network-traffic page.
pub const NETWORK_CAPACITY: usize = 30;

/// Fixed-capacity, index-aligned series of labels and rates.
///
/// Oldest entries are evicted first once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    labels: Vec<String>,
    download: Vec<f64>,
    upload: Vec<f64>,
    capacity: usize,
}

/// Borrowed, read-only view of a [`HistoryBuffer`] for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistorySnapshot<'a> {
    pub labels: &'a [String],
    pub download: &'a [f64],
    pub upload: &'a [f64],
}

impl HistoryBuffer {
    /// Create an empty buffer. A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            labels: Vec::with_capacity(capacity + 1),
            download: Vec::with_capacity(capacity + 1),
            upload: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append `sample`, labelled with the local wall-clock time.
    pub fn push(&mut self, sample: &RateSample) {
        let label = chrono::Local::now().format("%H:%M:%S").to_string();
        self.push_at(label, sample);
    }

    /// Append `sample` under an explicit label.
    pub fn push_at(&mut self, label: impl Into<String>, sample: &RateSample) {
        self.labels.push(label.into());
        self.download.push(sample.download_rate);
        self.upload.push(sample.upload_rate);

        if self.labels.len() > self.capacity {
            let excess = self.labels.len() - self.capacity;
            self.labels.drain(..excess);
            self.download.drain(..excess);
            self.upload.drain(..excess);
        }
    }

    /// Clear all three series.
    pub fn reset(&mut self) {
        self.labels.clear();
        self.download.clear();
        self.upload.clear();
    }

    pub fn snapshot(&self) -> HistorySnapshot<'_> {
        HistorySnapshot {
            labels: &self.labels,
            download: &self.download,
            upload: &self.upload,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Highest download and upload rates in the window.
    pub fn peak(&self) -> (f64, f64) {
        let max = |series: &[f64]| series.iter().copied().fold(0.0, f64::max);
        (max(&self.download), max(&self.upload))
    }

    /// Mean download and upload rates in the window, zero when empty.
    pub fn average(&self) -> (f64, f64) {
        if self.is_empty() {
            return (0.0, 0.0);
        }
        let count = self.len() as f64;
        (
            self.download.iter().sum::<f64>() / count,
            self.upload.iter().sum::<f64>() / count,
        )
    }
}
