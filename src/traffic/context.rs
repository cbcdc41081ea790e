// SPDX-License-Identifier: MPL-2.0

//! One traffic view: estimator, chart history and interface selection
//!
//! The dashboard widget and the network-traffic page each own a
//! [`TrafficContext`]. Nothing is shared between them.

use super::estimator::{RateEstimator, ResetReason};
use super::history::{HistoryBuffer, HistorySnapshot};
use super::normalizer::{normalize, RawCounters};
use super::snapshot::RateSample;
use crate::config::ContextConfig;
use crate::error::TransportError;
use chrono::{DateTime, Utc};

pub struct TrafficContext {
    /// Label used in logs ("dashboard", "network")
    name: String,
    /// Explicitly selected interface; `None` means auto-select
    selected: Option<String>,
    estimator: RateEstimator,
    history: HistoryBuffer,
    /// Interfaces seen in the last successful cycle, for the selector
    interfaces: Vec<String>,
}

impl TrafficContext {
    pub fn new(name: impl Into<String>, config: &ContextConfig) -> Self {
        Self {
            name: name.into(),
            selected: config.interface.clone().filter(|i| !i.is_empty()),
            estimator: RateEstimator::new(config.stale_after()),
            history: HistoryBuffer::new(config.history_capacity),
            interfaces: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selected_interface(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Select the interface to observe. An empty name returns to auto-select.
    ///
    /// A change of selection drops the estimator baseline and the chart.
    pub fn select_interface(&mut self, name: &str) {
        let next = (!name.is_empty()).then(|| name.to_string());
        if next == self.selected {
            return;
        }
        log::info!(
            "[{}] Interface selection changed: {} -> {}",
            self.name,
            self.selected.as_deref().unwrap_or("auto"),
            next.as_deref().unwrap_or("auto")
        );
        self.selected = next;
        self.estimator.reset();
        self.history.reset();
    }

    /// Run one successful poll cycle.
    ///
    /// Only real measurements go into the history; zero-rate resets do not.
    /// An implicit interface change (auto-select picked another one) clears
    /// the chart just like an explicit selection does.
    ///
    /// A reading without the wanted interface (or without any interface)
    /// yields a zero-rate sample and leaves baseline and chart alone, so the
    /// next good reading is measured against the last real one.
    pub fn ingest(&mut self, raw: &RawCounters, now: DateTime<Utc>) -> RateSample {
        let normalized = normalize(raw, self.selected.as_deref());
        if !normalized.interfaces.is_empty() {
            self.interfaces = normalized.interfaces;
        }

        if !normalized.found {
            log::debug!(
                "[{}] No counters for '{}' in this reading",
                self.name,
                self.selected.as_deref().unwrap_or("auto")
            );
            return RateSample::zero(&normalized.snapshot, now);
        }

        let estimate = self.estimator.observe(normalized.snapshot, now);
        match estimate.reset {
            None => self.history.push(&estimate.sample),
            Some(ResetReason::InterfaceChanged) => {
                log::info!(
                    "[{}] Now observing '{}', clearing history",
                    self.name,
                    estimate.sample.interface
                );
                self.history.reset();
            }
            Some(reason) => {
                log::debug!("[{}] Estimator reset: {:?}", self.name, reason);
            }
        }

        estimate.sample
    }

    /// Record a failed fetch. State is left exactly as it was.
    pub fn skip_cycle(&self, error: &TransportError) {
        log::warn!("[{}] Skipping poll cycle: {}", self.name, error);
    }

    pub fn history_snapshot(&self) -> HistorySnapshot<'_> {
        self.history.snapshot()
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn estimator(&self) -> &RateEstimator {
        &self.estimator
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }
}
