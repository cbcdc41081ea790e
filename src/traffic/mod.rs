// SPDX-License-Identifier: MPL-2.0

//! Throughput core: counter normalization, rate estimation and chart history

pub mod context;
pub mod estimator;
pub mod history;
pub mod normalizer;
pub mod snapshot;

pub use context::TrafficContext;
pub use estimator::{Estimate, RateEstimator, ResetReason};
pub use history::{HistoryBuffer, HistorySnapshot};
pub use normalizer::{normalize, Normalized, RawCounters};
pub use snapshot::{CounterSnapshot, RateSample};
