// SPDX-License-Identifier: MPL-2.0

//! Network throughput estimation for appliance dashboards
//!
//! Turns cumulative interface counters, sampled at irregular intervals, into
//! download/upload rates and a bounded history for a live chart.
//!
//! - [`traffic`]: normalizer, rate estimator, history buffer and the
//!   per-view [`traffic::TrafficContext`] tying them together
//! - [`source`]: where counters come from (appliance API, `/proc/net/dev`, sysinfo)
//! - [`poller`]: the periodic task driving a context and its sinks

pub mod config;
pub mod error;
pub mod poller;
pub mod source;
pub mod traffic;
pub mod units;

pub use config::Config;
pub use error::TransportError;
