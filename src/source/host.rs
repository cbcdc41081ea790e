// SPDX-License-Identifier: MPL-2.0

//! Host interface counters via sysinfo

use super::CounterSource;
use crate::error::TransportError;
use crate::traffic::{CounterSnapshot, RawCounters};
use chrono::Utc;
use sysinfo::Networks;

/// Reads cumulative per-interface totals from the local network stack.
pub struct SysinfoSource {
    networks: Networks,
}

impl SysinfoSource {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }

    /// Refresh and snapshot every interface, sorted by name.
    pub fn snapshots(&mut self) -> Vec<CounterSnapshot> {
        self.networks.refresh();

        let now = Utc::now();
        let mut snapshots: Vec<CounterSnapshot> = (&self.networks)
            .into_iter()
            .map(|(interface_name, network)| CounterSnapshot {
                interface: interface_name.clone(),
                // total_* are cumulative; received()/transmitted() are per-refresh deltas
                bytes_received: network.total_received(),
                bytes_sent: network.total_transmitted(),
                packets_received: Some(network.total_packets_received()),
                packets_sent: Some(network.total_packets_transmitted()),
                errors: Some(
                    network
                        .total_errors_on_received()
                        .saturating_add(network.total_errors_on_transmitted()),
                ),
                drops: None,
                captured_at: Some(now),
            })
            .collect();

        snapshots.sort_by(|a, b| a.interface.cmp(&b.interface));
        snapshots
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSource for SysinfoSource {
    async fn fetch_counters(&mut self, _interface: Option<&str>) -> Result<RawCounters, TransportError> {
        Ok(RawCounters::Snapshots(self.snapshots()))
    }
}
