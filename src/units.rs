// SPDX-License-Identifier: MPL-2.0

//! Human-readable rates

use crate::traffic::RateSample;

/// Bytes per binary kilobyte; the dashboard's KB/s figures use it too.
pub const KIB: f64 = 1_024.0;

const RATE_UNITS: [&str; 4] = ["B/s", "KB/s", "MB/s", "GB/s"];

/// Format bytes per second with a binary unit, e.g. `12.3 KB/s`.
///
/// Bytes are shown whole, gigabytes with two decimals, the rest with one.
/// Anything that is not a finite non-negative number shows as `0 B/s`.
pub fn fmt_rate(bytes_per_sec: f64) -> String {
    let mut value = if bytes_per_sec.is_finite() {
        bytes_per_sec.max(0.0)
    } else {
        0.0
    };
    let mut unit = 0;
    while value >= KIB && unit + 1 < RATE_UNITS.len() {
        value /= KIB;
        unit += 1;
    }

    let precision = match unit {
        0 => 0,
        3 => 2,
        _ => 1,
    };
    format!("{:.*} {}", precision, value, RATE_UNITS[unit])
}

/// One-line summary of a sample: `eth0 ↓ 1.5 KB/s ↑ 250 B/s`.
pub fn fmt_sample(sample: &RateSample) -> String {
    let interface = if sample.interface.is_empty() {
        "-"
    } else {
        sample.interface.as_str()
    };
    format!(
        "{} ↓ {} ↑ {}",
        interface,
        fmt_rate(sample.download_rate),
        fmt_rate(sample.upload_rate)
    )
}
