// SPDX-License-Identifier: MPL-2.0

//! Throughput estimation
//!
//! [`RateEstimator`] keeps the last accepted snapshot and turns the next one
//! into a [`RateSample`]. It has two states: no baseline, or one baseline.
//! Anything it cannot divide by safely (first sample, interface switch, a
//! clock that did not move forward, a gap longer than the staleness ceiling)
//! sends it back to a fresh baseline and produces a zero-rate sample.
//!
//! Counters that go backwards by more than half their previous value are
//! taken as an interface restart: the new absolute value is the delta.
//! Smaller regressions read as zero.

use super::snapshot::{CounterSnapshot, RateSample};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Fraction of the previous counter a regression must exceed to count as a reset.
const COUNTER_RESET_RATIO: f64 = 0.5;

/// Why an observation produced a zero-rate sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// No baseline yet.
    Initial,
    /// The snapshot belongs to a different interface than the baseline.
    InterfaceChanged,
    /// Elapsed time was non-positive, non-finite or past the staleness ceiling.
    Stale,
}

/// Last accepted snapshot and the time it counts for.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub snapshot: CounterSnapshot,
    pub received_at: DateTime<Utc>,
}

/// Output of [`RateEstimator::observe`].
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub sample: RateSample,
    /// Set when the sample is a zero-rate reset rather than a real measurement.
    pub reset: Option<ResetReason>,
}

impl Estimate {
    pub fn interface_changed(&self) -> bool {
        self.reset == Some(ResetReason::InterfaceChanged)
    }
}

/// Per-context rate estimator state.
#[derive(Debug, Clone)]
pub struct RateEstimator {
    baseline: Option<Baseline>,
    stale_after: Duration,
}

impl RateEstimator {
    /// Create an estimator that distrusts gaps longer than `stale_after`.
    pub fn new(stale_after: Duration) -> Self {
        Self {
            baseline: None,
            stale_after,
        }
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Current baseline, if warm.
    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    /// Drop the baseline. The next observation starts over.
    pub fn reset(&mut self) {
        self.baseline = None;
    }

    /// Feed one snapshot observed at `now`.
    ///
    /// The snapshot's own `captured_at` takes precedence over `now` for the
    /// elapsed-time computation. Never fails; every rate in the returned
    /// sample is finite and non-negative.
    pub fn observe(&mut self, snapshot: CounterSnapshot, now: DateTime<Utc>) -> Estimate {
        let at = snapshot.captured_at.unwrap_or(now);

        let Some(prev) = self.baseline.take() else {
            return self.rebase(snapshot, at, now, ResetReason::Initial);
        };

        if prev.snapshot.interface != snapshot.interface {
            log::debug!(
                "Interface changed from '{}' to '{}', dropping baseline",
                prev.snapshot.interface,
                snapshot.interface
            );
            return self.rebase(snapshot, at, now, ResetReason::InterfaceChanged);
        }

        let elapsed = elapsed_secs(prev.received_at, at);
        if !(elapsed.is_finite() && elapsed > 0.0 && elapsed <= self.stale_after.as_secs_f64()) {
            log::debug!(
                "Unusable interval of {:.3}s on '{}', starting a new baseline",
                elapsed,
                snapshot.interface
            );
            return self.rebase(snapshot, at, now, ResetReason::Stale);
        }

        let prev = &prev.snapshot;
        let packet_rate = |prev: Option<u64>, cur: Option<u64>| {
            prev.zip(cur).map(|(p, c)| rate(counter_delta(p, c), elapsed))
        };

        let sample = RateSample {
            interface: snapshot.interface.clone(),
            download_rate: rate(counter_delta(prev.bytes_received, snapshot.bytes_received), elapsed),
            upload_rate: rate(counter_delta(prev.bytes_sent, snapshot.bytes_sent), elapsed),
            bytes_received: snapshot.bytes_received,
            bytes_sent: snapshot.bytes_sent,
            packets_received_rate: packet_rate(prev.packets_received, snapshot.packets_received),
            packets_sent_rate: packet_rate(prev.packets_sent, snapshot.packets_sent),
            computed_at: now,
        };

        self.baseline = Some(Baseline {
            snapshot,
            received_at: at,
        });

        Estimate {
            sample,
            reset: None,
        }
    }

    fn rebase(
        &mut self,
        snapshot: CounterSnapshot,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
        reason: ResetReason,
    ) -> Estimate {
        let sample = RateSample::zero(&snapshot, now);
        self.baseline = Some(Baseline {
            snapshot,
            received_at: at,
        });
        Estimate {
            sample,
            reset: Some(reason),
        }
    }
}

/// Seconds from `from` to `to`; NaN if the span does not fit.
fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from)
        .num_microseconds()
        .map(|us| us as f64 / 1_000_000.0)
        .unwrap_or(f64::NAN)
}

/// Increase of a cumulative counter, with the restart heuristic applied.
fn counter_delta(prev: u64, cur: u64) -> f64 {
    if cur >= prev {
        return (cur - prev) as f64;
    }
    let regression = (prev - cur) as f64;
    if regression > prev as f64 * COUNTER_RESET_RATIO {
        cur as f64
    } else {
        0.0
    }
}

fn rate(delta: f64, elapsed: f64) -> f64 {
    let value = delta.max(0.0) / elapsed;
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn at(secs: f64) -> DateTime<Utc> {
        t0() + TimeDelta::microseconds((secs * 1_000_000.0) as i64)
    }

    fn estimator() -> RateEstimator {
        RateEstimator::new(Duration::from_secs(300))
    }

    #[test]
    fn first_observation_is_zero_and_warms_up() {
        let mut est = estimator();
        let out = est.observe(CounterSnapshot::new("eth0", 1000, 200), t0());
        assert_eq!(out.reset, Some(ResetReason::Initial));
        assert_eq!(out.sample.download_rate, 0.0);
        assert_eq!(out.sample.upload_rate, 0.0);
        assert_eq!(out.sample.bytes_received, 1000);
        assert_eq!(est.baseline().unwrap().received_at, t0());
    }

    #[test]
    fn two_second_interval() {
        let mut est = estimator();
        est.observe(CounterSnapshot::new("eth0", 1000, 200), at(0.0));
        let out = est.observe(CounterSnapshot::new("eth0", 3000, 700), at(2.0));
        assert_eq!(out.reset, None);
        assert!((out.sample.download_rate - 1000.0).abs() < 1e-9);
        assert!((out.sample.upload_rate - 250.0).abs() < 1e-9);
        assert_eq!(out.sample.bytes_sent, 700);
    }

    #[test]
    fn capture_time_wins_over_receipt_time() {
        let mut est = estimator();
        est.observe(CounterSnapshot::new("eth0", 0, 0).captured_at(at(0.0)), at(10.0));
        let out = est.observe(CounterSnapshot::new("eth0", 4000, 0).captured_at(at(4.0)), at(10.5));
        assert!((out.sample.download_rate - 1000.0).abs() < 1e-9);
        assert_eq!(out.sample.computed_at, at(10.5));
    }

    #[test]
    fn zero_elapsed_resets_to_new_baseline() {
        let mut est = estimator();
        est.observe(CounterSnapshot::new("eth0", 1000, 200), at(0.0));
        let second = CounterSnapshot::new("eth0", 3000, 700);
        let out = est.observe(second.clone(), at(0.0));
        assert_eq!(out.reset, Some(ResetReason::Stale));
        assert_eq!(out.sample.download_rate, 0.0);
        assert_eq!(out.sample.upload_rate, 0.0);
        assert_eq!(est.baseline().unwrap().snapshot, second);
    }

    #[test]
    fn late_result_and_long_gap_reset() {
        let mut est = estimator();
        est.observe(CounterSnapshot::new("eth0", 1000, 0), at(10.0));

        let out = est.observe(CounterSnapshot::new("eth0", 900, 0), at(5.0));
        assert_eq!(out.reset, Some(ResetReason::Stale));

        let out = est.observe(CounterSnapshot::new("eth0", 5000, 0), at(5.0 + 301.0));
        assert_eq!(out.reset, Some(ResetReason::Stale));
        assert_eq!(out.sample.download_rate, 0.0);

        // Exactly at the ceiling is still trusted.
        let out = est.observe(CounterSnapshot::new("eth0", 5300, 0), at(5.0 + 301.0 + 300.0));
        assert_eq!(out.reset, None);
        assert!((out.sample.download_rate - 1.0).abs() < 1e-9);
    }

    #[test]
    fn interface_switch_discards_baseline() {
        let mut est = estimator();
        est.observe(CounterSnapshot::new("eth0", 1000, 1000), at(0.0));
        let out = est.observe(CounterSnapshot::new("wlan0", 9000, 9000), at(1.0));
        assert!(out.interface_changed());
        assert_eq!(out.sample.interface, "wlan0");
        assert_eq!(out.sample.download_rate, 0.0);
        assert_eq!(est.baseline().unwrap().snapshot.interface, "wlan0");
    }

    #[test]
    fn large_regression_is_counter_reset() {
        let mut est = estimator();
        est.observe(CounterSnapshot::new("eth0", 10_000_000, 10_000_000), at(0.0));
        let out = est.observe(CounterSnapshot::new("eth0", 500, 10_000_000), at(2.0));
        assert!((out.sample.download_rate - 250.0).abs() < 1e-9);
        assert_eq!(out.sample.upload_rate, 0.0);
    }

    #[test]
    fn small_regression_reads_as_zero() {
        let mut est = estimator();
        est.observe(CounterSnapshot::new("eth0", 1000, 1000), at(0.0));
        let out = est.observe(CounterSnapshot::new("eth0", 900, 1000), at(1.0));
        assert_eq!(out.sample.download_rate, 0.0);
        assert_eq!(out.reset, None);
    }

    #[test]
    fn packet_rates_need_both_snapshots() {
        let mut est = estimator();
        let mut first = CounterSnapshot::new("eth0", 0, 0);
        first.packets_received = Some(10);
        est.observe(first, at(0.0));

        let mut second = CounterSnapshot::new("eth0", 0, 0);
        second.packets_received = Some(30);
        second.packets_sent = Some(4);
        let out = est.observe(second, at(2.0));
        assert_eq!(out.sample.packets_received_rate, Some(10.0));
        assert_eq!(out.sample.packets_sent_rate, None);
    }

    #[test]
    fn monotonic_counters_give_exact_rates() {
        let mut est = estimator();
        let mut rx = 0u64;
        let mut t = 0.0;
        est.observe(CounterSnapshot::new("eth0", rx, 0), at(t));
        for step in 1..50u64 {
            let prev = rx;
            rx += step * 7919;
            let dt = 0.25 * step as f64;
            t += dt;
            let out = est.observe(CounterSnapshot::new("eth0", rx, 0), at(t));
            let expected = (rx - prev) as f64 / dt;
            assert!((out.sample.download_rate - expected).abs() <= expected * 1e-9);
        }
    }

    #[test]
    fn rates_are_always_finite_and_non_negative() {
        let mut est = RateEstimator::new(Duration::from_secs(60));
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        let names = ["eth0", "eth0", "eth0", "wlan0"];
        for _ in 0..2000 {
            let roll = next();
            let counter = match roll % 4 {
                0 => 0,
                1 => u64::MAX,
                2 => roll >> 40,
                _ => roll,
            };
            let offset_us = (next() % 200_000_000) as i64 - 20_000_000;
            let snapshot = CounterSnapshot::new(names[(roll % 4) as usize], counter, next());
            let out = est.observe(snapshot, t0() + TimeDelta::microseconds(offset_us));
            for value in [out.sample.download_rate, out.sample.upload_rate] {
                assert!(value.is_finite() && value >= 0.0, "bad rate {value}");
            }
        }
    }
}
