// SPDX-License-Identifier: MPL-2.0

//! Periodic polling of a traffic context
//!
//! Each tick fetches counters from a [`CounterSource`], feeds them through the
//! context and hands the resulting sample to a [`RateSink`]. Failed fetches
//! skip the tick. The loop ends when the shutdown flag flips to `true`; a
//! fetch already in flight finishes first.

use crate::source::CounterSource;
use crate::traffic::{RateSample, TrafficContext};
use crate::units::fmt_sample;
use chrono::Utc;
use std::io::Write;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Consumer of computed rate samples (chart, widget, log...).
pub trait RateSink {
    fn on_rate_sample(&mut self, context: &TrafficContext, sample: &RateSample);
}

/// Poll `source` into `context` every `period` until `shutdown` is set.
pub async fn run<S, K>(
    context: &mut TrafficContext,
    source: &mut S,
    sink: &mut K,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    S: CounterSource,
    K: RateSink + ?Sized,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    log::info!("[{}] Polling every {:?}", context.name(), period);

    while !*shutdown.borrow() {
        tokio::select! {
            _ = ticker.tick() => {
                poll_once(context, source, sink).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    log::info!("[{}] Polling stopped", context.name());
}

/// One poll cycle. Returns the sample, or `None` if the fetch failed.
pub async fn poll_once<S, K>(context: &mut TrafficContext, source: &mut S, sink: &mut K) -> Option<RateSample>
where
    S: CounterSource,
    K: RateSink + ?Sized,
{
    let requested = context.selected_interface().map(str::to_owned);
    match source.fetch_counters(requested.as_deref()).await {
        Ok(raw) => {
            let sample = context.ingest(&raw, Utc::now());
            sink.on_rate_sample(context, &sample);
            Some(sample)
        }
        Err(e) => {
            context.skip_cycle(&e);
            None
        }
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Logs each sample at `info`.
#[derive(Debug, Default)]
pub struct LogSink;

impl RateSink for LogSink {
    fn on_rate_sample(&mut self, context: &TrafficContext, sample: &RateSample) {
        log::info!("[{}] {}", context.name(), fmt_sample(sample));
    }
}

/// Writes one JSON object per sample: context, sample, chart history and
/// the interface list.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> RateSink for JsonLinesSink<W> {
    fn on_rate_sample(&mut self, context: &TrafficContext, sample: &RateSample) {
        let line = serde_json::json!({
            "context": context.name(),
            "sample": sample,
            "history": context.history_snapshot(),
            "interfaces": context.interfaces(),
        });
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            log::error!("Failed to write sample: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextConfig;
    use crate::error::TransportError;
    use crate::traffic::RawCounters;
    use std::collections::VecDeque;

    /// Replays scripted results; 503 once the script runs out.
    struct ScriptedSource {
        script: VecDeque<Result<RawCounters, TransportError>>,
        requests: Vec<Option<String>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<RawCounters, TransportError>>) -> Self {
            Self {
                script: script.into(),
                requests: Vec::new(),
            }
        }
    }

    impl CounterSource for ScriptedSource {
        async fn fetch_counters(&mut self, interface: Option<&str>) -> Result<RawCounters, TransportError> {
            self.requests.push(interface.map(str::to_owned));
            self.script.pop_front().unwrap_or(Err(TransportError::Status(503)))
        }
    }

    #[derive(Default)]
    struct RecordingSink(Vec<RateSample>);

    impl RateSink for RecordingSink {
        fn on_rate_sample(&mut self, _context: &TrafficContext, sample: &RateSample) {
            self.0.push(sample.clone());
        }
    }

    fn dump(rx: u64) -> RawCounters {
        RawCounters::Text(format!("eth0: {rx} 0 0 0 0 0 0 0 0 100 0 0 0"))
    }

    #[tokio::test]
    async fn failed_fetch_skips_cycle() {
        let mut context = TrafficContext::new("dashboard", &ContextConfig::dashboard());
        let mut source = ScriptedSource::new(vec![Ok(dump(1000)), Err(TransportError::Status(500))]);
        let mut sink = RecordingSink::default();

        assert!(poll_once(&mut context, &mut source, &mut sink).await.is_some());
        let baseline = context.estimator().baseline().cloned();

        assert!(poll_once(&mut context, &mut source, &mut sink).await.is_none());
        assert_eq!(sink.0.len(), 1);
        assert_eq!(context.estimator().baseline().cloned(), baseline);
    }

    #[tokio::test]
    async fn requests_selected_interface() {
        let mut context = TrafficContext::new("network", &ContextConfig::network());
        context.select_interface("eth0");
        let mut source = ScriptedSource::new(vec![Ok(dump(1))]);
        let mut sink = RecordingSink::default();

        poll_once(&mut context, &mut source, &mut sink).await;
        assert_eq!(source.requests, vec![Some("eth0".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_until_shutdown() {
        let mut context = TrafficContext::new("network", &ContextConfig::network());
        let mut source = ScriptedSource::new(vec![
            Ok(dump(1000)),
            Err(TransportError::Status(502)),
            Ok(dump(2000)),
        ]);
        let mut sink = RecordingSink::default();
        let (tx, rx) = watch::channel(false);

        let stopper = async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            tx.send(true).unwrap();
        };
        tokio::join!(
            run(&mut context, &mut source, &mut sink, Duration::from_secs(5), rx),
            stopper
        );

        // Ticks at 0s, 5s and 10s.
        assert_eq!(source.requests.len(), 3);
        assert_eq!(sink.0.len(), 2);
        assert!(sink.0.iter().all(|s| s.download_rate.is_finite() && s.download_rate >= 0.0));
    }

    #[test]
    fn json_lines_sink_writes_one_object_per_sample() {
        let mut context = TrafficContext::new("dashboard", &ContextConfig::dashboard());
        let sample = context.ingest(&dump(10), Utc::now());
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.on_rate_sample(&context, &sample);
        sink.on_rate_sample(&context, &sample);

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["context"], "dashboard");
        assert_eq!(value["sample"]["interface"], "eth0");
        assert_eq!(value["sample"]["downloadRate"], 0.0);
        assert_eq!(value["history"]["labels"].as_array().unwrap().len(), 0);
        assert_eq!(value["interfaces"][0], "eth0");
    }
}
