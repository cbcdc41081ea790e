// SPDX-License-Identifier: MPL-2.0

//! Counter normalization
//!
//! Counter sources hand back whatever shape they have: a list of structured
//! snapshots, a JSON payload from the appliance API, or a textual
//! `/proc/net/dev`-style dump. [`normalize`] turns any of those into a single
//! [`CounterSnapshot`] for the selected interface, plus the names of every
//! interface it saw so a selector can be populated.
//!
//! # Text dumps
//!
//! One interface per line, `name: counters...`. Header and blank lines are
//! skipped. The receive block starts at the first counter, the transmit block
//! at counter index 9 unless a `/proc/net/dev` header says otherwise:
//!
//! ```text
//! Inter-|   Receive                                                |  Transmit
//!  face |bytes    packets errs drop fifo frame compressed multicast|bytes ...
//!   eth0:  500      10    0    0    0     0          0         0   1200 ...
//! ```
//!
//! Nothing here fails. Unknown shapes and garbage fields come out as zeros.

use super::snapshot::CounterSnapshot;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

/// Name of the loopback interface, never reported.
pub const LOOPBACK: &str = "lo";

/// Longest interface name accepted from a text dump.
pub const MAX_NAME_LEN: usize = 20;

/// Minimum whitespace-separated fields (name included) for a text record.
pub const MIN_RECORD_FIELDS: usize = 10;

/// Counter index where the transmit block starts when no header says otherwise.
pub const DEFAULT_TX_OFFSET: usize = 9;

/// Keys under which appliance responses wrap their payload.
const WRAPPER_KEYS: &[&str] = &["data", "interfaces", "stats", "result"];

const NAME_KEYS: &[&str] = &["interface", "iface", "ifname", "name"];
const RX_BYTES_KEYS: &[&str] = &["bytesReceived", "bytes_received", "bytes_recv", "rx_bytes", "rxBytes"];
const TX_BYTES_KEYS: &[&str] = &["bytesSent", "bytes_sent", "tx_bytes", "txBytes"];
const RX_PACKETS_KEYS: &[&str] = &["packetsReceived", "packets_received", "packets_recv", "rx_packets", "rxPackets"];
const TX_PACKETS_KEYS: &[&str] = &["packetsSent", "packets_sent", "tx_packets", "txPackets"];
const ERROR_PAIRS: &[(&str, &str)] = &[("errin", "errout"), ("rx_errors", "tx_errors"), ("errorsReceived", "errorsSent")];
const DROP_PAIRS: &[(&str, &str)] = &[("dropin", "dropout"), ("rx_dropped", "tx_dropped"), ("dropsReceived", "dropsSent")];
const TIME_KEYS: &[&str] = &["capturedAt", "captured_at", "timestamp"];

// ============================================================================
// Public types
// ============================================================================

/// Raw reading as returned by a counter source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCounters {
    /// Already-structured snapshots, one per interface.
    Snapshots(Vec<CounterSnapshot>),
    /// JSON payload from the appliance API.
    Json(Value),
    /// Multi-interface textual dump.
    Text(String),
}

/// Result of normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// Counters of the selected interface.
    pub snapshot: CounterSnapshot,
    /// Every interface discovered in the input, in input order.
    pub interfaces: Vec<String>,
    /// `false` when `snapshot` is a zero-valued placeholder: the requested
    /// interface was absent, or the input held no records at all.
    pub found: bool,
}

// ============================================================================
// Entry point
// ============================================================================

/// Normalize `raw` and pick the interface to report.
///
/// With `requested` set (and non-empty) only that interface is ever returned;
/// if it is missing the snapshot is zero-valued but still carries the
/// requested name. Otherwise the first interface with traffic wins, falling
/// back to the first interface seen.
pub fn normalize(raw: &RawCounters, requested: Option<&str>) -> Normalized {
    let records = match raw {
        RawCounters::Snapshots(list) => list
            .iter()
            .filter(|s| s.interface != LOOPBACK)
            .cloned()
            .collect(),
        RawCounters::Json(value) => json_records(value),
        RawCounters::Text(text) => parse_text(text),
    };

    select(records, requested.filter(|name| !name.is_empty()))
}

fn select(records: Vec<CounterSnapshot>, requested: Option<&str>) -> Normalized {
    let mut interfaces: Vec<String> = Vec::with_capacity(records.len());
    for record in &records {
        if !record.interface.is_empty() && !interfaces.contains(&record.interface) {
            interfaces.push(record.interface.clone());
        }
    }

    let chosen = match requested {
        Some(name) => match records.iter().find(|r| r.interface == name) {
            Some(found) => Some(found.clone()),
            // A lone unnamed object is the answer for whatever was asked.
            None if records.len() == 1 && records[0].interface.is_empty() => Some(CounterSnapshot {
                interface: name.to_string(),
                ..records[0].clone()
            }),
            None => None,
        },
        None => records
            .iter()
            .find(|r| r.total_bytes() > 0)
            .or_else(|| records.first())
            .cloned(),
    };

    let found = chosen.is_some();
    let snapshot = chosen.unwrap_or_else(|| CounterSnapshot::empty(requested.unwrap_or_default()));

    Normalized {
        snapshot,
        interfaces,
        found,
    }
}

// ============================================================================
// Text dumps
// ============================================================================

/// Parse every valid interface record from a textual dump.
pub fn parse_text(text: &str) -> Vec<CounterSnapshot> {
    let mut tx_offset = DEFAULT_TX_OFFSET;
    let mut records = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // Header rows are the only lines with column separators.
        if line.contains('|') {
            if let Some(offset) = header_tx_offset(line) {
                tx_offset = offset;
            }
            continue;
        }
        if let Some(record) = parse_record(line, tx_offset) {
            records.push(record);
        }
    }

    records
}

/// Number of receive columns named by a `/proc/net/dev` column header.
fn header_tx_offset(line: &str) -> Option<usize> {
    let mut sections = line.split('|');
    let _face = sections.next()?;
    let receive = sections.next()?;
    sections.next()?;
    if !receive.contains("bytes") {
        return None;
    }
    let columns = receive.split_whitespace().count();
    (columns > 0).then_some(columns)
}

fn parse_record(line: &str, tx_offset: usize) -> Option<CounterSnapshot> {
    let (name, rest) = match line.split_once(':') {
        Some((name, rest)) => (name.trim(), rest),
        None => {
            let mut parts = line.splitn(2, char::is_whitespace);
            (parts.next()?, parts.next().unwrap_or(""))
        }
    };

    let counters: Vec<&str> = rest.split_whitespace().collect();
    if counters.len() + 1 < MIN_RECORD_FIELDS || !is_valid_name(name) {
        return None;
    }
    // Column headers without separators (`Interface RxBytes ...`) have words
    // where the byte counters belong.
    let numeric = |index: usize| counters.get(index).is_none_or(|s| s.parse::<f64>().is_ok());
    if !numeric(0) || !numeric(tx_offset) {
        return None;
    }

    let field = |index: usize| counters.get(index).map(|s| coerce_str(s));

    Some(CounterSnapshot {
        interface: name.to_string(),
        bytes_received: field(0).unwrap_or(0),
        packets_received: field(1),
        bytes_sent: field(tx_offset).unwrap_or(0),
        packets_sent: field(tx_offset + 1),
        errors: sum_present(field(2), field(tx_offset + 2)),
        drops: sum_present(field(3), field(tx_offset + 3)),
        captured_at: None,
    })
}

/// `[A-Za-z0-9_-]+`, not loopback, at most [`MAX_NAME_LEN`] characters.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name != LOOPBACK
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

// ============================================================================
// JSON payloads
// ============================================================================

fn json_records(value: &Value) -> Vec<CounterSnapshot> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_object)
            .filter(|map| has_counters(map))
            .map(|map| object_record(map, None))
            .filter(|s| s.interface != LOOPBACK)
            .collect(),
        Value::Object(map) => {
            if has_counters(map) {
                return vec![object_record(map, None)];
            }
            if let Some(inner) = WRAPPER_KEYS.iter().find_map(|key| map.get(*key)) {
                return json_records(inner);
            }
            // `{ "eth0": {...}, "wlan0": {...} }`
            map.iter()
                .filter(|(name, _)| name.as_str() != LOOPBACK)
                .filter_map(|(name, inner)| {
                    let inner = inner.as_object()?;
                    has_counters(inner).then(|| object_record(inner, Some(name.as_str())))
                })
                .collect()
        }
        Value::String(text) => parse_text(text),
        _ => Vec::new(),
    }
}

fn has_counters(map: &Map<String, Value>) -> bool {
    RX_BYTES_KEYS
        .iter()
        .chain(TX_BYTES_KEYS)
        .any(|key| map.contains_key(*key))
}

fn object_record(map: &Map<String, Value>, key_name: Option<&str>) -> CounterSnapshot {
    let interface = lookup(map, NAME_KEYS)
        .and_then(Value::as_str)
        .or(key_name)
        .unwrap_or_default()
        .to_string();

    CounterSnapshot {
        interface,
        bytes_received: counter(map, RX_BYTES_KEYS).unwrap_or(0),
        bytes_sent: counter(map, TX_BYTES_KEYS).unwrap_or(0),
        packets_received: counter(map, RX_PACKETS_KEYS),
        packets_sent: counter(map, TX_PACKETS_KEYS),
        errors: counter(map, &["errors"]).or_else(|| paired(map, ERROR_PAIRS)),
        drops: counter(map, &["drops"]).or_else(|| paired(map, DROP_PAIRS)),
        captured_at: lookup(map, TIME_KEYS).and_then(timestamp),
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| map.get(*key))
}

fn counter(map: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    lookup(map, keys).map(coerce_value)
}

fn paired(map: &Map<String, Value>, pairs: &[(&str, &str)]) -> Option<u64> {
    pairs.iter().find_map(|(rx, tx)| {
        sum_present(map.get(*rx).map(coerce_value), map.get(*tx).map(coerce_value))
    })
}

/// RFC 3339 string, or a Unix time in seconds (milliseconds if it is that large).
fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => {
            let secs = n.as_f64().filter(|v| v.is_finite() && *v > 0.0)?;
            let millis = if secs >= 1e12 { secs } else { secs * 1000.0 };
            Utc.timestamp_millis_opt(millis as i64).single()
        }
        _ => None,
    }
}

// ============================================================================
// Coercion
// ============================================================================

/// Counter value from JSON. Negative, non-finite and non-numeric become 0.
pub fn coerce_value(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(coerce_float))
            .unwrap_or(0),
        Value::String(s) => coerce_str(s),
        _ => 0,
    }
}

/// Counter value from text. Same rules as [`coerce_value`].
pub fn coerce_str(s: &str) -> u64 {
    let s = s.trim();
    s.parse::<u64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().map(coerce_float))
        .unwrap_or(0)
}

fn coerce_float(v: f64) -> u64 {
    if v.is_finite() && v > 0.0 {
        // `as` saturates at u64::MAX
        v.trunc() as u64
    } else {
        0
    }
}

fn sum_present(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0).saturating_add(b.unwrap_or(0))),
    }
}
