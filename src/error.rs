// SPDX-License-Identifier: MPL-2.0

//! Errors surfaced by counter sources

/// A counter fetch that produced no reading this cycle.
///
/// Never fatal: the poll cycle is skipped and retried on the next tick.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
