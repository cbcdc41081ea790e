// SPDX-License-Identifier: MPL-2.0

//! Local `/proc/net/dev` reader

use super::CounterSource;
use crate::error::TransportError;
use crate::traffic::RawCounters;
use std::path::{Path, PathBuf};

/// Reads a `/proc/net/dev`-format file on every poll.
pub struct ProcNetDevSource {
    path: PathBuf,
}

impl ProcNetDevSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CounterSource for ProcNetDevSource {
    // The file always lists every interface; selection happens downstream.
    async fn fetch_counters(&mut self, _interface: Option<&str>) -> Result<RawCounters, TransportError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        Ok(RawCounters::Text(text))
    }
}
