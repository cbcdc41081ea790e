// SPDX-License-Identifier: MPL-2.0

//! Counter sources
//!
//! A source returns one raw reading per call. It does not interpret it; that
//! is the normalizer's job. A failed fetch is a [`TransportError`] and costs
//! one poll cycle, nothing more.

pub mod host;
pub mod http;
pub mod proc;

pub use self::host::SysinfoSource;
pub use self::http::HttpSource;
pub use self::proc::ProcNetDevSource;

use crate::config::SourceConfig;
use crate::error::TransportError;
use crate::traffic::RawCounters;
use std::future::Future;
use std::time::Duration;

/// Something that can be asked for the current interface counters.
pub trait CounterSource {
    /// Fetch counters, preferably for `interface` (`None` = all / auto).
    fn fetch_counters(
        &mut self,
        interface: Option<&str>,
    ) -> impl Future<Output = Result<RawCounters, TransportError>> + Send;
}

/// Source chosen at runtime from the configuration.
pub enum Source {
    Http(HttpSource),
    ProcNetDev(ProcNetDevSource),
    Sysinfo(SysinfoSource),
}

impl Source {
    pub fn from_config(config: &SourceConfig) -> Result<Self, TransportError> {
        Ok(match config {
            SourceConfig::Http { url, timeout_ms } => {
                Self::Http(HttpSource::new(url.clone(), Duration::from_millis(*timeout_ms))?)
            }
            SourceConfig::ProcNetDev { path } => Self::ProcNetDev(ProcNetDevSource::new(path.clone())),
            SourceConfig::Sysinfo => Self::Sysinfo(SysinfoSource::new()),
        })
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Http(source) => format!("http {}", source.url()),
            Self::ProcNetDev(source) => format!("file {}", source.path().display()),
            Self::Sysinfo(_) => "sysinfo".to_string(),
        }
    }
}

impl CounterSource for Source {
    async fn fetch_counters(&mut self, interface: Option<&str>) -> Result<RawCounters, TransportError> {
        match self {
            Self::Http(source) => source.fetch_counters(interface).await,
            Self::ProcNetDev(source) => source.fetch_counters(interface).await,
            Self::Sysinfo(source) => source.fetch_counters(interface).await,
        }
    }
}
