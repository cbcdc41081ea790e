// SPDX-License-Identifier: MPL-2.0

//! Appliance REST endpoint
//!
//! The appliance answers `GET <url>[?interface=<name>]` with either a JSON
//! document (any of the shapes the normalizer accepts) or a plain-text
//! interface dump. Non-2xx answers and connection failures are transport
//! errors.

use super::CounterSource;
use crate::error::TransportError;
use crate::traffic::RawCounters;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl CounterSource for HttpSource {
    async fn fetch_counters(&mut self, interface: Option<&str>) -> Result<RawCounters, TransportError> {
        let mut request = self.client.get(&self.url);
        if let Some(name) = interface.filter(|name| !name.is_empty()) {
            request = request.query(&[("interface", name)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let declared_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("json"));
        let body = response.text().await?;

        Ok(classify_body(body, declared_json))
    }
}

/// JSON when declared or when it looks like JSON; text otherwise.
fn classify_body(body: String, declared_json: bool) -> RawCounters {
    let trimmed = body.trim_start();
    if declared_json || trimmed.starts_with('{') || trimmed.starts_with('[') {
        match serde_json::from_str(trimmed) {
            Ok(value) => return RawCounters::Json(value),
            Err(e) => log::debug!("Counter response is not valid JSON ({}), treating as text", e),
        }
    }
    RawCounters::Text(body)
}
