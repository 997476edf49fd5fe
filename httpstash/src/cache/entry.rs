//! On-disk entry layout.
//!
//! Each entry is a directory named after its key holding three files:
//!
//! ```text
//! <key>/metadata.json   status line, timing and headers
//! <key>/body            raw body bytes
//! <key>/timestamp       store time in epoch milliseconds
//! ```

use serde::{Deserialize, Serialize};

use crate::http::{Body, Headers, Response};

pub(crate) const METADATA_FILE: &str = "metadata.json";
pub(crate) const BODY_FILE: &str = "body";
pub(crate) const TIMESTAMP_FILE: &str = "timestamp";

/// One header line in `metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct HeaderRecord {
    pub name: String,
    pub value: String,
}

/// Serialized response metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EntryMetadata {
    pub code: u16,
    pub method: String,
    pub message: String,
    pub protocol: String,
    #[serde(default)]
    pub url: String,
    pub sent_request_at_millis: i64,
    pub received_response_at_millis: i64,
    pub response_headers: Vec<HeaderRecord>,
}

impl EntryMetadata {
    pub fn from_response(response: &Response) -> Self {
        Self {
            code: response.status,
            method: response.method.as_str().to_string(),
            message: response.message.clone(),
            protocol: response.protocol.clone(),
            url: response.url.clone(),
            sent_request_at_millis: response.sent_at_millis,
            received_response_at_millis: response.received_at_millis,
            response_headers: response
                .headers
                .iter()
                .map(|(name, value)| HeaderRecord {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    /// Rebuild a response around a stored body.
    ///
    /// Fails with a description when the stored method is unknown.
    pub fn into_response(self, body: Body) -> Result<Response, String> {
        let method = self.method.parse()?;
        let headers: Headers = self
            .response_headers
            .into_iter()
            .map(|h| (h.name, h.value))
            .collect();

        Ok(Response::new(self.code, self.url)
            .with_message(self.message)
            .with_protocol(self.protocol)
            .with_method(method)
            .with_headers(headers)
            .with_timing(self.sent_request_at_millis, self.received_response_at_millis)
            .with_body(body))
    }
}
