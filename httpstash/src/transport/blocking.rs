//! Blocking reqwest implementation of [`Transport`].

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect;
use tracing::trace;

use super::{Transport, TransportError};
use crate::http::{Body, Headers, Method, Request, Response};

/// Default timeout for a single exchange in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Real HTTP transport backed by `reqwest::blocking`.
///
/// Automatic redirects are disabled; the redirect executor owns them.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with the default timeout and no custom user agent.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_options(Duration::from_secs(DEFAULT_TIMEOUT_SECS), None)
    }

    /// Creates a transport with a custom timeout and optional user agent.
    pub fn with_options(timeout: Duration, user_agent: Option<&str>) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none());
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent.to_string());
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self { client })
    }

    fn map_error(url: &str, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
            }
        } else if e.is_connect() {
            TransportError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            }
        } else {
            TransportError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), request.url.as_str());
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let sent_at = now_millis();
        trace!(method = %request.method, url = %request.url, "Sending request");
        let response = builder
            .send()
            .map_err(|e| Self::map_error(&request.url, e))?;
        let received_at = now_millis();

        let status = response.status();
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            headers.append(
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
        let protocol = format!("{:?}", response.version());
        let url = response.url().to_string();
        let content_length = response.content_length();

        Ok(Response::new(status.as_u16(), url)
            .with_message(status.canonical_reason().unwrap_or(""))
            .with_protocol(protocol)
            .with_method(request.method)
            .with_headers(headers)
            .with_timing(sent_at, received_at)
            .with_body(Body::from_reader(response, content_length)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_mapping() {
        assert_eq!(to_reqwest_method(Method::Get), reqwest::Method::GET);
        assert_eq!(to_reqwest_method(Method::Delete), reqwest::Method::DELETE);
        assert_eq!(to_reqwest_method(Method::Patch), reqwest::Method::PATCH);
    }

    #[test]
    fn test_transport_builds() {
        let transport = ReqwestTransport::with_options(Duration::from_secs(5), Some("httpstash-test"));
        assert!(transport.is_ok());
    }

    #[test]
    fn test_connect_failure_is_reported() {
        let transport = ReqwestTransport::with_options(Duration::from_secs(2), None).unwrap();
        // Port 9 on localhost is the discard service and is closed on test hosts.
        let result = transport.execute(&Request::get("http://127.0.0.1:9/"));
        assert!(result.is_err());
    }
}
