//! Scripted transport used by unit tests.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::{Transport, TransportError};
use crate::http::{Body, Request, Response};

type Handler = Box<dyn FnMut(&Request) -> Result<Response, TransportError> + Send>;

/// Transport that answers each request with the next scripted handler and
/// records every request it sees.
#[derive(Default)]
pub(crate) struct MockTransport {
    script: Mutex<VecDeque<Handler>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a handler for the next request.
    pub fn respond<F>(&self, handler: F) -> &Self
    where
        F: FnMut(&Request) -> Result<Response, TransportError> + Send + 'static,
    {
        self.script.lock().push_back(Box::new(handler));
        self
    }

    /// Queue a response with the given status and body.
    pub fn respond_with(&self, status: u16, body: &[u8]) -> &Self {
        let body = body.to_vec();
        self.respond(move |req| {
            Ok(Response::new(status, req.url.clone())
                .with_method(req.method)
                .with_body(Body::from_bytes(body.clone())))
        })
    }

    /// Queue a redirect to `location`.
    pub fn redirect_to(&self, status: u16, location: &str) -> &Self {
        let location = location.to_string();
        self.respond(move |req| {
            Ok(Response::new(status, req.url.clone()).with_header("Location", location.clone()))
        })
    }

    /// Queue a connection failure.
    pub fn fail(&self) -> &Self {
        self.respond(|req| {
            Err(TransportError::Connect {
                url: req.url.clone(),
                reason: "connection refused".to_string(),
            })
        })
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        self.requests.lock().push(request.clone());
        let handler = self.script.lock().pop_front();
        match handler {
            Some(mut handler) => handler(request),
            None => Err(TransportError::Request {
                url: request.url.clone(),
                reason: "no scripted response".to_string(),
            }),
        }
    }
}
