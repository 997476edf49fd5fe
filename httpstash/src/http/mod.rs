//! Transport-neutral HTTP types.
//!
//! Requests and responses are owned values so they can be replayed from the
//! response store, re-issued on redirects, and moved across worker threads.

mod headers;
mod request;
mod response;

pub use headers::Headers;
pub use request::{Method, Request};
pub use response::{Body, Response, FROM_CACHE_HEADER};
