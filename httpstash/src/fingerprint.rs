//! Request fingerprinting.
//!
//! A fingerprint is the lowercase hex MD5 of the URL, the method name, the
//! headers rendered as `name: value` joined by `,`, and an optional salt.
//! Identical requests always map to the same store key.

use md5::{Digest, Md5};

use crate::http::{Headers, Method, Request};

/// Compute the store key for a request.
///
/// # Arguments
///
/// * `method` - Request method
/// * `url` - Absolute request URL
/// * `headers` - Request headers in insertion order
/// * `salt` - Optional caller-supplied discriminator
pub fn fingerprint(method: Method, url: &str, headers: &Headers, salt: Option<&str>) -> String {
    let mut hasher = Md5::new();
    hasher.update(url.as_bytes());
    hasher.update(method.as_str().as_bytes());
    hasher.update(headers.to_string().as_bytes());
    if let Some(salt) = salt {
        hasher.update(salt.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Fingerprint of a full request.
pub fn request_fingerprint(request: &Request, salt: Option<&str>) -> String {
    fingerprint(request.method, &request.url, &request.headers, salt)
}
