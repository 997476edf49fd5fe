//! Response body conversion.
//!
//! A [`Converter<T>`] turns a [`Response`] into a `T`. The
//! [`ConverterRegistry`] keeps one converter per result type, keyed by
//! `TypeId`; registering a second converter for the same type replaces the
//! first.
//!
//! Built-in converters: [`StringConverter`], [`BytesConverter`],
//! [`JsonConverter`] and [`PassthroughConverter`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::http::Response;

/// Errors raised by converters.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Reading the body failed.
    #[error("failed to read response body: {0}")]
    Body(#[from] std::io::Error),

    /// The body is not valid UTF-8.
    #[error("response body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The body is not valid JSON for the target type.
    #[error("failed to decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Converter-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Converts a response into a typed value.
pub trait Converter<T>: Send + Sync {
    fn convert(&self, response: Response) -> Result<T, ConvertError>;
}

impl<T, F> Converter<T> for F
where
    F: Fn(Response) -> Result<T, ConvertError> + Send + Sync,
{
    fn convert(&self, response: Response) -> Result<T, ConvertError> {
        self(response)
    }
}

/// Body as UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl Converter<String> for StringConverter {
    fn convert(&self, response: Response) -> Result<String, ConvertError> {
        Ok(String::from_utf8(response.bytes()?)?)
    }
}

/// Body as raw bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesConverter;

impl Converter<Vec<u8>> for BytesConverter {
    fn convert(&self, response: Response) -> Result<Vec<u8>, ConvertError> {
        Ok(response.bytes()?)
    }
}

/// Body decoded as JSON into any deserializable type.
pub struct JsonConverter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonConverter<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> Converter<T> for JsonConverter<T> {
    fn convert(&self, response: Response) -> Result<T, ConvertError> {
        let bytes = response.bytes()?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// The response itself, body unread.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughConverter;

impl Converter<Response> for PassthroughConverter {
    fn convert(&self, response: Response) -> Result<Response, ConvertError> {
        Ok(response)
    }
}

/// Registry of converters keyed by result type.
pub struct ConverterRegistry {
    converters: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl ConverterRegistry {
    /// Registry with no converters.
    pub fn empty() -> Self {
        Self {
            converters: RwLock::new(HashMap::new()),
        }
    }

    /// Registry with the built-in converters for `String`, `Vec<u8>`,
    /// `serde_json::Value` and `Response`.
    pub fn with_defaults() -> Self {
        let registry = Self::empty();
        registry.register::<String>(Arc::new(StringConverter));
        registry.register::<Vec<u8>>(Arc::new(BytesConverter));
        registry.register::<serde_json::Value>(Arc::new(JsonConverter::<serde_json::Value>::new()));
        registry.register::<Response>(Arc::new(PassthroughConverter));
        registry
    }

    /// Register the converter for `T`, replacing any existing one.
    pub fn register<T: 'static>(&self, converter: Arc<dyn Converter<T>>) {
        self.converters
            .write()
            .insert(TypeId::of::<T>(), Box::new(converter));
    }

    /// Converter registered for `T`.
    pub fn get<T: 'static>(&self) -> Option<Arc<dyn Converter<T>>> {
        self.converters
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<Arc<dyn Converter<T>>>())
            .cloned()
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.converters.read().contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.converters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.read().is_empty()
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("converters", &self.len())
            .finish()
    }
}
