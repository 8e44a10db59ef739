//! Codec Module
//!
//! Pluggable value encoding for caches that store bytes.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{CacheError, Result};

// == Codec Trait ==
/// Turns values into bytes and back.
pub trait Codec<V>: Send + Sync {
    /// Encodes a value into its stored form.
    fn encode(&self, value: &V) -> Result<Vec<u8>>;

    /// Decodes a stored payload back into a value.
    fn decode(&self, bytes: &[u8]) -> Result<V>;
}

// == JSON Codec ==
/// Encodes any serde value as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<V> Codec<V> for JsonCodec
where
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(CacheError::codec)
    }

    fn decode(&self, bytes: &[u8]) -> Result<V> {
        serde_json::from_slice(bytes).map_err(CacheError::codec)
    }
}

// == Raw Codec ==
/// Stores strings and byte buffers as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl Codec<String> for RawCodec {
    fn encode(&self, value: &String) -> Result<Vec<u8>> {
        Ok(value.as_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(CacheError::codec)
    }
}

impl Codec<Vec<u8>> for RawCodec {
    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}
