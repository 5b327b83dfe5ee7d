use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Deterministic cache key derived from a namespace and call arguments
///
/// Positional arguments keep their order; named arguments are sorted by
/// name, so the order in which they are added does not matter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Starts a key for the given logical namespace
    ///
    /// # Example
    ///
    /// ```
    /// use vlr_harvest::CacheKey;
    ///
    /// let a = CacheKey::builder("results").arg(5).arg(None::<u32>).build();
    /// let b = CacheKey::builder("results").arg(5).arg(None::<u32>).build();
    /// assert_eq!(a, b);
    /// ```
    pub fn builder(namespace: &str) -> CacheKeyBuilder {
        CacheKeyBuilder {
            args: vec![Value::from(namespace)],
            named: BTreeMap::new(),
        }
    }

    /// Hex-encoded SHA-256 digest identifying the entry
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accumulates the parts of a [`CacheKey`]
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    args: Vec<Value>,
    named: BTreeMap<String, Value>,
}

impl CacheKeyBuilder {
    /// Appends a positional argument
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Sets a named argument
    pub fn named(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.named.insert(name.to_string(), value.into());
        self
    }

    pub fn build(self) -> CacheKey {
        let raw = json!({ "a": self.args, "k": self.named }).to_string();
        let mut hasher = Sha256::new();
        hasher.update(raw.as_bytes());
        CacheKey(hex::encode(hasher.finalize()))
    }
}
