//! Blake3 hashing utilities for deterministic content identity.
//!
//! Build targets are identified by a structural hash over their ordered
//! fields. Every field is length-prefixed so that `["ab", "c"]` and
//! `["a", "bc"]` never collide.

/// Incremental structural hasher
#[derive(Debug, Default)]
pub struct ContentHasher {
    hasher: blake3::Hasher,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one length-prefixed field
    pub fn field(&mut self, value: &str) -> &mut Self {
        self.hasher.update(&(value.len() as u64).to_le_bytes());
        self.hasher.update(value.as_bytes());
        self
    }

    /// Feed an ordered list of fields, prefixed with its length
    pub fn list<I, S>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values: Vec<S> = values.into_iter().collect();
        self.hasher.update(&(values.len() as u64).to_le_bytes());
        for value in &values {
            self.field(value.as_ref());
        }
        self
    }

    /// Hex digest of everything fed so far
    pub fn finish(&self) -> String {
        self.hasher.finalize().to_hex().to_string()
    }
}
