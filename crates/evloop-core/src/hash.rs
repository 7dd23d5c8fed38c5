//! Stable hashing for analysis declarations and manifests.

use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Hash256(*blake3::hash(bytes).as_bytes())
    }

    /// Hash any serde-serializable value deterministically (via JSON).
    pub fn of_serde<T: Serialize>(v: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(v).map_err(|e| Error::Hash(e.to_string()))?;
        Ok(Self::of_bytes(&bytes))
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// First 12 hex chars, for log lines.
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_64_chars_and_stable() {
        let a = Hash256::of_bytes(b"samples");
        let b = Hash256::of_bytes(b"samples");
        assert_eq!(a, b);
        assert_eq!(a.to_hex().len(), 64);
        assert_eq!(a.short().len(), 12);
        assert_ne!(a, Hash256::of_bytes(b"variables"));
    }
}
