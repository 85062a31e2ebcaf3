//! Raw signature material as received from signing devices.

use std::fmt;

use arbitrary::{Arbitrary, Unstructured};
use serde::{Deserialize, Serialize};

/// A hex-encoded signature string, kept exactly as it was uploaded or typed.
///
/// The engine deduplicates signatures by value, so equality and hashing are
/// plain string comparisons. No decoding happens on construction: malformed
/// input is representable and is rejected later, with context about which
/// input it was submitted for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureHex(String);

impl SignatureHex {
    /// Wrap a raw signature string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the raw string.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Whether the string is non-empty, even-length hex.
    ///
    /// This is the shape check only; whether the bytes are a signature that
    /// verifies against anything is the verifier's business.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty() && self.0.len() % 2 == 0 && hex::decode(&self.0).is_ok()
    }
}

impl fmt::Display for SignatureHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SignatureHex {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for SignatureHex {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl<'a> Arbitrary<'a> for SignatureHex {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        // ECDSA DER signatures land around 70-72 bytes; stay in that range.
        let len = u.int_in_range(64..=72)?;
        let bytes = u.bytes(len)?;
        Ok(Self(hex::encode(bytes)))
    }
}
