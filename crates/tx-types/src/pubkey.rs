//! Compressed public key type for signer identification.

use std::{
    hash::{self, Hash},
    ops::Deref,
};

use arbitrary::{Arbitrary, Unstructured};
use secp256k1::{Error, PublicKey, SecretKey, SECP256K1};
use serde::{Deserialize, Serialize};

/// A compressed secp256k1 public key (33 bytes) recovered from, or expected
/// to verify, a signature.
///
/// Thin wrapper around [`secp256k1::PublicKey`]. No parity restriction is
/// enforced: these keys come out of ECDSA verification against a multisig
/// script, which accepts both parities. Serde encodes the key as a 33-byte
/// compressed point in lowercase hex, matching the form key-origin metadata
/// carries it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SignerPubkey(PublicKey);

impl SignerPubkey {
    /// Create a new `SignerPubkey` from a byte slice.
    ///
    /// The slice must be a valid compressed (33-byte) or uncompressed
    /// (65-byte) SEC point encoding.
    pub fn from_slice(data: &[u8]) -> Result<Self, Error> {
        let pk = PublicKey::from_slice(data)?;
        Ok(Self(pk))
    }

    /// Get the inner `secp256k1::PublicKey`.
    pub fn as_inner(&self) -> &PublicKey {
        &self.0
    }

    /// Serialize to 33-byte compressed format.
    pub fn serialize(&self) -> [u8; 33] {
        self.0.serialize()
    }
}

impl Deref for SignerPubkey {
    type Target = PublicKey;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<PublicKey> for SignerPubkey {
    fn as_ref(&self) -> &PublicKey {
        &self.0
    }
}

impl From<PublicKey> for SignerPubkey {
    fn from(pk: PublicKey) -> Self {
        Self(pk)
    }
}

impl From<SignerPubkey> for PublicKey {
    fn from(pk: SignerPubkey) -> Self {
        pk.0
    }
}

impl Hash for SignerPubkey {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.serialize().hash(state);
    }
}

impl<'a> Arbitrary<'a> for SignerPubkey {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        // Derive from an arbitrary (non-zero) secret key so the point is
        // always on the curve.
        let mut sk_bytes = [0u8; 32];
        u.fill_buffer(&mut sk_bytes)?;
        if sk_bytes.iter().all(|&b| b == 0) {
            sk_bytes[31] = 1;
        }
        let sk = SecretKey::from_slice(&sk_bytes).map_err(|_| arbitrary::Error::IncorrectFormat)?;
        Ok(Self(PublicKey::from_secret_key(SECP256K1, &sk)))
    }
}

impl Serialize for SignerPubkey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0.serialize()))
    }
}

impl<'de> Deserialize<'de> for SignerPubkey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as DeError;

        let hex_string: String = Deserialize::deserialize(deserializer)?;
        let bytes = hex::decode(&hex_string).map_err(DeError::custom)?;
        let pk = PublicKey::from_slice(&bytes).map_err(DeError::custom)?;
        Ok(Self(pk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_key(seed: u8) -> SignerPubkey {
        let mut sk_bytes = [0u8; 32];
        sk_bytes[31] = seed.max(1);
        let sk = SecretKey::from_slice(&sk_bytes).unwrap();
        SignerPubkey::from(PublicKey::from_secret_key(SECP256K1, &sk))
    }

    #[test]
    fn test_pubkey_roundtrip() {
        let pk = make_key(1);
        let bytes = pk.serialize();
        let restored = SignerPubkey::from_slice(&bytes).unwrap();
        assert_eq!(pk, restored);
    }

    #[test]
    fn test_pubkey_serde_hex() {
        let pk = make_key(2);
        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json, format!("\"{}\"", hex::encode(pk.serialize())));
        let back: SignerPubkey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pk);
    }

    #[test]
    fn test_invalid_pubkey_slice() {
        let invalid = [0u8; 33];
        assert!(SignerPubkey::from_slice(&invalid).is_err());
    }
}
