//! Transaction-side data model for threshold-multisig signature collection.
//!
//! These types describe what a signing round operates *on*: an immutable
//! unsigned spend with per-input key-origin metadata, raw hex signature
//! material as produced by signing devices, and the compressed public keys
//! that signatures recover to.

pub mod pubkey;
pub mod signature;
pub mod spend;

pub use bitcoin::bip32::Fingerprint;
pub use pubkey::SignerPubkey;
pub use signature::SignatureHex;
pub use spend::{KeySource, SpendError, SpendInput, SpendOutput, UnsignedSpend};
