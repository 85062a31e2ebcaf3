//! Signature aggregation engine for threshold-multisig signing rounds.
//!
//! A signing round owns one [`SignerSlot`] per required signer and an
//! immutable unsigned spend. Raw signature batches (typed in by hand,
//! produced by a signing device, or recovered from a signed-transaction
//! container) arrive through [`SigningRound::submit`], get shape-checked,
//! verified against the spend's inputs (realigning unordered material by
//! trial matching), deduplicated against already-finalized slots, and
//! committed to the lowest open slot.
//!
//! The cryptographic primitive itself is behind the [`SignatureVerifier`]
//! seam; this crate never touches curve math.

pub mod batch;
pub mod errors;
pub mod round;
pub mod slot;
pub mod verify;

mod matcher;

pub use batch::{ContainerSignatures, RawSignatureBatch};
pub use errors::{EngineError, VerifierError};
pub use round::{RoundStatus, SigningRound};
pub use slot::{SignerSlot, SigningMethod};
pub use verify::SignatureVerifier;
