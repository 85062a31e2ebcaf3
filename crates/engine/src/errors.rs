//! Error types for the signature aggregation engine.

use thiserror::Error;

/// Failure reported by the opaque verification primitive itself, as opposed
/// to a signature that simply does not verify against any participant key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct VerifierError {
    reason: String,
}

impl VerifierError {
    /// Create a new verifier error.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors from submitting a signature batch or manipulating slots.
///
/// Shape and capacity problems are detected before any cryptographic work.
/// Hex, verification, and duplicate problems carry the 1-based input number
/// they were detected at when one is known.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Fewer signatures than inputs.
    #[error("not enough signatures: got {provided}, need at least {required}")]
    NotEnoughSignatures {
        /// Number of signatures provided.
        provided: usize,
        /// One signature per input is the minimum.
        required: usize,
    },

    /// The batch does not divide evenly into per-input signature sets.
    #[error("signature count {provided} is not a multiple of input count {inputs}")]
    CountNotMultipleOfInputs {
        /// Number of signatures provided.
        provided: usize,
        /// Number of inputs in the spend.
        inputs: usize,
    },

    /// More signer sets than unfinalized slots.
    #[error("too many signature sets: {sets} sets for {open_slots} open slots")]
    TooManySignatureSets {
        /// Signer sets implied by the batch length.
        sets: usize,
        /// Slots still accepting signatures.
        open_slots: usize,
    },

    /// A multi-set batch arrived without its signed-container side-channel.
    #[error("multiple signature sets require signed-container metadata")]
    MissingContainerMetadata,

    /// A signature failed the hex shape check.
    #[error("signature{} is not valid hex", input.map(|i| format!(" for input {i}")).unwrap_or_default())]
    MalformedSignature {
        /// The 1-based input the signature was submitted for, when the batch
        /// order implies one.
        input: Option<usize>,
    },

    /// The verification primitive failed outright.
    #[error("error processing signature for input {input}: {source}")]
    VerifierFailure {
        /// The 1-based input under test.
        input: usize,
        /// What the primitive reported.
        source: VerifierError,
    },

    /// No participant key verifies the signature for this input.
    #[error("signature for input {input} is invalid")]
    UnverifiableSignature {
        /// The 1-based input the signature was aligned with.
        input: usize,
    },

    /// Unordered resolution found a signature that verifies against none of
    /// the still-unclaimed inputs.
    #[error("signature invalid for remaining inputs")]
    UnmatchedSignature,

    /// The chunk repeats a signature or recovered key already recorded by a
    /// finalized slot at the same input position.
    #[error("signature for input {input} duplicates a previously imported signer")]
    DuplicateSigner {
        /// The 1-based input position of the collision.
        input: usize,
    },

    /// Slot ordinal outside `1..=threshold`.
    #[error("slot {slot} out of range, round has {max} slots")]
    SlotOutOfRange {
        /// The ordinal requested.
        slot: usize,
        /// Number of slots in the round.
        max: usize,
    },
}
