//! Signer slots: per-signer accumulators for a signing round.

use quorum_tx_types::{SignatureHex, SignerPubkey};
use serde::Serialize;

/// How a slot's signature set is being sourced.
///
/// The engine only distinguishes sources by their alignment guarantee:
/// direct and typed entry assert input order, container uploads do not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningMethod {
    /// No method chosen yet.
    #[default]
    Unknown,
    /// A signing device producing input-aligned signatures.
    Direct,
    /// Signatures typed or pasted as text, input-aligned by convention.
    Text,
    /// A signed-transaction container upload; alignment is recovered by
    /// trial matching.
    Container,
}

/// One required signer's accumulator.
///
/// A finalized slot always holds exactly one signature and one recovered
/// public key per spend input, in input order. Slots are created empty and
/// only the round controller fills them; an explicit reset returns a slot
/// to empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignerSlot {
    ordinal: usize,
    method: SigningMethod,
    signatures: Vec<SignatureHex>,
    pubkeys: Vec<SignerPubkey>,
    finalized: bool,
}

impl SignerSlot {
    /// Create an empty slot with the given 1-based ordinal.
    pub(crate) fn new(ordinal: usize) -> Self {
        Self {
            ordinal,
            method: SigningMethod::default(),
            signatures: Vec::new(),
            pubkeys: Vec::new(),
            finalized: false,
        }
    }

    /// The slot's 1-based ordinal.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// The slot's signing method tag.
    pub fn method(&self) -> SigningMethod {
        self.method
    }

    /// Whether a full verified signature set has been accepted.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Accepted signatures, index-aligned with the spend's inputs.
    ///
    /// Empty until the slot finalizes.
    pub fn signatures(&self) -> &[SignatureHex] {
        &self.signatures
    }

    /// Recovered public keys, index-aligned with the spend's inputs.
    ///
    /// Empty until the slot finalizes.
    pub fn pubkeys(&self) -> &[SignerPubkey] {
        &self.pubkeys
    }

    pub(crate) fn set_method(&mut self, method: SigningMethod) {
        self.method = method;
    }

    /// Record a full verified signature set and mark the slot finalized.
    pub(crate) fn finalize(&mut self, signatures: Vec<SignatureHex>, pubkeys: Vec<SignerPubkey>) {
        debug_assert_eq!(signatures.len(), pubkeys.len());
        self.signatures = signatures;
        self.pubkeys = pubkeys;
        self.finalized = true;
    }

    /// Clear the slot back to empty.
    pub(crate) fn reset(&mut self) {
        self.signatures.clear();
        self.pubkeys.clear();
        self.finalized = false;
    }
}
