//! The verification seam between the engine and the cryptographic layer.

use quorum_tx_types::{SignatureHex, SignerPubkey, UnsignedSpend};

use crate::errors::VerifierError;

/// Opaque signature verification against one input's multisig script.
///
/// Implementations decide whether `signature` is valid for input
/// `input_index` of `spend` under that input's script and, if so, which
/// participant public key it recovers to. The engine treats this as an
/// oracle: it drives unordered trial matching with it and never inspects
/// signature bytes itself.
pub trait SignatureVerifier {
    /// Test one signature against one input.
    ///
    /// Returns `Ok(Some(key))` when the signature verifies for the input,
    /// `Ok(None)` when no participant key accepts it, and `Err` when the
    /// underlying primitive itself failed (malformed DER, script mismatch,
    /// and similar).
    fn verify_input(
        &self,
        spend: &UnsignedSpend,
        input_index: usize,
        signature: &SignatureHex,
    ) -> Result<Option<SignerPubkey>, VerifierError>;
}

impl<T: SignatureVerifier + ?Sized> SignatureVerifier for &T {
    fn verify_input(
        &self,
        spend: &UnsignedSpend,
        input_index: usize,
        signature: &SignatureHex,
    ) -> Result<Option<SignerPubkey>, VerifierError> {
        (**self).verify_input(spend, input_index, signature)
    }
}
