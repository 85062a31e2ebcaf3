//! Deterministic multi-signer signing setups with a scripted verifier.

use std::{cell::Cell, collections::HashMap};

use bitcoin::{bip32::Fingerprint, hashes::Hash as _, Amount, Network, OutPoint, ScriptBuf, Txid};
use quorum_engine::{ContainerSignatures, SignatureVerifier, VerifierError};
use quorum_tx_types::{
    KeySource, SignatureHex, SignerPubkey, SpendInput, SpendOutput, UnsignedSpend,
};
use secp256k1::{PublicKey, SecretKey, SECP256K1};

/// A scripted [`SignatureVerifier`].
///
/// Accepts exactly the `(input, signature) → pubkey` pairings it was loaded
/// with, counts every call (so tests can observe trial matching and cached
/// replays), and can be poisoned to fail outright on chosen signatures.
#[derive(Debug, Clone, Default)]
pub struct FixtureVerifier {
    accepted: HashMap<(usize, SignatureHex), SignerPubkey>,
    poisoned: Vec<SignatureHex>,
    calls: Cell<u64>,
}

impl FixtureVerifier {
    /// Script the verifier to recover `pubkey` from `signature` on `input`.
    pub fn accept(&mut self, input: usize, signature: SignatureHex, pubkey: SignerPubkey) {
        self.accepted.insert((input, signature), pubkey);
    }

    /// Make the verifier report a primitive failure for `signature` on any
    /// input.
    pub fn poison(&mut self, signature: SignatureHex) {
        self.poisoned.push(signature);
    }

    /// Number of verification calls made so far.
    pub fn calls(&self) -> u64 {
        self.calls.get()
    }
}

impl SignatureVerifier for FixtureVerifier {
    fn verify_input(
        &self,
        _spend: &UnsignedSpend,
        input_index: usize,
        signature: &SignatureHex,
    ) -> Result<Option<SignerPubkey>, VerifierError> {
        self.calls.set(self.calls.get() + 1);
        if self.poisoned.contains(signature) {
            return Err(VerifierError::new("fixture: poisoned signature"));
        }
        Ok(self
            .accepted
            .get(&(input_index, signature.clone()))
            .copied())
    }
}

#[derive(Debug)]
struct FixtureSigner {
    fingerprint: Fingerprint,
    pubkeys: Vec<SignerPubkey>,
    signatures: Vec<SignatureHex>,
    alt_signatures: Vec<SignatureHex>,
}

/// A deterministic signing setup: `num_signers` cosigners, each holding one
/// key and one valid signature per input of a `num_inputs` regtest spend.
///
/// Every input's key-origin list carries all signers in signer order, so
/// the derivation matrix enumerates signers 0, 1, ... in order. Each
/// `(signer, input)` pair also gets an alternate signature recovering to
/// the same key, for duplicate-key scenarios.
#[derive(Debug)]
pub struct SigningFixture {
    spend: UnsignedSpend,
    signers: Vec<FixtureSigner>,
    verifier: FixtureVerifier,
}

impl SigningFixture {
    /// Build a fixture with the given dimensions.
    pub fn new(num_inputs: usize, num_signers: usize) -> Self {
        assert!((1..=16).contains(&num_inputs), "unsupported input count");
        assert!((1..=8).contains(&num_signers), "unsupported signer count");

        let mut signers = Vec::with_capacity(num_signers);
        for signer in 0..num_signers {
            let mut pubkeys = Vec::with_capacity(num_inputs);
            let mut signatures = Vec::with_capacity(num_inputs);
            let mut alt_signatures = Vec::with_capacity(num_inputs);
            for input in 0..num_inputs {
                pubkeys.push(make_pubkey(signer, input));
                signatures.push(make_signature(signer, input, 0));
                alt_signatures.push(make_signature(signer, input, 1));
            }
            signers.push(FixtureSigner {
                fingerprint: Fingerprint::from([0xf0, 0x00, 0x00, signer as u8]),
                pubkeys,
                signatures,
                alt_signatures,
            });
        }

        let inputs = (0..num_inputs)
            .map(|input| {
                let key_sources = signers
                    .iter()
                    .map(|signer| KeySource::new(signer.fingerprint, signer.pubkeys[input]))
                    .collect();
                SpendInput::new(
                    OutPoint {
                        txid: Txid::from_byte_array([input as u8 + 1; 32]),
                        vout: input as u32,
                    },
                    key_sources,
                )
            })
            .collect();
        let outputs = vec![SpendOutput::new(
            Amount::from_sat(100_000),
            ScriptBuf::from(vec![0x51]),
        )];
        let spend = UnsignedSpend::try_new(Network::Regtest, inputs, outputs)
            .expect("fixture spend has inputs");

        let mut verifier = FixtureVerifier::default();
        for signer in &signers {
            for input in 0..num_inputs {
                verifier.accept(input, signer.signatures[input].clone(), signer.pubkeys[input]);
                verifier.accept(
                    input,
                    signer.alt_signatures[input].clone(),
                    signer.pubkeys[input],
                );
            }
        }

        Self {
            spend,
            signers,
            verifier,
        }
    }

    /// The fixture's spend.
    pub fn spend(&self) -> &UnsignedSpend {
        &self.spend
    }

    /// A fresh copy of the scripted verifier (call counter starts at the
    /// current value of this fixture's template, which is zero unless the
    /// template itself was used).
    pub fn verifier(&self) -> FixtureVerifier {
        self.verifier.clone()
    }

    /// One signer's root fingerprint.
    pub fn fingerprint(&self, signer: usize) -> Fingerprint {
        self.signers[signer].fingerprint
    }

    /// One signer's public key for one input.
    pub fn pubkey(&self, signer: usize, input: usize) -> SignerPubkey {
        self.signers[signer].pubkeys[input]
    }

    /// One signer's valid signature for one input.
    pub fn signature(&self, signer: usize, input: usize) -> SignatureHex {
        self.signers[signer].signatures[input].clone()
    }

    /// A second valid signature recovering to the same key as
    /// [`Self::signature`].
    pub fn alt_signature(&self, signer: usize, input: usize) -> SignatureHex {
        self.signers[signer].alt_signatures[input].clone()
    }

    /// One signer's full signature set, in input order.
    pub fn ordered_chunk(&self, signer: usize) -> Vec<SignatureHex> {
        self.signers[signer].signatures.clone()
    }

    /// One signer's full signature set with `order[k]` naming the input
    /// whose signature lands at position `k`.
    pub fn shuffled_chunk(&self, signer: usize, order: &[usize]) -> Vec<SignatureHex> {
        assert_eq!(order.len(), self.spend.num_inputs());
        order
            .iter()
            .map(|&input| self.signature(signer, input))
            .collect()
    }

    /// A decoded signed-container side-channel for the given signers: every
    /// per-input key maps to its one signature.
    pub fn container(&self, signers: &[usize]) -> ContainerSignatures {
        let mut container = ContainerSignatures::new();
        for &signer in signers {
            for input in 0..self.spend.num_inputs() {
                container.insert(
                    self.pubkey(signer, input),
                    vec![self.signature(signer, input)],
                );
            }
        }
        container
    }

    /// A single-signer container whose flat signature order is exactly
    /// `order` (see [`Self::shuffled_chunk`]): all of the signer's
    /// signatures attached to one key, the way a container keyed by a
    /// reused public key would carry them.
    ///
    /// [`Self::container`] is keyed per input key, so its flat order follows
    /// key sort order; use this constructor when a test needs to pin the
    /// order a single-set upload arrives in.
    pub fn container_in_order(&self, signer: usize, order: &[usize]) -> ContainerSignatures {
        let mut container = ContainerSignatures::new();
        container.insert(self.pubkey(signer, 0), self.shuffled_chunk(signer, order));
        container
    }
}

fn make_pubkey(signer: usize, input: usize) -> SignerPubkey {
    let mut sk_bytes = [0u8; 32];
    sk_bytes[30] = signer as u8 + 1;
    sk_bytes[31] = input as u8 + 1;
    let sk = SecretKey::from_slice(&sk_bytes).expect("fixture secret key is valid");
    SignerPubkey::from(PublicKey::from_secret_key(SECP256K1, &sk))
}

fn make_signature(signer: usize, input: usize, variant: u8) -> SignatureHex {
    // A stable, well-formed stand-in for DER bytes; the scripted verifier
    // never decodes it.
    let mut bytes = [0xabu8; 70];
    bytes[0] = 0x30;
    bytes[1] = 0x44;
    bytes[2] = signer as u8;
    bytes[3] = input as u8;
    bytes[4] = variant;
    SignatureHex::new(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_accepts_only_scripted_pairings() {
        let fixture = SigningFixture::new(2, 2);
        let verifier = fixture.verifier();

        let recovered = verifier
            .verify_input(fixture.spend(), 0, &fixture.signature(1, 0))
            .unwrap();
        assert_eq!(recovered, Some(fixture.pubkey(1, 0)));

        let wrong_input = verifier
            .verify_input(fixture.spend(), 1, &fixture.signature(1, 0))
            .unwrap();
        assert_eq!(wrong_input, None);

        assert_eq!(verifier.calls(), 2);
    }

    #[test]
    fn test_poisoned_signature_fails() {
        let fixture = SigningFixture::new(2, 1);
        let mut verifier = fixture.verifier();
        verifier.poison(fixture.signature(0, 1));

        assert!(verifier
            .verify_input(fixture.spend(), 1, &fixture.signature(0, 1))
            .is_err());
    }

    #[test]
    fn test_signatures_are_distinct_and_well_formed() {
        let fixture = SigningFixture::new(3, 2);
        let mut seen = std::collections::HashSet::new();
        for signer in 0..2 {
            for input in 0..3 {
                let sig = fixture.signature(signer, input);
                assert!(sig.is_well_formed());
                assert!(seen.insert(sig));
                assert!(seen.insert(fixture.alt_signature(signer, input)));
            }
        }
    }
}
