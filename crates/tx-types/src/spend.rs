//! The unsigned spend a signing round collects signatures for.

use arbitrary::{Arbitrary, Unstructured};
use bitcoin::{bip32::Fingerprint, hashes::Hash as _, Amount, Network, OutPoint, ScriptBuf, Txid};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pubkey::SignerPubkey;

/// Errors from constructing a spend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpendError {
    /// The input list is empty.
    #[error("spend has no inputs")]
    NoInputs,
}

/// One `(root fingerprint, public key)` pair from an input's key-origin
/// metadata: the key this fingerprint's device contributes to the input's
/// multisig script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySource {
    fingerprint: Fingerprint,
    pubkey: SignerPubkey,
}

impl KeySource {
    /// Create a new key source.
    pub fn new(fingerprint: Fingerprint, pubkey: SignerPubkey) -> Self {
        Self {
            fingerprint,
            pubkey,
        }
    }

    /// The root fingerprint of the controlling device/seed.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// The public key contributed to this input's script.
    pub fn pubkey(&self) -> SignerPubkey {
        self.pubkey
    }
}

impl<'a> Arbitrary<'a> for KeySource {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let fp_bytes: [u8; 4] = u.arbitrary()?;
        Ok(Self {
            fingerprint: Fingerprint::from(fp_bytes),
            pubkey: SignerPubkey::arbitrary(u)?,
        })
    }
}

/// A transaction input awaiting signatures.
///
/// Identified by its funding outpoint; carries the ordered key-origin list
/// describing which keys can sign it. Input order within a spend is
/// significant and fixed for the life of a signing round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendInput {
    outpoint: OutPoint,
    key_sources: Vec<KeySource>,
}

impl SpendInput {
    /// Create a new input.
    pub fn new(outpoint: OutPoint, key_sources: Vec<KeySource>) -> Self {
        Self {
            outpoint,
            key_sources,
        }
    }

    /// The funding outpoint.
    pub fn outpoint(&self) -> OutPoint {
        self.outpoint
    }

    /// Key-origin metadata, in script order.
    pub fn key_sources(&self) -> &[KeySource] {
        &self.key_sources
    }
}

impl<'a> Arbitrary<'a> for SpendInput {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let txid_bytes: [u8; 32] = u.arbitrary()?;
        let outpoint = OutPoint {
            txid: Txid::from_byte_array(txid_bytes),
            vout: u.int_in_range(0..=16)?,
        };
        let num_sources = u.int_in_range(1..=4)?;
        let mut key_sources = Vec::with_capacity(num_sources);
        for _ in 0..num_sources {
            key_sources.push(KeySource::arbitrary(u)?);
        }
        Ok(Self {
            outpoint,
            key_sources,
        })
    }
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendOutput {
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    value: Amount,
    script_pubkey: ScriptBuf,
}

impl SpendOutput {
    /// Create a new output.
    pub fn new(value: Amount, script_pubkey: ScriptBuf) -> Self {
        Self {
            value,
            script_pubkey,
        }
    }

    /// The output value.
    pub fn value(&self) -> Amount {
        self.value
    }

    /// The destination script.
    pub fn script_pubkey(&self) -> &ScriptBuf {
        &self.script_pubkey
    }
}

impl<'a> Arbitrary<'a> for SpendOutput {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let value = Amount::from_sat(u.arbitrary()?);
        let script_len = u.int_in_range(0usize..=80)?;
        let script_pubkey = ScriptBuf::from(u.bytes(script_len)?.to_vec());
        Ok(Self {
            value,
            script_pubkey,
        })
    }
}

/// The unsigned transaction a signing round is collecting signatures for.
///
/// Constructed fully formed by the transaction-building collaborator; the
/// engine only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedSpend {
    network: Network,
    inputs: Vec<SpendInput>,
    outputs: Vec<SpendOutput>,
}

impl UnsignedSpend {
    /// Create a new spend.
    ///
    /// # Errors
    ///
    /// Returns [`SpendError::NoInputs`] if `inputs` is empty; a spend with
    /// nothing to sign is not meaningful to a signing round.
    pub fn try_new(
        network: Network,
        inputs: Vec<SpendInput>,
        outputs: Vec<SpendOutput>,
    ) -> Result<Self, SpendError> {
        if inputs.is_empty() {
            return Err(SpendError::NoInputs);
        }
        Ok(Self {
            network,
            inputs,
            outputs,
        })
    }

    /// The network this spend is for.
    pub fn network(&self) -> Network {
        self.network
    }

    /// The inputs, in signing order.
    pub fn inputs(&self) -> &[SpendInput] {
        &self.inputs
    }

    /// The outputs.
    pub fn outputs(&self) -> &[SpendOutput] {
        &self.outputs
    }

    /// Number of inputs, which is also the size of every signature chunk.
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }
}

impl<'a> Arbitrary<'a> for UnsignedSpend {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let network = *u.choose(&[
            Network::Bitcoin,
            Network::Testnet,
            Network::Signet,
            Network::Regtest,
        ])?;
        let num_inputs = u.int_in_range(1..=4)?;
        let mut inputs = Vec::with_capacity(num_inputs);
        for _ in 0..num_inputs {
            inputs.push(SpendInput::arbitrary(u)?);
        }
        let num_outputs = u.int_in_range(0usize..=3)?;
        let mut outputs = Vec::with_capacity(num_outputs);
        for _ in 0..num_outputs {
            outputs.push(SpendOutput::arbitrary(u)?);
        }
        Ok(Self {
            network,
            inputs,
            outputs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_input(tag: u8) -> SpendInput {
        SpendInput::new(
            OutPoint {
                txid: Txid::from_byte_array([tag; 32]),
                vout: 0,
            },
            vec![],
        )
    }

    #[test]
    fn test_spend_rejects_empty_inputs() {
        let result = UnsignedSpend::try_new(Network::Regtest, vec![], vec![]);
        assert_eq!(result.unwrap_err(), SpendError::NoInputs);
    }

    #[test]
    fn test_spend_preserves_input_order() {
        let spend = UnsignedSpend::try_new(
            Network::Regtest,
            vec![make_input(1), make_input(2), make_input(3)],
            vec![],
        )
        .unwrap();

        assert_eq!(spend.num_inputs(), 3);
        let txids: Vec<_> = spend
            .inputs()
            .iter()
            .map(|input| input.outpoint().txid)
            .collect();
        assert_eq!(
            txids,
            vec![
                Txid::from_byte_array([1; 32]),
                Txid::from_byte_array([2; 32]),
                Txid::from_byte_array([3; 32]),
            ]
        );
    }

    #[test]
    fn test_spend_serde_roundtrip() {
        let spend = UnsignedSpend::try_new(
            Network::Signet,
            vec![make_input(7)],
            vec![SpendOutput::new(
                Amount::from_sat(50_000),
                ScriptBuf::from(vec![0x51]),
            )],
        )
        .unwrap();

        let json = serde_json::to_string(&spend).unwrap();
        let back: UnsignedSpend = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spend);
    }
}
