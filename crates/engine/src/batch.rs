//! Raw signature batches and shape validation.

use std::collections::BTreeMap;

use quorum_tx_types::{SignatureHex, SignerPubkey};

use crate::errors::EngineError;

/// Signatures recovered from a signed-transaction container, keyed by the
/// public key they were authored under.
///
/// This side-channel carries no inherent ordering against the spend's
/// inputs; the engine realigns it by trial matching.
pub type ContainerSignatures = BTreeMap<SignerPubkey, Vec<SignatureHex>>;

/// A flat, ordered sequence of raw signatures as submitted in one upload or
/// entry event.
///
/// Batches from direct or typed entry carry only the flat sequence and
/// assert input alignment. Batches decoded from a signed-transaction
/// container also carry the per-key side-channel, which is what makes
/// multi-signer splitting possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSignatureBatch {
    signatures: Vec<SignatureHex>,
    container: Option<ContainerSignatures>,
}

impl RawSignatureBatch {
    /// A batch from direct or typed entry, already in input order.
    pub fn direct(signatures: Vec<SignatureHex>) -> Self {
        Self {
            signatures,
            container: None,
        }
    }

    /// A batch from a decoded signed-transaction container.
    ///
    /// The flat sequence is the concatenation of the per-key signature
    /// lists in key order; alignment against inputs is recovered later.
    pub fn from_container(container: ContainerSignatures) -> Self {
        let signatures = container.values().flatten().cloned().collect();
        Self {
            signatures,
            container: Some(container),
        }
    }

    /// The flat signature sequence.
    pub fn signatures(&self) -> &[SignatureHex] {
        &self.signatures
    }

    /// The per-key side-channel, when the batch came from a container.
    pub fn container(&self) -> Option<&ContainerSignatures> {
        self.container.as_ref()
    }

    /// Number of signatures in the batch.
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// Whether the batch carries no signatures at all.
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

/// How a shape-valid batch splits into signer sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BatchShape {
    /// Exactly one signature per input.
    Single,
    /// `sets` complete signer sets, backed by container metadata.
    Multiple {
        /// Number of per-input signature sets in the batch.
        sets: usize,
    },
}

/// Checks batch arity against the spend before any cryptographic work.
///
/// Has no side effects: a failing batch leaves the round untouched.
pub(crate) fn validate_shape(
    batch: &RawSignatureBatch,
    num_inputs: usize,
    open_slots: usize,
) -> Result<BatchShape, EngineError> {
    let provided = batch.len();
    if provided < num_inputs {
        return Err(EngineError::NotEnoughSignatures {
            provided,
            required: num_inputs,
        });
    }
    if provided % num_inputs != 0 {
        return Err(EngineError::CountNotMultipleOfInputs {
            provided,
            inputs: num_inputs,
        });
    }
    let sets = provided / num_inputs;
    if sets > open_slots {
        return Err(EngineError::TooManySignatureSets { sets, open_slots });
    }
    if sets == 1 {
        Ok(BatchShape::Single)
    } else if batch.container().is_some() {
        Ok(BatchShape::Multiple { sets })
    } else {
        // Splitting a flat sequence into signer sets needs the per-key
        // side-channel; only containers provide it.
        Err(EngineError::MissingContainerMetadata)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use quorum_test_utils::ArbitraryGenerator;

    use super::*;

    fn sigs(count: usize) -> Vec<SignatureHex> {
        let mut generator = ArbitraryGenerator::new();
        (0..count).map(|_| generator.generate()).collect()
    }

    #[test]
    fn test_single_set_accepted() {
        let batch = RawSignatureBatch::direct(sigs(3));
        assert_eq!(validate_shape(&batch, 3, 2).unwrap(), BatchShape::Single);
    }

    #[test]
    fn test_not_enough_signatures() {
        let batch = RawSignatureBatch::direct(sigs(2));
        assert_eq!(
            validate_shape(&batch, 3, 2).unwrap_err(),
            EngineError::NotEnoughSignatures {
                provided: 2,
                required: 3,
            }
        );
    }

    #[test]
    fn test_count_not_multiple() {
        let batch = RawSignatureBatch::direct(sigs(5));
        assert_eq!(
            validate_shape(&batch, 3, 2).unwrap_err(),
            EngineError::CountNotMultipleOfInputs {
                provided: 5,
                inputs: 3,
            }
        );
    }

    #[test]
    fn test_too_many_sets() {
        let batch = RawSignatureBatch::direct(sigs(9));
        assert_eq!(
            validate_shape(&batch, 3, 2).unwrap_err(),
            EngineError::TooManySignatureSets {
                sets: 3,
                open_slots: 2,
            }
        );
    }

    #[test]
    fn test_multiple_sets_require_container() {
        let batch = RawSignatureBatch::direct(sigs(6));
        assert_eq!(
            validate_shape(&batch, 3, 2).unwrap_err(),
            EngineError::MissingContainerMetadata
        );
    }

    #[test]
    fn test_multiple_sets_with_container() {
        let mut generator = ArbitraryGenerator::new();
        let mut container = ContainerSignatures::new();
        for _ in 0..2 {
            let key: SignerPubkey = generator.generate();
            container.insert(key, sigs(3));
        }
        let batch = RawSignatureBatch::from_container(container);
        assert_eq!(batch.len(), 6);
        assert_eq!(
            validate_shape(&batch, 3, 2).unwrap(),
            BatchShape::Multiple { sets: 2 }
        );
    }

    proptest! {
        #[test]
        fn prop_rejects_lengths_that_are_not_positive_multiples(
            len in 0usize..40,
            num_inputs in 1usize..6,
            open_slots in 1usize..4,
        ) {
            prop_assume!(len < num_inputs || len % num_inputs != 0);
            let batch = RawSignatureBatch::direct(sigs(len));
            prop_assert!(validate_shape(&batch, num_inputs, open_slots).is_err());
        }
    }
}
