//! Resolves one chunk of signatures into an input-aligned, verified set.
//!
//! Ordered resolution trusts the submitted order. Unordered resolution
//! treats verification as an oracle: each signature claims the first
//! still-open input it verifies against, and the discovered alignment is
//! remembered for the rest of the round so repeat uploads resolve the same
//! way without a fresh search.

use std::collections::VecDeque;

use quorum_tx_types::{SignatureHex, SignerPubkey, UnsignedSpend};

use crate::{errors::EngineError, verify::SignatureVerifier};

/// One fully resolved signer set: signature and recovered key per input, in
/// input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedChunk {
    pub(crate) signatures: Vec<SignatureHex>,
    pub(crate) pubkeys: Vec<SignerPubkey>,
}

/// A signature→input alignment discovered by an earlier unordered
/// resolution in the same round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SignatureOrder {
    /// `source_position[input]` is the chunk position whose signature
    /// resolved to `input`.
    source_position: Vec<usize>,
}

impl SignatureOrder {
    /// Build the inverse mapping from a completed search.
    ///
    /// `discovered[position]` is the input claimed by the signature at
    /// `position`; a full resolution visits every input exactly once.
    fn from_discovery(discovered: &[usize]) -> Self {
        let mut source_position = vec![0; discovered.len()];
        for (position, &input) in discovered.iter().enumerate() {
            source_position[input] = position;
        }
        Self { source_position }
    }

    pub(crate) fn chunk_len(&self) -> usize {
        self.source_position.len()
    }
}

/// Verify an input-aligned chunk: `chunk[i]` must verify against input `i`.
pub(crate) fn match_ordered<V: SignatureVerifier>(
    verifier: &V,
    spend: &UnsignedSpend,
    chunk: &[SignatureHex],
) -> Result<ResolvedChunk, EngineError> {
    debug_assert_eq!(chunk.len(), spend.num_inputs());

    let mut pubkeys = Vec::with_capacity(chunk.len());
    for (index, signature) in chunk.iter().enumerate() {
        if !signature.is_well_formed() {
            return Err(EngineError::MalformedSignature {
                input: Some(index + 1),
            });
        }
        let recovered = verifier
            .verify_input(spend, index, signature)
            .map_err(|source| EngineError::VerifierFailure {
                input: index + 1,
                source,
            })?;
        match recovered {
            Some(pubkey) => pubkeys.push(pubkey),
            None => {
                return Err(EngineError::UnverifiableSignature { input: index + 1 });
            }
        }
    }

    Ok(ResolvedChunk {
        signatures: chunk.to_vec(),
        pubkeys,
    })
}

/// Resolve a chunk with no alignment guarantee by trial matching.
///
/// Takes the first unplaced signature and tests it against every unclaimed
/// input in input order; the first input it verifies against claims it. A
/// signature that verifies against none of the remaining inputs fails the
/// whole chunk. When an earlier resolution of the round already discovered
/// an alignment for chunks of this size, it is replayed directly instead.
pub(crate) fn match_unordered<V: SignatureVerifier>(
    verifier: &V,
    spend: &UnsignedSpend,
    chunk: &[SignatureHex],
    cache: &mut Option<SignatureOrder>,
) -> Result<ResolvedChunk, EngineError> {
    let num_inputs = spend.num_inputs();
    debug_assert_eq!(chunk.len(), num_inputs);

    if let Some(order) = cache.as_ref().filter(|order| order.chunk_len() == chunk.len()) {
        return replay_order(verifier, spend, chunk, order);
    }

    let mut pool: VecDeque<SignatureHex> = chunk.iter().cloned().collect();
    let mut unclaimed: Vec<usize> = (0..num_inputs).collect();
    let mut signatures: Vec<Option<SignatureHex>> = vec![None; num_inputs];
    let mut pubkeys: Vec<Option<SignerPubkey>> = vec![None; num_inputs];
    let mut discovered: Vec<usize> = Vec::with_capacity(num_inputs);

    while let Some(signature) = pool.pop_front() {
        if !signature.is_well_formed() {
            return Err(EngineError::MalformedSignature { input: None });
        }

        let mut claimed = None;
        for (position, &input) in unclaimed.iter().enumerate() {
            let recovered = verifier
                .verify_input(spend, input, &signature)
                .map_err(|source| EngineError::VerifierFailure {
                    input: input + 1,
                    source,
                })?;
            if let Some(pubkey) = recovered {
                claimed = Some((position, input, pubkey));
                break;
            }
        }

        let Some((position, input, pubkey)) = claimed else {
            return Err(EngineError::UnmatchedSignature);
        };
        unclaimed.remove(position);
        signatures[input] = Some(signature);
        pubkeys[input] = Some(pubkey);
        discovered.push(input);
    }

    // Remember non-identity alignments so later chunks of the round resolve
    // in the same permutation without searching.
    if discovered
        .iter()
        .enumerate()
        .any(|(position, &input)| position != input)
    {
        *cache = Some(SignatureOrder::from_discovery(&discovered));
    }

    let signatures: Vec<SignatureHex> = signatures.into_iter().flatten().collect();
    let pubkeys: Vec<SignerPubkey> = pubkeys.into_iter().flatten().collect();
    debug_assert_eq!(signatures.len(), num_inputs);
    debug_assert_eq!(pubkeys.len(), num_inputs);

    Ok(ResolvedChunk {
        signatures,
        pubkeys,
    })
}

/// Verify a chunk against a previously discovered alignment.
fn replay_order<V: SignatureVerifier>(
    verifier: &V,
    spend: &UnsignedSpend,
    chunk: &[SignatureHex],
    order: &SignatureOrder,
) -> Result<ResolvedChunk, EngineError> {
    let mut signatures = Vec::with_capacity(chunk.len());
    let mut pubkeys = Vec::with_capacity(chunk.len());

    for (input, &position) in order.source_position.iter().enumerate() {
        let signature = &chunk[position];
        if !signature.is_well_formed() {
            return Err(EngineError::MalformedSignature { input: None });
        }
        let recovered = verifier
            .verify_input(spend, input, signature)
            .map_err(|source| EngineError::VerifierFailure {
                input: input + 1,
                source,
            })?;
        match recovered {
            Some(pubkey) => {
                signatures.push(signature.clone());
                pubkeys.push(pubkey);
            }
            None => {
                return Err(EngineError::UnverifiableSignature { input: input + 1 });
            }
        }
    }

    Ok(ResolvedChunk {
        signatures,
        pubkeys,
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use quorum_test_utils::SigningFixture;

    use super::*;

    #[test]
    fn test_ordered_chunk_verifies_in_input_order() {
        let fixture = SigningFixture::new(3, 1);
        let chunk = fixture.ordered_chunk(0);

        let resolved = match_ordered(&fixture.verifier(), fixture.spend(), &chunk).unwrap();

        assert_eq!(resolved.signatures, chunk);
        let expected: Vec<_> = (0..3).map(|input| fixture.pubkey(0, input)).collect();
        assert_eq!(resolved.pubkeys, expected);
    }

    #[test]
    fn test_ordered_chunk_reports_bad_hex_with_input_number() {
        let fixture = SigningFixture::new(3, 1);
        let mut chunk = fixture.ordered_chunk(0);
        chunk[1] = SignatureHex::from("not-hex");

        let err = match_ordered(&fixture.verifier(), fixture.spend(), &chunk).unwrap_err();
        assert_eq!(err, EngineError::MalformedSignature { input: Some(2) });
    }

    #[test]
    fn test_ordered_chunk_rejects_misaligned_signature() {
        let fixture = SigningFixture::new(3, 1);
        let mut chunk = fixture.ordered_chunk(0);
        chunk.swap(0, 2);

        let err = match_ordered(&fixture.verifier(), fixture.spend(), &chunk).unwrap_err();
        assert_eq!(err, EngineError::UnverifiableSignature { input: 1 });
    }

    #[test]
    fn test_unordered_chunk_realigns_to_input_order() {
        let fixture = SigningFixture::new(3, 1);
        let scrambled = fixture.shuffled_chunk(0, &[2, 0, 1]);
        let mut cache = None;

        let resolved =
            match_unordered(&fixture.verifier(), fixture.spend(), &scrambled, &mut cache).unwrap();

        assert_eq!(resolved.signatures, fixture.ordered_chunk(0));
        assert!(cache.is_some(), "non-identity order should be remembered");
    }

    #[test]
    fn test_unordered_identity_order_is_not_cached() {
        let fixture = SigningFixture::new(3, 1);
        let chunk = fixture.ordered_chunk(0);
        let mut cache = None;

        match_unordered(&fixture.verifier(), fixture.spend(), &chunk, &mut cache).unwrap();
        assert!(cache.is_none());
    }

    #[test]
    fn test_unordered_rejects_foreign_signature() {
        let fixture = SigningFixture::new(2, 1);
        let chunk = vec![
            fixture.signature(0, 0),
            SignatureHex::from("deadbeefdeadbeef"),
        ];
        let mut cache = None;

        let err =
            match_unordered(&fixture.verifier(), fixture.spend(), &chunk, &mut cache).unwrap_err();
        assert_eq!(err, EngineError::UnmatchedSignature);
    }

    #[test]
    fn test_cached_order_short_circuits_search() {
        let fixture = SigningFixture::new(3, 2);
        let verifier = fixture.verifier();
        let mut cache = None;

        match_unordered(
            &verifier,
            fixture.spend(),
            &fixture.shuffled_chunk(0, &[2, 0, 1]),
            &mut cache,
        )
        .unwrap();
        let after_search = verifier.calls();

        let resolved = match_unordered(
            &verifier,
            fixture.spend(),
            &fixture.shuffled_chunk(1, &[2, 0, 1]),
            &mut cache,
        )
        .unwrap();
        assert_eq!(
            verifier.calls() - after_search,
            3,
            "replay should verify each input exactly once"
        );
        assert_eq!(resolved.signatures, fixture.ordered_chunk(1));
    }

    #[test]
    fn test_cached_order_replay_failure_is_an_error() {
        let fixture = SigningFixture::new(3, 2);
        let mut cache = None;

        match_unordered(
            &fixture.verifier(),
            fixture.spend(),
            &fixture.shuffled_chunk(0, &[2, 0, 1]),
            &mut cache,
        )
        .unwrap();

        // Same signer again, but in a different permutation than the cached
        // one: replay misaligns and reports the first input that fails.
        let err = match_unordered(
            &fixture.verifier(),
            fixture.spend(),
            &fixture.shuffled_chunk(0, &[1, 2, 0]),
            &mut cache,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::UnverifiableSignature { .. }));
    }

    proptest! {
        #[test]
        fn prop_every_permutation_resolves_to_canonical_alignment(
            order in Just(vec![0usize, 1, 2, 3]).prop_shuffle(),
        ) {
            let fixture = SigningFixture::new(4, 1);
            let chunk = fixture.shuffled_chunk(0, &order);
            let mut cache = None;

            let resolved =
                match_unordered(&fixture.verifier(), fixture.spend(), &chunk, &mut cache).unwrap();

            prop_assert_eq!(resolved.signatures, fixture.ordered_chunk(0));
            let expected: Vec<_> = (0..4).map(|input| fixture.pubkey(0, input)).collect();
            prop_assert_eq!(resolved.pubkeys, expected);
        }
    }
}
