//! The signing round controller.
//!
//! Owns the signer slots for one threshold-multisig spend and drives batch
//! validation, chunk resolution, duplicate rejection, and slot
//! finalization. Calls arrive serialized from the surrounding UI; the
//! controller holds no locks but tolerates being re-entered with fresh
//! batches after successes and after slot resets.

use std::{collections::HashSet, num::NonZero};

use quorum_tx_types::{Fingerprint, SignatureHex, SignerPubkey, UnsignedSpend};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    batch::{validate_shape, BatchShape, RawSignatureBatch},
    errors::EngineError,
    matcher::{match_ordered, match_unordered, ResolvedChunk, SignatureOrder},
    slot::{SignerSlot, SigningMethod},
    verify::SignatureVerifier,
};

/// Round-level progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// At least one slot is still accepting signatures.
    Collecting,
    /// Every slot has finalized.
    Complete,
}

/// One signing round: the spend, its signer slots, and the round-scoped
/// signature-order cache.
///
/// Slots finalize in ascending ordinal order; every accepted set lands in
/// the lowest-numbered unfinalized slot. A finalized slot always holds one
/// signature and one recovered key per input, in input order, and no two
/// finalized slots share either at the same input position.
#[derive(Debug)]
pub struct SigningRound<V> {
    spend: UnsignedSpend,
    verifier: V,
    slots: Vec<SignerSlot>,
    order_cache: Option<SignatureOrder>,
}

impl<V: SignatureVerifier> SigningRound<V> {
    /// Start a round with one empty slot per required signer.
    pub fn new(spend: UnsignedSpend, threshold: NonZero<u8>, verifier: V) -> Self {
        let slots = (1..=threshold.get() as usize).map(SignerSlot::new).collect();
        Self {
            spend,
            verifier,
            slots,
            order_cache: None,
        }
    }

    /// The spend this round is collecting signatures for.
    pub fn spend(&self) -> &UnsignedSpend {
        &self.spend
    }

    /// The verifier driving resolution.
    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Number of inputs, which is also the chunk size for this round.
    pub fn num_inputs(&self) -> usize {
        self.spend.num_inputs()
    }

    /// All slots, in ordinal order.
    pub fn slots(&self) -> &[SignerSlot] {
        &self.slots
    }

    /// One slot by its 1-based ordinal.
    pub fn slot(&self, ordinal: usize) -> Option<&SignerSlot> {
        self.slots.get(ordinal.wrapping_sub(1))
    }

    /// Slots still accepting signatures.
    pub fn open_slot_count(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_finalized()).count()
    }

    /// Whether the round is still collecting or every slot has finalized.
    pub fn status(&self) -> RoundStatus {
        if self.slots.iter().all(SignerSlot::is_finalized) {
            RoundStatus::Complete
        } else {
            RoundStatus::Collecting
        }
    }

    /// Submit a raw batch; the sole mutating entry point.
    ///
    /// On success one or more slots finalize in place. On failure nothing
    /// changes, except that a multi-set batch may have committed earlier
    /// sets before a later one failed; those commits stand, and the error
    /// for the failing set is reported.
    pub fn submit(&mut self, batch: &RawSignatureBatch) -> Result<(), EngineError> {
        match validate_shape(batch, self.spend.num_inputs(), self.open_slot_count())? {
            BatchShape::Single => {
                let unordered = batch.container().is_some();
                let resolved = self.resolve_chunk(batch.signatures(), unordered)?;
                let ordinal = self.commit_chunk(resolved)?;
                debug!(slot = ordinal, unordered, "finalized signer slot");
                Ok(())
            }
            BatchShape::Multiple { sets } => self.submit_container_sets(batch, sets),
        }
    }

    /// Clear one slot back to empty and drop the round's cached signature
    /// order.
    ///
    /// The cached order may have been discovered from this slot's
    /// contribution; a later unordered batch simply rediscovers it.
    pub fn reset_slot(&mut self, ordinal: usize) -> Result<(), EngineError> {
        let max = self.slots.len();
        let slot = self
            .slots
            .get_mut(ordinal.wrapping_sub(1))
            .ok_or(EngineError::SlotOutOfRange {
                slot: ordinal,
                max,
            })?;
        slot.reset();
        self.order_cache = None;
        debug!(slot = ordinal, "reset signer slot");
        Ok(())
    }

    /// Change a slot's signing method, clearing any signatures collected
    /// under the previous method.
    pub fn set_method(&mut self, ordinal: usize, method: SigningMethod) -> Result<(), EngineError> {
        let max = self.slots.len();
        let slot = self
            .slots
            .get_mut(ordinal.wrapping_sub(1))
            .ok_or(EngineError::SlotOutOfRange {
                slot: ordinal,
                max,
            })?;
        slot.set_method(method);
        slot.reset();
        self.order_cache = None;
        Ok(())
    }

    /// Split a container batch into per-signer chunks and commit them one
    /// by one.
    fn submit_container_sets(
        &mut self,
        batch: &RawSignatureBatch,
        sets: usize,
    ) -> Result<(), EngineError> {
        let num_inputs = self.spend.num_inputs();
        // Shape validation only tags a batch Multiple when the side-channel
        // is present.
        let container = batch
            .container()
            .ok_or(EngineError::MissingContainerMetadata)?;

        // Candidates in derivation-matrix order: fingerprints as first seen
        // across inputs, keys as first seen within a fingerprint, then the
        // container's own per-key signature order.
        let mut candidates: Vec<SignatureHex> = Vec::new();
        for (_, keys) in derivation_matrix(&self.spend) {
            if keys.iter().any(|key| container.contains_key(key)) {
                for key in &keys {
                    if let Some(signatures) = container.get(key) {
                        candidates.extend(signatures.iter().cloned());
                    }
                }
            }
        }
        let mut candidates = self.filter_known_signatures(candidates);
        debug!(
            sets,
            candidates = candidates.len(),
            "processing container signature sets"
        );

        let mut finalized_now = 0usize;
        while self.open_slot_count() > 0 && !candidates.is_empty() {
            if candidates.len() < num_inputs {
                return Err(EngineError::NotEnoughSignatures {
                    provided: candidates.len(),
                    required: num_inputs,
                });
            }
            let chunk: Vec<SignatureHex> = candidates.drain(..num_inputs).collect();
            let committed = self
                .resolve_chunk(&chunk, true)
                .and_then(|resolved| self.commit_chunk(resolved));
            match committed {
                Ok(ordinal) => {
                    finalized_now += 1;
                    debug!(slot = ordinal, "finalized signer slot from container set");
                }
                Err(err) => {
                    warn!(
                        committed = finalized_now,
                        %err,
                        "aborting container batch after earlier commits"
                    );
                    return Err(err);
                }
            }
        }
        debug!(committed = finalized_now, "container batch done");
        Ok(())
    }

    fn resolve_chunk(
        &mut self,
        chunk: &[SignatureHex],
        unordered: bool,
    ) -> Result<ResolvedChunk, EngineError> {
        if unordered {
            match_unordered(&self.verifier, &self.spend, chunk, &mut self.order_cache)
        } else {
            match_ordered(&self.verifier, &self.spend, chunk)
        }
    }

    /// Reject the chunk if it repeats anything a finalized slot already
    /// holds, then finalize the lowest open slot with it.
    fn commit_chunk(&mut self, resolved: ResolvedChunk) -> Result<usize, EngineError> {
        self.check_duplicates(&resolved)?;
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| !slot.is_finalized())
            .ok_or(EngineError::TooManySignatureSets {
                sets: 1,
                open_slots: 0,
            })?;
        let ordinal = slot.ordinal();
        slot.finalize(resolved.signatures, resolved.pubkeys);
        Ok(ordinal)
    }

    /// The duplicate-signer guard: no finalized slot may share a signature
    /// or a recovered key with the chunk at the same input position.
    fn check_duplicates(&self, resolved: &ResolvedChunk) -> Result<(), EngineError> {
        for input in 0..self.spend.num_inputs() {
            for slot in self.slots.iter().filter(|slot| slot.is_finalized()) {
                if slot.signatures()[input] == resolved.signatures[input]
                    || slot.pubkeys()[input] == resolved.pubkeys[input]
                {
                    return Err(EngineError::DuplicateSigner { input: input + 1 });
                }
            }
        }
        Ok(())
    }

    /// Drop candidates already recorded by any finalized slot.
    ///
    /// Membership is by signature value across all input positions, not
    /// positional: a byte-identical signature at a different input is
    /// dropped too. Known approximation, kept deliberately.
    fn filter_known_signatures(&self, candidates: Vec<SignatureHex>) -> Vec<SignatureHex> {
        let known: HashSet<&SignatureHex> = self
            .slots
            .iter()
            .filter(|slot| slot.is_finalized())
            .flat_map(|slot| slot.signatures().iter())
            .collect();
        candidates
            .into_iter()
            .filter(|signature| !known.contains(signature))
            .collect()
    }
}

/// Union of per-input key-origin metadata: fingerprints in first-seen
/// order, each with its keys in first-seen order.
fn derivation_matrix(spend: &UnsignedSpend) -> Vec<(Fingerprint, Vec<SignerPubkey>)> {
    let mut matrix: Vec<(Fingerprint, Vec<SignerPubkey>)> = Vec::new();
    for input in spend.inputs() {
        for source in input.key_sources() {
            match matrix
                .iter_mut()
                .find(|(fingerprint, _)| *fingerprint == source.fingerprint())
            {
                Some((_, keys)) => {
                    if !keys.contains(&source.pubkey()) {
                        keys.push(source.pubkey());
                    }
                }
                None => matrix.push((source.fingerprint(), vec![source.pubkey()])),
            }
        }
    }
    matrix
}
