//! Independent verification of submitted proof bundles.
//!
//! The verifier holds its own view of the published tree root, the
//! verification key, and the set of nullifier hashes it has already
//! accepted. Checks run cheapest-first: root equality and the
//! spent-nullifier pre-check short-circuit before the expensive
//! cryptographic verification, and the final nullifier insertion is an
//! atomic test-and-set so concurrent duplicates resolve to exactly one
//! acceptance.

use halo2_proofs::plonk::{verify_proof, SingleVerifier};
use halo2_proofs::transcript::Blake2bRead;
use log::{debug, info, warn};
use parking_lot::Mutex;
use pasta_curves::pallas;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::circuit::CircuitArtifacts;
use crate::error::ProtocolError;
use crate::field::{decode_hex_32, field_to_bytes, signal_hash, HASH_SIZE};
use crate::types::ProofBundle;

/// Reason a submission was turned away. Wire codes match the verification
/// channel contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The bundle's root is not the verifier's current root; the tree has
    /// changed since the proof was generated. Recoverable: re-fetch the
    /// snapshot and re-prove.
    StaleRoot,
    /// The nullifier hash was already accepted in this scope. Terminal
    /// for this identity and scope; never retried.
    DuplicateSignal,
    /// The cryptographic check failed: tampered payload, forged proof, or
    /// a client bug.
    InvalidProof,
}

impl RejectReason {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::StaleRoot => "STALE_ROOT",
            RejectReason::DuplicateSignal => "DUPLICATE_SIGNAL",
            RejectReason::InvalidProof => "INVALID_PROOF",
        }
    }
}

/// Outcome of one verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(RejectReason),
}

impl Verdict {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accepted => write!(f, "ACCEPTED"),
            Verdict::Rejected(reason) => write!(f, "REJECTED({})", reason.code()),
        }
    }
}

/// Verifier-side state: verification key, expected root, spent set.
pub struct ProofVerifier {
    artifacts: Arc<CircuitArtifacts>,
    expected_root: pallas::Base,
    spent: Mutex<HashSet<[u8; HASH_SIZE]>>,
}

impl ProofVerifier {
    #[must_use]
    pub fn new(artifacts: Arc<CircuitArtifacts>, expected_root: pallas::Base) -> Self {
        Self::with_spent(artifacts, expected_root, HashSet::new())
    }

    /// Constructs a verifier with a pre-seeded spent set, e.g. loaded
    /// from a [`NullifierStore`].
    #[must_use]
    pub fn with_spent(
        artifacts: Arc<CircuitArtifacts>,
        expected_root: pallas::Base,
        spent: HashSet<[u8; HASH_SIZE]>,
    ) -> Self {
        Self {
            artifacts,
            expected_root,
            spent: Mutex::new(spent),
        }
    }

    #[must_use]
    pub fn expected_root(&self) -> pallas::Base {
        self.expected_root
    }

    /// Number of nullifiers accepted so far.
    #[must_use]
    pub fn spent_count(&self) -> usize {
        self.spent.lock().len()
    }

    /// Verifies one bundle against the submitted signal payload.
    ///
    /// Check order: structural validation and artifact version (hard
    /// errors), then root equality, spent-nullifier pre-check, and the
    /// cryptographic proof check (verdicts). On success the nullifier is
    /// inserted with an atomic test-and-set; if a concurrent submission
    /// won the race, this one is rejected as a duplicate.
    pub fn verify(&self, bundle: &ProofBundle, signal: &[u8]) -> Result<Verdict, ProtocolError> {
        bundle.validate()?;

        if bundle.version != self.artifacts.version {
            return Err(ProtocolError::ArtifactMismatch {
                ours: self.artifacts.version.clone(),
                theirs: bundle.version.clone(),
            });
        }

        let root = bundle.public_signals.root_field()?;
        if root != self.expected_root {
            info!(
                "rejecting stale root {} (expected {})",
                bundle.public_signals.root,
                crate::field::field_to_hex(self.expected_root)
            );
            return Ok(Verdict::Rejected(RejectReason::StaleRoot));
        }

        let nullifier_bytes = decode_hex_32(&bundle.public_signals.nullifier_hash, "nullifier")?;
        if self.spent.lock().contains(&nullifier_bytes) {
            info!(
                "rejecting duplicate nullifier {}",
                bundle.public_signals.nullifier_hash
            );
            return Ok(Verdict::Rejected(RejectReason::DuplicateSignal));
        }

        // The signal hash is recomputed from the submitted payload, not
        // taken from the bundle: a proof replayed with a different
        // payload fails the cryptographic check below.
        let expected_signal_hash = signal_hash(signal);
        if bundle.public_signals.signal_hash_field()? != expected_signal_hash {
            debug!("declared signal hash does not match the submitted payload");
        }

        let nullifier_hash = bundle.public_signals.nullifier_hash_field()?;
        let external_nullifier = bundle.public_signals.external_nullifier_field()?;
        let instance = vec![root, nullifier_hash, expected_signal_hash, external_nullifier];

        let strategy = SingleVerifier::new(&self.artifacts.params);
        let mut transcript = Blake2bRead::init(&bundle.proof[..]);
        let instance_slice: &[&[&[pallas::Base]]] = &[&[&instance]];

        let verified = verify_proof(
            &self.artifacts.params,
            &self.artifacts.vk,
            strategy,
            instance_slice,
            &mut transcript,
        )
        .is_ok();

        if !verified {
            warn!(
                "proof failed cryptographic verification (nullifier {})",
                bundle.public_signals.nullifier_hash
            );
            return Ok(Verdict::Rejected(RejectReason::InvalidProof));
        }

        // Single serialization point: insert returns false if another
        // submission spent this nullifier between the pre-check and now.
        if self.spent.lock().insert(nullifier_bytes) {
            info!(
                "accepted signal, nullifier {}",
                bundle.public_signals.nullifier_hash
            );
            Ok(Verdict::Accepted)
        } else {
            Ok(Verdict::Rejected(RejectReason::DuplicateSignal))
        }
    }
}

/// Durable sidecar file for spent nullifiers, one lowercase hex hash per
/// line. Lets a CLI verifier carry its spent set across runs.
pub struct NullifierStore {
    path: PathBuf,
}

impl NullifierStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads previously spent nullifiers. A missing file is an empty set.
    pub fn load(&self) -> Result<HashSet<[u8; HASH_SIZE]>, ProtocolError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(e.into()),
        };

        let mut spent = HashSet::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            spent.insert(decode_hex_32(trimmed, "stored nullifier")?);
        }
        Ok(spent)
    }

    /// Records one accepted nullifier, returning false if it was already
    /// present. The file is re-scanned at write time, so a nullifier
    /// recorded by another process after this store's set was loaded is
    /// still caught.
    pub fn record(&self, nullifier: &[u8; HASH_SIZE]) -> Result<bool, ProtocolError> {
        let encoded = hex::encode(nullifier);
        let file = fs::OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;

        for line in BufReader::new(&file).lines() {
            let line = line?;
            if line.trim().eq_ignore_ascii_case(&encoded) {
                return Ok(false);
            }
        }

        writeln!(&file, "{encoded}")?;
        Ok(true)
    }

    /// Convenience for recording a field-element nullifier hash.
    pub fn record_field(&self, nullifier: pallas::Base) -> Result<bool, ProtocolError> {
        self.record(&field_to_bytes(nullifier))
    }
}
