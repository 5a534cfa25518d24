//! Wire types for proof submission.

use log::debug;
use pasta_curves::pallas;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::field::{field_from_hex, field_to_hex};

/// Maximum accepted size for the opaque proof bytes. Proofs from the
/// expected circuit parameters are well below this; anything larger is a
/// malformed or incompatible submission.
pub const MAX_PROOF_SIZE: usize = 512 * 1024;

/// Public signals exposed by the circuit, hex-encoded field elements.
///
/// Exactly these four values are public: nothing about the trapdoor, the
/// nullifier secret, or the leaf position ever leaves the prover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicSignals {
    /// Membership tree root the proof was generated against.
    pub root: String,
    /// `Poseidon(external_nullifier, nullifier_secret)` — the sole
    /// anti-replay key.
    pub nullifier_hash: String,
    /// Hash of the greeting payload the proof is bound to.
    pub signal_hash: String,
    /// The scope (epoch) element the nullifier hash is bound to.
    pub external_nullifier: String,
}

impl PublicSignals {
    #[must_use]
    pub fn from_fields(
        root: pallas::Base,
        nullifier_hash: pallas::Base,
        signal_hash: pallas::Base,
        external_nullifier: pallas::Base,
    ) -> Self {
        Self {
            root: field_to_hex(root),
            nullifier_hash: field_to_hex(nullifier_hash),
            signal_hash: field_to_hex(signal_hash),
            external_nullifier: field_to_hex(external_nullifier),
        }
    }

    pub fn root_field(&self) -> Result<pallas::Base, ProtocolError> {
        field_from_hex(&self.root)
    }

    pub fn nullifier_hash_field(&self) -> Result<pallas::Base, ProtocolError> {
        field_from_hex(&self.nullifier_hash)
    }

    pub fn signal_hash_field(&self) -> Result<pallas::Base, ProtocolError> {
        field_from_hex(&self.signal_hash)
    }

    pub fn external_nullifier_field(&self) -> Result<pallas::Base, ProtocolError> {
        field_from_hex(&self.external_nullifier)
    }
}

/// One submission's worth of proof material, consumed exactly once by the
/// verifier. Serialized as JSON for the file/channel boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofBundle {
    /// Opaque halo2 proof bytes (Blake2b transcript).
    pub proof: Vec<u8>,
    pub public_signals: PublicSignals,
    /// Circuit/key version the proof was generated with. Verifier rejects
    /// bundles from a different version outright.
    pub version: String,
    /// Unix timestamp at generation time.
    pub timestamp: u64,
}

impl ProofBundle {
    const TIMESTAMP_TOLERANCE_SECS: u64 = 30;
    const TIMESTAMP_MAX_AGE_SECS: u64 = 86400;

    /// Stamps the bundle with the current time. Fails if the system
    /// clock reads before the unix epoch rather than emitting a
    /// timestamp that [`ProofBundle::validate`] would reject as stale.
    pub fn new(
        proof: Vec<u8>,
        public_signals: PublicSignals,
        version: String,
    ) -> Result<Self, ProtocolError> {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .map_err(|e| {
                ProtocolError::Proving(format!("system clock is before the unix epoch: {e}"))
            })?;
        Ok(Self {
            proof,
            public_signals,
            version,
            timestamp,
        })
    }

    /// Structural validation, run before any cryptographic work.
    ///
    /// Checks field presence, hex decodability of every public signal,
    /// proof size bounds, and timestamp sanity. Cheap by design; the
    /// expensive proof check only runs on bundles that pass.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        debug!(
            "validating bundle: proof={} bytes, version={}, timestamp={}",
            self.proof.len(),
            self.version,
            self.timestamp
        );

        if self.proof.is_empty() {
            return Err(ProtocolError::MalformedBundle(
                "proof bytes are missing".into(),
            ));
        }
        if self.proof.len() > MAX_PROOF_SIZE {
            return Err(ProtocolError::MalformedBundle(format!(
                "proof is {} bytes (limit {MAX_PROOF_SIZE}); likely generated with incompatible parameters",
                self.proof.len()
            )));
        }
        if self.version.is_empty() {
            return Err(ProtocolError::MalformedBundle(
                "artifact version is missing".into(),
            ));
        }

        // All four signals must decode to canonical field elements.
        self.public_signals.root_field()?;
        self.public_signals.nullifier_hash_field()?;
        self.public_signals.signal_hash_field()?;
        self.public_signals.external_nullifier_field()?;

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .map_err(|e| ProtocolError::MalformedBundle(format!("system clock unavailable: {e}")))?;

        if self.timestamp > now + Self::TIMESTAMP_TOLERANCE_SECS {
            return Err(ProtocolError::MalformedBundle(format!(
                "timestamp {} is in the future (now {now})",
                self.timestamp
            )));
        }
        if now > self.timestamp + Self::TIMESTAMP_MAX_AGE_SECS {
            return Err(ProtocolError::MalformedBundle(format!(
                "timestamp {} is older than {}s; generate a fresh proof",
                self.timestamp,
                Self::TIMESTAMP_MAX_AGE_SECS
            )));
        }

        Ok(())
    }
}
