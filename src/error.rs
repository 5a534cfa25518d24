//! Error taxonomy for the greeting protocol.
//!
//! Every failure a caller can act on gets its own variant: input errors
//! (bad message, unknown commitment, identity/leaf mismatch) are raised
//! before any expensive proving work, staleness and replay show up as
//! verifier verdicts, and cryptographic failures carry enough context to
//! tell a client bug from an adversarial submission.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The signed message fed to identity derivation is empty or too short
    /// to carry signature-grade entropy.
    #[error("signed message too short to derive an identity: {len} bytes (minimum {min})")]
    InvalidMessage { len: usize, min: usize },

    /// More commitments than a tree of the configured depth can hold.
    #[error("group has {len} commitments but a depth-{depth} tree holds at most {max}")]
    CapacityExceeded {
        len: usize,
        depth: usize,
        max: usize,
    },

    /// The commitment was never added to the membership tree.
    #[error("identity commitment is not a member of the group")]
    NotAMember,

    /// The membership proof was generated for a different leaf than the
    /// identity's commitment. A programming error, caught before proving.
    #[error("membership proof leaf does not match the identity commitment")]
    IdentityMismatch,

    /// The assembled witness cannot satisfy the circuit relations, e.g. a
    /// Merkle path that does not reach the claimed root.
    #[error("witness does not satisfy the circuit: {0}")]
    WitnessUnsatisfiable(&'static str),

    /// Prover and verifier disagree on the circuit/key version.
    #[error("circuit artifact version mismatch: verifier has {ours:?}, bundle was built with {theirs:?}")]
    ArtifactMismatch { ours: String, theirs: String },

    /// A proof bundle failed structural validation before any
    /// cryptographic check was attempted.
    #[error("malformed proof bundle: {0}")]
    MalformedBundle(String),

    /// The proving backend failed outright (distinct from an invalid
    /// proof, which is a verifier verdict).
    #[error("proving backend error: {0}")]
    Proving(String),

    /// The external signer refused or failed to sign.
    #[error("signer error: {0}")]
    Signer(String),

    /// The membership snapshot source could not produce the commitment
    /// list.
    #[error("commitment source error: {0}")]
    Source(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
