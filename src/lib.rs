//! Anonymous group signaling ("greeting") protocol.
//!
//! A user who belongs to a published group of identity commitments can
//! submit exactly one anonymous greeting per epoch. The pipeline:
//!
//! - [`Identity`]: secret (trapdoor, nullifier secret) pair plus a public
//!   commitment, derived deterministically from a wallet-signed message
//! - [`MembershipTree`]: fixed-depth Poseidon Merkle tree over the
//!   published commitments, producing [`MembershipProof`]s
//! - [`Witness`]: private and public circuit inputs for one greeting
//! - [`ProofEngine`]: halo2 proof generation against fixed circuit
//!   artifacts, producing a [`ProofBundle`]
//! - [`ProofVerifier`]: checks a bundle against the published root and a
//!   spent-nullifier set, so the same identity cannot signal twice in the
//!   same epoch
//! - [`SignalSubmitter`]: end-to-end orchestration of a single greeting
//!
//! The identity behind a greeting is never revealed; the only public link
//! between submissions is the nullifier hash, which is deterministic per
//! (identity, epoch) and therefore detects reuse without deanonymizing.

pub mod circuit;
pub mod config;
pub mod error;
pub mod field;
pub mod identity;
pub mod merkle;
pub mod submit;
pub mod types;
pub mod verifier;
pub mod witness;


pub use circuit::{CircuitArtifacts, GreeterCircuit, ProofEngine, ProofTask};
pub use error::ProtocolError;
pub use field::{bytes_to_field, field_to_bytes, poseidon_hash};
pub use identity::{Identity, IdentitySigner, WalletSigner, IDENTITY_MESSAGE};
pub use merkle::{MembershipProof, MembershipTree};
pub use submit::{CommitmentSource, SignalSubmitter, VerificationChannel};
pub use types::{ProofBundle, PublicSignals};
pub use verifier::{NullifierStore, ProofVerifier, RejectReason, Verdict};
pub use witness::{ExternalNullifier, Witness};

/// Depth of the published membership tree.
///
/// A depth of 20 supports 2^20 = 1,048,576 member commitments, matching
/// the depth the group publisher uses. The Merkle path length is part of
/// the circuit shape, so prover and verifier must agree on this value or
/// verification will fail.
pub const TREE_DEPTH: usize = 20;

/// Circuit parameter for the halo2 proving system.
///
/// `k = 12` creates a circuit with 2^12 = 4096 rows, enough for the 22
/// in-circuit Poseidon invocations of the depth-20 layout (commitment,
/// one fold per level, nullifier) with headroom. Changing `CIRCUIT_K`
/// requires regenerating proving and verifying keys, and prover and
/// verifier must use the same value. Each increment doubles circuit size
/// and proof generation time.
pub const CIRCUIT_K: u32 = 12;
