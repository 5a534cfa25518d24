//! End-to-end orchestration of one anonymous greeting.

use log::{debug, info};
use pasta_curves::pallas;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::circuit::ProofEngine;
use crate::error::ProtocolError;
use crate::field::field_from_hex;
use crate::identity::{Identity, IdentitySigner, IDENTITY_MESSAGE};
use crate::merkle::MembershipTree;
use crate::types::ProofBundle;
use crate::verifier::{ProofVerifier, Verdict};
use crate::witness::{ExternalNullifier, Witness};

/// External source of truth for the published commitment list.
pub trait CommitmentSource {
    fn fetch_commitments(&self) -> Result<Vec<pallas::Base>, ProtocolError>;
}

/// File-backed commitment source: one hex-encoded commitment per line,
/// in publication order.
pub struct CommitmentFile {
    path: PathBuf,
    max_file_size: u64,
}

impl CommitmentFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, max_file_size: u64) -> Self {
        Self {
            path: path.into(),
            max_file_size,
        }
    }
}

impl CommitmentSource for CommitmentFile {
    fn fetch_commitments(&self) -> Result<Vec<pallas::Base>, ProtocolError> {
        let metadata = fs::metadata(&self.path)?;
        if metadata.len() > self.max_file_size {
            return Err(ProtocolError::Source(format!(
                "group file {} is {} bytes (limit {})",
                self.path.display(),
                metadata.len(),
                self.max_file_size
            )));
        }

        let content = fs::read_to_string(&self.path)?;
        let mut commitments = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let commitment = field_from_hex(trimmed).map_err(|e| {
                ProtocolError::Source(format!(
                    "{} line {}: {e}",
                    self.path.display(),
                    line_no + 1
                ))
            })?;
            commitments.push(commitment);
        }

        debug!(
            "loaded {} commitments from {}",
            commitments.len(),
            self.path.display()
        );
        Ok(commitments)
    }
}

/// In-memory commitment source.
pub struct InMemoryCommitments(pub Vec<pallas::Base>);

impl CommitmentSource for InMemoryCommitments {
    fn fetch_commitments(&self) -> Result<Vec<pallas::Base>, ProtocolError> {
        Ok(self.0.clone())
    }
}

/// Opaque request/response channel to a verification service.
pub trait VerificationChannel {
    fn submit(&self, bundle: &ProofBundle, signal: &[u8]) -> Result<Verdict, ProtocolError>;
}

/// In-process channel wrapping a shared verifier. Stands in for the
/// network transport, which is out of scope here.
pub struct LocalChannel {
    verifier: Arc<ProofVerifier>,
}

impl LocalChannel {
    #[must_use]
    pub fn new(verifier: Arc<ProofVerifier>) -> Self {
        Self { verifier }
    }
}

impl VerificationChannel for LocalChannel {
    fn submit(&self, bundle: &ProofBundle, signal: &[u8]) -> Result<Verdict, ProtocolError> {
        self.verifier.verify(bundle, signal)
    }
}

/// Outcome of one submission attempt.
pub struct SubmitOutcome {
    pub bundle: ProofBundle,
    pub verdict: Verdict,
}

/// Drives the full pipeline: sign, derive, look up membership, build the
/// witness, prove on a worker thread, submit, report.
///
/// Exactly one submission attempt per [`SignalSubmitter::greet`] call and
/// no automatic retry: proof generation is too expensive for blind
/// retries, so the caller inspects the verdict and decides.
pub struct SignalSubmitter<S, C, V> {
    signer: S,
    source: C,
    channel: V,
    engine: ProofEngine,
}

impl<S, C, V> SignalSubmitter<S, C, V>
where
    S: IdentitySigner,
    C: CommitmentSource,
    V: VerificationChannel,
{
    #[must_use]
    pub fn new(signer: S, source: C, channel: V, engine: ProofEngine) -> Self {
        Self {
            signer,
            source,
            channel,
            engine,
        }
    }

    /// Submits one anonymous greeting under the given scope.
    pub fn greet(
        &self,
        signal: &str,
        scope: &ExternalNullifier,
    ) -> Result<SubmitOutcome, ProtocolError> {
        info!("deriving identity from signed message");
        let signed = self.signer.sign(IDENTITY_MESSAGE)?;
        let identity = Identity::derive(&signed)?;

        info!("fetching membership snapshot");
        let commitments = self.source.fetch_commitments()?;
        let tree = MembershipTree::build(commitments, self.engine.artifacts().depth)?;
        debug!("snapshot: {} members, depth {}", tree.len(), tree.depth());

        let membership = tree.prove_membership(identity.commitment())?;
        let witness = Witness::build(&identity, &membership, scope, signal.as_bytes())?;

        info!("generating proof on worker thread (scope {:?})", scope.scope());
        let task = self.engine.generate_on_worker(witness);
        let bundle = task.wait()?;

        info!("submitting proof bundle");
        let verdict = self.channel.submit(&bundle, signal.as_bytes())?;
        info!("verifier verdict: {verdict}");

        Ok(SubmitOutcome { bundle, verdict })
    }
}
