//! Witness assembly: the private and public inputs for one greeting.

use pasta_curves::pallas;

use crate::error::ProtocolError;
use crate::field::{poseidon_hash, scope_to_field, signal_hash};
use crate::identity::Identity;
use crate::merkle::MembershipProof;

/// Application-chosen scope that partitions allowed signals per identity.
///
/// This build binds one greeting per identity per *epoch*: the scope is an
/// epoch string such as `"epoch-1"`, hashed into the field. Two greetings
/// by the same identity in the same epoch produce the same nullifier hash
/// and the second is rejected; a new epoch re-enables signaling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalNullifier {
    scope: String,
    element: pallas::Base,
}

impl ExternalNullifier {
    #[must_use]
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
            element: scope_to_field(scope),
        }
    }

    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    #[must_use]
    pub fn element(&self) -> pallas::Base {
        self.element
    }
}

/// Full input set for the proving algorithm.
///
/// Private: identity secrets and the Merkle path. Public: root, external
/// nullifier, signal hash. The nullifier hash is derived, not stored.
pub struct Witness {
    pub(crate) trapdoor: pallas::Base,
    pub(crate) nullifier_secret: pallas::Base,
    pub path_elements: Vec<pallas::Base>,
    pub path_indices: Vec<bool>,
    pub root: pallas::Base,
    pub external_nullifier: pallas::Base,
    pub signal_hash: pallas::Base,
}

impl Witness {
    /// Packages identity secrets, the membership path, and the public
    /// inputs into one witness.
    ///
    /// # Errors
    ///
    /// `ProtocolError::IdentityMismatch` if the membership proof was
    /// generated for a different leaf than this identity's commitment.
    /// Caught here so an unsatisfiable circuit never reaches the prover.
    pub fn build(
        identity: &Identity,
        membership: &MembershipProof,
        external_nullifier: &ExternalNullifier,
        signal: &[u8],
    ) -> Result<Self, ProtocolError> {
        if membership.leaf != identity.commitment() {
            return Err(ProtocolError::IdentityMismatch);
        }

        Ok(Self {
            trapdoor: identity.trapdoor(),
            nullifier_secret: identity.nullifier_secret(),
            path_elements: membership.path_elements.clone(),
            path_indices: membership.path_indices.clone(),
            root: membership.root,
            external_nullifier: external_nullifier.element(),
            signal_hash: signal_hash(signal),
        })
    }

    /// Deterministic anti-replay key: `Poseidon(external_nullifier,
    /// nullifier_secret)`. Same identity + same scope always yields the
    /// same hash, which is what makes double-signal detection possible
    /// without revealing the identity.
    #[must_use]
    pub fn nullifier_hash(&self) -> pallas::Base {
        poseidon_hash(self.external_nullifier, self.nullifier_secret)
    }

    /// The identity commitment implied by the private inputs.
    #[must_use]
    pub fn commitment(&self) -> pallas::Base {
        poseidon_hash(self.trapdoor, self.nullifier_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::MembershipTree;

    fn member_identity() -> (Identity, MembershipTree) {
        let identity = Identity::derive(&[5u8; 65]).unwrap();
        let others = vec![pallas::Base::from(11), pallas::Base::from(22)];
        let mut commitments = others;
        commitments.push(identity.commitment());
        let tree = MembershipTree::build(commitments, 3).unwrap();
        (identity, tree)
    }

    #[test]
    fn test_build_witness() {
        let (identity, tree) = member_identity();
        let membership = tree.prove_membership(identity.commitment()).unwrap();
        let scope = ExternalNullifier::new("epoch-1");

        let witness = Witness::build(&identity, &membership, &scope, b"hello").unwrap();
        assert_eq!(witness.root, tree.root());
        assert_eq!(witness.commitment(), identity.commitment());
        assert_eq!(witness.path_elements.len(), 3);
    }

    #[test]
    fn test_identity_mismatch_caught_before_proving() {
        let (identity, tree) = member_identity();
        // A proof for someone else's leaf.
        let membership = tree.prove_membership(pallas::Base::from(11)).unwrap();
        let scope = ExternalNullifier::new("epoch-1");

        assert!(matches!(
            Witness::build(&identity, &membership, &scope, b"hello"),
            Err(ProtocolError::IdentityMismatch)
        ));
    }

    #[test]
    fn test_nullifier_hash_deterministic_per_scope() {
        let (identity, tree) = member_identity();
        let membership = tree.prove_membership(identity.commitment()).unwrap();

        let epoch1 = ExternalNullifier::new("epoch-1");
        let epoch2 = ExternalNullifier::new("epoch-2");

        let w1 = Witness::build(&identity, &membership, &epoch1, b"hello").unwrap();
        let w1_again = Witness::build(&identity, &membership, &epoch1, b"other").unwrap();
        let w2 = Witness::build(&identity, &membership, &epoch2, b"hello").unwrap();

        // Same scope: same nullifier regardless of payload.
        assert_eq!(w1.nullifier_hash(), w1_again.nullifier_hash());
        // New scope: fresh nullifier.
        assert_ne!(w1.nullifier_hash(), w2.nullifier_hash());
    }

    #[test]
    fn test_distinct_identities_distinct_nullifiers() {
        let a = Identity::derive(&[1u8; 65]).unwrap();
        let b = Identity::derive(&[2u8; 65]).unwrap();
        let tree =
            MembershipTree::build(vec![a.commitment(), b.commitment()], 3).unwrap();
        let scope = ExternalNullifier::new("epoch-1");

        let wa = Witness::build(&a, &tree.prove_membership(a.commitment()).unwrap(), &scope, b"x")
            .unwrap();
        let wb = Witness::build(&b, &tree.prove_membership(b.commitment()).unwrap(), &scope, b"x")
            .unwrap();
        assert_ne!(wa.nullifier_hash(), wb.nullifier_hash());
    }
}
