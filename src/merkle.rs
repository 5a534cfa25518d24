//! Fixed-depth Merkle tree over published identity commitments.
//!
//! The tree is an immutable snapshot: it is rebuilt from the published
//! commitment list whenever the group changes, never mutated in place, so
//! concurrent provers always see a self-consistent root. Leaves beyond the
//! appended commitments are a fixed zero value; empty subtrees are never
//! materialized thanks to a per-level zero-hash cache. Nodes are hashed
//! with the same Poseidon permutation the circuit tooling uses.

use pasta_curves::pallas;

use crate::error::ProtocolError;
use crate::field::poseidon_hash;

/// Membership proof: the sibling hashes along the path from a leaf to the
/// root, plus the direction bit at each level (true = the leaf-side node
/// is the right child). The same ordering convention is applied at proof
/// generation and verification; a mismatch makes the recomputed root
/// diverge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipProof {
    pub leaf: pallas::Base,
    pub root: pallas::Base,
    pub path_elements: Vec<pallas::Base>,
    pub path_indices: Vec<bool>,
}

impl MembershipProof {
    /// Recomputes the root by folding the leaf with its siblings.
    #[must_use]
    pub fn compute_root(&self) -> pallas::Base {
        let mut node = self.leaf;
        for (sibling, is_right) in self.path_elements.iter().zip(&self.path_indices) {
            node = if *is_right {
                poseidon_hash(*sibling, node)
            } else {
                poseidon_hash(node, *sibling)
            };
        }
        node
    }

    /// True if the path actually reaches the claimed root.
    #[must_use]
    pub fn verify(&self) -> bool {
        self.compute_root() == self.root
    }
}

/// Append-only membership tree of a fixed depth.
#[derive(Debug, Clone)]
pub struct MembershipTree {
    depth: usize,
    levels: Vec<Vec<pallas::Base>>,
    zeros: Vec<pallas::Base>,
    root: pallas::Base,
}

impl MembershipTree {
    /// Builds a tree from the ordered commitment list.
    ///
    /// The root is a pure function of the leaf sequence: any two parties
    /// holding the same list compute the same root.
    ///
    /// # Errors
    ///
    /// `ProtocolError::CapacityExceeded` if the list holds more than
    /// `2^depth` commitments.
    pub fn build(commitments: Vec<pallas::Base>, depth: usize) -> Result<Self, ProtocolError> {
        let max = 1usize << depth;
        if commitments.len() > max {
            return Err(ProtocolError::CapacityExceeded {
                len: commitments.len(),
                depth,
                max,
            });
        }

        // zeros[i] is the hash of an all-empty subtree of height i.
        let mut zeros = Vec::with_capacity(depth + 1);
        zeros.push(pallas::Base::zero());
        for i in 0..depth {
            zeros.push(poseidon_hash(zeros[i], zeros[i]));
        }

        let mut levels = Vec::with_capacity(depth + 1);
        levels.push(commitments);
        for level_idx in 0..depth {
            let current = &levels[level_idx];
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for i in (0..current.len()).step_by(2) {
                let left = current[i];
                let right = if i + 1 < current.len() {
                    current[i + 1]
                } else {
                    zeros[level_idx]
                };
                next.push(poseidon_hash(left, right));
            }
            levels.push(next);
        }

        let root = levels[depth].first().copied().unwrap_or(zeros[depth]);

        Ok(Self {
            depth,
            levels,
            zeros,
            root,
        })
    }

    #[must_use]
    pub fn root(&self) -> pallas::Base {
        self.root
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of appended commitments (excluding zero padding).
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    /// Index of a commitment in the leaf sequence, if present.
    #[must_use]
    pub fn leaf_index(&self, commitment: pallas::Base) -> Option<usize> {
        self.levels[0].iter().position(|leaf| *leaf == commitment)
    }

    /// Produces a membership proof for the given commitment.
    ///
    /// # Errors
    ///
    /// `ProtocolError::NotAMember` if the commitment was never appended.
    pub fn prove_membership(
        &self,
        commitment: pallas::Base,
    ) -> Result<MembershipProof, ProtocolError> {
        let mut index = self
            .leaf_index(commitment)
            .ok_or(ProtocolError::NotAMember)?;

        let mut path_elements = Vec::with_capacity(self.depth);
        let mut path_indices = Vec::with_capacity(self.depth);

        for level in 0..self.depth {
            let is_right = index % 2 == 1;
            let sibling_index = if is_right { index - 1 } else { index + 1 };
            let nodes = &self.levels[level];

            // Siblings past the occupied prefix are empty subtrees.
            let sibling = if sibling_index < nodes.len() {
                nodes[sibling_index]
            } else {
                self.zeros[level]
            };

            path_elements.push(sibling);
            path_indices.push(is_right);
            index /= 2;
        }

        Ok(MembershipProof {
            leaf: commitment,
            root: self.root,
            path_elements,
            path_indices,
        })
    }
}
