//! Merkle commitment over an ordered list of leaf digests.
//!
//! The variant used here is the one the deployed anchor contract verifies:
//!
//! - 0 leaves: the zero digest
//! - 1 leaf: the leaf itself, unhashed
//! - otherwise reduce pairwise level by level; an odd node at the end of a level
//!   is paired with itself
//! - a pair is combined as `digest(min(l, r) || max(l, r))`
//!
//! Because pairs are sorted before hashing, a proof is just the list of sibling
//! digests; no left/right flags are needed. Any change to this rule silently
//! invalidates every proof checked on the ledger.

use serde::{Deserialize, Serialize};

use crate::digest::{Digest, Hasher};

/// Combine two nodes with the sorted-pair rule.
pub fn combine(hasher: &Hasher, a: &Digest, b: &Digest) -> Digest {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    hasher.digest_parts(&[lo.as_bytes(), hi.as_bytes()])
}

/// Reduce one level to the next, pairing a trailing odd node with itself.
pub fn next_level(hasher: &Hasher, level: &[Digest]) -> Vec<Digest> {
    level
        .chunks(2)
        .map(|pair| {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            combine(hasher, left, right)
        })
        .collect()
}

/// Compute the root of `leaves`.
pub fn compute_root(hasher: &Hasher, leaves: &[Digest]) -> Digest {
    match leaves {
        [] => Digest::ZERO,
        [only] => *only,
        _ => {
            let mut level = next_level(hasher, leaves);
            while level.len() > 1 {
                level = next_level(hasher, &level);
            }
            level[0]
        }
    }
}

/// Bottom-up sibling list for the leaf at `index`.
///
/// Returns `None` when `index` is out of range. A self-paired node contributes
/// itself as its sibling.
pub fn build_proof(hasher: &Hasher, leaves: &[Digest], index: usize) -> Option<Vec<Digest>> {
    if index >= leaves.len() {
        return None;
    }

    let mut siblings = Vec::new();
    let mut level = leaves.to_vec();
    let mut index = index;

    while level.len() > 1 {
        let sibling = level.get(index ^ 1).unwrap_or(&level[index]);
        siblings.push(*sibling);
        level = next_level(hasher, &level);
        index /= 2;
    }

    Some(siblings)
}

/// Re-derive the root from `leaf` and `siblings` and compare with `root`.
pub fn verify(hasher: &Hasher, leaf: &Digest, siblings: &[Digest], root: &Digest) -> bool {
    let derived = siblings
        .iter()
        .fold(*leaf, |node, sibling| combine(hasher, &node, sibling));
    derived == *root
}

/// A fully materialized tree, level 0 being the leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Build every level of the tree.
    pub fn build(hasher: &Hasher, leaves: &[Digest]) -> Self {
        let mut levels = vec![leaves.to_vec()];
        while let Some(top) = levels.last() {
            if top.len() <= 1 {
                break;
            }
            let next = next_level(hasher, top);
            levels.push(next);
        }
        Self { levels }
    }

    /// The committed root.
    pub fn root(&self) -> Digest {
        match self.levels.last() {
            Some(top) if top.len() == 1 => top[0],
            _ => Digest::ZERO,
        }
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// All levels, leaves first.
    pub fn levels(&self) -> &[Vec<Digest>] {
        &self.levels
    }

    /// Sibling list for the leaf at `index`, read from the stored levels.
    pub fn proof(&self, index: usize) -> Option<Vec<Digest>> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut index = index;
        let mut siblings = Vec::with_capacity(self.levels.len().saturating_sub(1));
        for level in &self.levels[..self.levels.len() - 1] {
            siblings.push(*level.get(index ^ 1).unwrap_or(&level[index]));
            index /= 2;
        }
        Some(siblings)
    }
}

/// Evidence that an event is committed in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    /// The event id (leaf digest).
    pub leaf: Digest,
    /// Position of the leaf in the block.
    pub index: u64,
    /// Sibling digests, leaf level first.
    pub siblings: Vec<Digest>,
    /// Sequence number of the containing block.
    pub block_sequence: u64,
    /// Root the proof recomputes to.
    pub merkle_root: Digest,
}

impl InclusionProof {
    /// Check the proof against its own root.
    pub fn verify(&self, hasher: &Hasher) -> bool {
        verify(hasher, &self.leaf, &self.siblings, &self.merkle_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::DigestAlgorithm;
    use proptest::prelude::*;

    fn hasher() -> Hasher {
        Hasher::new(DigestAlgorithm::Keccak256)
    }

    fn leaf(n: u8) -> Digest {
        hasher().digest(&[n])
    }

    #[test]
    fn test_empty_root_is_zero() {
        assert_eq!(compute_root(&hasher(), &[]), Digest::ZERO);
        assert_eq!(MerkleTree::build(&hasher(), &[]).root(), Digest::ZERO);
        assert!(build_proof(&hasher(), &[], 0).is_none());
    }

    #[test]
    fn test_single_leaf_identity() {
        let x = leaf(1);
        assert_eq!(compute_root(&hasher(), &[x]), x);
        assert_eq!(build_proof(&hasher(), &[x], 0).unwrap(), Vec::<Digest>::new());
        assert!(verify(&hasher(), &x, &[], &x));
    }

    #[test]
    fn test_combine_is_order_independent() {
        let h = hasher();
        let (a, b) = (leaf(1), leaf(2));
        assert_eq!(combine(&h, &a, &b), combine(&h, &b, &a));
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        assert_eq!(combine(&h, &a, &b), h.digest_parts(&[lo.as_bytes(), hi.as_bytes()]));
    }

    #[test]
    fn test_odd_count_duplicates_last() {
        let h = hasher();
        let (a, b, c) = (leaf(1), leaf(2), leaf(3));
        let expected = combine(&h, &combine(&h, &a, &b), &combine(&h, &c, &c));
        assert_eq!(compute_root(&h, &[a, b, c]), expected);
    }

    #[test]
    fn test_three_leaf_proof_matches_hand_computed_tree() {
        let h = hasher();
        let mut ids = vec![leaf(10), leaf(20), leaf(30)];
        ids.sort();
        let (ha, hb, hc) = (ids[0], ids[1], ids[2]);

        let n1 = combine(&h, &ha, &hb);
        let n2 = combine(&h, &hc, &hc);
        let root = combine(&h, &n1, &n2);
        assert_eq!(compute_root(&h, &ids), root);

        let proof = build_proof(&h, &ids, 1).unwrap();
        assert_eq!(proof, vec![ha, n2]);
        assert!(verify(&h, &hb, &proof, &root));

        // Self-paired leaf lists itself as the first sibling.
        let proof_c = build_proof(&h, &ids, 2).unwrap();
        assert_eq!(proof_c, vec![hc, n1]);
        assert!(verify(&h, &hc, &proof_c, &root));
    }

    #[test]
    fn test_tree_levels_are_exposed() {
        let h = hasher();
        let leaves: Vec<Digest> = (0..5).map(leaf).collect();
        let tree = MerkleTree::build(&h, &leaves);
        let sizes: Vec<usize> = tree.levels().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![5, 3, 2, 1]);
        assert_eq!(tree.root(), compute_root(&h, &leaves));
        assert_eq!(tree.leaf_count(), 5);
        assert!(tree.proof(5).is_none());
    }

    #[test]
    fn test_tampered_proof_fails() {
        let h = hasher();
        let leaves: Vec<Digest> = (0..4).map(leaf).collect();
        let root = compute_root(&h, &leaves);
        let mut proof = build_proof(&h, &leaves, 2).unwrap();
        proof[0] = leaf(99);
        assert!(!verify(&h, &leaves[2], &proof, &root));
        assert!(!verify(&h, &leaf(99), &build_proof(&h, &leaves, 2).unwrap(), &root));
    }

    #[test]
    fn test_inclusion_proof_verify() {
        let h = hasher();
        let leaves: Vec<Digest> = (0..7).map(leaf).collect();
        let root = compute_root(&h, &leaves);
        let proof = InclusionProof {
            leaf: leaves[6],
            index: 6,
            siblings: build_proof(&h, &leaves, 6).unwrap(),
            block_sequence: 1,
            merkle_root: root,
        };
        assert!(proof.verify(&h));
        assert!(!proof.verify(&Hasher::new(DigestAlgorithm::Blake3)));
    }

    fn digests() -> impl Strategy<Value = Vec<Digest>> {
        prop::collection::vec(any::<[u8; 32]>().prop_map(Digest::from_bytes), 1..64)
    }

    proptest! {
        #[test]
        fn root_is_deterministic(leaves in digests()) {
            let h = hasher();
            prop_assert_eq!(compute_root(&h, &leaves), compute_root(&h, &leaves));
        }

        #[test]
        fn every_leaf_proves_into_root(leaves in digests()) {
            let h = hasher();
            let root = compute_root(&h, &leaves);
            let tree = MerkleTree::build(&h, &leaves);
            prop_assert_eq!(tree.root(), root);
            for (i, leaf) in leaves.iter().enumerate() {
                let proof = build_proof(&h, &leaves, i).unwrap();
                prop_assert_eq!(tree.proof(i).unwrap(), proof.clone());
                prop_assert!(verify(&h, leaf, &proof, &root));
            }
        }
    }
}
