//! BLAKE3 commitment tree over (recipient, amount) entitlement pairs.
//!
//! Uses domain-separated hashing to prevent second-preimage attacks:
//! - Leaf hash: `BLAKE3(0x00 || account || amount_le)`
//! - Internal node: `BLAKE3(0x01 || lo || hi)` where `(lo, hi)` is the
//!   byte-wise sorted pair
//!
//! Sorting the pair before hashing makes verification independent of the
//! order in which proof siblings were generated, so a proof is just a flat
//! list of hashes with no left/right markers.
//!
//! Odd-length layers are padded by duplicating the last element.
//! Empty trees produce [`Hash256::ZERO`].

use crate::types::{AccountId, Amount, Hash256};

/// Domain separation prefix for leaf hashes.
const LEAF_PREFIX: u8 = 0x00;

/// Domain separation prefix for internal node hashes.
const NODE_PREFIX: u8 = 0x01;

/// Compute the leaf hash of an entitlement pair:
/// `BLAKE3(0x00 || account || amount_le)`.
pub fn leaf_hash(account: &AccountId, amount: Amount) -> Hash256 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[LEAF_PREFIX]);
    hasher.update(account.as_bytes());
    hasher.update(&amount.to_le_bytes());
    Hash256(hasher.finalize().into())
}

/// Combine two nodes into their parent: `BLAKE3(0x01 || lo || hi)`.
///
/// The pair is sorted before hashing, so `node_hash(a, b) == node_hash(b, a)`.
pub fn node_hash(a: &Hash256, b: &Hash256) -> Hash256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[NODE_PREFIX]);
    hasher.update(lo.as_bytes());
    hasher.update(hi.as_bytes());
    Hash256(hasher.finalize().into())
}

/// Verify that `(account, amount)` belongs to the tree committed to by
/// `root`, given the sibling hashes along the path from leaf to root.
///
/// Stateless and side-effect free; callers map a `false` result to their
/// own error kind.
pub fn verify(root: &Hash256, account: &AccountId, amount: Amount, proof: &[Hash256]) -> bool {
    let mut current = leaf_hash(account, amount);
    for sibling in proof {
        current = node_hash(&current, sibling);
    }
    current == *root
}

/// Full commitment tree supporting root computation and proof extraction.
///
/// Built off-line from the complete entitlement set; the engine itself only
/// ever sees the root and individual proofs.
#[derive(Clone, Debug)]
pub struct CommitmentTree {
    /// `layers[0]` = leaf hashes, `layers[last]` = `[root]`.
    layers: Vec<Vec<Hash256>>,
}

impl CommitmentTree {
    /// Build a tree from the full entitlement set.
    pub fn from_entitlements(entitlements: &[(AccountId, Amount)]) -> Self {
        if entitlements.is_empty() {
            return Self { layers: Vec::new() };
        }

        let leaf_layer: Vec<Hash256> = entitlements
            .iter()
            .map(|(account, amount)| leaf_hash(account, *amount))
            .collect();
        let mut layers = vec![leaf_layer];

        while layers.last().is_some_and(|l| l.len() > 1) {
            let prev = layers.last().expect("non-empty by construction");
            layers.push(next_layer(prev));
        }

        Self { layers }
    }

    /// The commitment root. Returns [`Hash256::ZERO`] for an empty tree.
    pub fn root(&self) -> Hash256 {
        self.layers
            .last()
            .and_then(|l| l.first())
            .copied()
            .unwrap_or(Hash256::ZERO)
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        self.layers.first().map_or(0, Vec::len)
    }

    /// Extract the inclusion proof for the leaf at `index`.
    ///
    /// Returns `None` if the index is out of bounds or the tree is empty.
    pub fn proof(&self, index: usize) -> Option<Vec<Hash256>> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut path = Vec::new();
        let mut pos = index;

        for layer in &self.layers[..self.layers.len() - 1] {
            let sibling_pos = pos ^ 1;
            let sibling = if sibling_pos < layer.len() {
                layer[sibling_pos]
            } else {
                // Odd layer: last element's sibling is itself (duplication)
                layer[pos]
            };
            path.push(sibling);
            pos /= 2;
        }

        Some(path)
    }
}

/// Compute the next layer of the tree from the current one.
///
/// Pairs adjacent hashes with [`node_hash`]. Duplicates the last element
/// when the layer has an odd number of entries.
fn next_layer(layer: &[Hash256]) -> Vec<Hash256> {
    let mut next = Vec::with_capacity(layer.len().div_ceil(2));
    let mut i = 0;
    while i < layer.len() {
        let left = &layer[i];
        let right = if i + 1 < layer.len() { &layer[i + 1] } else { left };
        next.push(node_hash(left, right));
        i += 2;
    }
    next
}
