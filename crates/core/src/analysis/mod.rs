//! Stateless tree analytics used by core detection.

use crate::tree::{Leaf, Tree};

/// Heaviest leaf by `count`. Ties keep the leftmost leaf; empty input gives `None`.
pub fn heaviest<'a, I>(leaves: I) -> Option<&'a Leaf>
where
    I: IntoIterator<Item = &'a Leaf>,
{
    let mut best: Option<&Leaf> = None;
    for leaf in leaves {
        if best.map_or(true, |b| leaf.count() > b.count()) {
            best = Some(leaf);
        }
    }
    best
}

/// How much bigger `leaf` is than its heaviest child, relative to that child.
///
/// `(leaf.count - child.count) / child.count`; 0 for a leaf without children.
pub fn variation(leaf: &Leaf) -> f64 {
    match heaviest(leaf.children()) {
        Some(child) if child.count() > 0 => {
            leaf.count().abs_diff(child.count()) as f64 / child.count() as f64
        }
        _ => 0.0,
    }
}

/// Heaviest leaf of the slice at `depth`.
pub fn biggest_in_slice(tree: &Tree, depth: usize) -> Option<&Leaf> {
    heaviest(tree.get_slice_by_depth(depth))
}
