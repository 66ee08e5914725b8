//! Naming hierarchy.
//!
//! A [`Tree`] owns a root [`Leaf`] and groups object names into a prefix
//! hierarchy using one of two insertion strategies:
//! - segment-delimited: names split on a structural delimiter (`com.acme.Foo`);
//! - prefix-merge: flat names merged and split on their greatest common prefix.
//!
//! Every node on an insertion path, the root included, records the inserted
//! object, so for any leaf `count == sum(child.count) + direct`.
//!
//! Trees are populated once and then only read; there is no removal.

use std::collections::{BTreeSet, VecDeque};
use std::fmt::Write as _;

use serde::Serialize;
use thiserror::Error;

use crate::model::{ObjectId, ObjectRecord};

pub mod builder;
mod prefix;
mod segment;

pub use builder::{InsertReport, TreeBuilder};

/// Per-record insertion failures. These never abort a bulk build; see
/// [`TreeBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertError {
    #[error("cannot insert an empty name")]
    EmptyName,

    #[error("name '{name}' contains an empty segment")]
    EmptySegment { name: String },
}

/// How names are placed into the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsertStrategy {
    SegmentDelimited { delimiter: char },
    PrefixMerge,
}

/// One node of the naming hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leaf {
    name: String,
    full_name: String,
    depth: usize,
    count: u64,
    direct: u64,
    object_ids: BTreeSet<ObjectId>,
    object_types: BTreeSet<String>,
    levels: BTreeSet<String>,
    children: Vec<Leaf>,
}

/// Attributes recorded on every leaf an object passes through.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Attachment<'a> {
    pub id: ObjectId,
    pub internal_type: Option<&'a str>,
    pub level: Option<&'a str>,
}

impl<'a> Attachment<'a> {
    pub(crate) fn bare(id: ObjectId) -> Self {
        Self { id, internal_type: None, level: None }
    }

    pub(crate) fn from_record(record: &'a ObjectRecord) -> Self {
        Self {
            id: record.id,
            internal_type: record.internal_type.as_deref(),
            level: record.level.as_deref(),
        }
    }
}

impl Leaf {
    pub(crate) fn new(name: impl Into<String>, full_name: impl Into<String>, depth: usize) -> Self {
        Self {
            name: name.into(),
            full_name: full_name.into(),
            depth,
            count: 0,
            direct: 0,
            object_ids: BTreeSet::new(),
            object_types: BTreeSet::new(),
            levels: BTreeSet::new(),
            children: Vec::new(),
        }
    }

    /// Local name (last segment, or the whole name for prefix-merge trees).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full path from the root.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Depth of this leaf; the root's direct children are at depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of insertions that passed through this leaf.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Number of insertions that ended exactly at this leaf.
    pub fn direct_count(&self) -> u64 {
        self.direct
    }

    /// Ids attached here or anywhere below.
    pub fn object_ids(&self) -> &BTreeSet<ObjectId> {
        &self.object_ids
    }

    /// Internal types of the objects attached here or below.
    pub fn object_types(&self) -> &BTreeSet<String> {
        &self.object_types
    }

    pub fn levels(&self) -> &BTreeSet<String> {
        &self.levels
    }

    /// Children in first-seen order.
    pub fn children(&self) -> &[Leaf] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn attach(&mut self, attachment: &Attachment<'_>) {
        self.count += 1;
        self.object_ids.insert(attachment.id);
        if let Some(t) = attachment.internal_type {
            self.object_types.insert(t.to_string());
        }
        if let Some(level) = attachment.level {
            self.levels.insert(level.to_string());
        }
    }

    /// Merge the aggregate of `other` into this leaf without taking its children.
    pub(crate) fn absorb(&mut self, other: &Leaf) {
        self.count += other.count;
        self.object_ids.extend(other.object_ids.iter().copied());
        self.object_types.extend(other.object_types.iter().cloned());
        self.levels.extend(other.levels.iter().cloned());
    }

    pub(crate) fn shift_depth(&mut self, by: usize) {
        self.depth += by;
        for child in &mut self.children {
            child.shift_depth(by);
        }
    }
}

/// Row produced by [`Tree::flatten`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatLeaf {
    /// Sequential id in flattening order; the root is 0.
    pub id: usize,
    pub parent_id: Option<usize>,
    pub name: String,
    pub full_name: String,
    pub depth: usize,
    pub count: u64,
}

/// A naming hierarchy built with a single insertion strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tree {
    root: Leaf,
    strategy: InsertStrategy,
}

impl Tree {
    pub fn new(strategy: InsertStrategy) -> Self {
        Self { root: Leaf::new("", "", 0), strategy }
    }

    pub fn segment_delimited(delimiter: char) -> Self {
        Self::new(InsertStrategy::SegmentDelimited { delimiter })
    }

    pub fn prefix_merge() -> Self {
        Self::new(InsertStrategy::PrefixMerge)
    }

    pub fn strategy(&self) -> InsertStrategy {
        self.strategy
    }

    /// The root represents the empty prefix.
    pub fn root(&self) -> &Leaf {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Total number of insertions.
    pub fn object_count(&self) -> u64 {
        self.root.count
    }

    /// Insert a bare id under `full_name`.
    pub fn insert(&mut self, full_name: &str, id: ObjectId) -> Result<(), InsertError> {
        self.insert_attachment(full_name, &Attachment::bare(id))
    }

    /// Insert a record under `full_name`, aggregating its type and level.
    pub fn insert_object(
        &mut self,
        full_name: &str,
        record: &ObjectRecord,
    ) -> Result<(), InsertError> {
        self.insert_attachment(full_name, &Attachment::from_record(record))
    }

    fn insert_attachment(
        &mut self,
        full_name: &str,
        attachment: &Attachment<'_>,
    ) -> Result<(), InsertError> {
        match self.strategy {
            InsertStrategy::SegmentDelimited { delimiter } => {
                segment::insert(&mut self.root, full_name, delimiter, attachment)
            }
            InsertStrategy::PrefixMerge => prefix::insert(&mut self.root, full_name, attachment),
        }
    }

    /// Leaves at exactly `depth`, in breadth-first discovery order.
    ///
    /// Leaves shallower than `depth` are expanded; a leaf at `depth` is
    /// collected and its subtree is not visited.
    pub fn get_slice_by_depth(&self, depth: usize) -> Vec<&Leaf> {
        let mut slice = Vec::new();
        let mut queue: VecDeque<&Leaf> = self.root.children.iter().collect();
        while let Some(leaf) = queue.pop_front() {
            if leaf.depth == depth {
                slice.push(leaf);
            } else if leaf.depth < depth {
                queue.extend(leaf.children.iter());
            }
        }
        slice
    }

    /// The root followed by every internal node (at least one child), in
    /// breadth-first order, each with a sequential id and its parent's id.
    ///
    /// Parent ids are resolved while traversing, so the cost is linear. The
    /// rows are the same as a first-match search for the parent over the
    /// flattened list would produce.
    pub fn flatten(&self) -> Vec<FlatLeaf> {
        let mut out = Vec::new();
        let mut queue: VecDeque<(&Leaf, Option<usize>)> = VecDeque::from([(&self.root, None)]);
        while let Some((leaf, parent_id)) = queue.pop_front() {
            let id = out.len();
            out.push(FlatLeaf {
                id,
                parent_id,
                name: leaf.name.clone(),
                full_name: leaf.full_name.clone(),
                depth: leaf.depth,
                count: leaf.count,
            });
            for child in leaf.children.iter().filter(|c| !c.is_leaf()) {
                queue.push_back((child, Some(id)));
            }
        }
        out
    }

    /// Breadth-first iterator over every non-root leaf.
    pub fn iter(&self) -> Bfs<'_> {
        Bfs { queue: self.root.children.iter().collect() }
    }

    /// First leaf (breadth-first) with the given full name.
    pub fn find(&self, full_name: &str) -> Option<&Leaf> {
        self.iter().find(|leaf| leaf.full_name == full_name)
    }

    /// Indented text rendering, one line per leaf, root first.
    pub fn render(&self) -> String {
        let mut out = String::new();
        render_leaf(&self.root, 0, None, &mut out);
        out
    }

    /// Same as [`Tree::render`] but stops below `max_depth`.
    pub fn render_to_depth(&self, max_depth: usize) -> String {
        let mut out = String::new();
        render_leaf(&self.root, 0, Some(max_depth), &mut out);
        out
    }
}

fn render_leaf(leaf: &Leaf, level: usize, max_depth: Option<usize>, out: &mut String) {
    let indent = "__".repeat(level);
    let _ = writeln!(out, "|{} : {}  ::  {} :: {}", indent, leaf.name, leaf.depth, leaf.count);
    for child in &leaf.children {
        if max_depth.is_some_and(|max| child.depth > max) {
            continue;
        }
        render_leaf(child, level + 1, max_depth, out);
    }
}

impl<'a> IntoIterator for &'a Tree {
    type Item = &'a Leaf;
    type IntoIter = Bfs<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Breadth-first walk, see [`Tree::iter`].
pub struct Bfs<'a> {
    queue: VecDeque<&'a Leaf>,
}

impl<'a> Iterator for Bfs<'a> {
    type Item = &'a Leaf;

    fn next(&mut self) -> Option<Self::Item> {
        let leaf = self.queue.pop_front()?;
        self.queue.extend(leaf.children.iter());
        Some(leaf)
    }
}
