//! Interned, insertion-ordered storage of frames.
//!
//! Public API talks in string [`FrameId`]s; everything else in the crate
//! talks in dense [`FrameIdx`] indices into the vectors kept here.

use smallvec::SmallVec;
use tf_types::{FrameId, RigidTransform};

/// Dense index of a frame inside a [`FrameStore`].
///
/// Indices are assigned in insertion order and never reused, so index order
/// is insertion order, which in turn is topological order, since a frame's
/// parent must exist (and therefore have a smaller index) at insertion time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct FrameIdx(u32);

impl nohash_hasher::IsEnabled for FrameIdx {}

impl FrameIdx {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

pub(crate) struct FrameNode {
    pub id: FrameId,

    pub parent: Option<FrameIdx>,

    /// This frame expressed in its parent's coordinates.
    ///
    /// For a root this doubles as the world transform.
    pub parent_from_frame: RigidTransform,
}

/// Insertion-ordered set of frames with parent links and child adjacency.
///
/// Removed frames leave a tombstone slot behind instead of freeing their
/// index; that keeps index order equal to insertion order for the lifetime
/// of the store.
#[derive(Default)]
pub(crate) struct FrameStore {
    /// One slot per frame ever inserted; `None` marks a removed frame.
    nodes: Vec<Option<FrameNode>>,

    /// Child adjacency, indexed like `nodes`.
    children: Vec<SmallVec<[FrameIdx; 2]>>,

    /// Interning table from public id to dense index.
    index_of: ahash::HashMap<FrameId, FrameIdx>,
}

impl FrameStore {
    /// Number of live (non-removed) frames.
    #[inline]
    pub fn len(&self) -> usize {
        self.index_of.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index_of.is_empty()
    }

    /// Number of slots ever allocated, including tombstones.
    ///
    /// Vectors kept parallel to the store (like the world-transform memo)
    /// are sized by this.
    #[inline]
    pub fn num_slots(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn index_of(&self, id: &str) -> Option<FrameIdx> {
        self.index_of.get(id).copied()
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.index_of.contains_key(id)
    }

    #[inline]
    pub fn get(&self, idx: FrameIdx) -> Option<&FrameNode> {
        self.nodes.get(idx.index()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, idx: FrameIdx) -> Option<&mut FrameNode> {
        self.nodes.get_mut(idx.index()).and_then(Option::as_mut)
    }

    /// Child indices of `idx`, in insertion order of the children.
    #[inline]
    pub fn children(&self, idx: FrameIdx) -> &[FrameIdx] {
        self.children
            .get(idx.index())
            .map_or(&[], SmallVec::as_slice)
    }

    /// Inserts a new frame at the end of the insertion order.
    ///
    /// The caller must already have validated that `id` is unused and that
    /// `parent` (if any) is a live frame.
    pub fn insert(
        &mut self,
        id: FrameId,
        parent: Option<FrameIdx>,
        parent_from_frame: RigidTransform,
    ) -> FrameIdx {
        debug_assert!(!self.contains(id.as_str()), "id already interned");

        let idx = FrameIdx(self.nodes.len() as u32);
        self.index_of.insert(id.clone(), idx);
        self.nodes.push(Some(FrameNode {
            id,
            parent,
            parent_from_frame,
        }));
        self.children.push(SmallVec::new());

        if let Some(parent) = parent {
            self.children[parent.index()].push(idx);
        }

        idx
    }

    /// Removes `idx`, unlinking it from its parent's adjacency.
    ///
    /// The caller must already have validated that the frame has no children.
    pub fn remove(&mut self, idx: FrameIdx) -> Option<FrameNode> {
        debug_assert!(self.children(idx).is_empty(), "removing a non-leaf frame");

        let node = self.nodes.get_mut(idx.index())?.take()?;
        self.index_of.remove(node.id.as_str());
        if let Some(parent) = node.parent {
            self.children[parent.index()].retain(|child| *child != idx);
        }
        Some(node)
    }

    /// Live frames in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (FrameIdx, &FrameNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| Some((FrameIdx(i as u32), slot.as_ref()?)))
    }
}
