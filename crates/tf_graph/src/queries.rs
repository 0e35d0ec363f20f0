//! Relative-transform queries over the graph.

use nohash_hasher::IntSet;
use tf_types::{FrameId, RigidTransform};

use crate::FrameGraphError;
use crate::frame_store::FrameIdx;
use crate::graph::{TransformGraph, unknown_frame_id};

impl TransformGraph {
    /// Computes the transform relating two frames of the same tree.
    ///
    /// The result expresses points given in `to` coordinates in `from`
    /// coordinates: `transform_from_to("world", "camera")` applied to the
    /// origin yields the camera position in world coordinates.
    ///
    /// Fails with [`FrameGraphError::NotConnected`] when the frames live in
    /// different trees of the forest, and with
    /// [`FrameGraphError::CycleDetected`] if a root walk revisits a frame
    /// (which can only happen when internal state was corrupted externally;
    /// the walk terminates instead of looping).
    pub fn transform_from_to(
        &mut self,
        from: &str,
        to: &str,
    ) -> Result<RigidTransform, FrameGraphError> {
        let from_idx = self
            .store
            .index_of(from)
            .ok_or_else(|| FrameGraphError::FrameNotFound(FrameId::new(from)))?;
        let to_idx = self
            .store
            .index_of(to)
            .ok_or_else(|| FrameGraphError::FrameNotFound(FrameId::new(to)))?;
        if from_idx == to_idx {
            return Ok(RigidTransform::IDENTITY);
        }

        // A lowest common ancestor must exist for the frames to be related
        // at all; scanning one chain against the other's membership set
        // finds it (or proves the trees disjoint).
        let from_chain = self.chain_to_root(from_idx)?;
        let to_chain = self.chain_to_root(to_idx)?;
        let to_membership: IntSet<FrameIdx> = to_chain.iter().copied().collect();
        if !from_chain.iter().any(|idx| to_membership.contains(idx)) {
            return Err(FrameGraphError::NotConnected {
                from: FrameId::new(from),
                to: FrameId::new(to),
            });
        }

        // Composing through the shared root instead of walking up from the
        // LCA twice is the numerically stable form, and the memo keeps both
        // lookups O(depth) amortised.
        let world_from_from = self.world_from_frame_idx(from_idx)?;
        let world_from_to = self.world_from_frame_idx(to_idx)?;
        Ok(world_from_from.inverse() * world_from_to)
    }

    /// Walks from `idx` up to its root, returning the visited chain
    /// (`idx` first, root last).
    ///
    /// Re-detects cycles with a visited set as it walks, so a corrupted
    /// graph terminates with [`FrameGraphError::CycleDetected`].
    pub(crate) fn chain_to_root(&self, idx: FrameIdx) -> Result<Vec<FrameIdx>, FrameGraphError> {
        let mut chain = Vec::new();
        let mut visited: IntSet<FrameIdx> = IntSet::default();
        let mut current = Some(idx);
        while let Some(cur) = current {
            if !visited.insert(cur) {
                return Err(FrameGraphError::CycleDetected(self.frame_id(cur)));
            }
            let Some(node) = self.store.get(cur) else {
                return Err(FrameGraphError::FrameNotFound(unknown_frame_id()));
            };
            chain.push(cur);
            current = node.parent;
        }
        Ok(chain)
    }
}
