//! A transform graph with per-frame sample buffers for temporal queries.

use nohash_hasher::{IntMap, IntSet};
use tf_types::{FrameId, RigidTransform};

use crate::frame_store::FrameIdx;
use crate::graph::unknown_frame_id;
use crate::notifier::SubscriptionId;
use crate::sample_buffer::TransformSampleBuffer;
use crate::{FrameGraphError, TemporalQueryError, TransformGraph};

/// Options for a [`BufferedTransformGraph`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BufferedGraphOptions {
    /// Per-frame sample retention window, in milliseconds.
    pub max_buffer_duration_ms: f64,
}

impl Default for BufferedGraphOptions {
    #[inline]
    fn default() -> Self {
        Self {
            max_buffer_duration_ms: 10_000.0,
        }
    }
}

/// A [`TransformGraph`] extended with per-frame time-indexed sample buffers,
/// answering "what was the transform between these frames at time `t`?".
///
/// Time-stamped updates go through [`Self::set_transform`], which performs
/// the regular static update (cache invalidation, listener firing) and then
/// records the sample. Temporal queries bypass the static world-transform
/// memo entirely: [`Self::transform_from_to_at`] recomposes world transforms
/// from each frame's interpolated local transform at the requested time,
/// falling back to the static local transform for frames that were never
/// time-stamped.
///
/// Buffers are created lazily on the first time-stamped update of a frame
/// and dropped with the frame.
pub struct BufferedTransformGraph {
    graph: TransformGraph,
    buffers: IntMap<FrameIdx, TransformSampleBuffer>,
    options: BufferedGraphOptions,
}

impl Default for BufferedTransformGraph {
    #[inline]
    fn default() -> Self {
        Self::new(BufferedGraphOptions::default())
    }
}

impl BufferedTransformGraph {
    pub fn new(options: BufferedGraphOptions) -> Self {
        Self {
            graph: TransformGraph::new(),
            buffers: IntMap::default(),
            options,
        }
    }

    /// Builds a buffered graph whose static state replays `snapshot`
    /// (buffers start out empty; samples are not part of snapshots).
    pub fn from_snapshot(
        snapshot: &crate::GraphSnapshot,
        options: BufferedGraphOptions,
    ) -> Result<Self, FrameGraphError> {
        Ok(Self {
            graph: TransformGraph::from_snapshot(snapshot)?,
            buffers: IntMap::default(),
            options,
        })
    }

    #[inline]
    pub fn options(&self) -> &BufferedGraphOptions {
        &self.options
    }

    /// Read access to the underlying static graph (`has`, `ids`,
    /// `children`, snapshots, …).
    ///
    /// All mutation goes through the methods on this type so that buffer
    /// bookkeeping stays consistent with the graph.
    #[inline]
    pub fn graph(&self) -> &TransformGraph {
        &self.graph
    }

    /// See [`TransformGraph::add`].
    pub fn add(
        &mut self,
        id: &str,
        parent: Option<&str>,
        parent_from_frame: RigidTransform,
    ) -> Result<(), FrameGraphError> {
        self.graph.add(id, parent, parent_from_frame)
    }

    /// See [`TransformGraph::remove`]. Also drops the frame's buffer.
    pub fn remove(&mut self, id: &str) -> Result<(), FrameGraphError> {
        let idx = self.graph.store.index_of(id);
        self.graph.remove(id)?;
        if let Some(idx) = idx {
            self.buffers.remove(&idx);
        }
        Ok(())
    }

    /// See [`TransformGraph::set_local`]. The update is *not* recorded in
    /// the frame's buffer; use [`Self::set_transform`] for time-stamped
    /// updates.
    pub fn set_local(
        &mut self,
        id: &str,
        parent_from_frame: RigidTransform,
    ) -> Result<(), FrameGraphError> {
        self.graph.set_local(id, parent_from_frame)
    }

    /// See [`TransformGraph::set_local_batch`].
    pub fn set_local_batch(
        &mut self,
        updates: &[(&str, RigidTransform)],
    ) -> Result<(), FrameGraphError> {
        self.graph.set_local_batch(updates)
    }

    /// See [`TransformGraph::on_change`].
    pub fn on_change(
        &mut self,
        id: &str,
        callback: impl FnMut(&FrameId) + 'static,
    ) -> Result<SubscriptionId, FrameGraphError> {
        self.graph.on_change(id, callback)
    }

    /// See [`TransformGraph::unsubscribe`].
    pub fn unsubscribe(&mut self, subscription: SubscriptionId) {
        self.graph.unsubscribe(subscription);
    }

    /// See [`TransformGraph::transform_from_to`]: the static query against
    /// the current local transforms.
    pub fn transform_from_to(
        &mut self,
        from: &str,
        to: &str,
    ) -> Result<RigidTransform, FrameGraphError> {
        self.graph.transform_from_to(from, to)
    }

    /// See [`TransformGraph::world_from_frame`].
    pub fn world_from_frame(&mut self, id: &str) -> Result<RigidTransform, FrameGraphError> {
        self.graph.world_from_frame(id)
    }

    /// Updates the local transform of `id` as of `time_ms`.
    ///
    /// The static update runs first, invalidating the subtree and firing
    /// change listeners exactly like [`TransformGraph::set_local`]; the
    /// sample is then appended to the frame's buffer, creating the buffer on
    /// first use.
    pub fn set_transform(
        &mut self,
        id: &str,
        parent_from_frame: RigidTransform,
        time_ms: f64,
    ) -> Result<(), FrameGraphError> {
        self.graph.set_local(id, parent_from_frame)?;

        let idx = self
            .graph
            .store
            .index_of(id)
            .ok_or_else(|| FrameGraphError::FrameNotFound(FrameId::new(id)))?;
        self.buffers
            .entry(idx)
            .or_insert_with(|| TransformSampleBuffer::new(self.options.max_buffer_duration_ms))
            .push(time_ms, parent_from_frame);
        Ok(())
    }

    /// The transform relating two frames as of `time_ms`, composed from
    /// interpolated local transforms. Same orientation as
    /// [`TransformGraph::transform_from_to`]: the result expresses points
    /// given in `to` coordinates in `from` coordinates.
    ///
    /// A buffer that cannot serve `time_ms` surfaces its
    /// [`crate::InterpolationError::OutOfRange`] verbatim.
    pub fn transform_from_to_at(
        &self,
        from: &str,
        to: &str,
        time_ms: f64,
    ) -> Result<RigidTransform, TemporalQueryError> {
        let from_idx = self
            .graph
            .store
            .index_of(from)
            .ok_or_else(|| FrameGraphError::FrameNotFound(FrameId::new(from)))?;
        let to_idx = self
            .graph
            .store
            .index_of(to)
            .ok_or_else(|| FrameGraphError::FrameNotFound(FrameId::new(to)))?;
        if from_idx == to_idx {
            return Ok(RigidTransform::IDENTITY);
        }

        // Connectivity is a property of the graph structure, not of time;
        // the same chain walk as the static query applies.
        let from_chain = self.graph.chain_to_root(from_idx)?;
        let to_chain = self.graph.chain_to_root(to_idx)?;
        let to_membership: IntSet<FrameIdx> = to_chain.iter().copied().collect();
        if !from_chain.iter().any(|idx| to_membership.contains(idx)) {
            return Err(FrameGraphError::NotConnected {
                from: FrameId::new(from),
                to: FrameId::new(to),
            }
            .into());
        }

        let mut visiting = IntSet::default();
        let world_from_from = self.world_from_frame_at(from_idx, time_ms, &mut visiting)?;
        visiting.clear();
        let world_from_to = self.world_from_frame_at(to_idx, time_ms, &mut visiting)?;
        Ok(world_from_from.inverse() * world_from_to)
    }

    /// Recursively composes the world transform of `idx` as of `time_ms`,
    /// bypassing the static memo: each frame contributes its buffered local
    /// transform at `time_ms` when it has samples, its static local
    /// transform otherwise.
    fn world_from_frame_at(
        &self,
        idx: FrameIdx,
        time_ms: f64,
        visiting: &mut IntSet<FrameIdx>,
    ) -> Result<RigidTransform, TemporalQueryError> {
        if !visiting.insert(idx) {
            return Err(FrameGraphError::CycleDetected(self.graph.frame_id(idx)).into());
        }

        let Some(node) = self.graph.store.get(idx) else {
            return Err(FrameGraphError::FrameNotFound(unknown_frame_id()).into());
        };

        let parent_from_frame = match self.buffers.get(&idx) {
            Some(buffer) => buffer.interpolate(time_ms)?,
            None => node.parent_from_frame,
        };

        match node.parent {
            None => Ok(parent_from_frame),
            Some(parent) => {
                Ok(self.world_from_frame_at(parent, time_ms, visiting)? * parent_from_frame)
            }
        }
    }
}

impl std::fmt::Debug for BufferedTransformGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedTransformGraph")
            .field("graph", &self.graph)
            .field("buffered_frames", &self.buffers.len())
            .field("options", &self.options)
            .finish()
    }
}
