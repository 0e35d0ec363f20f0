//! The static transform graph: mutators, world-transform memo, notification.

use nohash_hasher::IntSet;
use tf_types::{FrameId, RigidTransform};

use crate::FrameGraphError;
use crate::frame_store::{FrameIdx, FrameStore};
use crate::notifier::{ChangeNotifier, SubscriptionId};

/// Stand-in id for a frame that vanished from the store while a link to it
/// remained. Only reachable if internal state was corrupted externally.
pub(crate) fn unknown_frame_id() -> FrameId {
    FrameId::new("<unknown>")
}

/// A forest of named frames, each placed by a rigid transform relative to a
/// parent frame.
///
/// The graph answers "what transform relates frame A to frame B?" in
/// O(depth) amortised time: world transforms (root-to-frame compositions)
/// are memoised, and mutators only *invalidate* the affected subtree;
/// recomputation is deferred to the next query that needs it. This makes a
/// single-leaf update O(1) regardless of how much of the tree a later query
/// actually touches.
///
/// Every mutator validates all of its preconditions before touching any
/// state; on error the graph is unchanged.
///
/// Change listeners registered via [`Self::on_change`] fire after a mutator
/// has finished invalidating, once for every frame whose world transform
/// went stale.
#[derive(Default)]
pub struct TransformGraph {
    pub(crate) store: FrameStore,

    /// Memoised world transform per store slot; `None` is "not computed".
    world_from_frame: Vec<Option<RigidTransform>>,

    /// Frames whose memo entry is stale and must be recomputed before use.
    ///
    /// Invariant on mutator return: every descendant of a dirty frame is
    /// itself dirty (or has no memo entry).
    dirty: IntSet<FrameIdx>,

    notifier: ChangeNotifier,
}

impl TransformGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new frame under `parent`, or as a new root if `parent` is
    /// `None`.
    ///
    /// `parent_from_frame` places the frame in its parent's coordinates
    /// (pass [`RigidTransform::IDENTITY`] for a co-located frame).
    pub fn add(
        &mut self,
        id: &str,
        parent: Option<&str>,
        parent_from_frame: RigidTransform,
    ) -> Result<(), FrameGraphError> {
        if self.store.contains(id) {
            return Err(FrameGraphError::DuplicateFrame(FrameId::new(id)));
        }

        let parent_idx = match parent {
            Some(parent_id) => {
                let parent_idx = self
                    .store
                    .index_of(parent_id)
                    .ok_or_else(|| FrameGraphError::ParentNotFound(FrameId::new(parent_id)))?;
                self.ensure_chain_acyclic(id, parent_idx)?;
                Some(parent_idx)
            }
            None => None,
        };

        let idx = self
            .store
            .insert(FrameId::new(id), parent_idx, parent_from_frame);
        debug_assert_eq!(idx.index(), self.world_from_frame.len());
        self.world_from_frame.push(None);
        self.dirty.insert(idx);

        self.notify(&[idx]);
        Ok(())
    }

    /// Removes a frame. Fails with [`FrameGraphError::HasChildren`] unless
    /// the frame is a leaf; children must be removed first.
    ///
    /// Dropping the frame also drops its change listeners and memo entry.
    pub fn remove(&mut self, id: &str) -> Result<(), FrameGraphError> {
        let idx = self
            .store
            .index_of(id)
            .ok_or_else(|| FrameGraphError::FrameNotFound(FrameId::new(id)))?;
        if !self.store.children(idx).is_empty() {
            return Err(FrameGraphError::HasChildren(FrameId::new(id)));
        }

        self.store.remove(idx);
        if let Some(slot) = self.world_from_frame.get_mut(idx.index()) {
            *slot = None;
        }
        self.dirty.remove(&idx);
        self.notifier.remove_frame(idx);
        Ok(())
    }

    /// Replaces the local transform of `id`, invalidating the memo for the
    /// whole subtree below it.
    pub fn set_local(
        &mut self,
        id: &str,
        parent_from_frame: RigidTransform,
    ) -> Result<(), FrameGraphError> {
        let idx = self
            .store
            .index_of(id)
            .ok_or_else(|| FrameGraphError::FrameNotFound(FrameId::new(id)))?;
        let Some(node) = self.store.get_mut(idx) else {
            return Err(FrameGraphError::FrameNotFound(FrameId::new(id)));
        };
        node.parent_from_frame = parent_from_frame;

        let stale = self.invalidate_subtree(idx);
        self.notify(&stale);
        Ok(())
    }

    /// Replaces the local transforms of several frames at once.
    ///
    /// All ids are validated up front; if any is unknown, nothing is
    /// applied. The stale set is the union of the touched subtrees,
    /// deduplicated so that a frame whose ancestor is also in the batch does
    /// not trigger a redundant subtree traversal. Listeners still fire
    /// exactly once per stale frame.
    ///
    /// If the same id appears more than once, the last transform wins.
    pub fn set_local_batch(
        &mut self,
        updates: &[(&str, RigidTransform)],
    ) -> Result<(), FrameGraphError> {
        // Validate every id before mutating anything.
        let mut resolved = Vec::with_capacity(updates.len());
        let mut batch_keys: IntSet<FrameIdx> = IntSet::default();
        for (id, parent_from_frame) in updates {
            let idx = self
                .store
                .index_of(id)
                .ok_or_else(|| FrameGraphError::FrameNotFound(FrameId::new(*id)))?;
            if !batch_keys.insert(idx) {
                log::warn!(
                    "frame {id:?} appears more than once in a batch update; the last transform wins"
                );
            }
            resolved.push((idx, *parent_from_frame));
        }

        // Decide which subtrees to traverse, still before mutating: a frame
        // with an ancestor in the batch is covered by that ancestor's
        // subtree already.
        let mut subtree_roots = Vec::new();
        let mut seen: IntSet<FrameIdx> = IntSet::default();
        for (idx, _) in &resolved {
            if seen.insert(*idx) && !self.has_ancestor_in(*idx, &batch_keys)? {
                subtree_roots.push(*idx);
            }
        }

        // Apply in input order, so a duplicated id ends up with its last
        // transform.
        for (idx, parent_from_frame) in &resolved {
            if let Some(node) = self.store.get_mut(*idx) {
                node.parent_from_frame = *parent_from_frame;
            }
        }

        let mut stale = Vec::new();
        for root in subtree_roots {
            stale.extend(self.invalidate_subtree(root));
        }

        self.notify(&stale);
        Ok(())
    }

    #[inline]
    pub fn has(&self, id: &str) -> bool {
        self.store.contains(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// All frame ids, in insertion order (parents before children).
    pub fn ids(&self) -> impl Iterator<Item = &FrameId> {
        self.store.iter().map(|(_, node)| &node.id)
    }

    /// Child ids of `id`, in insertion order.
    pub fn children(
        &self,
        id: &str,
    ) -> Result<impl Iterator<Item = &FrameId>, FrameGraphError> {
        let idx = self
            .store
            .index_of(id)
            .ok_or_else(|| FrameGraphError::FrameNotFound(FrameId::new(id)))?;
        Ok(self
            .store
            .children(idx)
            .iter()
            .filter_map(|child| self.store.get(*child).map(|node| &node.id)))
    }

    /// Whether `id` has at least one child. `false` for unknown ids.
    pub fn has_children(&self, id: &str) -> bool {
        self.store
            .index_of(id)
            .is_some_and(|idx| !self.store.children(idx).is_empty())
    }

    /// The parent id of `id`, or `None` for a root.
    pub fn parent(&self, id: &str) -> Result<Option<&FrameId>, FrameGraphError> {
        let idx = self
            .store
            .index_of(id)
            .ok_or_else(|| FrameGraphError::FrameNotFound(FrameId::new(id)))?;
        Ok(self
            .store
            .get(idx)
            .and_then(|node| node.parent)
            .and_then(|parent| self.store.get(parent))
            .map(|parent| &parent.id))
    }

    /// The local transform of `id`, expressing it in its parent's
    /// coordinates.
    pub fn parent_from_frame(&self, id: &str) -> Result<RigidTransform, FrameGraphError> {
        let idx = self
            .store
            .index_of(id)
            .ok_or_else(|| FrameGraphError::FrameNotFound(FrameId::new(id)))?;
        self.store
            .get(idx)
            .map(|node| node.parent_from_frame)
            .ok_or_else(|| FrameGraphError::FrameNotFound(FrameId::new(id)))
    }

    /// The composed world transform of `id`: the transform from `id`'s
    /// coordinates into the coordinates of its tree's root.
    ///
    /// Resolved lazily: stale memo entries are recomputed on demand, which
    /// is why this takes `&mut self`.
    pub fn world_from_frame(&mut self, id: &str) -> Result<RigidTransform, FrameGraphError> {
        let idx = self
            .store
            .index_of(id)
            .ok_or_else(|| FrameGraphError::FrameNotFound(FrameId::new(id)))?;
        self.world_from_frame_idx(idx)
    }

    /// Registers `callback` to run whenever the world transform of `id` goes
    /// stale, with the stale frame's id as argument.
    ///
    /// Callbacks fire synchronously at the end of the mutator, after all
    /// invalidation has completed; callbacks on the same frame fire in
    /// registration order. The graph is already consistent when they run.
    /// Mutating the graph from inside a callback is unsupported: reaching
    /// it requires shared ownership (e.g. `Rc<RefCell<_>>`), whose borrow
    /// check will fail at runtime while the mutator is still borrowed.
    pub fn on_change(
        &mut self,
        id: &str,
        callback: impl FnMut(&FrameId) + 'static,
    ) -> Result<SubscriptionId, FrameGraphError> {
        let idx = self
            .store
            .index_of(id)
            .ok_or_else(|| FrameGraphError::FrameNotFound(FrameId::new(id)))?;
        Ok(self.notifier.subscribe(idx, Box::new(callback)))
    }

    /// Removes the subscription behind `subscription`. A no-op if the
    /// subscription (or its frame) is gone already.
    pub fn unsubscribe(&mut self, subscription: SubscriptionId) {
        self.notifier.unsubscribe(subscription);
    }

    // --- internals ---

    pub(crate) fn world_from_frame_idx(
        &mut self,
        idx: FrameIdx,
    ) -> Result<RigidTransform, FrameGraphError> {
        let mut visiting = IntSet::default();
        self.world_from_frame_memoized(idx, &mut visiting)
    }

    /// The lazy recompute: return the memo entry if it is fresh, otherwise
    /// recurse to the parent, compose, and fill the memo on the way back.
    fn world_from_frame_memoized(
        &mut self,
        idx: FrameIdx,
        visiting: &mut IntSet<FrameIdx>,
    ) -> Result<RigidTransform, FrameGraphError> {
        if !self.dirty.contains(&idx)
            && let Some(world_from_frame) = self.world_from_frame.get(idx.index()).copied().flatten()
        {
            return Ok(world_from_frame);
        }

        if !visiting.insert(idx) {
            return Err(FrameGraphError::CycleDetected(self.frame_id(idx)));
        }

        let Some(node) = self.store.get(idx) else {
            return Err(FrameGraphError::FrameNotFound(unknown_frame_id()));
        };
        let parent = node.parent;
        let parent_from_frame = node.parent_from_frame;

        let world_from_frame = match parent {
            None => parent_from_frame,
            Some(parent) => self.world_from_frame_memoized(parent, visiting)? * parent_from_frame,
        };

        if let Some(slot) = self.world_from_frame.get_mut(idx.index()) {
            *slot = Some(world_from_frame);
        }
        self.dirty.remove(&idx);
        Ok(world_from_frame)
    }

    /// Marks `root` and every descendant stale and clears their memo
    /// entries. Returns the stale set in traversal order, mutated frame
    /// first. Listeners fire in this order.
    fn invalidate_subtree(&mut self, root: FrameIdx) -> Vec<FrameIdx> {
        let mut stale = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if let Some(slot) = self.world_from_frame.get_mut(current.index()) {
                *slot = None;
            }
            self.dirty.insert(current);
            stale.push(current);
            stack.extend_from_slice(self.store.children(current));
        }

        log::trace!("invalidated {} frame(s)", stale.len());
        stale
    }

    /// Whether any proper ancestor of `idx` is in `keys`.
    fn has_ancestor_in(
        &self,
        idx: FrameIdx,
        keys: &IntSet<FrameIdx>,
    ) -> Result<bool, FrameGraphError> {
        let mut visited: IntSet<FrameIdx> = IntSet::default();
        let mut current = self.store.get(idx).and_then(|node| node.parent);
        while let Some(cur) = current {
            if keys.contains(&cur) {
                return Ok(true);
            }
            if !visited.insert(cur) {
                return Err(FrameGraphError::CycleDetected(self.frame_id(cur)));
            }
            current = self.store.get(cur).and_then(|node| node.parent);
        }
        Ok(false)
    }

    /// Guard used at `add` time: walking up from the declared parent must
    /// never reach a frame named `id`, and must terminate.
    fn ensure_chain_acyclic(&self, id: &str, parent: FrameIdx) -> Result<(), FrameGraphError> {
        let mut visited: IntSet<FrameIdx> = IntSet::default();
        let mut current = Some(parent);
        while let Some(cur) = current {
            if !visited.insert(cur) {
                return Err(FrameGraphError::CycleDetected(self.frame_id(cur)));
            }
            let Some(node) = self.store.get(cur) else {
                return Err(FrameGraphError::FrameNotFound(unknown_frame_id()));
            };
            if node.id.as_str() == id {
                return Err(FrameGraphError::CycleDetected(node.id.clone()));
            }
            current = node.parent;
        }
        Ok(())
    }

    /// Fires change callbacks for `stale`, in stale-set order.
    fn notify(&mut self, stale: &[FrameIdx]) {
        let Self {
            store, notifier, ..
        } = self;
        for idx in stale {
            if let Some(node) = store.get(*idx) {
                notifier.fire(*idx, &node.id);
            }
        }
    }

    pub(crate) fn frame_id(&self, idx: FrameIdx) -> FrameId {
        self.store
            .get(idx)
            .map_or_else(unknown_frame_id, |node| node.id.clone())
    }
}

impl std::fmt::Debug for TransformGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformGraph")
            .field("len", &self.len())
            .field("dirty", &self.dirty.len())
            .finish_non_exhaustive()
    }
}
