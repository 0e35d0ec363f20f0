//! Snapshot (de)serialization of the graph's static state.
//!
//! Snapshots list frames in insertion order, which by construction is
//! parents-before-children, so replaying a snapshot through
//! [`TransformGraph::add`] never trips the parent-must-exist check on a
//! well-formed input.

use serde::{Deserialize, Serialize};
use tf_types::{FrameId, RigidTransform};

use crate::{FrameGraphError, SnapshotError, TransformGraph};

/// A deep-copy snapshot of a [`TransformGraph`].
///
/// The serialized form is stable and self-describing:
///
/// ```json
/// {
///   "frames": [
///     { "id": "world", "parentId": null,
///       "transform": { "translation": [0.0, 0.0, 0.0],
///                      "rotation": [0.0, 0.0, 0.0, 1.0] } }
///   ]
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub frames: Vec<FrameRecord>,
}

/// One frame of a [`GraphSnapshot`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub id: FrameId,

    /// `None` (serialized as `null`) for roots.
    #[serde(rename = "parentId")]
    pub parent_id: Option<FrameId>,

    /// The frame's local transform, in its parent's coordinates.
    pub transform: RigidTransform,
}

impl TransformGraph {
    /// Snapshots the static state of the graph (ids, parent links, local
    /// transforms), frames ordered parents-before-children.
    ///
    /// The snapshot is a value-level deep copy; it does not alias graph
    /// state and stays valid across later mutation.
    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            frames: self
                .store
                .iter()
                .map(|(_, node)| FrameRecord {
                    id: node.id.clone(),
                    parent_id: node
                        .parent
                        .and_then(|parent| self.store.get(parent))
                        .map(|parent| parent.id.clone()),
                    transform: node.parent_from_frame,
                })
                .collect(),
        }
    }

    /// Builds a fresh graph by replaying `snapshot` through [`Self::add`].
    ///
    /// Propagates `add`'s errors ([`FrameGraphError::DuplicateFrame`],
    /// [`FrameGraphError::ParentNotFound`], [`FrameGraphError::CycleDetected`])
    /// for malformed inputs.
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Result<Self, FrameGraphError> {
        let mut graph = Self::new();
        for record in &snapshot.frames {
            graph.add(
                record.id.as_str(),
                record.parent_id.as_ref().map(FrameId::as_str),
                record.transform,
            )?;
        }
        Ok(graph)
    }

    /// [`Self::to_snapshot`], serialized to a JSON string.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(&self.to_snapshot())?)
    }

    /// Builds a fresh graph from a JSON string produced by [`Self::to_json`].
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: GraphSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(&snapshot)?)
    }
}
