//! # tf-graph: a cached, time-aware transform-frame graph
//!
//! ## Concepts
//!
//! ### Transform frames
//!
//! A transform frame is a named coordinate system, connected to a parent
//! frame by a rigid-body transform (translation + unit-quaternion rotation).
//! For instance, the frame of a robot's camera may be connected to the frame
//! of the robot body, which is in turn connected to a world frame.
//!
//! Frames are identified by string ids, see [`FrameId`]. A valid graph forms
//! a forest: every frame has at most one parent, no frame is its own
//! ancestor, and several independent roots may coexist.
//!
//! ### World transforms & the stale set
//!
//! The world transform of a frame is the composition of local transforms
//! from its tree's root down to the frame. [`TransformGraph`] memoises world
//! transforms and only *invalidates* on mutation: updating a frame marks the
//! frame and its whole subtree stale, and the next query recomputes just the
//! chains it touches. The set of frames staled by one mutation (the mutated
//! frame's subtree, or for batch updates the ancestor-deduplicated union of
//! subtrees) is exactly the set reported to change listeners.
//!
//! ### Time-stamped transforms
//!
//! [`BufferedTransformGraph`] keeps a bounded history of time-stamped local
//! transforms per frame and answers queries at any retained timestamp by
//! LERP/SLERP interpolation between the surrounding samples. There is no
//! extrapolation: queries past the newest sample clamp to it, queries before
//! the oldest retained sample fail with
//! [`InterpolationError::OutOfRange`].
//!
//! ## Implementation
//!
//! ### [`TransformGraph`]
//!
//! The static core: insertion-ordered frame storage interned to dense
//! indices, the lazy world-transform memo with its dirty set, relative
//! transform queries via lowest-common-ancestor connectivity checks, change
//! notification, and snapshot (de)serialization.
//!
//! ### [`BufferedTransformGraph`]
//!
//! Layers per-frame [`TransformSampleBuffer`]s on top of the static graph.
//! Temporal queries bypass the static memo and recompose world transforms
//! from interpolated local transforms.
//!
//! All operations are synchronous and finite; the graph has no internal
//! concurrency and no locks. Mutators validate every precondition before
//! touching state, so any error leaves the graph unchanged.

mod buffered;
mod error;
mod frame_store;
mod graph;
mod notifier;
mod queries;
mod sample_buffer;
mod snapshot;

pub use buffered::{BufferedGraphOptions, BufferedTransformGraph};
pub use error::{FrameGraphError, InterpolationError, SnapshotError, TemporalQueryError};
pub use graph::TransformGraph;
pub use notifier::{ChangeCallback, SubscriptionId};
pub use sample_buffer::{TransformSample, TransformSampleBuffer};
pub use snapshot::{FrameRecord, GraphSnapshot};

pub use tf_types::{FrameId, RigidTransform};

pub mod external {
    pub use tf_types;
    pub use tf_types::external::glam;
}
