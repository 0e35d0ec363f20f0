//! Value types shared across the tf-graph project.
//!
//! Transform frames are identified by a string identifier, see [`FrameId`].
//! The relationship between a frame and its parent is a rigid-body transform,
//! see [`RigidTransform`]: translation plus unit-quaternion rotation, with
//! no scale or shear.
//!
//! All math is built on [`glam`]'s `f64` types (`DVec3`, `DQuat`, `DMat4`),
//! re-exported through [`external`]. Rotations are constructed with the glam
//! constructors (`DQuat::from_axis_angle`, `DQuat::from_euler`, …).

mod frame_id;
mod rigid_transform;

pub use frame_id::FrameId;
pub use rigid_transform::RigidTransform;

pub mod external {
    pub use glam;
}
