use tf_types::FrameId;

/// Errors returned by [`crate::TransformGraph`] mutators and queries.
///
/// Mutators validate every precondition before touching any state, so an
/// error always leaves the graph exactly as it was.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrameGraphError {
    #[error("frame {0:?} is already registered")]
    DuplicateFrame(FrameId),

    #[error("parent frame {0:?} not found; register parents before children")]
    ParentNotFound(FrameId),

    #[error("frame {0:?} not found")]
    FrameNotFound(FrameId),

    #[error("cannot remove frame {0:?}: it still has child frames")]
    HasChildren(FrameId),

    /// A walk along the parent chain revisited a frame.
    ///
    /// Carries the frame at which the walk re-entered itself.
    #[error("cycle detected in the parent chain at frame {0:?}")]
    CycleDetected(FrameId),

    #[error("frames {from:?} and {to:?} are not connected in the same tree")]
    NotConnected { from: FrameId, to: FrameId },
}

/// Errors returned by [`crate::TransformSampleBuffer::interpolate`].
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum InterpolationError {
    #[error("the sample buffer is empty")]
    BufferEmpty,

    /// The requested timestamp is older than the oldest retained sample.
    ///
    /// Queries newer than the newest sample clamp instead; there is no
    /// symmetric error on that end.
    #[error(
        "timestamp {requested_ms} ms is older than the oldest retained sample at {oldest_ms} ms"
    )]
    OutOfRange { requested_ms: f64, oldest_ms: f64 },
}

/// Errors returned by [`crate::BufferedTransformGraph::transform_from_to_at`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum TemporalQueryError {
    #[error(transparent)]
    Graph(#[from] FrameGraphError),

    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
}

/// Errors returned by the JSON snapshot conversions.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Graph(#[from] FrameGraphError),
}
