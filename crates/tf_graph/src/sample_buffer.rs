//! Time-indexed local-transform samples for a single frame.

use tf_types::RigidTransform;

use crate::InterpolationError;

/// A single time-stamped local transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformSample {
    pub time_ms: f64,

    /// The frame's local transform at `time_ms`.
    pub parent_from_frame: RigidTransform,
}

/// Sorted, bounded-retention buffer of [`TransformSample`]s.
///
/// Samples stay sorted by timestamp regardless of push order. Whenever a
/// sample is pushed, anything older than `max_duration_ms` before the newest
/// retained timestamp is pruned from the front.
///
/// Interpolation clamps at the newest sample (no extrapolation into the
/// future) and refuses timestamps older than the oldest retained sample.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformSampleBuffer {
    samples: Vec<TransformSample>,
    max_duration_ms: f64,
}

impl TransformSampleBuffer {
    pub fn new(max_duration_ms: f64) -> Self {
        Self {
            samples: Vec::new(),
            max_duration_ms,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn oldest(&self) -> Option<&TransformSample> {
        self.samples.first()
    }

    #[inline]
    pub fn newest(&self) -> Option<&TransformSample> {
        self.samples.last()
    }

    /// Inserts a sample at its sorted position (after any existing sample
    /// with the same timestamp), then prunes samples that have aged out of
    /// the retention window.
    pub fn push(&mut self, time_ms: f64, parent_from_frame: RigidTransform) {
        let insert_at = self
            .samples
            .partition_point(|sample| sample.time_ms <= time_ms);
        self.samples.insert(
            insert_at,
            TransformSample {
                time_ms,
                parent_from_frame,
            },
        );

        if let Some(newest) = self.samples.last() {
            let cutoff_ms = newest.time_ms - self.max_duration_ms;
            let first_retained = self
                .samples
                .partition_point(|sample| sample.time_ms < cutoff_ms);
            self.samples.drain(..first_retained);
        }
    }

    /// The local transform at `time_ms`.
    ///
    /// Exact hits return the stored sample; timestamps between two samples
    /// LERP the translation and SLERP the rotation; timestamps at or past
    /// the newest sample clamp to it.
    pub fn interpolate(&self, time_ms: f64) -> Result<RigidTransform, InterpolationError> {
        let (Some(oldest), Some(newest)) = (self.samples.first(), self.samples.last()) else {
            return Err(InterpolationError::BufferEmpty);
        };

        if time_ms < oldest.time_ms {
            return Err(InterpolationError::OutOfRange {
                requested_ms: time_ms,
                oldest_ms: oldest.time_ms,
            });
        }
        if time_ms >= newest.time_ms {
            return Ok(newest.parent_from_frame);
        }

        // First sample at or after the requested time; `>= 1` because the
        // request is known to be above the oldest timestamp.
        let upper_index = self
            .samples
            .partition_point(|sample| sample.time_ms < time_ms);
        let upper = self.samples[upper_index];
        if upper.time_ms == time_ms {
            return Ok(upper.parent_from_frame);
        }

        let lower = self.samples[upper_index - 1];
        let t = (time_ms - lower.time_ms) / (upper.time_ms - lower.time_ms);
        Ok(lower
            .parent_from_frame
            .lerp_slerp(&upper.parent_from_frame, t))
    }
}
