use crate::{
    foundation::core::FrameIndex,
    timeline::segment::{Segment, SegmentKind, Timeline},
};

/// The segment playing at a given output frame.
#[derive(Clone, Copy, Debug)]
pub struct ActiveSegment<'a> {
    /// Index into [`Timeline::segments`].
    pub index: usize,
    /// The segment itself.
    pub segment: &'a Segment,
    /// Frame offset inside the segment.
    pub local: FrameIndex,
    /// Raw progress `local / len` in `[0, 1)`; exactly 1 past the end of the timeline.
    pub progress: f64,
}

impl ActiveSegment<'_> {
    /// Progress after the transition's ease (raw progress for scene segments).
    pub fn eased_progress(&self) -> f64 {
        match &self.segment.kind {
            SegmentKind::Transition { ease, .. } => ease.apply(self.progress).clamp(0.0, 1.0),
            SegmentKind::Scene { .. } => self.progress,
        }
    }
}

impl Timeline {
    /// Find the segment containing `frame`.
    ///
    /// Frames at or past the end resolve to the closing scene, held on its last frame with
    /// progress 1.
    pub fn resolve(&self, frame: FrameIndex) -> ActiveSegment<'_> {
        let segments = self.segments();
        let index = segments.partition_point(|s| s.range.end <= frame);

        if index >= segments.len() {
            let index = segments.len() - 1;
            let segment = &segments[index];
            return ActiveSegment {
                index,
                segment,
                local: FrameIndex(segment.len_frames() - 1),
                progress: 1.0,
            };
        }

        let segment = &segments[index];
        let local = frame.0 - segment.range.start.0;
        ActiveSegment {
            index,
            segment,
            local: FrameIndex(local),
            progress: (local as f64) / (segment.len_frames() as f64),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/resolve.rs"]
mod tests;
