use crate::{
    animation::ease::Ease,
    effects::transitions::{TransitionKind, parse_transition},
    foundation::core::{FrameIndex, FrameRange},
    foundation::error::{StackError, StackResult},
    scene::model::SceneStack,
};

/// What plays during a [`Segment`].
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentKind {
    /// A single scene plays on its own.
    Scene {
        /// Index into `SceneStack::scenes`.
        scene: usize,
    },
    /// Scene `from` blends into scene `to`.
    Transition {
        /// Index into `SceneStack::transitions`.
        index: usize,
        /// Outgoing scene index.
        from: usize,
        /// Incoming scene index (`from + 1`).
        to: usize,
        /// Parsed kind.
        kind: TransitionKind,
        /// Ease applied to raw progress.
        ease: Ease,
    },
}

/// One contiguous interval of the output timeline.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Segment {
    /// Output frames covered by the segment.
    pub range: FrameRange,
    /// What plays.
    pub kind: SegmentKind,
}

impl Segment {
    /// Length in frames (always >= 1).
    pub fn len_frames(&self) -> u64 {
        self.range.len_frames()
    }

    /// `true` for transition segments.
    pub fn is_transition(&self) -> bool {
        matches!(self.kind, SegmentKind::Transition { .. })
    }
}

/// Flat, ordered, gap-free segment list for a [`SceneStack`].
///
/// Layout is `Scene(0), Transition(0), Scene(1), .., Scene(n-1)`, with a transition segment
/// only where the document defines one. Segments cover `[0, total_frames)` without overlap,
/// and `total_frames` is the sum of every scene and transition duration.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Timeline {
    segments: Vec<Segment>,
    total_frames: u64,
}

impl Timeline {
    /// Segment `stack`. Transition kinds are parsed here, once.
    #[tracing::instrument(
        skip(stack),
        fields(scenes = stack.scenes.len(), transitions = stack.transitions.len())
    )]
    pub fn build(stack: &SceneStack) -> StackResult<Self> {
        if stack.scenes.is_empty() {
            return Err(StackError::validation("scene stack needs at least one scene"));
        }
        if stack.transitions.len() >= stack.scenes.len() {
            return Err(StackError::validation(format!(
                "{} transitions for {} scenes (at most {} allowed)",
                stack.transitions.len(),
                stack.scenes.len(),
                stack.scenes.len() - 1
            )));
        }

        let mut segments = Vec::with_capacity(stack.scenes.len() + stack.transitions.len());
        let mut cursor = 0u64;
        let mut push = |len: u64, kind: SegmentKind| -> StackResult<()> {
            if len == 0 {
                return Err(StackError::validation("segment durations must be > 0"));
            }
            let end = cursor
                .checked_add(len)
                .ok_or_else(|| StackError::validation("timeline length overflows u64"))?;
            segments.push(Segment {
                range: FrameRange {
                    start: FrameIndex(cursor),
                    end: FrameIndex(end),
                },
                kind,
            });
            cursor = end;
            Ok(())
        };

        for (i, scene) in stack.scenes.iter().enumerate() {
            push(scene.duration_frames, SegmentKind::Scene { scene: i })?;
            if let Some(tr) = stack.transitions.get(i) {
                push(
                    tr.duration_frames,
                    SegmentKind::Transition {
                        index: i,
                        from: i,
                        to: i + 1,
                        kind: parse_transition(tr, stack.seed, i)?,
                        ease: tr.ease,
                    },
                )?;
            }
        }

        tracing::debug!(segments = segments.len(), total_frames = cursor, "timeline built");
        Ok(Self {
            segments,
            total_frames: cursor,
        })
    }

    /// All segments in playback order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Total output length in frames.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// `[0, total_frames)`.
    pub fn full_range(&self) -> FrameRange {
        FrameRange {
            start: FrameIndex(0),
            end: FrameIndex(self.total_frames),
        }
    }

    /// The segment in which scene `scene` plays alone.
    pub fn scene_segment(&self, scene: usize) -> Option<&Segment> {
        self.segments
            .iter()
            .find(|s| matches!(s.kind, SegmentKind::Scene { scene: i } if i == scene))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/segment.rs"]
mod tests;
