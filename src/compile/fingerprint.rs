use crate::{
    effects::transitions::{Direction, TransitionKind},
    eval::evaluator::{EvaluatedFrame, EvaluatedScene, FrameContent},
    foundation::math::Fnv1a64,
};

/// 128-bit identity of an evaluated frame.
///
/// Two frames with equal fingerprints render to identical pixels, so a renderer may reuse the
/// previous frame's output. The output frame number and scene-local clocks are not part of the
/// fingerprint; only what is drawn is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameFingerprint {
    /// First hash lane.
    pub hi: u64,
    /// Second hash lane.
    pub lo: u64,
}

/// Fingerprint everything in `eval` that affects its pixels.
pub fn fingerprint_eval(eval: &EvaluatedFrame) -> FrameFingerprint {
    let mut h = PairHasher::new();
    match &eval.content {
        FrameContent::Scene(scene) => {
            h.u8(0);
            write_scene(&mut h, scene);
        }
        FrameContent::Transition {
            outgoing,
            incoming,
            kind,
            progress,
        } => {
            h.u8(1);
            write_scene(&mut h, outgoing);
            write_scene(&mut h, incoming);
            write_kind(&mut h, kind);
            h.u64(progress.to_bits());
        }
    }
    h.finish()
}

fn write_scene(h: &mut PairHasher, scene: &EvaluatedScene) {
    h.u64(scene.scene_index as u64);
    h.u64(scene.layers.len() as u64);
    for layer in &scene.layers {
        h.u64(layer.layer_index as u64);
        for c in layer.transform.as_coeffs() {
            h.u64(c.to_bits());
        }
        h.u64(layer.opacity.to_bits());
    }
}

fn write_kind(h: &mut PairHasher, kind: &TransitionKind) {
    match kind {
        TransitionKind::Crossfade => h.u8(0),
        TransitionKind::Wipe { dir, soft_edge } => {
            h.u8(1);
            h.u8(dir_tag(*dir));
            h.u64(u64::from(soft_edge.to_bits()));
        }
        TransitionKind::Slide { dir } => {
            h.u8(2);
            h.u8(dir_tag(*dir));
        }
        TransitionKind::Push { dir } => {
            h.u8(3);
            h.u8(dir_tag(*dir));
        }
        TransitionKind::Zoom { intensity } => {
            h.u8(4);
            h.u64(u64::from(intensity.to_bits()));
        }
        TransitionKind::Dissolve { seed, softness } => {
            h.u8(5);
            h.u64(*seed);
            h.u64(u64::from(softness.to_bits()));
        }
        TransitionKind::Glitch { seed, intensity } => {
            h.u8(6);
            h.u64(*seed);
            h.u64(u64::from(intensity.to_bits()));
        }
        TransitionKind::FadeThrough { color } => {
            h.u8(7);
            for c in color.to_array() {
                h.u8(c);
            }
        }
    }
}

fn dir_tag(dir: Direction) -> u8 {
    match dir {
        Direction::LeftToRight => 0,
        Direction::RightToLeft => 1,
        Direction::TopToBottom => 2,
        Direction::BottomToTop => 3,
    }
}

struct PairHasher {
    a: Fnv1a64,
    b: Fnv1a64,
}

impl PairHasher {
    fn new() -> Self {
        Self {
            a: Fnv1a64::new(Fnv1a64::OFFSET_BASIS),
            b: Fnv1a64::new(0x9ae1_6a3b_2f90_404f),
        }
    }

    fn u8(&mut self, v: u8) {
        self.a.write_u8(v);
        self.b.write_u8(v);
    }

    fn u64(&mut self, v: u64) {
        self.a.write_u64(v);
        self.b.write_u64(v);
    }

    fn finish(self) -> FrameFingerprint {
        FrameFingerprint {
            hi: self.a.finish(),
            lo: self.b.finish(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/fingerprint.rs"]
mod tests;
