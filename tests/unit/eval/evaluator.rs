use super::*;
use crate::animation::{anim::Anim, ease::Ease};
use crate::foundation::core::{Canvas, Fps, FrameRange, Transform2D, Vec2};
use crate::scene::model::{LayerContent, Scene, TransitionSpec};

fn layer(id: &str, opacity: Anim<f64>, transform: Anim<Transform2D>) -> Layer {
    Layer {
        id: id.to_string(),
        content: LayerContent::Solid {
            color: [255, 255, 255, 255],
        },
        transform,
        opacity,
        visible: None,
    }
}

fn moving(id: &str) -> Layer {
    layer(
        id,
        Anim::constant(1.0),
        Anim::tween(
            Transform2D::default(),
            Transform2D {
                translate: Vec2::new(100.0, 0.0),
                ..Transform2D::default()
            },
            0,
            100,
            Ease::Linear,
        ),
    )
}

fn stack() -> SceneStack {
    SceneStack {
        fps: Fps::new(30, 1).unwrap(),
        canvas: Canvas {
            width: 16,
            height: 16,
        },
        background: None,
        seed: 3,
        scenes: vec![
            Scene {
                id: "a".to_string(),
                duration_frames: 10,
                layers: vec![moving("m")],
            },
            Scene {
                id: "b".to_string(),
                duration_frames: 10,
                layers: vec![
                    moving("m"),
                    layer("hidden", Anim::constant(0.0), Anim::constant(Transform2D::default())),
                    Layer {
                        visible: Some(FrameRange::new(FrameIndex(5), FrameIndex(8)).unwrap()),
                        ..moving("late")
                    },
                ],
            },
        ],
        transitions: vec![TransitionSpec {
            kind: "crossfade".to_string(),
            duration_frames: 4,
            ease: Ease::Linear,
            params: serde_json::Value::Null,
        }],
    }
}

fn eval(s: &SceneStack, f: u64) -> EvaluatedFrame {
    let tl = Timeline::build(s).unwrap();
    Evaluator::eval_frame(s, &tl, FrameIndex(f)).unwrap()
}

fn translate_x(l: &EvaluatedLayer) -> f64 {
    l.transform.translation().x
}

#[test]
fn scene_segment_samples_scene_local_frame() {
    let s = stack();
    let ev = eval(&s, 7);
    let FrameContent::Scene(scene) = &ev.content else {
        panic!("expected scene content");
    };
    assert_eq!(scene.scene_id, "a");
    assert_eq!(scene.local_frame, FrameIndex(7));
    assert!((translate_x(&scene.layers[0]) - 7.0).abs() < 1e-9);
}

#[test]
fn transition_keeps_outgoing_playing_and_holds_incoming() {
    let s = stack();
    let ev = eval(&s, 12);
    assert_eq!(ev.segment_index, 1);
    let FrameContent::Transition {
        outgoing,
        incoming,
        kind,
        progress,
    } = &ev.content
    else {
        panic!("expected transition content");
    };
    assert_eq!(outgoing.local_frame, FrameIndex(12));
    assert!((translate_x(&outgoing.layers[0]) - 12.0).abs() < 1e-9);
    assert_eq!(incoming.local_frame, FrameIndex(0));
    assert!(translate_x(&incoming.layers[0]).abs() < 1e-9);
    assert_eq!(*kind, TransitionKind::Crossfade);
    assert!((progress - 0.5).abs() < 1e-12);
}

#[test]
fn incoming_scene_starts_after_transition() {
    let s = stack();
    let ev = eval(&s, 14);
    let FrameContent::Scene(scene) = &ev.content else {
        panic!("expected scene content");
    };
    assert_eq!(scene.scene_id, "b");
    assert_eq!(scene.local_frame, FrameIndex(0));
}

#[test]
fn zero_opacity_and_invisible_layers_are_dropped() {
    let s = stack();
    let at = |f: u64| -> Vec<String> {
        let ev = eval(&s, f);
        let FrameContent::Scene(scene) = ev.content else {
            panic!("expected scene content");
        };
        scene.layers.into_iter().map(|l| l.layer_id).collect()
    };
    assert_eq!(at(14), vec!["m"]);
    assert_eq!(at(19), vec!["m", "late"]);
    assert_eq!(at(22), vec!["m"]);
}

#[test]
fn opacity_is_clamped() {
    let mut s = stack();
    s.scenes[0].layers[0].opacity = Anim::constant(3.0);
    let ev = eval(&s, 0);
    let FrameContent::Scene(scene) = &ev.content else {
        panic!("expected scene content");
    };
    assert_eq!(scene.layers[0].opacity, 1.0);
}

#[test]
fn mismatched_timeline_is_an_evaluation_error() {
    let s = stack();
    let tl = Timeline::build(&s).unwrap();
    let mut shorter = s.clone();
    shorter.scenes.truncate(1);
    shorter.transitions.clear();
    let err = Evaluator::eval_frame(&shorter, &tl, FrameIndex(20)).unwrap_err();
    assert!(matches!(err, StackError::Evaluation(_)));
}

#[test]
fn evaluation_is_deterministic() {
    let s = stack();
    let a = serde_json::to_string(&eval(&s, 12)).unwrap();
    let b = serde_json::to_string(&eval(&s, 12)).unwrap();
    assert_eq!(a, b);
}
