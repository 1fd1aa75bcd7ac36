use super::*;
use crate::animation::ease::Ease;
use crate::foundation::core::{FrameIndex, Vec2};

fn canvas() -> Canvas {
    Canvas {
        width: 320,
        height: 180,
    }
}

#[test]
fn builders_create_expected_structure() {
    let layer = LayerBuilder::new(
        "box",
        LayerContent::Rect {
            width: 40.0,
            height: 20.0,
            corner_radius: 4.0,
            color: [255, 255, 255, 255],
        },
    )
    .opacity(Anim::constant(0.5))
    .transform(Anim::constant(Transform2D {
        translate: Vec2::new(1.0, 2.0),
        ..Transform2D::default()
    }))
    .visible(FrameRange::new(FrameIndex(0), FrameIndex(10)).unwrap())
    .build()
    .unwrap();

    let a = SceneBuilder::new("a", 30).layer(layer).build().unwrap();
    let b = SceneBuilder::new("b", 30).build().unwrap();

    let stack = SceneStackBuilder::new(Fps::new(30, 1).unwrap(), canvas())
        .seed(5)
        .background([0, 0, 0, 255])
        .scene(a)
        .transition(TransitionSpec {
            kind: "slide".to_string(),
            duration_frames: 12,
            ease: Ease::OutCubic,
            params: serde_json::json!({ "dir": "up" }),
        })
        .scene(b)
        .build()
        .unwrap();

    assert_eq!(stack.scenes.len(), 2);
    assert_eq!(stack.transitions.len(), 1);
    assert_eq!(stack.seed, 5);
    assert!(stack.scenes[0].layers[0].visible.is_some());
}

#[test]
fn scene_builder_rejects_zero_duration() {
    assert!(SceneBuilder::new("a", 0).build().is_err());
    assert!(SceneBuilder::new(" ", 3).build().is_err());
}

#[test]
fn stack_builder_validates_transition_count() {
    let res = SceneStackBuilder::new(Fps::new(30, 1).unwrap(), canvas())
        .scene(SceneBuilder::new("only", 10).build().unwrap())
        .transition(TransitionSpec {
            kind: "crossfade".to_string(),
            duration_frames: 5,
            ease: Ease::Linear,
            params: serde_json::Value::Null,
        })
        .build();
    assert!(res.is_err());
}

#[test]
fn layer_builder_rejects_invalid_animation() {
    let res = LayerBuilder::new(
        "l",
        LayerContent::Solid {
            color: [0, 0, 0, 255],
        },
    )
    .opacity(Anim::tween(1.0, 0.0, 10, 0, Ease::Linear))
    .build();
    assert!(res.is_err());
}
