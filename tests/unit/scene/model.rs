use super::*;
use crate::foundation::core::FrameIndex;

fn two_scene_stack() -> SceneStack {
    SceneStack {
        fps: Fps::new(30, 1).unwrap(),
        canvas: Canvas {
            width: 64,
            height: 36,
        },
        background: Some([0, 0, 0, 255]),
        seed: 7,
        scenes: vec![
            Scene {
                id: "intro".to_string(),
                duration_frames: 30,
                layers: vec![Layer {
                    id: "bg".to_string(),
                    content: LayerContent::Solid {
                        color: [255, 0, 0, 255],
                    },
                    transform: default_transform(),
                    opacity: default_opacity(),
                    visible: None,
                }],
            },
            Scene {
                id: "outro".to_string(),
                duration_frames: 20,
                layers: vec![Layer {
                    id: "logo".to_string(),
                    content: LayerContent::Image {
                        source: "assets/logo.png".to_string(),
                    },
                    transform: default_transform(),
                    opacity: default_opacity(),
                    visible: Some(FrameRange::new(FrameIndex(5), FrameIndex(15)).unwrap()),
                }],
            },
        ],
        transitions: vec![TransitionSpec {
            kind: "wipe".to_string(),
            duration_frames: 10,
            ease: Ease::InOutCubic,
            params: serde_json::json!({ "dir": "left" }),
        }],
    }
}

#[test]
fn valid_stack_passes_and_roundtrips() {
    let stack = two_scene_stack();
    stack.validate().unwrap();
    let json = stack.to_json_string().unwrap();
    let de = SceneStack::from_json_str(&json).unwrap();
    assert_eq!(de.scenes.len(), 2);
    assert_eq!(de.transitions[0].ease, Ease::InOutCubic);
    assert_eq!(de.scene_index("outro"), Some(1));
}

#[test]
fn minimal_json_fills_defaults() {
    let json = r#"{
        "fps": {"num": 24, "den": 1},
        "canvas": {"width": 8, "height": 8},
        "scenes": [
            {"id": "a", "duration_frames": 5,
             "layers": [{"id": "r", "content": {"type": "rect", "width": 4, "height": 2, "color": [1,2,3,255]}}]},
            {"id": "b", "duration_frames": 5}
        ],
        "transitions": [{"kind": "crossfade", "duration_frames": 3}]
    }"#;
    let stack = SceneStack::from_json_str(json).unwrap();
    assert_eq!(stack.seed, 0);
    assert!(stack.background.is_none());
    assert_eq!(stack.transitions[0].ease, Ease::Linear);
    assert!(stack.transitions[0].params.is_null());
    assert!(matches!(
        stack.scenes[0].layers[0].content,
        LayerContent::Rect { corner_radius, .. } if corner_radius == 0.0
    ));
}

#[test]
fn too_many_transitions_are_rejected() {
    let mut stack = two_scene_stack();
    stack.transitions.push(stack.transitions[0].clone());
    assert!(matches!(stack.validate(), Err(StackError::Validation(_))));
}

#[test]
fn fewer_transitions_than_gaps_is_fine() {
    let mut stack = two_scene_stack();
    stack.transitions.clear();
    stack.validate().unwrap();
}

#[test]
fn empty_stack_and_zero_durations_are_rejected() {
    let mut stack = two_scene_stack();
    stack.scenes.clear();
    stack.transitions.clear();
    assert!(stack.validate().is_err());

    let mut stack = two_scene_stack();
    stack.scenes[1].duration_frames = 0;
    assert!(stack.validate().is_err());

    let mut stack = two_scene_stack();
    stack.transitions[0].duration_frames = 0;
    assert!(stack.validate().is_err());
}

#[test]
fn duplicate_ids_are_rejected() {
    let mut stack = two_scene_stack();
    stack.scenes[1].id = "intro".to_string();
    assert!(stack.validate().is_err());

    let mut stack = two_scene_stack();
    let dup = stack.scenes[0].layers[0].clone();
    stack.scenes[0].layers.push(dup);
    let err = stack.validate().unwrap_err().to_string();
    assert!(err.contains("duplicate layer id 'bg'"), "{err}");
}

#[test]
fn unknown_transition_kind_is_rejected() {
    let mut stack = two_scene_stack();
    stack.transitions[0].kind = "spin".to_string();
    assert!(stack.validate().is_err());

    let mut stack = two_scene_stack();
    stack.transitions[0].params = serde_json::json!("ltr");
    assert!(stack.validate().is_err());
}

#[test]
fn escaping_asset_paths_are_rejected() {
    for bad in ["../secret.png", "/etc/passwd", ""] {
        let mut stack = two_scene_stack();
        stack.scenes[1].layers[0].content = LayerContent::Image {
            source: bad.to_string(),
        };
        assert!(stack.validate().is_err(), "{bad:?}");
    }
}

#[test]
fn degenerate_rect_and_empty_path_are_rejected() {
    let mut stack = two_scene_stack();
    stack.scenes[0].layers[0].content = LayerContent::Rect {
        width: 0.0,
        height: 10.0,
        corner_radius: 0.0,
        color: [0, 0, 0, 255],
    };
    assert!(stack.validate().is_err());

    let mut stack = two_scene_stack();
    stack.scenes[0].layers[0].content = LayerContent::Path {
        svg_path_d: "  ".to_string(),
        color: [0, 0, 0, 255],
    };
    assert!(stack.validate().is_err());
}

#[test]
fn from_path_reports_missing_file() {
    let err = SceneStack::from_path(Path::new("/definitely/not/here.json")).unwrap_err();
    assert!(matches!(err, StackError::Other(_)));
}
