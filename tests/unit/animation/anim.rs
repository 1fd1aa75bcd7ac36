use super::*;
use crate::animation::proc::{ProcScalar, ProceduralKind};

fn ctx(local: u64) -> SampleCtx {
    SampleCtx {
        frame: FrameIndex(local),
        fps: Fps::new(30, 1).unwrap(),
        local: FrameIndex(local),
        seed: 1,
    }
}

fn linear_0_to_10() -> Anim<f64> {
    Anim::tween(0.0, 10.0, 0, 10, Ease::Linear)
}

#[test]
fn constant_holds_everywhere() {
    let a = Anim::constant(3.5);
    for f in [0, 1, 100] {
        assert_eq!(a.sample(ctx(f)).unwrap(), 3.5);
    }
}

#[test]
fn tween_interpolates_and_clamps_outside_keys() {
    let a = Anim::tween(0.0, 10.0, 5, 15, Ease::Linear);
    assert_eq!(a.sample(ctx(0)).unwrap(), 0.0);
    assert_eq!(a.sample(ctx(5)).unwrap(), 0.0);
    assert!((a.sample(ctx(10)).unwrap() - 5.0).abs() < 1e-9);
    assert_eq!(a.sample(ctx(15)).unwrap(), 10.0);
    assert_eq!(a.sample(ctx(40)).unwrap(), 10.0);
}

#[test]
fn hold_mode_steps() {
    let a = Anim::Keyframes(Keyframes {
        keys: vec![
            Keyframe {
                frame: FrameIndex(0),
                value: 1.0,
                ease: Ease::Linear,
            },
            Keyframe {
                frame: FrameIndex(10),
                value: 2.0,
                ease: Ease::Linear,
            },
        ],
        mode: InterpMode::Hold,
        default: None,
    });
    assert_eq!(a.sample(ctx(9)).unwrap(), 1.0);
    assert_eq!(a.sample(ctx(10)).unwrap(), 2.0);
}

#[test]
fn empty_keys_fall_back_to_default() {
    let a: Anim<f64> = Anim::Keyframes(Keyframes {
        keys: vec![],
        mode: InterpMode::Linear,
        default: Some(0.25),
    });
    a.validate().unwrap();
    assert_eq!(a.sample(ctx(3)).unwrap(), 0.25);
}

#[test]
fn validate_rejects_empty_and_unsorted() {
    let empty: Anim<f64> = Anim::Keyframes(Keyframes {
        keys: vec![],
        mode: InterpMode::Linear,
        default: None,
    });
    assert!(matches!(empty.validate(), Err(StackError::Animation(_))));

    let unsorted = Anim::tween(0.0, 1.0, 10, 2, Ease::Linear);
    assert!(unsorted.validate().is_err());
}

#[test]
fn delay_shifts_inner_timeline() {
    let a = Anim::Expr(Expr::Delay {
        inner: Box::new(linear_0_to_10()),
        by: 5,
    });
    assert_eq!(a.sample(ctx(3)).unwrap(), 0.0);
    assert!((a.sample(ctx(10)).unwrap() - 5.0).abs() < 1e-9);
}

#[test]
fn speed_scales_time_and_rejects_bad_factor() {
    let a = Anim::Expr(Expr::Speed {
        inner: Box::new(linear_0_to_10()),
        factor: 2.0,
    });
    assert!((a.sample(ctx(3)).unwrap() - 6.0).abs() < 1e-9);

    let bad = Anim::Expr(Expr::Speed {
        inner: Box::new(linear_0_to_10()),
        factor: 0.0,
    });
    assert!(bad.validate().is_err());
    assert!(bad.sample(ctx(1)).is_err());
}

#[test]
fn loop_repeat_and_ping_pong() {
    let repeat = Anim::Expr(Expr::Loop {
        inner: Box::new(linear_0_to_10()),
        period: 4,
        mode: LoopMode::Repeat,
    });
    let got: Vec<f64> = (0..6).map(|f| repeat.sample(ctx(f)).unwrap()).collect();
    assert_eq!(got, vec![0.0, 1.0, 2.0, 3.0, 0.0, 1.0]);

    let ping = Anim::Expr(Expr::Loop {
        inner: Box::new(linear_0_to_10()),
        period: 4,
        mode: LoopMode::PingPong,
    });
    let got: Vec<f64> = (0..8).map(|f| ping.sample(ctx(f)).unwrap()).collect();
    assert_eq!(got, vec![0.0, 1.0, 2.0, 3.0, 2.0, 1.0, 0.0, 1.0]);
}

#[test]
fn zero_period_loop_is_invalid() {
    let a = Anim::Expr(Expr::Loop {
        inner: Box::new(linear_0_to_10()),
        period: 0,
        mode: LoopMode::Repeat,
    });
    assert!(a.validate().is_err());
}

#[test]
fn transform_lerp_moves_every_component() {
    let from = Transform2D::default();
    let to = Transform2D {
        translate: Vec2::new(100.0, 50.0),
        rotation_rad: 1.0,
        scale: Vec2::new(3.0, 3.0),
        anchor: Vec2::new(10.0, 10.0),
    };
    let mid = <Transform2D as Lerp>::lerp(&from, &to, 0.5);
    assert_eq!(mid.translate, Vec2::new(50.0, 25.0));
    assert!((mid.rotation_rad - 0.5).abs() < 1e-12);
    assert_eq!(mid.scale, Vec2::new(2.0, 2.0));
    assert_eq!(mid.anchor, Vec2::new(5.0, 5.0));
}

#[test]
fn procedural_scalar_samples_through_anim() {
    let a: Anim<f64> = Anim::Procedural(Procedural::new(ProceduralKind::Scalar(
        ProcScalar::Sine {
            amp: 1.0,
            freq_hz: 1.0,
            phase: 0.0,
            offset: 2.0,
        },
    )));
    a.validate().unwrap();
    assert!((a.sample(ctx(0)).unwrap() - 2.0).abs() < 1e-9);
}

#[test]
fn keyframes_deserialize_with_default_ease() {
    let json = r#"{"keyframes":{"keys":[{"frame":0,"value":0.0},{"frame":4,"value":1.0}],"mode":"linear"}}"#;
    let a: Anim<f64> = serde_json::from_str(json).unwrap();
    a.validate().unwrap();
    assert!((a.sample(ctx(2)).unwrap() - 0.5).abs() < 1e-9);
}
