use super::*;

#[test]
fn frame_range_contains_boundaries() {
    let r = FrameRange::new(FrameIndex(2), FrameIndex(5)).unwrap();
    assert!(!r.contains(FrameIndex(1)));
    assert!(r.contains(FrameIndex(2)));
    assert!(r.contains(FrameIndex(4)));
    assert!(!r.contains(FrameIndex(5)));
}

#[test]
fn frame_range_rejects_inverted_bounds() {
    assert!(FrameRange::new(FrameIndex(5), FrameIndex(2)).is_err());
    let empty = FrameRange::new(FrameIndex(3), FrameIndex(3)).unwrap();
    assert!(empty.is_empty());
    assert_eq!(empty.clamp(FrameIndex(10)), FrameIndex(3));
}

#[test]
fn frame_range_clamp_stays_inside() {
    let r = FrameRange::new(FrameIndex(10), FrameIndex(20)).unwrap();
    assert_eq!(r.clamp(FrameIndex(0)), FrameIndex(10));
    assert_eq!(r.clamp(FrameIndex(15)), FrameIndex(15));
    assert_eq!(r.clamp(FrameIndex(99)), FrameIndex(19));
}

#[test]
fn fps_frames_secs_roundtrip_floor() {
    let fps = Fps::new(30000, 1001).unwrap();
    let secs = fps.frames_to_secs(123);
    assert_eq!(fps.secs_to_frames_floor(secs), 123);
    assert!(Fps::new(30, 0).is_err());
    assert!(Fps::new(0, 1).is_err());
}

#[test]
fn premultiply_scales_color_by_alpha() {
    let c = Rgba8Premul::from_straight_rgba(255, 128, 0, 128);
    assert_eq!(c.a, 128);
    assert_eq!(c.r, 128);
    assert_eq!(c.g, 64);
    assert_eq!(c.b, 0);
    assert_eq!(
        Rgba8Premul::from_straight_array([9, 9, 9, 0]),
        Rgba8Premul::transparent()
    );
}

#[test]
fn transform_to_affine_identity_and_translation() {
    let t = Transform2D::default();
    assert_eq!(t.to_affine(), Affine::IDENTITY);

    let t = Transform2D {
        translate: Vec2::new(10.0, -2.5),
        ..Transform2D::default()
    };
    assert_eq!(t.to_affine(), Affine::translate(Vec2::new(10.0, -2.5)));
}

#[test]
fn transform_scales_around_anchor() {
    let t = Transform2D {
        scale: Vec2::new(2.0, 2.0),
        anchor: Vec2::new(10.0, 10.0),
        ..Transform2D::default()
    };
    let p = t.to_affine() * Point::new(10.0, 10.0);
    assert!((p.x - 10.0).abs() < 1e-9);
    assert!((p.y - 10.0).abs() < 1e-9);
    let q = t.to_affine() * Point::new(20.0, 10.0);
    assert!((q.x - 30.0).abs() < 1e-9);
}
