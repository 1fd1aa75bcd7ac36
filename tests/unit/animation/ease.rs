use super::*;

const ALL: [Ease; 9] = [
    Ease::Linear,
    Ease::InQuad,
    Ease::OutQuad,
    Ease::InOutQuad,
    Ease::InCubic,
    Ease::OutCubic,
    Ease::InOutCubic,
    Ease::InOutSine,
    Ease::OutExpo,
];

#[test]
fn endpoints_are_exact() {
    for e in ALL {
        assert!(e.apply(0.0).abs() < 1e-12, "{e:?}");
        assert!((e.apply(1.0) - 1.0).abs() < 1e-12, "{e:?}");
    }
}

#[test]
fn out_of_range_input_is_clamped() {
    for e in ALL {
        assert_eq!(e.apply(-3.0), e.apply(0.0));
        assert_eq!(e.apply(7.5), e.apply(1.0));
    }
}

#[test]
fn every_curve_is_monotone() {
    for e in ALL {
        let mut prev = e.apply(0.0);
        for i in 1..=1000 {
            let v = e.apply(f64::from(i) / 1000.0);
            assert!(v + 1e-12 >= prev, "{e:?} decreased at step {i}");
            prev = v;
        }
    }
}

#[test]
fn in_out_curves_pass_through_midpoint() {
    for e in [Ease::InOutQuad, Ease::InOutCubic, Ease::InOutSine] {
        assert!((e.apply(0.5) - 0.5).abs() < 1e-9, "{e:?}");
    }
}

#[test]
fn names_are_snake_case() {
    let e: Ease = serde_json::from_str("\"in_out_cubic\"").unwrap();
    assert_eq!(e, Ease::InOutCubic);
    assert_eq!(serde_json::to_string(&Ease::OutExpo).unwrap(), "\"out_expo\"");
}
