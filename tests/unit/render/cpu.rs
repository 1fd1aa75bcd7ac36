use super::*;
use crate::{
    compile::plan::{Pass, PixelFormat, SurfaceDesc},
    effects::transitions::TransitionKind,
    foundation::core::{Canvas, Rect},
    render::passes::execute_plan,
};

const W: u32 = 8;
const H: u32 = 4;

fn desc() -> SurfaceDesc {
    SurfaceDesc {
        width: W,
        height: H,
        format: PixelFormat::Rgba8Premul,
    }
}

fn fill(color: [u8; 4], opacity: f32) -> DrawOp {
    use kurbo::Shape;
    DrawOp::FillPath {
        path: Rect::new(0.0, 0.0, f64::from(W), f64::from(H)).to_path(0.1),
        transform: Affine::IDENTITY,
        color: Rgba8Premul::from_straight_array(color),
        opacity,
    }
}

fn scene(target: u32, ops: Vec<DrawOp>) -> Pass {
    Pass::Scene(ScenePass {
        target: SurfaceId(target),
        ops,
        clear_to_transparent: true,
    })
}

fn plan(surfaces: usize, passes: Vec<Pass>) -> RenderPlan {
    RenderPlan {
        canvas: Canvas {
            width: W,
            height: H,
        },
        surfaces: vec![desc(); surfaces],
        passes,
        final_surface: SurfaceId(0),
    }
}

fn run(backend: &mut CpuBackend, plan: &RenderPlan) -> FrameRGBA {
    execute_plan(backend, plan, &PreparedAssetStore::empty(".")).unwrap()
}

fn px(frame: &FrameRGBA, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * frame.width + x) * 4) as usize;
    [
        frame.data[i],
        frame.data[i + 1],
        frame.data[i + 2],
        frame.data[i + 3],
    ]
}

#[test]
fn final_surface_is_cleared_to_settings_color() {
    let mut backend = CpuBackend::new(RenderSettings {
        clear_rgba: Some([255, 0, 0, 255]),
    });
    let frame = run(&mut backend, &plan(1, vec![]));
    assert!(frame.premultiplied);
    assert!(frame.data.chunks_exact(4).all(|p| p == [255, 0, 0, 255]));
}

#[test]
fn opaque_fill_composited_over_final_covers_every_pixel() {
    let mut backend = CpuBackend::new(RenderSettings::default());
    let p = plan(
        2,
        vec![
            scene(1, vec![fill([0, 0, 255, 255], 1.0)]),
            Pass::Composite(CompositePass {
                target: SurfaceId(0),
                ops: vec![CompositeOp::Over {
                    src: SurfaceId(1),
                    opacity: 1.0,
                }],
            }),
        ],
    );
    let frame = run(&mut backend, &p);
    assert_eq!(px(&frame, 0, 0), [0, 0, 255, 255]);
    assert_eq!(px(&frame, W - 1, H - 1), [0, 0, 255, 255]);
}

#[test]
fn layer_opacity_scales_alpha() {
    let mut backend = CpuBackend::new(RenderSettings::default());
    let p = plan(
        2,
        vec![
            scene(1, vec![fill([255, 255, 255, 255], 0.5)]),
            Pass::Composite(CompositePass {
                target: SurfaceId(0),
                ops: vec![CompositeOp::Over {
                    src: SurfaceId(1),
                    opacity: 1.0,
                }],
            }),
        ],
    );
    let a = px(&run(&mut backend, &p), 3, 2)[3];
    assert!((120..=136).contains(&a), "alpha was {a}");
}

#[test]
fn transition_endpoints_show_one_scene_each() {
    let mut backend = CpuBackend::new(RenderSettings::default());
    let at = |backend: &mut CpuBackend, t: f32| {
        let p = plan(
            3,
            vec![
                scene(1, vec![fill([255, 0, 0, 255], 1.0)]),
                scene(2, vec![fill([0, 255, 0, 255], 1.0)]),
                Pass::Composite(CompositePass {
                    target: SurfaceId(0),
                    ops: vec![CompositeOp::Transition {
                        a: SurfaceId(1),
                        b: SurfaceId(2),
                        t,
                        kind: TransitionKind::Crossfade,
                    }],
                }),
            ],
        );
        run(backend, &p)
    };

    assert_eq!(px(&at(&mut backend, 0.0), 1, 1), [255, 0, 0, 255]);
    assert_eq!(px(&at(&mut backend, 1.0), 1, 1), [0, 255, 0, 255]);
}

#[test]
fn missing_surface_is_reported() {
    let mut backend = CpuBackend::new(RenderSettings::default());
    let p = plan(1, vec![scene(5, vec![])]);
    assert!(execute_plan(&mut backend, &p, &PreparedAssetStore::empty(".")).is_err());
}

#[test]
fn readback_drops_surfaces_beyond_the_plan() {
    let mut backend = CpuBackend::new(RenderSettings::default());
    run(&mut backend, &plan(3, vec![]));
    assert_eq!(backend.surfaces.len(), 3);
    run(&mut backend, &plan(1, vec![]));
    assert_eq!(backend.surfaces.len(), 1);
}

#[test]
fn pixmap_conversion_rejects_wrong_length() {
    assert!(premul_bytes_to_pixmap(&[0; 12], 2, 2).is_err());
    assert!(premul_bytes_to_pixmap(&[0; 16], 2, 2).is_ok());
}
