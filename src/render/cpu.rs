use std::{collections::HashMap, sync::Arc};

use crate::{
    assets::store::{AssetId, PreparedAsset, PreparedAssetStore},
    assets::svg_raster::{rasterize_svg_to_premul_rgba8, svg_raster_params},
    compile::plan::{CompositeOp, CompositePass, DrawOp, RenderPlan, ScenePass, SurfaceDesc, SurfaceId},
    effects::composite::{SurfaceView, over_in_place, transition_over_in_place},
    foundation::core::{Affine, BezPath, Point, Rgba8Premul},
    foundation::error::{StackError, StackResult},
    render::backend::{FrameRGBA, RenderBackend, RenderSettings},
    render::passes::PassBackend,
};

/// Software backend built on `vello_cpu`.
///
/// Each backend owns its surfaces and per-asset paint caches, so parallel renders create one
/// backend per worker thread.
pub struct CpuBackend {
    settings: RenderSettings,
    image_cache: HashMap<AssetId, vello_cpu::Image>,
    svg_cache: HashMap<SvgRasterKey, vello_cpu::Image>,
    surfaces: HashMap<SurfaceId, CpuSurface>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct SvgRasterKey {
    asset: AssetId,
    width: u32,
    height: u32,
}

struct CpuSurface {
    width: u16,
    height: u16,
    pixmap: vello_cpu::Pixmap,
}

impl CpuSurface {
    fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixmap: vello_cpu::Pixmap::new(width, height),
        }
    }
}

impl CpuBackend {
    /// New backend with empty caches.
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            image_cache: HashMap::new(),
            svg_cache: HashMap::new(),
            surfaces: HashMap::new(),
        }
    }

    fn surface(&self, id: SurfaceId, role: &str) -> StackResult<&CpuSurface> {
        self.surfaces.get(&id).ok_or_else(|| {
            StackError::evaluation(format!("{role} surface {id:?} was not initialized"))
        })
    }

    fn take_surface(&mut self, id: SurfaceId, role: &str) -> StackResult<CpuSurface> {
        self.surfaces.remove(&id).ok_or_else(|| {
            StackError::evaluation(format!("{role} surface {id:?} was not initialized"))
        })
    }
}

impl PassBackend for CpuBackend {
    fn ensure_surface(&mut self, id: SurfaceId, desc: &SurfaceDesc) -> StackResult<()> {
        let width: u16 = desc
            .width
            .try_into()
            .map_err(|_| StackError::evaluation("surface width exceeds u16"))?;
        let height: u16 = desc
            .height
            .try_into()
            .map_err(|_| StackError::evaluation("surface height exceeds u16"))?;

        let surface = self
            .surfaces
            .entry(id)
            .or_insert_with(|| CpuSurface::new(width, height));
        if surface.width != width || surface.height != height {
            *surface = CpuSurface::new(width, height);
        }

        if id == SurfaceId(0) {
            let clear = self
                .settings
                .clear_rgba
                .map(|c| Rgba8Premul::from_straight_array(c).to_array())
                .unwrap_or([0, 0, 0, 0]);
            clear_pixmap(&mut surface.pixmap, clear);
        }
        Ok(())
    }

    fn exec_scene(&mut self, pass: &ScenePass, assets: &PreparedAssetStore) -> StackResult<()> {
        let mut surface = self.take_surface(pass.target, "scene target")?;
        if pass.clear_to_transparent {
            clear_pixmap(&mut surface.pixmap, [0, 0, 0, 0]);
        }

        let mut ctx = vello_cpu::RenderContext::new(surface.width, surface.height);
        let drawn = pass
            .ops
            .iter()
            .try_for_each(|op| self.draw_op(&mut ctx, op, assets));
        if drawn.is_ok() {
            ctx.flush();
            ctx.render_to_pixmap(&mut surface.pixmap);
        }
        self.surfaces.insert(pass.target, surface);
        drawn
    }

    fn exec_composite(
        &mut self,
        pass: &CompositePass,
        _assets: &PreparedAssetStore,
    ) -> StackResult<()> {
        let mut dst = self.take_surface(pass.target, "composite target")?;
        let result = pass
            .ops
            .iter()
            .try_for_each(|op| self.composite_op(&mut dst, op));
        self.surfaces.insert(pass.target, dst);
        result
    }

    fn readback_rgba8(
        &mut self,
        surface: SurfaceId,
        plan: &RenderPlan,
        _assets: &PreparedAssetStore,
    ) -> StackResult<FrameRGBA> {
        let data = self
            .surface(surface, "readback")?
            .pixmap
            .data_as_u8_slice()
            .to_vec();
        // Drop surfaces a larger previous plan left behind.
        let cap = plan.surfaces.len() as u32;
        self.surfaces.retain(|id, _| id.0 < cap);

        Ok(FrameRGBA {
            width: plan.canvas.width,
            height: plan.canvas.height,
            data,
            premultiplied: true,
        })
    }
}

impl RenderBackend for CpuBackend {
    fn worker_render_settings(&self) -> Option<RenderSettings> {
        Some(self.settings.clone())
    }
}

impl CpuBackend {
    fn composite_op(&self, dst: &mut CpuSurface, op: &CompositeOp) -> StackResult<()> {
        match op {
            CompositeOp::Over { src, opacity } => {
                let src = self.surface(*src, "composite src")?;
                over_in_place(
                    dst.pixmap.data_as_u8_slice_mut(),
                    src.pixmap.data_as_u8_slice(),
                    *opacity,
                )
            }
            CompositeOp::Transition { a, b, t, kind } => {
                let a = self.surface(*a, "transition src")?;
                let b = self.surface(*b, "transition src")?;
                transition_over_in_place(
                    dst.pixmap.data_as_u8_slice_mut(),
                    view(a)?,
                    view(b)?,
                    kind,
                    *t,
                )
            }
        }
    }

    fn draw_op(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        op: &DrawOp,
        assets: &PreparedAssetStore,
    ) -> StackResult<()> {
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        match op {
            DrawOp::FillPath {
                path,
                transform,
                color,
                opacity,
            } => {
                ctx.set_transform(affine_to_cpu(*transform));
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    color.r, color.g, color.b, color.a,
                ));
                with_opacity(ctx, *opacity, |ctx| ctx.fill_path(&bezpath_to_cpu(path)));
            }
            DrawOp::Image {
                asset,
                transform,
                opacity,
            } => {
                let paint = self.image_paint_for(*asset, assets)?;
                let (w, h) = image_paint_size(&paint)?;
                ctx.set_transform(affine_to_cpu(*transform));
                ctx.set_paint(paint);
                with_opacity(ctx, *opacity, |ctx| {
                    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
                });
            }
            DrawOp::Svg {
                asset,
                transform,
                opacity,
            } => {
                let (paint, w, h, adjusted) = self.svg_paint_for(*asset, *transform, assets)?;
                ctx.set_transform(affine_to_cpu(adjusted));
                ctx.set_paint(paint);
                with_opacity(ctx, *opacity, |ctx| {
                    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
                });
            }
        }
        Ok(())
    }

    fn image_paint_for(
        &mut self,
        id: AssetId,
        assets: &PreparedAssetStore,
    ) -> StackResult<vello_cpu::Image> {
        if let Some(paint) = self.image_cache.get(&id) {
            return Ok(paint.clone());
        }

        let PreparedAsset::Image(img) = assets.get(id)? else {
            return Err(StackError::evaluation("AssetId is not a PreparedImage"));
        };
        let pixmap = premul_bytes_to_pixmap(img.rgba8_premul.as_slice(), img.width, img.height)?;
        let paint = pixmap_paint(pixmap);
        self.image_cache.insert(id, paint.clone());
        Ok(paint)
    }

    fn svg_paint_for(
        &mut self,
        id: AssetId,
        transform: Affine,
        assets: &PreparedAssetStore,
    ) -> StackResult<(vello_cpu::Image, f64, f64, Affine)> {
        let PreparedAsset::Svg(svg) = assets.get(id)? else {
            return Err(StackError::evaluation("AssetId is not a PreparedSvg"));
        };

        let (w, h, adjusted) = svg_raster_params(&svg.tree, transform)?;
        let key = SvgRasterKey {
            asset: id,
            width: w,
            height: h,
        };
        if let Some(paint) = self.svg_cache.get(&key) {
            return Ok((paint.clone(), f64::from(w), f64::from(h), adjusted));
        }

        let rgba8_premul = rasterize_svg_to_premul_rgba8(&svg.tree, w, h)?;
        let paint = pixmap_paint(premul_bytes_to_pixmap(&rgba8_premul, w, h)?);
        self.svg_cache.insert(key, paint.clone());
        Ok((paint, f64::from(w), f64::from(h), adjusted))
    }
}

fn view(s: &CpuSurface) -> StackResult<SurfaceView<'_>> {
    SurfaceView::new(
        s.pixmap.data_as_u8_slice(),
        u32::from(s.width),
        u32::from(s.height),
    )
}

fn with_opacity(
    ctx: &mut vello_cpu::RenderContext,
    opacity: f32,
    draw: impl FnOnce(&mut vello_cpu::RenderContext),
) {
    if opacity < 1.0 {
        ctx.push_opacity_layer(opacity);
        draw(ctx);
        ctx.pop_layer();
    } else {
        draw(ctx);
    }
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap, rgba: [u8; 4]) {
    for px in pixmap.data_as_u8_slice_mut().chunks_exact_mut(4) {
        px.copy_from_slice(&rgba);
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

// vello_cpu re-exports its own kurbo version.
fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn pixmap_paint(pixmap: vello_cpu::Pixmap) -> vello_cpu::Image {
    vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    }
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> StackResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| StackError::evaluation("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| StackError::evaluation("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(StackError::evaluation("prepared image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let pixels = rgba8_premul
        .chunks_exact(4)
        .map(|px| {
            may_have_opacities |= px[3] != 255;
            vello_cpu::peniko::color::PremulRgba8 {
                r: px[0],
                g: px[1],
                b: px[2],
                a: px[3],
            }
        })
        .collect::<Vec<_>>();

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

fn image_paint_size(image: &vello_cpu::Image) -> StackResult<(f64, f64)> {
    match &image.image {
        vello_cpu::ImageSource::Pixmap(p) => Ok((f64::from(p.width()), f64::from(p.height()))),
        vello_cpu::ImageSource::OpaqueId(_) => Err(StackError::evaluation(
            "cpu backend does not support opaque image ids",
        )),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
