use crate::{
    foundation::core::Affine,
    foundation::error::{StackError, StackResult},
};

const MAX_RASTER_DIM: u32 = 16_384;

/// Pick a raster size for `tree` drawn with `transform`.
///
/// Returns `(width, height, draw_transform)`: rasterize at `(width, height)` and draw the result
/// with `draw_transform`, which undoes the raster scale so the image lands where the vector
/// would have.
pub(crate) fn svg_raster_params(
    tree: &usvg::Tree,
    transform: Affine,
) -> StackResult<(u32, u32, Affine)> {
    let size = tree.size();
    let (base_w, base_h) = (f64::from(size.width()), f64::from(size.height()));
    if !(base_w.is_finite() && base_h.is_finite() && base_w > 0.0 && base_h > 0.0) {
        return Err(StackError::evaluation("svg has invalid width/height"));
    }

    let [a, b, c, d, _, _] = transform.as_coeffs();
    let sx = (a * a + b * b).sqrt().max(1e-6);
    let sy = (c * c + d * d).sqrt().max(1e-6);

    let w = (base_w * sx).ceil().max(1.0);
    let h = (base_h * sy).ceil().max(1.0);
    if w > f64::from(MAX_RASTER_DIM) || h > f64::from(MAX_RASTER_DIM) {
        return Err(StackError::evaluation(format!(
            "svg raster size too large: {w}x{h} (max {MAX_RASTER_DIM}x{MAX_RASTER_DIM})"
        )));
    }
    let (w, h) = (w as u32, h as u32);

    // Map raster pixels back onto the tree's user space before applying `transform`.
    let to_user = Affine::scale_non_uniform(base_w / f64::from(w), base_h / f64::from(h));
    Ok((w, h, transform * to_user))
}

/// Rasterize `tree` stretched to `width x height`, premultiplied RGBA8.
pub(crate) fn rasterize_svg_to_premul_rgba8(
    tree: &usvg::Tree,
    width: u32,
    height: u32,
) -> StackResult<Vec<u8>> {
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| StackError::evaluation("failed to allocate svg pixmap"))?;

    let sx = (width as f32) / tree.size().width();
    let sy = (height as f32) / tree.size().height();
    resvg::render(
        tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap.take())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/svg_raster.rs"]
mod tests;
