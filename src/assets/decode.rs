use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::{
    assets::store::{PreparedImage, PreparedPath, PreparedSvg},
    foundation::core::BezPath,
    foundation::error::{StackError, StackResult},
    foundation::math::mul_div255_u8,
};

/// Decode any format `image` understands into premultiplied RGBA8.
pub(crate) fn decode_image(bytes: &[u8]) -> StackResult<PreparedImage> {
    let rgba = image::load_from_memory(bytes)
        .context("decode image from memory")?
        .to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Parse an SVG document. Relative hrefs resolve against `resources_dir`.
pub(crate) fn parse_svg(bytes: &[u8], resources_dir: Option<&Path>) -> StackResult<PreparedSvg> {
    let mut fontdb = usvg::fontdb::Database::new();
    fontdb.load_system_fonts();
    let opts = usvg::Options {
        resources_dir: resources_dir.map(Path::to_path_buf),
        fontdb: Arc::new(fontdb),
        ..Default::default()
    };
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;
    Ok(PreparedSvg {
        tree: Arc::new(tree),
    })
}

pub(crate) fn parse_svg_path(d: &str) -> StackResult<PreparedPath> {
    let d = d.trim();
    if d.is_empty() {
        return Err(StackError::validation("svg_path_d must be non-empty"));
    }
    let path = BezPath::from_svg(d)
        .map_err(|e| StackError::validation(format!("invalid svg_path_d: {e}")))?;
    Ok(PreparedPath { path })
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        for c in &mut px[..3] {
            *c = mul_div255_u8(u16::from(*c), a);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
