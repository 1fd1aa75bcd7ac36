use super::*;

fn tree(w: u32, h: u32, fill: &str) -> usvg::Tree {
    let svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}"><rect width="{w}" height="{h}" fill="{fill}"/></svg>"#
    );
    usvg::Tree::from_data(svg.as_bytes(), &usvg::Options::default()).unwrap()
}

#[test]
fn raster_size_follows_transform_scale() {
    let t = tree(10, 5, "red");
    let (w, h, _) = svg_raster_params(&t, Affine::IDENTITY).unwrap();
    assert_eq!((w, h), (10, 5));

    let (w, h, adjust) = svg_raster_params(&t, Affine::scale(3.0)).unwrap();
    assert_eq!((w, h), (30, 15));
    let corner = adjust * kurbo::Point::new(f64::from(w), f64::from(h));
    assert!((corner.x - 30.0).abs() < 1e-9 && (corner.y - 15.0).abs() < 1e-9);
}

#[test]
fn oversized_raster_is_rejected() {
    let t = tree(100, 100, "red");
    assert!(svg_raster_params(&t, Affine::scale(1000.0)).is_err());
}

#[test]
fn rasterized_pixels_are_premultiplied() {
    let t = tree(2, 2, "rgba(0, 0, 255, 0.5)");
    let px = rasterize_svg_to_premul_rgba8(&t, 2, 2).unwrap();
    assert_eq!(px.len(), 16);
    for p in px.chunks_exact(4) {
        assert!(p[2] <= p[3]);
        assert!(p[3] > 100 && p[3] < 160);
    }
}
