use std::io::Cursor;

use super::*;

#[test]
fn decode_image_png_dimensions_and_premul() {
    let img = image::RgbaImage::from_raw(2, 1, vec![100, 50, 200, 128, 9, 9, 9, 0]).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();

    let prepared = decode_image(&buf).unwrap();
    assert_eq!((prepared.width, prepared.height), (2, 1));
    assert_eq!(
        prepared.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128,
            0,
            0,
            0,
            0
        ]
    );
}

#[test]
fn garbage_bytes_are_not_an_image() {
    assert!(decode_image(b"not an image").is_err());
}

#[test]
fn svg_parse_ok_and_err() {
    let ok = br#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="2"></svg>"#;
    let svg = parse_svg(ok, None).unwrap();
    assert_eq!(svg.tree.size().width(), 4.0);
    assert!(parse_svg(br#"<svg"#, None).is_err());
}

#[test]
fn svg_path_parse() {
    assert!(parse_svg_path("M0 0 L4 0 L4 4 Z").is_ok());
    assert!(parse_svg_path("   ").is_err());
    assert!(parse_svg_path("M0 0 Q").is_err());
}
