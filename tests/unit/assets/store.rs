use std::io::Cursor;

use super::*;
use crate::animation::anim::Anim;
use crate::foundation::core::{Canvas, Fps, Transform2D};
use crate::scene::model::{Layer, Scene};

fn temp_root(name: &str) -> PathBuf {
    let tmp = std::env::temp_dir().join(format!(
        "scenestack_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&tmp).unwrap();
    tmp
}

fn layer(id: &str, content: LayerContent) -> Layer {
    Layer {
        id: id.to_string(),
        content,
        transform: Anim::constant(Transform2D::default()),
        opacity: Anim::constant(1.0),
        visible: None,
    }
}

fn stack_with(layers: Vec<Layer>) -> SceneStack {
    SceneStack {
        fps: Fps::new(30, 1).unwrap(),
        canvas: Canvas {
            width: 4,
            height: 4,
        },
        background: None,
        seed: 0,
        scenes: vec![Scene {
            id: "s".to_string(),
            duration_frames: 1,
            layers,
        }],
        transitions: vec![],
    }
}

#[test]
fn normalize_path_rules() {
    assert_eq!(normalize_rel_path("a/b.png").unwrap(), "a/b.png");
    assert_eq!(normalize_rel_path("a\\b.png").unwrap(), "a/b.png");
    assert_eq!(normalize_rel_path("./a//b.png").unwrap(), "a/b.png");
    assert!(normalize_rel_path("../x.png").is_err());
    assert!(normalize_rel_path("a/../../x.png").is_err());
    assert!(normalize_rel_path("/abs.png").is_err());
    assert!(normalize_rel_path("C:\\abs.png").is_err());
    assert!(normalize_rel_path("./").is_err());
    assert!(normalize_rel_path("").is_err());
}

#[test]
fn asset_ids_are_stable_and_kind_tagged() {
    let img = LayerContent::Image {
        source: "a/b.png".to_string(),
    };
    let same = LayerContent::Image {
        source: "./a\\b.png".to_string(),
    };
    let svg = LayerContent::Svg {
        source: "a/b.png".to_string(),
    };
    let a = asset_id_for(&img).unwrap().unwrap();
    assert_eq!(a, asset_id_for(&same).unwrap().unwrap());
    assert_ne!(a, asset_id_for(&svg).unwrap().unwrap());
    assert!(
        asset_id_for(&LayerContent::Solid {
            color: [0, 0, 0, 0]
        })
        .unwrap()
        .is_none()
    );
}

#[test]
fn prepare_paths_without_io_and_dedupes() {
    let path = LayerContent::Path {
        svg_path_d: "M0,0 L10,0 L10,10 Z".to_string(),
        color: [255, 0, 0, 255],
    };
    let stack = stack_with(vec![layer("p0", path.clone()), layer("p1", path.clone())]);
    let store = PreparedAssetStore::prepare(&stack, "/nonexistent").unwrap();
    assert_eq!(store.len(), 1);

    let id = asset_id_for(&path).unwrap().unwrap();
    let PreparedAsset::Path(p) = store.get(id).unwrap() else {
        panic!("expected prepared path");
    };
    assert!(!p.path.elements().is_empty());
}

#[test]
fn prepare_single_image_asset() {
    let tmp = temp_root("store_image");
    let img = image::RgbaImage::from_raw(1, 1, vec![200u8, 100u8, 0u8, 128u8]).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(tmp.join("img.png"), &buf).unwrap();

    let content = LayerContent::Image {
        source: "img.png".to_string(),
    };
    let store = PreparedAssetStore::prepare(&stack_with(vec![layer("i", content.clone())]), &tmp)
        .unwrap();
    let PreparedAsset::Image(p) = store.get(asset_id_for(&content).unwrap().unwrap()).unwrap()
    else {
        panic!("expected prepared image");
    };
    assert_eq!((p.width, p.height), (1, 1));
    assert_eq!(p.rgba8_premul.as_slice(), &[100, 50, 0, 128]);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn missing_file_is_reported() {
    let stack = stack_with(vec![layer(
        "i",
        LayerContent::Image {
            source: "nope.png".to_string(),
        },
    )]);
    let err = PreparedAssetStore::prepare(&stack, temp_root("store_missing")).unwrap_err();
    assert!(err.to_string().contains("nope.png"), "{err}");
}

#[test]
fn unknown_id_is_an_evaluation_error() {
    let store = PreparedAssetStore::empty(".");
    assert!(store.is_empty());
    assert!(matches!(
        store.get(AssetId(42)),
        Err(StackError::Evaluation(_))
    ));
}
