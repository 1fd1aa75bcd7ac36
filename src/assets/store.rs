use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;

use crate::{
    assets::decode,
    foundation::core::BezPath,
    foundation::error::{StackError, StackResult},
    foundation::math::Fnv1a64,
    scene::model::{LayerContent, SceneStack},
};

#[derive(Clone, Debug)]
/// Raster image in premultiplied RGBA8 form.
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

#[derive(Clone, Debug)]
/// Parsed SVG document.
pub struct PreparedSvg {
    /// Parsed tree.
    pub tree: Arc<usvg::Tree>,
}

#[derive(Clone, Debug)]
/// Path geometry parsed from SVG path data.
pub struct PreparedPath {
    /// Parsed path.
    pub path: BezPath,
}

#[derive(Clone, Debug)]
/// Any prepared asset.
pub enum PreparedAsset {
    /// Raster image.
    Image(PreparedImage),
    /// SVG document.
    Svg(PreparedSvg),
    /// Vector path.
    Path(PreparedPath),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
/// Stable hashed asset identifier: FNV-1a over a kind tag and the normalized source.
pub struct AssetId(pub(crate) u64);

impl AssetId {
    /// Raw 64-bit value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// All assets referenced by a [`SceneStack`], decoded up front.
///
/// Rendering never touches the filesystem; everything it needs is looked up here by
/// [`AssetId`]. The same file referenced by several layers is decoded once.
#[derive(Clone, Debug)]
pub struct PreparedAssetStore {
    root: PathBuf,
    assets: HashMap<AssetId, PreparedAsset>,
}

impl PreparedAssetStore {
    /// Decode every image, SVG and path referenced by `stack`, resolving files under `root`.
    #[tracing::instrument(skip(stack, root))]
    pub fn prepare(stack: &SceneStack, root: impl Into<PathBuf>) -> StackResult<Self> {
        let mut out = Self::empty(root);

        for scene in &stack.scenes {
            for layer in &scene.layers {
                let Some(id) = asset_id_for(&layer.content)? else {
                    continue;
                };
                if out.assets.contains_key(&id) {
                    continue;
                }
                let prepared = match &layer.content {
                    LayerContent::Image { source } => {
                        let norm = normalize_rel_path(source)?;
                        PreparedAsset::Image(decode::decode_image(&out.read_bytes(&norm)?)?)
                    }
                    LayerContent::Svg { source } => {
                        let norm = normalize_rel_path(source)?;
                        let abs = out.root.join(Path::new(&norm));
                        PreparedAsset::Svg(decode::parse_svg(&out.read_bytes(&norm)?, abs.parent())?)
                    }
                    LayerContent::Path { svg_path_d, .. } => {
                        PreparedAsset::Path(decode::parse_svg_path(svg_path_d)?)
                    }
                    LayerContent::Solid { .. } | LayerContent::Rect { .. } => continue,
                };
                out.assets.insert(id, prepared);
            }
        }

        tracing::debug!(assets = out.assets.len(), "assets prepared");
        Ok(out)
    }

    /// A store with no assets; enough for stacks made only of solids and rects.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            assets: HashMap::new(),
        }
    }

    /// Directory relative asset paths resolve against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of distinct prepared assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// `true` when nothing was prepared.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Look up a prepared asset.
    pub fn get(&self, id: AssetId) -> StackResult<&PreparedAsset> {
        self.assets
            .get(&id)
            .ok_or_else(|| StackError::evaluation(format!("unknown AssetId {}", id.as_u64())))
    }

    fn read_bytes(&self, norm_path: &str) -> StackResult<Vec<u8>> {
        let path = self.root.join(Path::new(norm_path));
        Ok(std::fs::read(&path)
            .with_context(|| format!("read asset bytes from '{}'", path.display()))?)
    }
}

/// Identifier for the asset behind `content`; `None` for content drawn without one.
pub fn asset_id_for(content: &LayerContent) -> StackResult<Option<AssetId>> {
    let (tag, key) = match content {
        LayerContent::Image { source } => (b'I', normalize_rel_path(source)?),
        LayerContent::Svg { source } => (b'S', normalize_rel_path(source)?),
        LayerContent::Path { svg_path_d, .. } => (b'P', svg_path_d.trim().to_string()),
        LayerContent::Solid { .. } | LayerContent::Rect { .. } => return Ok(None),
    };
    let mut hasher = Fnv1a64::new_default();
    hasher.write_u8(tag);
    hasher.write_str(&key);
    Ok(Some(AssetId(hasher.finish())))
}

/// Normalize a document-relative asset path.
///
/// Uses `/` separators, drops `.` segments, and rejects empty paths, absolute paths and
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> StackResult<String> {
    let s = source.replace('\\', "/");
    if s.is_empty() {
        return Err(StackError::validation("asset path must be non-empty"));
    }
    if s.starts_with('/') || s.as_bytes().get(1) == Some(&b':') {
        return Err(StackError::validation("asset paths must be relative"));
    }

    let mut parts = Vec::<&str>::new();
    for part in s.split('/') {
        match part {
            "" | "." => {}
            ".." => return Err(StackError::validation("asset paths must not contain '..'")),
            p => parts.push(p),
        }
    }
    if parts.is_empty() {
        return Err(StackError::validation("asset path must contain a file name"));
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
