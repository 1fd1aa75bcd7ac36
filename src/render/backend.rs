use crate::{
    assets::store::PreparedAssetStore,
    compile::plan::RenderPlan,
    foundation::error::StackResult,
    render::passes::{PassBackend, execute_plan},
};

/// A rendered frame in RGBA8 format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes, row-major, 4 bytes per pixel.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Un-premultiply into straight-alpha RGBA8, e.g. for PNG output.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if !self.premultiplied {
            return out;
        }
        for px in out.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 {
                px[..3].fill(0);
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }
}

/// Backend that can execute a [`RenderPlan`] end to end.
pub trait RenderBackend: PassBackend {
    /// Run every pass of `plan` and read back the final surface.
    fn render_plan(
        &mut self,
        plan: &RenderPlan,
        assets: &PreparedAssetStore,
    ) -> StackResult<FrameRGBA> {
        execute_plan(self, plan, assets)
    }

    /// Settings for cloning this backend onto worker threads, if it supports that.
    fn worker_render_settings(&self) -> Option<RenderSettings> {
        None
    }
}

/// Available rendering backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// CPU rasterization through `vello_cpu`.
    Cpu,
}

/// Backend-independent render settings.
#[derive(Clone, Debug, Default)]
pub struct RenderSettings {
    /// Straight-alpha color the final surface is cleared to before each frame.
    pub clear_rgba: Option<[u8; 4]>,
}

/// Construct a boxed backend of the requested kind.
pub fn create_backend(
    kind: BackendKind,
    settings: &RenderSettings,
) -> StackResult<Box<dyn RenderBackend>> {
    match kind {
        BackendKind::Cpu => Ok(Box::new(crate::render::cpu::CpuBackend::new(
            settings.clone(),
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
