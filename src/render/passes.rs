use crate::{
    assets::store::PreparedAssetStore,
    compile::plan::{CompositePass, Pass, RenderPlan, ScenePass, SurfaceDesc, SurfaceId},
    foundation::error::{StackError, StackResult},
    render::backend::FrameRGBA,
};

/// The per-pass operations a backend provides to [`execute_plan`].
pub trait PassBackend {
    /// Allocate (or resize) surface `id`. Surface 0 is also cleared here.
    fn ensure_surface(&mut self, id: SurfaceId, desc: &SurfaceDesc) -> StackResult<()>;

    /// Draw a scene pass.
    fn exec_scene(&mut self, pass: &ScenePass, assets: &PreparedAssetStore) -> StackResult<()>;

    /// Run a composite pass.
    fn exec_composite(
        &mut self,
        pass: &CompositePass,
        assets: &PreparedAssetStore,
    ) -> StackResult<()>;

    /// Copy `surface` out as a frame.
    fn readback_rgba8(
        &mut self,
        surface: SurfaceId,
        plan: &RenderPlan,
        assets: &PreparedAssetStore,
    ) -> StackResult<FrameRGBA>;
}

/// Execute `plan` on `backend`: declare surfaces, run passes in order, read back the result.
pub fn execute_plan<B: PassBackend + ?Sized>(
    backend: &mut B,
    plan: &RenderPlan,
    assets: &PreparedAssetStore,
) -> StackResult<FrameRGBA> {
    for (idx, desc) in plan.surfaces.iter().enumerate() {
        let id = SurfaceId(
            idx.try_into()
                .map_err(|_| StackError::evaluation("surface id overflow"))?,
        );
        backend.ensure_surface(id, desc)?;
    }

    for pass in &plan.passes {
        match pass {
            Pass::Scene(p) => backend.exec_scene(p, assets)?,
            Pass::Composite(p) => backend.exec_composite(p, assets)?,
        }
    }

    backend.readback_rgba8(plan.final_surface, plan, assets)
}

#[cfg(test)]
#[path = "../../tests/unit/render/passes.rs"]
mod tests;
