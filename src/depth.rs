//! Depth compositing for surfaces that react to the geometry behind them.
//!
//! The water surface needs the depth of everything else in the scene to
//! draw foam where it meets the ground. Each frame runs five stages in a
//! fixed order:
//!
//! 1. [`HideSurface`](CompositeStage::HideSurface): the water must not write
//!    into its own depth source.
//! 2. [`RenderToDepthTarget`](CompositeStage::RenderToDepthTarget): render
//!    the scene into the off-screen color+depth target.
//! 3. [`RestoreSurface`](CompositeStage::RestoreSurface): make the water
//!    visible again, even if stage 2 failed.
//! 4. [`SampleDepthIntoUniforms`](CompositeStage::SampleDepthIntoUniforms):
//!    hand the depth texture, camera planes, wave clock and colors to the
//!    water material.
//! 5. [`RenderFinal`](CompositeStage::RenderFinal): render the full scene to
//!    the screen.
//!
//! Before stage 1 the target is compared against the viewport and recreated
//! if it is stale, so the depth pass never samples a target of the wrong size.

use crate::config::WaterConfig;
use crate::error::{self, RenderError};
use crate::uniforms::{TextureId, Uniform};

/// Size of the drawable area in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Minimized windows report a zero-sized viewport.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Near and far clip distances of the scene camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPlanes {
    pub near: f32,
    pub far: f32,
}

/// One step of a compositing frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeStage {
    HideSurface,
    RenderToDepthTarget,
    RestoreSurface,
    SampleDepthIntoUniforms,
    RenderFinal,
}

impl CompositeStage {
    /// Stages in execution order.
    pub const ORDER: [CompositeStage; 5] = [
        CompositeStage::HideSurface,
        CompositeStage::RenderToDepthTarget,
        CompositeStage::RestoreSurface,
        CompositeStage::SampleDepthIntoUniforms,
        CompositeStage::RenderFinal,
    ];
}

/// The renderer collaborator the compositor drives.
///
/// `Target` is the backend's off-screen color+depth target; the compositor
/// owns it and decides when it is recreated.
pub trait SceneRenderer {
    type Target;

    fn viewport(&self) -> Viewport;

    fn camera_planes(&self) -> CameraPlanes;

    /// Allocate a color+depth target of `size`.
    fn create_depth_target(&mut self, size: Viewport) -> Result<Self::Target, RenderError>;

    /// Handle of the depth texture inside `target`.
    fn depth_texture(&self, target: &Self::Target) -> TextureId;

    /// Show or hide the depth-consuming surface.
    fn set_surface_visible(&mut self, visible: bool);

    /// Render the scene into `target`.
    fn render_to_target(&mut self, target: &Self::Target) -> Result<(), RenderError>;

    /// Set a uniform on the depth-consuming surface's material.
    fn set_surface_uniform(&mut self, uniform: &Uniform);

    /// Render the scene to the screen.
    fn render_final(&mut self) -> Result<(), RenderError>;
}

/// An off-screen target together with the size it was created for.
#[derive(Debug)]
pub struct DepthTarget<T> {
    size: Viewport,
    texture: TextureId,
    inner: T,
}

impl<T> DepthTarget<T> {
    pub fn size(&self) -> Viewport {
        self.size
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

/// What a call to [`DepthCompositor::frame`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered,
    /// The viewport is empty; nothing was drawn.
    Skipped,
}

/// Runs the depth compositing stages and owns the depth target.
#[derive(Debug)]
pub struct DepthCompositor<T> {
    target: Option<DepthTarget<T>>,
    water: WaterConfig,
    colors_dirty: bool,
    stale_heals: u64,
    frames: u64,
}

impl<T> DepthCompositor<T> {
    pub fn new(water: WaterConfig) -> error::Result<Self> {
        water.validate()?;
        Ok(Self {
            target: None,
            water,
            colors_dirty: true,
            stale_heals: 0,
            frames: 0,
        })
    }

    /// Replace the water material settings; colors are pushed next frame.
    ///
    /// An invalid config is rejected and the current one stays in use.
    pub fn set_water(&mut self, water: WaterConfig) -> error::Result<()> {
        water.validate()?;
        self.water = water;
        self.colors_dirty = true;
        Ok(())
    }

    pub fn water(&self) -> &WaterConfig {
        &self.water
    }

    pub fn target(&self) -> Option<&DepthTarget<T>> {
        self.target.as_ref()
    }

    /// Times a target was found out of date and rebuilt.
    pub fn stale_heals(&self) -> u64 {
        self.stale_heals
    }

    /// Frames fully rendered.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Drop the depth target. The next frame allocates a new one.
    ///
    /// Call after the backend lost its resources.
    pub fn reset(&mut self) {
        self.target = None;
        self.colors_dirty = true;
    }

    /// `uTime` of the water material.
    pub fn wave_time(&self, elapsed_ms: f64) -> f32 {
        ((elapsed_ms / self.water.wave_period_ms as f64).sin() + 2.0) as f32
    }

    /// Bring the depth target in line with the scene's viewport.
    ///
    /// Returns `false` when the viewport is empty; the current target is
    /// then kept. [`frame`](Self::frame) does this itself, hosts call it
    /// first when the simulation step must see the new size.
    pub fn sync_viewport<S>(&mut self, scene: &mut S) -> Result<bool, RenderError>
    where
        S: SceneRenderer<Target = T>,
    {
        let viewport = scene.viewport();
        if viewport.is_empty() {
            return Ok(false);
        }
        self.ensure_target(scene, viewport)?;
        Ok(true)
    }

    /// Run one compositing frame.
    pub fn frame<S>(&mut self, scene: &mut S, elapsed_ms: f64) -> Result<FrameOutcome, RenderError>
    where
        S: SceneRenderer<Target = T>,
    {
        let viewport = scene.viewport();
        if viewport.is_empty() {
            log::trace!("viewport is empty, skipping composite frame");
            return Ok(FrameOutcome::Skipped);
        }
        let target = self.ensure_target(scene, viewport)?;

        scene.set_surface_visible(false);
        let rendered = scene.render_to_target(&target.inner);
        scene.set_surface_visible(true);
        rendered?;
        let texture = target.texture;

        let planes = scene.camera_planes();
        scene.set_surface_uniform(&Uniform::DepthTexture(texture));
        scene.set_surface_uniform(&Uniform::CameraNear(planes.near));
        scene.set_surface_uniform(&Uniform::CameraFar(planes.far));
        scene.set_surface_uniform(&Uniform::Time(self.wave_time(elapsed_ms)));
        if std::mem::take(&mut self.colors_dirty) {
            let [foam1, foam2, foam3] = self.water.foam_colors;
            scene.set_surface_uniform(&Uniform::Color(self.water.color.to_vec3()));
            scene.set_surface_uniform(&Uniform::FoamColor1(foam1.to_vec3()));
            scene.set_surface_uniform(&Uniform::FoamColor2(foam2.to_vec3()));
            scene.set_surface_uniform(&Uniform::FoamColor3(foam3.to_vec3()));
        }

        scene.render_final()?;
        self.frames += 1;
        Ok(FrameOutcome::Rendered)
    }

    fn ensure_target<S>(&mut self, scene: &mut S, viewport: Viewport) -> Result<&DepthTarget<T>, RenderError>
    where
        S: SceneRenderer<Target = T>,
    {
        match self.target.take() {
            Some(target) if target.size == viewport => return Ok(&*self.target.insert(target)),
            Some(target) => {
                log::debug!(
                    "depth target {}x{} is stale for viewport {}x{}, recreating",
                    target.size.width,
                    target.size.height,
                    viewport.width,
                    viewport.height
                );
                self.stale_heals += 1;
                // Dispose the old target before allocating its replacement
                drop(target);
            }
            None => log::debug!("creating depth target {}x{}", viewport.width, viewport.height),
        }

        let inner = scene.create_depth_target(viewport)?;
        let texture = scene.depth_texture(&inner);
        Ok(&*self.target.insert(DepthTarget {
            size: viewport,
            texture,
            inner,
        }))
    }
}
