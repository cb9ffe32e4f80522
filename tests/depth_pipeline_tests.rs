//! Compositing order and target lifetime, checked with a mock scene.

use std::cell::Cell;
use std::rc::Rc;

use fogfx::prelude::*;
use fogfx::CompositeStage;

/// Counts live targets so tests can see when the compositor drops one.
struct MockTarget {
    id: u64,
    size: Viewport,
    live: Rc<Cell<u32>>,
}

impl Drop for MockTarget {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

struct MockScene {
    viewport: Viewport,
    stages: Vec<CompositeStage>,
    live: Rc<Cell<u32>>,
    max_live: u32,
    next_id: u64,
    sampled: Option<TextureId>,
    water_color: Option<Vec3>,
}

impl MockScene {
    fn new(width: u32, height: u32) -> Self {
        Self {
            viewport: Viewport::new(width, height),
            stages: Vec::new(),
            live: Rc::new(Cell::new(0)),
            max_live: 0,
            next_id: 0,
            sampled: None,
            water_color: None,
        }
    }

    fn record(&mut self, stage: CompositeStage) {
        if self.stages.last() != Some(&stage) {
            self.stages.push(stage);
        }
    }
}

impl SceneRenderer for MockScene {
    type Target = MockTarget;

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn camera_planes(&self) -> CameraPlanes {
        CameraPlanes { near: 0.5, far: 40.0 }
    }

    fn create_depth_target(&mut self, size: Viewport) -> Result<MockTarget, RenderError> {
        self.next_id += 1;
        self.live.set(self.live.get() + 1);
        self.max_live = self.max_live.max(self.live.get());
        Ok(MockTarget {
            id: self.next_id,
            size,
            live: self.live.clone(),
        })
    }

    fn depth_texture(&self, target: &MockTarget) -> TextureId {
        TextureId(target.id)
    }

    fn set_surface_visible(&mut self, visible: bool) {
        self.record(if visible {
            CompositeStage::RestoreSurface
        } else {
            CompositeStage::HideSurface
        });
    }

    fn render_to_target(&mut self, target: &MockTarget) -> Result<(), RenderError> {
        assert_eq!(target.size, self.viewport, "depth pass on a stale target");
        self.record(CompositeStage::RenderToDepthTarget);
        Ok(())
    }

    fn set_surface_uniform(&mut self, uniform: &Uniform) {
        self.record(CompositeStage::SampleDepthIntoUniforms);
        match *uniform {
            Uniform::DepthTexture(id) => self.sampled = Some(id),
            Uniform::Color(color) => self.water_color = Some(color),
            _ => {}
        }
    }

    fn render_final(&mut self) -> Result<(), RenderError> {
        self.record(CompositeStage::RenderFinal);
        Ok(())
    }
}

#[test]
fn test_stages_run_in_order_every_frame() {
    let mut scene = MockScene::new(320, 240);
    let mut compositor = DepthCompositor::new(WaterConfig::default()).unwrap();

    for frame in 0..3 {
        scene.stages.clear();
        let outcome = compositor.frame(&mut scene, frame as f64 * 16.0).unwrap();
        assert_eq!(outcome, FrameOutcome::Rendered);
        assert_eq!(scene.stages, CompositeStage::ORDER);
    }
    assert_eq!(compositor.frames(), 3);
}

#[test]
fn test_resize_replaces_target_before_sampling() {
    let mut scene = MockScene::new(320, 240);
    let mut compositor = DepthCompositor::new(WaterConfig::default()).unwrap();
    compositor.frame(&mut scene, 0.0).unwrap();
    assert_eq!(scene.sampled, Some(TextureId(1)));

    scene.viewport = Viewport::new(1024, 768);
    compositor.frame(&mut scene, 16.0).unwrap();

    assert_eq!(scene.sampled, Some(TextureId(2)));
    assert_eq!(compositor.stale_heals(), 1);
    // The stale target was released before its replacement was allocated
    assert_eq!(scene.max_live, 1);
    assert_eq!(scene.live.get(), 1);
}

#[test]
fn test_minimized_window_keeps_target() {
    let mut scene = MockScene::new(320, 240);
    let mut compositor = DepthCompositor::new(WaterConfig::default()).unwrap();
    compositor.frame(&mut scene, 0.0).unwrap();

    scene.viewport = Viewport::new(0, 0);
    scene.stages.clear();
    assert_eq!(compositor.frame(&mut scene, 16.0), Ok(FrameOutcome::Skipped));
    assert!(scene.stages.is_empty());
    assert_eq!(compositor.stale_heals(), 0);
}

#[test]
fn test_water_colors_resent_after_change() {
    let mut scene = MockScene::new(64, 64);
    let mut compositor = DepthCompositor::new(WaterConfig::default()).unwrap();
    compositor.frame(&mut scene, 0.0).unwrap();
    assert_eq!(scene.water_color, Some(Color(0x8eb4e6).to_vec3()));

    compositor.set_water(WaterConfig {
        color: Color(0x102030),
        ..WaterConfig::default()
    })
    .unwrap();
    compositor.frame(&mut scene, 16.0).unwrap();
    assert_eq!(scene.water_color, Some(Color(0x102030).to_vec3()));
}

#[test]
fn test_reset_recreates_target() {
    let mut scene = MockScene::new(64, 64);
    let mut compositor = DepthCompositor::new(WaterConfig::default()).unwrap();
    compositor.frame(&mut scene, 0.0).unwrap();
    compositor.reset();
    assert_eq!(scene.live.get(), 0);

    compositor.frame(&mut scene, 16.0).unwrap();
    assert_eq!(scene.sampled, Some(TextureId(2)));
    assert_eq!(compositor.stale_heals(), 0);
}

#[test]
fn test_resize_seen_before_the_frame_starts() {
    let mut scene = MockScene::new(320, 240);
    let mut compositor = DepthCompositor::new(WaterConfig::default()).unwrap();
    compositor.frame(&mut scene, 0.0).unwrap();

    scene.viewport = Viewport::new(640, 480);
    assert_eq!(compositor.sync_viewport(&mut scene), Ok(true));
    assert_eq!(compositor.target().map(|target| target.size()), Some(Viewport::new(640, 480)));
    assert_eq!(scene.live.get(), 1);

    scene.stages.clear();
    compositor.frame(&mut scene, 16.0).unwrap();
    assert_eq!(scene.stages, CompositeStage::ORDER);
    assert_eq!(scene.sampled, Some(TextureId(2)));
    assert_eq!(compositor.stale_heals(), 1);
}

#[test]
fn test_broken_water_config_keeps_previous_one() {
    let broken = WaterConfig {
        wave_period_ms: 0.0,
        ..WaterConfig::default()
    };
    assert!(DepthCompositor::<MockTarget>::new(broken.clone()).is_err());

    let mut scene = MockScene::new(64, 64);
    let mut compositor = DepthCompositor::new(WaterConfig::default()).unwrap();
    assert!(matches!(
        compositor.set_water(broken),
        Err(FogError::InvalidConfig { field: "wave_period_ms", .. })
    ));
    compositor.frame(&mut scene, 16.0).unwrap();
    assert!(compositor.wave_time(16.0).is_finite());
    assert_eq!(scene.water_color, Some(Color(0x8eb4e6).to_vec3()));
}
