//! The fog engine facade.
//!
//! [`FogEngine`] ties the generator, the update step and the material clock
//! together behind two entry points:
//!
//! - [`FogEngine::apply_config`] validates and applies a configuration patch.
//!   Shape changes are deferred to the next tick.
//! - [`FogEngine::tick`] advances the simulation and returns the commands the
//!   host must submit to its render surface.
//!
//! The engine never schedules itself; the host calls `tick` once per frame.
//!
//! # Example
//!
//! ```
//! use fogfx::prelude::*;
//!
//! let config = FogConfig { seed: Some(1), ..Default::default() };
//! let mut engine = FogEngine::new(config).unwrap();
//!
//! let commands = engine.tick(1.0 / 60.0, &FrameInput::default());
//! assert_eq!(commands.generation(), engine.generation());
//! assert_eq!(engine.system().len(), 15);
//! ```

use glam::Vec3;

use crate::attributes::AttributeName;
use crate::config::{ConfigChange, ConfigPatch, FogConfig};
use crate::error::Result;
use crate::generator::generate;
use crate::surface::{RenderCommand, RenderCommands, RenderSurface};
use crate::sprite::SpriteSheet;
use crate::system::ParticleSystem;
use crate::uniforms::Uniform;
use crate::update::{FrameInput, UpdateEngine, UpdateStats};

/// Owns one fog field and everything needed to animate it.
#[derive(Debug)]
pub struct FogEngine {
    config: FogConfig,
    system: ParticleSystem,
    updater: UpdateEngine,
    sprite: SpriteSheet,
    elapsed_ms: f64,
    paused: bool,
    /// Generation whose buffers the surface currently holds.
    uploaded: Option<u64>,
    regenerate: bool,
    material_dirty: bool,
    last_force: Option<Vec3>,
    last_stats: UpdateStats,
}

impl FogEngine {
    /// Validate `config` and generate the first field.
    pub fn new(config: FogConfig) -> Result<Self> {
        config.validate()?;

        let mut updater = match config.seed {
            Some(seed) => UpdateEngine::from_seed(seed),
            None => UpdateEngine::from_entropy(),
        };
        let system = generate(config.density, &config.volume(), config.rotation, 0, updater.rng_mut())?;
        log::debug!("fog engine created with {} particles", system.len());

        Ok(Self {
            sprite: SpriteSheet::new(config.frame_duration),
            config,
            system,
            updater,
            elapsed_ms: 0.0,
            paused: false,
            uploaded: None,
            regenerate: false,
            material_dirty: true,
            last_force: None,
            last_stats: UpdateStats::default(),
        })
    }

    /// Apply a configuration patch.
    ///
    /// The patched config is validated as a whole; on error nothing changes.
    /// A shape change is recorded and carried out by the next [`tick`](Self::tick).
    pub fn apply_config(&mut self, patch: &ConfigPatch) -> Result<ConfigChange> {
        let (next, change) = self.config.patched(patch);
        next.validate()?;

        if next.seed != self.config.seed {
            if let Some(seed) = next.seed {
                self.updater = UpdateEngine::from_seed(seed);
            }
        }
        if change.material {
            self.sprite.set_frame_duration_ms(next.frame_duration);
            self.material_dirty = true;
        }
        self.regenerate |= change.regenerate;
        self.config = next;

        log::debug!("config patch applied: {change:?}");
        Ok(change)
    }

    /// Advance the field by `delta_secs` and describe what the surface must do.
    ///
    /// Order of the returned commands: releases of the previous generation,
    /// uploads (or writes of the attributes this tick changed), then uniforms.
    pub fn tick(&mut self, delta_secs: f32, input: &FrameInput) -> RenderCommands {
        if self.regenerate {
            self.regenerate();
        }

        let generation = self.system.generation();
        let mut commands = RenderCommands::new(generation);

        if !self.paused {
            if delta_secs.is_finite() && delta_secs > 0.0 {
                self.elapsed_ms += delta_secs as f64 * 1000.0;
            }
            self.last_stats =
                self.updater
                    .update(&mut self.system, &self.config.update_params(), delta_secs, input);
        }

        let dirty = self.system.store_mut().take_dirty();
        if self.uploaded != Some(generation) {
            if self.uploaded.is_some() {
                for name in AttributeName::ALL {
                    commands.push(RenderCommand::Release(name));
                }
            }
            for name in AttributeName::ALL {
                commands.push(RenderCommand::Upload(name));
            }
            self.uploaded = Some(generation);
        } else {
            for name in dirty.iter() {
                commands.push(RenderCommand::Write(name));
            }
        }

        if std::mem::take(&mut self.material_dirty) {
            commands.push(RenderCommand::SetUniform(Uniform::Color(self.config.color.to_vec3())));
            commands.push(RenderCommand::SetUniform(Uniform::InnerColor(
                self.config.inner_color.to_vec3(),
            )));
            commands.push(RenderCommand::SetUniform(Uniform::Opacity(self.config.opacity)));
            commands.push(RenderCommand::SetUniform(Uniform::FrameDuration(
                self.sprite.frame_duration_ms(),
            )));
        }
        if self.last_force != Some(input.force) {
            commands.push(RenderCommand::SetUniform(Uniform::Force(input.force)));
            self.last_force = Some(input.force);
        }
        commands.push(RenderCommand::SetUniform(Uniform::Time(self.elapsed_ms as f32)));
        commands.push(RenderCommand::SetUniform(Uniform::FragmentTime(
            self.sprite.fragment_time(self.elapsed_ms),
        )));

        commands
    }

    /// Play `commands` against `surface` using the current arrays.
    pub fn submit<S: RenderSurface + ?Sized>(&self, commands: &RenderCommands, surface: &mut S) -> Result<()> {
        commands.submit(self.system.store(), surface)
    }

    /// Forget what the surface holds so the next tick uploads everything again.
    ///
    /// Used after the host rebuilt its surface, e.g. following a context loss.
    pub fn invalidate_surface(&mut self) {
        self.uploaded = None;
        self.material_dirty = true;
        self.last_force = None;
    }

    fn regenerate(&mut self) {
        self.regenerate = false;
        let generation = self.system.generation() + 1;
        match generate(
            self.config.density,
            &self.config.volume(),
            self.config.rotation,
            generation,
            self.updater.rng_mut(),
        ) {
            Ok(system) => {
                log::debug!(
                    "regenerated fog field: generation {generation}, {} particles",
                    system.len()
                );
                self.system = system;
            }
            // Configs are validated before they are stored
            Err(err) => log::error!("fog regeneration failed, keeping previous field: {err}"),
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn config(&self) -> &FogConfig {
        &self.config
    }

    pub fn system(&self) -> &ParticleSystem {
        &self.system
    }

    /// Generation of the current field.
    pub fn generation(&self) -> u64 {
        self.system.generation()
    }

    /// Whether a shape change is waiting for the next tick.
    pub fn regeneration_pending(&self) -> bool {
        self.regenerate
    }

    /// Unpaused time accumulated by [`tick`](Self::tick).
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn sprite(&self) -> &SpriteSheet {
        &self.sprite
    }

    /// Statistics of the last unpaused update.
    pub fn last_stats(&self) -> UpdateStats {
        self.last_stats
    }
}
