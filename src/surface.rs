//! Boundary between the simulation core and whatever draws it.
//!
//! The core never talks to a GPU API directly. A tick produces a
//! [`RenderCommands`] batch; the host submits it against the attribute store
//! and a [`RenderSurface`] implementation, which turns the commands into
//! buffer uploads and uniform writes. The wgpu implementation lives in
//! [`crate::gpu`]; tests use recording fakes.

use crate::attributes::{AttributeName, AttributeStore};
use crate::error::{FogError, RenderError, Result};
use crate::uniforms::Uniform;

/// GPU-facing object fed with per-instance attributes and uniforms.
pub trait RenderSurface {
    /// Create the buffer for `name` with the full contents of `data`,
    /// `components` floats per instance. Replaces any buffer already
    /// registered under that name.
    fn upload_attributes(
        &mut self,
        name: AttributeName,
        data: &[f32],
        components: usize,
    ) -> std::result::Result<(), RenderError>;

    /// The contents of a previously uploaded attribute changed. `data` is
    /// the whole array, same length as at upload time.
    fn mark_dirty(&mut self, name: AttributeName, data: &[f32]) -> std::result::Result<(), RenderError>;

    /// Free the buffer registered under `name`. After this call the surface
    /// must not read it again.
    fn release_attributes(&mut self, name: AttributeName);

    /// Set one uniform of the material.
    fn set_uniform(&mut self, uniform: &Uniform);
}

/// One step of a tick's output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RenderCommand {
    /// Dispose the buffer of the previous generation.
    Release(AttributeName),
    /// Upload the full array of the current generation.
    Upload(AttributeName),
    /// Re-send the contents of an attribute changed this tick.
    Write(AttributeName),
    /// Set a material uniform.
    SetUniform(Uniform),
}

/// Ordered commands produced by one tick, bound to one particle generation.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderCommands {
    generation: u64,
    commands: Vec<RenderCommand>,
}

impl RenderCommands {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            commands: Vec::new(),
        }
    }

    /// Generation whose arrays the data-carrying commands read.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn push(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderCommand> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Play the commands against `surface`, reading array contents from `store`.
    ///
    /// A batch built for another generation is refused: its buffers have
    /// already been disposed.
    pub fn submit<S: RenderSurface + ?Sized>(&self, store: &AttributeStore, surface: &mut S) -> Result<()> {
        debug_assert_eq!(
            self.generation,
            store.generation(),
            "render commands for disposed generation submitted"
        );
        if self.generation != store.generation() {
            return Err(FogError::DisposedResourceReuse {
                expected: self.generation,
                found: store.generation(),
            });
        }

        for command in &self.commands {
            match *command {
                RenderCommand::Release(name) => surface.release_attributes(name),
                RenderCommand::Upload(name) => {
                    surface.upload_attributes(name, store.data(name), name.components())?
                }
                RenderCommand::Write(name) => surface.mark_dirty(name, store.data(name))?,
                RenderCommand::SetUniform(ref uniform) => surface.set_uniform(uniform),
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a RenderCommands {
    type Item = &'a RenderCommand;
    type IntoIter = std::slice::Iter<'a, RenderCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
