//! A generated fog field.

use crate::attributes::AttributeStore;
use crate::generator::RotationMode;
use crate::volume::BoundingVolume;

/// Fixed-capacity collection of fog particles.
///
/// The system is immutable in shape: the number of instances is fixed at
/// generation time and individual particles are only ever respawned in
/// place. Changing the shape means generating a new system.
#[derive(Clone, Debug)]
pub struct ParticleSystem {
    store: AttributeStore,
    volume: BoundingVolume,
    density: f32,
    rotation: RotationMode,
}

impl ParticleSystem {
    pub(crate) fn new(store: AttributeStore, volume: BoundingVolume, density: f32, rotation: RotationMode) -> Self {
        Self { store, volume, density, rotation }
    }

    /// Number of particle instances.
    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Generation number of the underlying buffers.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.store.generation()
    }

    pub fn store(&self) -> &AttributeStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AttributeStore {
        &mut self.store
    }

    /// Volume this system was generated from.
    pub fn volume(&self) -> &BoundingVolume {
        &self.volume
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    pub fn rotation(&self) -> RotationMode {
        self.rotation
    }
}
