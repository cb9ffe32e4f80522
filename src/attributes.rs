//! Per-instance attribute arrays.
//!
//! Every fog particle is one instance of a shared billboard quad. Its state
//! lives in flat `f32` arrays, one per [`AttributeName`], laid out exactly as
//! they are uploaded: `components()` floats per instance, instance `i` at
//! `[i * components .. (i + 1) * components]`.
//!
//! The transform is a column-major 4x4 matrix (16 floats); the translation
//! is the last column, so moving a particle only touches floats 12..15.
//!
//! # Example
//!
//! ```
//! use fogfx::attributes::{AttributeName, AttributeStore};
//! use glam::Vec3;
//!
//! let mut store = AttributeStore::new(4, 1);
//! store.set_translation(2, Vec3::new(1.0, 2.0, 3.0));
//! store.set_scalar(AttributeName::Size, 2, 0.5);
//!
//! assert_eq!(store.translation(2), Vec3::new(1.0, 2.0, 3.0));
//! assert_eq!(store.data(AttributeName::Size).len(), 4);
//! ```

use glam::{Mat4, Vec3};

/// Names of the per-instance attributes, in upload order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeName {
    /// Column-major 4x4 instance transform.
    Transform,
    /// Per-tick displacement.
    Velocity,
    /// Billboard size, grows over the particle lifetime.
    Size,
    /// Remaining opacity in `[0, 1]`; reaching the respawn threshold restarts the particle.
    OpacityDecrease,
    /// Phase offset into the sprite-sheet animation.
    OffsetFrame,
}

impl AttributeName {
    /// Number of attributes.
    pub const COUNT: usize = 5;

    /// All attributes in upload order.
    pub const ALL: [AttributeName; Self::COUNT] = [
        AttributeName::Transform,
        AttributeName::Velocity,
        AttributeName::Size,
        AttributeName::OpacityDecrease,
        AttributeName::OffsetFrame,
    ];

    /// Floats per instance.
    pub const fn components(self) -> usize {
        match self {
            AttributeName::Transform => 16,
            AttributeName::Velocity => 3,
            AttributeName::Size | AttributeName::OpacityDecrease | AttributeName::OffsetFrame => 1,
        }
    }

    /// Name used by the GPU program.
    pub const fn as_str(self) -> &'static str {
        match self {
            AttributeName::Transform => "transform",
            AttributeName::Velocity => "velocity",
            AttributeName::Size => "size",
            AttributeName::OpacityDecrease => "opacityDecrease",
            AttributeName::OffsetFrame => "offsetFrame",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for AttributeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of attributes, used to batch dirty flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttributeSet(u8);

impl AttributeSet {
    /// The empty set.
    pub const EMPTY: AttributeSet = AttributeSet(0);

    /// Every attribute.
    pub const ALL: AttributeSet = AttributeSet((1 << AttributeName::COUNT) - 1);

    /// Add an attribute to the set.
    pub fn insert(&mut self, name: AttributeName) {
        self.0 |= 1 << name.index();
    }

    /// Check membership.
    pub fn contains(&self, name: AttributeName) -> bool {
        self.0 & (1 << name.index()) != 0
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of attributes in the set.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in upload order.
    pub fn iter(self) -> impl Iterator<Item = AttributeName> {
        AttributeName::ALL.into_iter().filter(move |n| self.contains(*n))
    }
}

pub(crate) struct UpdateLanes<'a> {
    pub transform: &'a mut [f32],
    pub velocity: &'a [f32],
    pub size: &'a mut [f32],
    pub opacity: &'a mut [f32],
}

/// Struct-of-arrays storage for all instance attributes of one generation.
///
/// All arrays always hold exactly `len()` instances; they are sized once at
/// construction and never grow or shrink. A new particle count means a new
/// store with a new generation number.
#[derive(Clone, Debug)]
pub struct AttributeStore {
    count: usize,
    generation: u64,
    buffers: [Vec<f32>; AttributeName::COUNT],
    dirty: AttributeSet,
}

impl AttributeStore {
    /// Allocate zero-filled arrays for `count` instances.
    ///
    /// Transforms start as identity so an unfilled instance sits at the origin.
    pub fn new(count: usize, generation: u64) -> Self {
        let buffers = AttributeName::ALL.map(|name| vec![0.0; count * name.components()]);
        let mut store = Self {
            count,
            generation,
            buffers,
            dirty: AttributeSet::EMPTY,
        };
        for i in 0..count {
            store.set_transform(i, &Mat4::IDENTITY);
        }
        store
    }

    /// Number of instances.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the store holds no instances.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Generation number this store was built for.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Flat data of one attribute.
    #[inline]
    pub fn data(&self, name: AttributeName) -> &[f32] {
        &self.buffers[name.index()]
    }

    /// Mutable flat data of one attribute. Does not mark it dirty.
    #[inline]
    pub fn data_mut(&mut self, name: AttributeName) -> &mut [f32] {
        &mut self.buffers[name.index()]
    }

    /// Read a scalar attribute.
    #[inline]
    pub fn get_scalar(&self, name: AttributeName, index: usize) -> f32 {
        debug_assert_eq!(name.components(), 1, "{name} is not a scalar attribute");
        self.buffers[name.index()][index]
    }

    /// Write a scalar attribute.
    #[inline]
    pub fn set_scalar(&mut self, name: AttributeName, index: usize, value: f32) {
        debug_assert_eq!(name.components(), 1, "{name} is not a scalar attribute");
        self.buffers[name.index()][index] = value;
    }

    /// Read the first three components of an attribute.
    #[inline]
    pub fn get_vec3(&self, name: AttributeName, index: usize) -> Vec3 {
        let stride = name.components();
        debug_assert!(stride >= 3, "{name} has fewer than 3 components");
        let base = index * stride;
        Vec3::from_slice(&self.buffers[name.index()][base..base + 3])
    }

    /// Write the first three components of an attribute.
    #[inline]
    pub fn set_vec3(&mut self, name: AttributeName, index: usize, value: Vec3) {
        let stride = name.components();
        debug_assert!(stride >= 3, "{name} has fewer than 3 components");
        let base = index * stride;
        value.write_to_slice(&mut self.buffers[name.index()][base..base + 3]);
    }

    /// Translation part of an instance transform.
    #[inline]
    pub fn translation(&self, index: usize) -> Vec3 {
        let base = index * 16 + 12;
        Vec3::from_slice(&self.buffers[AttributeName::Transform.index()][base..base + 3])
    }

    /// Overwrite the translation part of an instance transform.
    #[inline]
    pub fn set_translation(&mut self, index: usize, value: Vec3) {
        let base = index * 16 + 12;
        value.write_to_slice(&mut self.buffers[AttributeName::Transform.index()][base..base + 3]);
    }

    /// Full instance transform.
    pub fn transform(&self, index: usize) -> Mat4 {
        let base = index * 16;
        Mat4::from_cols_slice(&self.buffers[AttributeName::Transform.index()][base..base + 16])
    }

    /// Overwrite a full instance transform.
    pub fn set_transform(&mut self, index: usize, value: &Mat4) {
        let base = index * 16;
        value.write_cols_to_slice(&mut self.buffers[AttributeName::Transform.index()][base..base + 16]);
    }

    /// Disjoint views of the arrays the update step walks together.
    pub(crate) fn update_lanes(&mut self) -> UpdateLanes<'_> {
        let [transform, velocity, size, opacity, _offset_frame] = &mut self.buffers;
        UpdateLanes {
            transform,
            velocity,
            size,
            opacity,
        }
    }

    /// Flag an attribute for upload.
    #[inline]
    pub fn mark_dirty(&mut self, name: AttributeName) {
        self.dirty.insert(name);
    }

    /// Attributes currently flagged for upload.
    #[inline]
    pub fn dirty(&self) -> AttributeSet {
        self.dirty
    }

    /// Return and clear the dirty flags.
    pub fn take_dirty(&mut self) -> AttributeSet {
        std::mem::take(&mut self.dirty)
    }
}
