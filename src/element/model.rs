use glam::{Mat4, Quat, Vec3};

use super::{Element, ElementCore, ElementType};
use crate::math::AABB;
use crate::state::StatePacker;

/// Where a model's geometry came from
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    /// Gaussian splat point cloud
    Splat,
    /// Triangle mesh
    Mesh,
}

/// A loaded model: splat cloud or mesh, placed in the world by a TRS transform
#[derive(Debug)]
pub struct Model {
    core: ElementCore,
    name: String,
    format: ModelFormat,
    local_bound: AABB,
    /// Splat count or triangle count, depending on `format`
    primitive_count: usize,
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    visible: bool,
    revision: u32,
}

impl Model {
    pub fn new(name: impl Into<String>, format: ModelFormat, local_bound: AABB, primitive_count: usize) -> Self {
        Self {
            core: ElementCore::new(),
            name: name.into(),
            format,
            local_bound,
            primitive_count,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            visible: true,
            revision: 0,
        }
    }

    pub fn format(&self) -> ModelFormat {
        self.format
    }

    pub fn primitive_count(&self) -> usize {
        self.primitive_count
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Geometry revision, bumped whenever the underlying data is edited
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Replace the geometry extent after an edit
    pub fn set_local_bound(&mut self, local_bound: AABB, primitive_count: usize) {
        self.local_bound = local_bound;
        self.primitive_count = primitive_count;
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn world_transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    pub fn world_bound(&self) -> AABB {
        self.local_bound.transformed(&self.world_transform())
    }
}

impl Element for Model {
    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        &mut self.core
    }

    fn element_type(&self) -> ElementType {
        ElementType::Model
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn add(&mut self) {
        log::debug!(
            "model '{}' attached: {} {:?} primitives",
            self.name,
            self.primitive_count,
            self.format
        );
    }

    fn calc_bound(&self) -> Option<AABB> {
        Some(self.world_bound())
    }

    fn local_bound(&self) -> Option<(AABB, Mat4)> {
        Some((self.local_bound, self.world_transform()))
    }

    fn pack(&self, packer: &mut StatePacker<'_>) {
        packer.transform(&self.world_transform());
        packer.bool(self.visible);
        packer.u32(self.revision);
    }
}
