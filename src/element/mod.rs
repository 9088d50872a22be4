mod camera;
mod grid;
mod model;

pub use camera::Camera;
pub use grid::Grid;
pub use model::{Model, ModelFormat};

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Mat4;

use crate::math::AABB;
use crate::state::StatePacker;
use crate::surface::RenderSurface;

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of an element, unique for the lifetime of the process
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    fn next() -> Self {
        Self(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a scene, used as the owner handle stored on its elements
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SceneId(u64);

impl SceneId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Variant tag of an element
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    Camera,
    Grid,
    Model,
    Other,
}

impl ElementType {
    /// Every variant, in the order per-type update events are raised
    pub const ALL: [ElementType; 4] = [
        ElementType::Camera,
        ElementType::Grid,
        ElementType::Model,
        ElementType::Other,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ElementType::Camera => "camera",
            ElementType::Grid => "grid",
            ElementType::Model => "model",
            ElementType::Other => "other",
        }
    }

    /// Whether elements of this type are expected to contribute to the
    /// aggregate scene bound. Snapshots start from this and then record what
    /// `calc_bound` actually returns.
    pub const fn is_boundable(self) -> bool {
        matches!(self, ElementType::Model)
    }

    pub(crate) const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity plus owner handle shared by every element implementation
#[derive(Debug)]
pub struct ElementCore {
    id: ElementId,
    scene: Option<SceneId>,
}

impl ElementCore {
    pub fn new() -> Self {
        Self {
            id: ElementId::next(),
            scene: None,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Owning scene, `None` until the element is added
    pub fn scene(&self) -> Option<SceneId> {
        self.scene
    }

    /// Set the owner. Returns false if the element already has one.
    pub(crate) fn attach(&mut self, scene: SceneId) -> bool {
        if self.scene.is_some() {
            return false;
        }
        self.scene = Some(scene);
        true
    }

    pub(crate) fn detach(&mut self) {
        self.scene = None;
    }
}

impl Default for ElementCore {
    fn default() -> Self {
        Self::new()
    }
}

/// Downcasting support for boxed elements
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A participant in the scene: camera, grid, model, ...
///
/// Hooks run on the frame-loop thread, one at a time, and must not block.
/// A panicking hook is a programming error and is not caught by the scene.
pub trait Element: AsAny {
    fn core(&self) -> &ElementCore;

    fn core_mut(&mut self) -> &mut ElementCore;

    fn element_type(&self) -> ElementType;

    /// Display name for logging and debug output
    fn name(&self) -> &str {
        self.element_type().as_str()
    }

    fn id(&self) -> ElementId {
        self.core().id()
    }

    fn scene(&self) -> Option<SceneId> {
        self.core().scene()
    }

    /// Called once, right after the element is attached to a scene
    fn add(&mut self) {}

    /// Called once, right before the element is detached from its scene
    fn remove(&mut self) {}

    /// Another element was added to the scene this element lives in
    fn on_added(&mut self, _other: &dyn Element) {}

    /// Per-frame logic. May only touch this element's own state.
    fn on_update(&mut self, _delta_time: f32) {}

    /// Runs after every element has updated and the frame has been diffed
    fn on_post_update(&mut self) {}

    /// Draw-time setup, only called on frames that render
    fn on_pre_render(&self, _surface: &mut dyn RenderSurface) {}

    /// Draw-time teardown, only called on frames that render
    fn on_post_render(&mut self) {}

    /// Current world bound, `None` if this element is not boundable
    fn calc_bound(&self) -> Option<AABB> {
        None
    }

    /// Local bound together with the local-to-world transform
    fn local_bound(&self) -> Option<(AABB, Mat4)> {
        None
    }

    /// Write everything that affects this element's visual output
    fn pack(&self, _packer: &mut StatePacker<'_>) {}
}

/// Downcast a scene element to its concrete type
pub fn downcast_ref<T: Element>(element: &dyn Element) -> Option<&T> {
    element.as_any().downcast_ref::<T>()
}

/// Downcast a scene element to its concrete type
pub fn downcast_mut<T: Element>(element: &mut dyn Element) -> Option<&mut T> {
    element.as_any_mut().downcast_mut::<T>()
}
