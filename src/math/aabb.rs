use glam::{Mat4, Vec3};

/// Axis-aligned box in world (or local) space.
///
/// An `AABB` is always a real box. Code that needs an "empty" state (no
/// boundable elements yet) holds an `Option<AABB>` instead.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box with the given center and half extents
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest box containing all points, `None` for an empty iterator
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| match acc {
            None => Some(AABB::new(p, p)),
            Some(b) => Some(AABB::new(b.min.min(p), b.max.max(p))),
        })
    }

    pub fn union(&self, other: &AABB) -> AABB {
        AABB {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grow this box in place to contain `other`
    pub fn add(&mut self, other: &AABB) {
        *self = self.union(other);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// World-space box enclosing this box after `transform` is applied
    pub fn transformed(&self, transform: &Mat4) -> AABB {
        // Arvo's method: project the half extents through the absolute rotation/scale
        let center = transform.transform_point3(self.center());
        let he = self.half_extents();
        let x = transform.x_axis.truncate().abs() * he.x;
        let y = transform.y_axis.truncate().abs() * he.y;
        let z = transform.z_axis.truncate().abs() * he.z;
        AABB::from_center_half_extents(center, x + y + z)
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// The 8 corners, min corner first
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }
}

/// Union of every box in the iterator, `None` when there are none
pub fn union_all<'a>(boxes: impl IntoIterator<Item = &'a AABB>) -> Option<AABB> {
    boxes.into_iter().fold(None, |acc: Option<AABB>, b| match acc {
        None => Some(*b),
        Some(a) => Some(a.union(b)),
    })
}
