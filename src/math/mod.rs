mod aabb;
mod color;

pub use aabb::{union_all, AABB};
pub use color::Color;
