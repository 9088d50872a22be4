use glam::Vec3;

use super::{Element, ElementCore, ElementType};
use crate::math::Color;
use crate::state::StatePacker;
use crate::surface::RenderSurface;

/// Ground grid on the XZ plane. Not boundable.
pub struct Grid {
    core: ElementCore,
    pub visible: bool,
    /// Distance between adjacent lines
    pub spacing: f32,
    /// Number of cells from the origin to the edge, per side
    pub half_cells: u32,
    pub color: Color,
}

impl Grid {
    pub fn new() -> Self {
        Self {
            core: ElementCore::new(),
            visible: true,
            spacing: 1.0,
            half_cells: 10,
            color: Color::GRAY.with_alpha(0.5),
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Half the side length of the grid in world units
    pub fn extent(&self) -> f32 {
        self.spacing * self.half_cells as f32
    }

    /// Line segments making up the grid, both directions
    pub fn lines(&self) -> impl Iterator<Item = (Vec3, Vec3)> + '_ {
        let extent = self.extent();
        let n = self.half_cells as i32;
        (-n..=n).flat_map(move |i| {
            let offset = i as f32 * self.spacing;
            [
                (Vec3::new(offset, 0.0, -extent), Vec3::new(offset, 0.0, extent)),
                (Vec3::new(-extent, 0.0, offset), Vec3::new(extent, 0.0, offset)),
            ]
        })
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for Grid {
    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        &mut self.core
    }

    fn element_type(&self) -> ElementType {
        ElementType::Grid
    }

    fn on_pre_render(&self, surface: &mut dyn RenderSurface) {
        if !self.visible {
            return;
        }
        for (from, to) in self.lines() {
            surface.draw_line(from, to, self.color);
        }
    }

    fn pack(&self, packer: &mut StatePacker<'_>) {
        packer.bool(self.visible);
        packer.f32(self.spacing);
        packer.u32(self.half_cells);
    }
}
