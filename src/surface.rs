use glam::{Mat4, Vec3};

use crate::math::{Color, AABB};

/// Edges of a box as index pairs into [`AABB::corners`]
const BOX_EDGES: [(usize, usize); 12] = [
    (0, 1), (2, 3), (4, 5), (6, 7),
    (0, 2), (1, 3), (4, 6), (5, 7),
    (0, 4), (1, 5), (2, 6), (3, 7),
];

/// Render/device surface the scene drives
///
/// The scene only ever sets the render request flag; the surface owns clearing
/// it when the frame is actually drawn in [`render_frame`](Self::render_frame).
pub trait RenderSurface {
    /// Width in physical pixels
    fn width(&self) -> u32;

    /// Height in physical pixels
    fn height(&self) -> u32;

    /// Physical pixels per logical pixel
    fn pixel_ratio(&self) -> f32;

    /// Apply a new output size
    fn resize(&mut self, width: u32, height: u32);

    /// Whether a render is pending for the current frame
    fn render_requested(&self) -> bool;

    /// Ask for the next frame to be drawn. Idempotent while a request is pending.
    fn request_render(&mut self);

    /// Draw the pending frame and clear the request
    fn render_frame(&mut self);

    /// Queue a debug line for the pending frame
    fn draw_line(&mut self, from: Vec3, to: Vec3, color: Color);

    /// Queue the 12 edges of `min..max`, optionally placed by `transform`
    fn draw_wire_box(&mut self, min: Vec3, max: Vec3, color: Color, transform: Option<&Mat4>) {
        let corners = AABB::new(min, max)
            .corners()
            .map(|c| transform.map_or(c, |m| m.transform_point3(c)));
        for (a, b) in BOX_EDGES {
            self.draw_line(corners[a], corners[b], color);
        }
    }
}

/// Debug line recorded by [`HeadlessSurface`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugLine {
    pub from: Vec3,
    pub to: Vec3,
    pub color: Color,
}

/// Surface without a device. Counts requests and frames and keeps debug lines,
/// which makes it suitable for the headless driver and for tests.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    pixel_ratio: f32,
    pending: bool,
    render_requests: u64,
    frames_rendered: u64,
    lines: Vec<DebugLine>,
    last_frame_lines: Vec<DebugLine>,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio,
            pending: false,
            render_requests: 0,
            frames_rendered: 0,
            lines: Vec::new(),
            last_frame_lines: Vec::new(),
        }
    }

    /// Number of times the pending flag went from clear to set
    pub fn render_requests(&self) -> u64 {
        self.render_requests
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Debug lines drawn into the most recently rendered frame
    pub fn last_frame_lines(&self) -> &[DebugLine] {
        &self.last_frame_lines
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new(800, 600, 1.0)
    }
}

impl RenderSurface for HeadlessSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn render_requested(&self) -> bool {
        self.pending
    }

    fn request_render(&mut self) {
        if !self.pending {
            self.pending = true;
            self.render_requests += 1;
        }
    }

    fn render_frame(&mut self) {
        self.pending = false;
        self.frames_rendered += 1;
        self.last_frame_lines = std::mem::take(&mut self.lines);
    }

    fn draw_line(&mut self, from: Vec3, to: Vec3, color: Color) {
        self.lines.push(DebugLine { from, to, color });
    }
}
