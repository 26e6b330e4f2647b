//! Debug line drawing for brush previews and bounds visualization.

use bytemuck::{Pod, Zeroable};

use crate::core::types::Vec3;
use crate::math::Aabb;

/// Sink for debug line primitives.
///
/// The renderer supplies the implementation; the editor only emits lines.
pub trait DebugDraw {
    /// Draw one world-space line segment with an RGBA color
    fn line(&mut self, a: Vec3, b: Vec3, color: [u8; 4]);

    /// Draw a horizontal circle around a center point
    fn circle_y(&mut self, center: Vec3, radius: f32, segments: u32, color: [u8; 4]) {
        let segments = segments.max(3);
        let step = std::f32::consts::TAU / segments as f32;
        for i in 0..segments {
            let a0 = i as f32 * step;
            let a1 = (i + 1) as f32 * step;
            self.line(
                center + Vec3::new(a0.cos() * radius, 0.0, a0.sin() * radius),
                center + Vec3::new(a1.cos() * radius, 0.0, a1.sin() * radius),
                color,
            );
        }
    }

    /// Draw the twelve edges of a box
    fn aabb(&mut self, aabb: &Aabb, color: [u8; 4]) {
        let (min, max) = (aabb.min, aabb.max);
        let corners = [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(max.x, max.y, max.z),
            Vec3::new(min.x, max.y, max.z),
        ];
        let edges = [
            (0, 1), (1, 2), (2, 3), (3, 0), // bottom
            (4, 5), (5, 6), (6, 7), (7, 4), // top
            (0, 4), (1, 5), (2, 6), (3, 7), // verticals
        ];
        for (a, b) in edges {
            self.line(corners[a], corners[b], color);
        }
    }
}

/// GPU-uploadable line vertex
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

/// Collects debug lines for one frame into a vertex list
#[derive(Debug, Default)]
pub struct LineBatch {
    lines: Vec<(Vec3, Vec3, [u8; 4])>,
}

impl LineBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[(Vec3, Vec3, [u8; 4])] {
        &self.lines
    }

    /// Drop all collected lines, keeping the allocation
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Flatten into line-list vertices for upload
    pub fn vertices(&self) -> Vec<LineVertex> {
        let mut out = Vec::with_capacity(self.lines.len() * 2);
        for &(a, b, color) in &self.lines {
            let color = [
                color[0] as f32 / 255.0,
                color[1] as f32 / 255.0,
                color[2] as f32 / 255.0,
                color[3] as f32 / 255.0,
            ];
            out.push(LineVertex { position: a.to_array(), color });
            out.push(LineVertex { position: b.to_array(), color });
        }
        out
    }
}

impl DebugDraw for LineBatch {
    fn line(&mut self, a: Vec3, b: Vec3, color: [u8; 4]) {
        self.lines.push((a, b, color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_segment_count() {
        let mut batch = LineBatch::new();
        batch.circle_y(Vec3::ZERO, 5.0, 32, [255, 0, 0, 255]);
        assert_eq!(batch.lines().len(), 32);
    }

    #[test]
    fn test_circle_points_on_radius() {
        let mut batch = LineBatch::new();
        batch.circle_y(Vec3::new(1.0, 2.0, 3.0), 5.0, 16, [255, 0, 0, 255]);
        for &(a, b, _) in batch.lines() {
            for p in [a, b] {
                let d = ((p.x - 1.0).powi(2) + (p.z - 3.0).powi(2)).sqrt();
                assert!((d - 5.0).abs() < 1e-4);
                assert_eq!(p.y, 2.0);
            }
        }
    }

    #[test]
    fn test_aabb_edge_count() {
        let mut batch = LineBatch::new();
        batch.aabb(&Aabb::new(Vec3::ZERO, Vec3::ONE), [0, 255, 0, 255]);
        assert_eq!(batch.lines().len(), 12);
    }

    #[test]
    fn test_vertices_flatten_and_normalize_color() {
        let mut batch = LineBatch::new();
        batch.line(Vec3::ZERO, Vec3::X, [255, 0, 128, 255]);

        let vertices = batch.vertices();
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[0].color[0], 1.0);
        assert!((vertices[0].color[2] - 128.0 / 255.0).abs() < 1e-5);
        assert_eq!(vertices[1].position, [1.0, 0.0, 0.0]);

        batch.clear();
        assert!(batch.lines().is_empty());
    }
}
