//! Terrain entity: heightmap plus mesh plus world placement.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::types::{Result, Vec2, Vec3};
use crate::math::{Aabb, Ray};
use crate::terrain::{Heightmap, TerrainMesh};

/// Stable handle to a terrain in a [`TerrainRegistry`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerrainId(pub u64);

/// Default level-of-detail cap for terrain rendering
pub const DEFAULT_MAX_LOD: u32 = 5;

/// Serializable terrain settings, stored next to the heightmap image
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TerrainAttributes {
    pub size: u32,
    pub patch_size: u32,
    pub max_lod: u32,
    pub scale: [f32; 3],
    pub position: [f32; 3],
    pub vertex_color: [f32; 4],
    pub texture_scale: f32,
    pub detail_scale: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub smooth_factor: u32,
    /// Whether the heightmap had edits pending a mesh refresh when saved
    pub modified: bool,
    pub heightmap_path: Option<PathBuf>,
}

/// An editable terrain with its heightmap, mesh, and world transform.
///
/// Grid coordinates map to world space through a per-axis `scale` and a
/// world `position` offset. All edit entry points mark the heightmap dirty;
/// [`update`](TerrainNode::update) pushes pending edits into the mesh.
#[derive(Clone, Debug)]
pub struct TerrainNode {
    pub heightmap: Heightmap,
    pub mesh: TerrainMesh,
    pub scale: Vec3,
    pub position: Vec3,
    /// Box-smoothing iterations applied right after loading a heightmap
    pub smooth_factor: u32,
    /// Level-of-detail cap handed to the renderer
    pub max_lod: u32,
    pub heightmap_path: Option<PathBuf>,
}

impl TerrainNode {
    pub fn new() -> Self {
        Self {
            heightmap: Heightmap::new(),
            mesh: TerrainMesh::new(),
            scale: Vec3::ONE,
            position: Vec3::ZERO,
            smooth_factor: 0,
            max_lod: DEFAULT_MAX_LOD,
            heightmap_path: None,
        }
    }

    /// Allocate a flat heightmap and generate its mesh
    pub fn create_heightmap(&mut self, size: u32, default_height: f32) -> Result<()> {
        if !self.heightmap.create(size, default_height) {
            return Err(crate::core::Error::Terrain(
                "invalid heightmap size".to_string(),
            ));
        }
        self.mesh.generate(&self.heightmap, self.scale)?;
        self.heightmap.mark_clean();
        Ok(())
    }

    /// Load a heightmap image, apply the smoothing factor, and generate the mesh
    pub fn load_heightmap(&mut self, path: impl AsRef<Path>, height_scale: f32) -> Result<()> {
        let path = path.as_ref();
        self.heightmap.load_from_file(path, height_scale)?;
        if self.smooth_factor > 0 {
            self.heightmap.smooth(self.smooth_factor);
        }
        self.mesh.generate(&self.heightmap, self.scale)?;
        self.heightmap.mark_clean();
        self.heightmap_path = Some(path.to_path_buf());
        Ok(())
    }

    /// Save the current heights as a grayscale image
    pub fn save_heightmap(&self, path: impl AsRef<Path>) -> Result<()> {
        self.heightmap.save_to_file(path)
    }

    /// Serialize placement and settings to a JSON file
    pub fn save_attributes(&self, path: impl AsRef<Path>) -> Result<()> {
        let attributes = TerrainAttributes {
            size: self.heightmap.size(),
            patch_size: self.mesh.patch_size,
            max_lod: self.max_lod,
            scale: self.scale.to_array(),
            position: self.position.to_array(),
            vertex_color: self.mesh.vertex_color(),
            texture_scale: self.mesh.texture_scale(),
            detail_scale: self.mesh.detail_scale(),
            min_height: self.heightmap.min_height(),
            max_height: self.heightmap.max_height(),
            smooth_factor: self.smooth_factor,
            modified: self.heightmap.is_modified(),
            heightmap_path: self.heightmap_path.clone(),
        };
        let json = serde_json::to_string_pretty(&attributes)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Apply placement and settings from a JSON file. Does not reload the
    /// heightmap; callers decide whether to follow `heightmap_path`. The
    /// stored size and height range are informational, the heightmap itself
    /// is authoritative once loaded.
    pub fn load_attributes(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let json = std::fs::read_to_string(path)?;
        let attributes: TerrainAttributes = serde_json::from_str(&json)?;
        self.scale = Vec3::from(attributes.scale);
        self.position = Vec3::from(attributes.position);
        self.smooth_factor = attributes.smooth_factor;
        self.max_lod = attributes.max_lod;
        self.heightmap_path = attributes.heightmap_path;
        self.mesh.patch_size = attributes.patch_size.max(2);
        self.mesh.set_vertex_color(attributes.vertex_color);
        self.mesh
            .scale_texture(attributes.texture_scale, attributes.detail_scale);
        // Edits were pending a mesh refresh when the file was saved
        if attributes.modified && self.heightmap.is_valid() {
            let size = self.heightmap.size();
            self.heightmap.mark_region_dirty(0, 0, size, size);
        }
        Ok(())
    }

    /// World-space bounds of the terrain mesh
    pub fn world_bounds(&self) -> Aabb {
        self.mesh.bounding_box.translated(self.position)
    }

    /// World XZ position to fractional grid coordinates
    pub fn world_to_heightmap(&self, world: Vec3) -> Vec2 {
        let local = world - self.position;
        Vec2::new(local.x / self.scale.x, local.z / self.scale.z)
    }

    /// Grid coordinates to a world XZ position at height zero
    pub fn heightmap_to_world(&self, x: f32, z: f32) -> Vec3 {
        Vec3::new(
            x * self.scale.x + self.position.x,
            self.position.y,
            z * self.scale.z + self.position.z,
        )
    }

    /// Interpolated terrain height in world units at a world XZ position
    pub fn height_at(&self, world: Vec3) -> f32 {
        let grid = self.world_to_heightmap(world);
        self.heightmap.interpolated_height(grid.x, grid.y) * self.scale.y + self.position.y
    }

    /// Write one grid sample; false when out of bounds
    pub fn update_height(&mut self, x: i32, z: i32, height: f32) -> bool {
        self.heightmap.set_height_safe(x, z, height)
    }

    /// Bulk write a grid region
    pub fn update_region(
        &mut self,
        start_x: u32,
        start_z: u32,
        width: u32,
        height: u32,
        heights: &[f32],
    ) -> bool {
        self.heightmap
            .update_region(start_x, start_z, width, height, heights)
    }

    /// Box-smooth the whole grid
    pub fn smooth_terrain(&mut self, iterations: u32) {
        self.heightmap.smooth(iterations);
    }

    /// Box-smooth a grid region
    pub fn smooth_region(&mut self, x: u32, z: u32, width: u32, height: u32, iterations: u32) {
        self.heightmap.smooth_region(x, z, width, height, iterations);
    }

    /// Push pending heightmap edits into the mesh
    pub fn update(&mut self) {
        self.mesh.update_dirty(&mut self.heightmap, self.scale);
    }

    /// Intersect a world-space ray with the terrain surface.
    ///
    /// Clips the ray to the world bounds, marches along it at half a cell
    /// per step until it drops below the surface, then bisects the crossing
    /// interval. A ray starting below the surface returns its clipped entry
    /// point.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<Vec3> {
        if !self.heightmap.is_valid() {
            return None;
        }

        // The terrain is solid below its surface, so extend the slab down to
        // the base plane. The top padding keeps a perfectly flat grid from
        // degenerating into a zero-thickness slab.
        let mut bounds = self.world_bounds();
        bounds.min.y = bounds.min.y.min(self.position.y) - 1.0;
        bounds.max.y += 0.001;
        let (t_near, t_far) = ray.intersects_aabb(&bounds)?;

        let step = self.scale.x.min(self.scale.z) * 0.5;
        if step <= 0.0 {
            return None;
        }

        let start = ray.at(t_near);
        if start.y <= self.height_at(start) {
            return Some(start);
        }

        let mut t_above = t_near;
        let mut t = t_near + step;
        while t <= t_far {
            let point = ray.at(t);
            if point.y <= self.height_at(point) {
                // Crossed the surface between t_above and t, bisect
                let mut lo = t_above;
                let mut hi = t;
                for _ in 0..16 {
                    let mid = (lo + hi) * 0.5;
                    let p = ray.at(mid);
                    if p.y <= self.height_at(p) {
                        hi = mid;
                    } else {
                        lo = mid;
                    }
                }
                return Some(ray.at(hi));
            }
            t_above = t;
            t += step;
        }

        None
    }
}

impl Default for TerrainNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner of all terrains, addressed by [`TerrainId`]
#[derive(Debug, Default)]
pub struct TerrainRegistry {
    nodes: HashMap<u64, TerrainNode>,
    next_id: u64,
}

impl TerrainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a terrain and hand back its handle
    pub fn insert(&mut self, node: TerrainNode) -> TerrainId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, node);
        TerrainId(id)
    }

    /// Remove a terrain, returning it if the handle was live
    pub fn remove(&mut self, id: TerrainId) -> Option<TerrainNode> {
        self.nodes.remove(&id.0)
    }

    pub fn get(&self, id: TerrainId) -> Option<&TerrainNode> {
        self.nodes.get(&id.0)
    }

    pub fn get_mut(&mut self, id: TerrainId) -> Option<&mut TerrainNode> {
        self.nodes.get_mut(&id.0)
    }

    pub fn contains(&self, id: TerrainId) -> bool {
        self.nodes.contains_key(&id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TerrainId, &TerrainNode)> {
        self.nodes.iter().map(|(&id, node)| (TerrainId(id), node))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (TerrainId, &mut TerrainNode)> {
        self.nodes
            .iter_mut()
            .map(|(&id, node)| (TerrainId(id), node))
    }
}
