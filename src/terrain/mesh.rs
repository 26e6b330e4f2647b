//! Terrain mesh synthesis from heightmap samples.

use bytemuck::{Pod, Zeroable};
use rayon::prelude::*;

use crate::core::types::{Result, Vec3};
use crate::math::{Aabb, GridRect};
use crate::terrain::Heightmap;

/// Default patch side length in vertices. A 257-sample grid splits into
/// 16x16 patches of 17x17 vertices with shared edges.
pub const DEFAULT_PATCH_SIZE: u32 = 17;

/// Vertex layout shared by the mesh builder and the GPU buffers
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub uv_detail: [f32; 2],
    pub color: [f32; 4],
}

/// Index element width chosen when the mesh is generated
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexWidth {
    U16,
    U32,
}

/// Triangle indices in whichever width the vertex count allows
#[derive(Clone, Debug)]
pub enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexData {
    /// Number of index elements
    pub fn len(&self) -> usize {
        match self {
            IndexData::U16(v) => v.len(),
            IndexData::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element width of this index buffer
    pub fn width(&self) -> IndexWidth {
        match self {
            IndexData::U16(_) => IndexWidth::U16,
            IndexData::U32(_) => IndexWidth::U32,
        }
    }

    /// Index buffer bytes for upload
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexData::U16(v) => bytemuck::cast_slice(v),
            IndexData::U32(v) => bytemuck::cast_slice(v),
        }
    }

    /// Read an index element as u32
    pub fn get(&self, i: usize) -> u32 {
        match self {
            IndexData::U16(v) => v[i] as u32,
            IndexData::U32(v) => v[i],
        }
    }
}

impl Default for IndexData {
    fn default() -> Self {
        IndexData::U16(Vec::new())
    }
}

/// One square tile of the terrain with its own bounds for culling
#[derive(Clone, Copy, Debug, Default)]
pub struct TerrainPatch {
    pub bounding_box: Aabb,
    pub dirty: bool,
}

/// Renderable terrain geometry generated from a [`Heightmap`].
///
/// The grid of `size x size` samples becomes `size^2` vertices and
/// `(size-1)^2 * 2` triangles, partitioned into square patches with
/// shared edge vertices.
#[derive(Clone, Debug)]
pub struct TerrainMesh {
    pub vertices: Vec<TerrainVertex>,
    pub indices: IndexData,
    pub patches: Vec<TerrainPatch>,
    /// Patches per side
    pub patch_count: u32,
    /// Vertices per patch side
    pub patch_size: u32,
    pub bounding_box: Aabb,
    size: u32,
    texture_scale: f32,
    detail_scale: f32,
    vertex_color: [f32; 4],
}

impl Default for TerrainMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl TerrainMesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            indices: IndexData::default(),
            patches: Vec::new(),
            patch_count: 0,
            patch_size: DEFAULT_PATCH_SIZE,
            bounding_box: Aabb::default(),
            size: 0,
            texture_scale: 1.0,
            detail_scale: 1.0,
            vertex_color: [1.0, 1.0, 1.0, 1.0],
        }
    }

    /// Sample grid side length this mesh was generated from
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Build the full mesh from heightmap samples.
    ///
    /// `scale` maps grid units to world units per axis. Fails when the grid
    /// does not split evenly into `patch_size` patches, i.e. when
    /// `(size - 1) % (patch_size - 1) != 0`.
    pub fn generate(&mut self, heightmap: &Heightmap, scale: Vec3) -> Result<()> {
        if !heightmap.is_valid() {
            return Err(crate::core::Error::Terrain(
                "cannot generate a mesh from an empty heightmap".to_string(),
            ));
        }

        let size = heightmap.size();
        if size < 2 {
            return Err(crate::core::Error::Terrain(
                "heightmap must be at least 2x2 to form triangles".to_string(),
            ));
        }
        if (size - 1) % (self.patch_size - 1) != 0 {
            return Err(crate::core::Error::Terrain(format!(
                "grid of {} samples does not divide into patches of {} vertices",
                size, self.patch_size
            )));
        }

        self.size = size;
        self.patch_count = (size - 1) / (self.patch_size - 1);

        self.regenerate_vertices(heightmap, scale);
        self.generate_indices();
        self.recompute_normals();
        self.recompute_patch_bounds();

        log::debug!(
            "generated terrain mesh: {} vertices, {} triangles, {}x{} patches",
            self.vertices.len(),
            self.triangle_count(),
            self.patch_count,
            self.patch_count
        );

        Ok(())
    }

    /// Refresh geometry after heightmap edits.
    ///
    /// Regenerates positions and normals for the whole grid when the
    /// heightmap carries pending edits, flags the patches covering the
    /// dirty region, and leaves the heightmap clean. No-op when nothing
    /// changed.
    pub fn update_dirty(&mut self, heightmap: &mut Heightmap, scale: Vec3) {
        if !heightmap.is_modified() || self.vertices.is_empty() {
            return;
        }
        if heightmap.size() != self.size {
            // Grid was recreated at a different resolution, a full generate
            // is required. Leave the dirty state for the caller.
            log::warn!(
                "heightmap resized from {} to {}, mesh needs regeneration",
                self.size,
                heightmap.size()
            );
            return;
        }

        let dirty = *heightmap.dirty_region();

        self.regenerate_vertices(heightmap, scale);
        self.recompute_normals();
        self.recompute_patch_bounds();
        self.mark_patches_dirty_in(&dirty);

        heightmap.mark_clean();
    }

    /// Rewrite vertex positions and UVs from the current samples
    fn regenerate_vertices(&mut self, heightmap: &Heightmap, scale: Vec3) {
        let size = heightmap.size();
        let step = 1.0 / (size - 1) as f32;
        let texture_scale = self.texture_scale;
        let detail_scale = self.detail_scale;
        let color = self.vertex_color;

        self.vertices.clear();
        self.vertices
            .resize((size * size) as usize, TerrainVertex::default());

        self.vertices
            .par_chunks_mut(size as usize)
            .enumerate()
            .for_each(|(z, row)| {
                let z = z as u32;
                for (x, vertex) in row.iter_mut().enumerate() {
                    let x = x as u32;
                    let height = heightmap.height(x, z);
                    vertex.position = [
                        x as f32 * scale.x,
                        height * scale.y,
                        z as f32 * scale.z,
                    ];
                    let u = 1.0 - x as f32 * step;
                    let v = z as f32 * step;
                    vertex.uv = [u * texture_scale, v * texture_scale];
                    vertex.uv_detail = [u * detail_scale, v * detail_scale];
                    vertex.color = color;
                }
            });

        let mut bbox = Aabb::new(
            Vec3::from(self.vertices[0].position),
            Vec3::from(self.vertices[0].position),
        );
        for vertex in &self.vertices[1..] {
            bbox.expand(Vec3::from(vertex.position));
        }
        self.bounding_box = bbox;
    }

    /// Two triangles per grid cell, counter-clockwise when seen from above.
    /// 16-bit indices whenever every vertex index fits.
    fn generate_indices(&mut self) {
        let size = self.size;
        let quads = ((size - 1) * (size - 1)) as usize;

        if (size as u64 * size as u64) <= 65536 {
            let mut indices = Vec::with_capacity(quads * 6);
            for z in 0..size - 1 {
                for x in 0..size - 1 {
                    let i1 = (z * size + x) as u16;
                    let i2 = i1 + 1;
                    let i3 = ((z + 1) * size + x) as u16;
                    let i4 = i3 + 1;
                    indices.extend_from_slice(&[i1, i3, i2, i2, i3, i4]);
                }
            }
            self.indices = IndexData::U16(indices);
        } else {
            let mut indices = Vec::with_capacity(quads * 6);
            for z in 0..size - 1 {
                for x in 0..size - 1 {
                    let i1 = z * size + x;
                    let i2 = i1 + 1;
                    let i3 = (z + 1) * size + x;
                    let i4 = i3 + 1;
                    indices.extend_from_slice(&[i1, i3, i2, i2, i3, i4]);
                }
            }
            self.indices = IndexData::U32(indices);
        }
    }

    /// Smooth per-vertex normals: each triangle's normalized face normal is
    /// accumulated into its three vertices, then every sum is renormalized.
    fn recompute_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertices.len()];

        let tri_count = self.indices.len() / 3;
        for tri in 0..tri_count {
            let ia = self.indices.get(tri * 3) as usize;
            let ib = self.indices.get(tri * 3 + 1) as usize;
            let ic = self.indices.get(tri * 3 + 2) as usize;

            let a = Vec3::from(self.vertices[ia].position);
            let b = Vec3::from(self.vertices[ib].position);
            let c = Vec3::from(self.vertices[ic].position);

            let face = (b - a).cross(c - a);
            if face.length_squared() > 1e-12 {
                let face = face.normalize();
                accum[ia] += face;
                accum[ib] += face;
                accum[ic] += face;
            }
        }

        for (vertex, normal) in self.vertices.iter_mut().zip(accum) {
            let n = if normal.length_squared() > 1e-12 {
                normal.normalize()
            } else {
                Vec3::Y
            };
            vertex.normal = n.to_array();
        }
    }

    /// Rebuild every patch bounding box from the current vertex positions
    fn recompute_patch_bounds(&mut self) {
        let count = (self.patch_count * self.patch_count) as usize;
        self.patches.clear();
        self.patches.resize(count, TerrainPatch::default());

        for pz in 0..self.patch_count {
            for px in 0..self.patch_count {
                let x0 = px * (self.patch_size - 1);
                let z0 = pz * (self.patch_size - 1);

                let first = (z0 * self.size + x0) as usize;
                let first_pos = Vec3::from(self.vertices[first].position);
                let mut bbox = Aabb::new(first_pos, first_pos);

                for z in z0..z0 + self.patch_size {
                    for x in x0..x0 + self.patch_size {
                        let idx = (z * self.size + x) as usize;
                        bbox.expand(Vec3::from(self.vertices[idx].position));
                    }
                }

                self.patches[(pz * self.patch_count + px) as usize] = TerrainPatch {
                    bounding_box: bbox,
                    dirty: false,
                };
            }
        }
    }

    /// Flag every patch overlapping a grid region as dirty
    pub fn mark_patches_dirty_in(&mut self, region: &GridRect) {
        if region.is_empty() || self.patch_count == 0 {
            return;
        }

        let stride = (self.patch_size - 1) as i32;
        let last = self.patch_count as i32 - 1;

        // A sample on a shared edge belongs to both neighboring patches
        let px_min = ((region.min_x - 1) / stride).clamp(0, last);
        let px_max = (region.max_x / stride).clamp(0, last);
        let pz_min = ((region.min_z - 1) / stride).clamp(0, last);
        let pz_max = (region.max_z / stride).clamp(0, last);

        for pz in pz_min..=pz_max {
            for px in px_min..=px_max {
                self.patches[(pz * self.patch_count as i32 + px) as usize].dirty = true;
            }
        }
    }

    /// Clear all patch dirty flags, typically after a GPU upload
    pub fn clear_patch_dirty(&mut self) {
        for patch in &mut self.patches {
            patch.dirty = false;
        }
    }

    /// Set the base and detail texture coordinate multipliers and rewrite
    /// every vertex UV in place
    pub fn scale_texture(&mut self, texture_scale: f32, detail_scale: f32) {
        if self.size < 2 {
            self.texture_scale = texture_scale;
            self.detail_scale = detail_scale;
            return;
        }

        // Undo the previous multiplier before applying the new one
        let step = 1.0 / (self.size - 1) as f32;
        for (i, vertex) in self.vertices.iter_mut().enumerate() {
            let x = i as u32 % self.size;
            let z = i as u32 / self.size;
            let u = 1.0 - x as f32 * step;
            let v = z as f32 * step;
            vertex.uv = [u * texture_scale, v * texture_scale];
            vertex.uv_detail = [u * detail_scale, v * detail_scale];
        }

        self.texture_scale = texture_scale;
        self.detail_scale = detail_scale;
    }

    /// Current base texture coordinate multiplier
    pub fn texture_scale(&self) -> f32 {
        self.texture_scale
    }

    /// Current detail texture coordinate multiplier
    pub fn detail_scale(&self) -> f32 {
        self.detail_scale
    }

    /// Current vertex tint
    pub fn vertex_color(&self) -> [f32; 4] {
        self.vertex_color
    }

    /// Tint every vertex with one color
    pub fn set_vertex_color(&mut self, color: [f32; 4]) {
        self.vertex_color = color;
        for vertex in &mut self.vertices {
            vertex.color = color;
        }
    }
}
