//! GPU vertex/index buffers for a terrain mesh.

use crate::terrain::{IndexWidth, TerrainMesh, TerrainVertex};

/// GPU-side copy of a [`TerrainMesh`].
///
/// Buffers are sized for the mesh they were created from; a resolution
/// change means creating a new set. [`write`](TerrainMeshBuffers::write)
/// re-uploads in place after edits.
pub struct TerrainMeshBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_format: wgpu::IndexFormat,
    index_count: u32,
}

impl TerrainMeshBuffers {
    /// Allocate buffers for a mesh and upload its current contents
    pub fn from_mesh(device: &wgpu::Device, queue: &wgpu::Queue, mesh: &TerrainMesh) -> Self {
        let vertex_bytes = bytemuck::cast_slice::<TerrainVertex, u8>(&mesh.vertices);
        let index_bytes = mesh.indices.as_bytes();

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("terrain_vertices"),
            size: vertex_bytes.len() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("terrain_indices"),
            size: index_bytes.len() as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        queue.write_buffer(&vertex_buffer, 0, vertex_bytes);
        queue.write_buffer(&index_buffer, 0, index_bytes);

        log::debug!(
            "created terrain buffers: {} vertices, {} indices",
            mesh.vertices.len(),
            mesh.indices.len()
        );

        Self {
            vertex_buffer,
            index_buffer,
            index_format: match mesh.indices.width() {
                IndexWidth::U16 => wgpu::IndexFormat::Uint16,
                IndexWidth::U32 => wgpu::IndexFormat::Uint32,
            },
            index_count: mesh.indices.len() as u32,
        }
    }

    /// Re-upload vertex data after terrain edits. The grid topology is
    /// fixed, so indices never change between full rebuilds.
    pub fn write(&self, queue: &wgpu::Queue, mesh: &TerrainMesh) {
        queue.write_buffer(
            &self.vertex_buffer,
            0,
            bytemuck::cast_slice::<TerrainVertex, u8>(&mesh.vertices),
        );
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &wgpu::Buffer {
        &self.index_buffer
    }

    pub fn index_format(&self) -> wgpu::IndexFormat {
        self.index_format
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Vertex layout matching [`TerrainVertex`]
    pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
            0 => Float32x3, // position
            1 => Float32x3, // normal
            2 => Float32x2, // uv
            3 => Float32x2, // uv_detail
            4 => Float32x4, // color
        ];

        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TerrainVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }

    /// Issue the draw for this terrain
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), self.index_format);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_matches_struct() {
        let layout = TerrainMeshBuffers::vertex_layout();
        assert_eq!(
            layout.array_stride,
            std::mem::size_of::<TerrainVertex>() as u64
        );
        assert_eq!(layout.attributes.len(), 5);

        // Attribute offsets cover the struct exactly
        let last = layout.attributes.last().unwrap();
        assert_eq!(last.offset + 16, layout.array_stride);
    }
}
