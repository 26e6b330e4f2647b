//! Rendering support: GPU mesh buffers and debug line drawing.

pub mod debug_draw;
pub mod mesh_buffers;

pub use debug_draw::{DebugDraw, LineBatch, LineVertex};
pub use mesh_buffers::TerrainMeshBuffers;
