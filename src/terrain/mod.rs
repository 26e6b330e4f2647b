//! Editable heightmap terrain: storage, mesh synthesis, and the terrain entity.

pub mod heightmap;
pub mod mesh;
pub mod node;

pub use heightmap::Heightmap;
pub use mesh::{IndexData, IndexWidth, TerrainMesh, TerrainPatch, TerrainVertex, DEFAULT_PATCH_SIZE};
pub use node::{TerrainAttributes, TerrainId, TerrainNode, TerrainRegistry};
