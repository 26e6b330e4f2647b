//! Relief - a heightmap-based terrain sculpting engine

pub mod core;
pub mod math;
pub mod terrain;
pub mod editor;
pub mod render;
