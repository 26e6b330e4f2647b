//! Core engine types and utilities

pub mod types;
pub mod error;
pub mod logging;
pub mod camera;
pub mod input;

pub use types::*;
pub use error::Error;
