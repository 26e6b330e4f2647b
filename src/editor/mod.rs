//! Brush-based terrain editing: brushes, undo history, and the edit session.

pub mod brush;
pub mod height;
pub mod history;
pub mod session;
pub mod smooth;

pub use brush::{Brush, BrushKind, BrushSettings, Falloff, HeightMode, HeightParams, SmoothMode, SmoothParams};
pub use history::EditHistory;
pub use session::{EditSession, SessionMode};
