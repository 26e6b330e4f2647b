//! Brush parameters, falloff math, and apply-rate limiting.

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;
use crate::render::DebugDraw;
use crate::terrain::TerrainNode;

/// Radial strength profile over normalized distance from the brush center
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Falloff {
    Linear,
    #[default]
    Smooth,
    Sharp,
    Constant,
}

/// Parameters shared by every brush variant.
///
/// `current_time` is fed from the session clock each tick; the brush fires
/// at most once per `apply_interval` while active. The per-tick strength is
/// scaled by `delta_time * time_scale` rather than normalized to a true
/// per-second rate, which keeps edits slow and controllable at typical
/// frame times.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BrushSettings {
    size: f32,
    strength: f32,
    pub falloff: Falloff,
    #[serde(skip)]
    pub position: Vec3,
    #[serde(skip)]
    pub active: bool,
    pub visible: bool,
    #[serde(skip)]
    pub current_time: f32,
    #[serde(skip)]
    pub last_apply_time: f32,
    pub apply_interval: f32,
    pub time_scale: f32,
}

impl BrushSettings {
    pub const MIN_SIZE: f32 = 0.1;
    pub const MAX_SIZE: f32 = 100.0;

    pub fn new() -> Self {
        Self {
            size: 5.0,
            strength: 0.1,
            falloff: Falloff::Smooth,
            position: Vec3::ZERO,
            active: false,
            visible: true,
            current_time: 0.0,
            last_apply_time: 0.0,
            // 15 Hz cap keeps strokes controllable
            apply_interval: 1.0 / 15.0,
            time_scale: 10.0,
        }
    }

    /// Brush radius in world units
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Set the radius, clamped to `[0.1, 100]`
    pub fn set_size(&mut self, size: f32) {
        self.size = size.clamp(Self::MIN_SIZE, Self::MAX_SIZE);
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Set the strength, clamped to `[0, 1]`
    pub fn set_strength(&mut self, strength: f32) {
        self.strength = strength.clamp(0.0, 1.0);
    }

    /// Falloff weight at a world distance from the center.
    ///
    /// Exactly 0 at and beyond the brush radius for every falloff type.
    pub fn falloff_at(&self, distance: f32) -> f32 {
        if distance >= self.size {
            return 0.0;
        }

        let t = distance / self.size;
        match self.falloff {
            Falloff::Linear => 1.0 - t,
            Falloff::Smooth => 1.0 - (t * t * (3.0 - 2.0 * t)),
            Falloff::Sharp => 1.0 - t * t,
            Falloff::Constant => 1.0,
        }
    }

    /// Per-cell strength for this tick
    pub fn effective_strength(&self, distance: f32, delta_time: f32) -> f32 {
        self.strength * self.falloff_at(distance) * delta_time * self.time_scale
    }

    /// Check the rate limiter
    pub fn ready_to_apply(&self) -> bool {
        self.current_time - self.last_apply_time >= self.apply_interval
    }

    /// Record a fire, resetting the rate limiter window
    pub fn note_applied(&mut self) {
        self.last_apply_time = self.current_time;
    }
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeightMode {
    Raise,
    Lower,
    /// Move toward the target height without overshooting
    Flatten,
    /// Same motion as Flatten; kept separate so the target is set explicitly
    /// rather than sampled from the terrain
    Set,
}

/// Height-brush parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeightParams {
    pub mode: HeightMode,
    pub target_height: f32,
    max_delta: f32,
    pub adaptive_strength: bool,
}

impl HeightParams {
    pub fn new(mode: HeightMode) -> Self {
        Self {
            mode,
            target_height: 0.0,
            max_delta: 2.0,
            adaptive_strength: false,
        }
    }

    /// Largest height change one application may make to a cell
    pub fn max_delta(&self) -> f32 {
        self.max_delta
    }

    /// Set the per-application clamp, kept at 0.1 or above
    pub fn set_max_delta(&mut self, max_delta: f32) {
        self.max_delta = max_delta.max(0.1);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmoothMode {
    /// 3x3 box average
    Average,
    /// Gaussian kernel sized from the brush radius
    Gaussian,
    /// Box average that backs off where it would erase large features
    PreserveDetail,
}

/// Smooth-brush parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SmoothParams {
    pub mode: SmoothMode,
    preserve_threshold: f32,
    iterations: u32,
}

impl SmoothParams {
    pub fn new(mode: SmoothMode) -> Self {
        Self {
            mode,
            preserve_threshold: 0.5,
            iterations: 1,
        }
    }

    /// Height difference above which detail preservation kicks in
    pub fn preserve_threshold(&self) -> f32 {
        self.preserve_threshold
    }

    pub fn set_preserve_threshold(&mut self, threshold: f32) {
        self.preserve_threshold = threshold.max(0.01);
    }

    /// Smoothing passes per application
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn set_iterations(&mut self, iterations: u32) {
        self.iterations = iterations.clamp(1, 10);
    }
}

/// Concrete brush variant. Closed set so the editor can enumerate and
/// serialize every brush it might hold.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BrushKind {
    Height(HeightParams),
    Smooth(SmoothParams),
}

/// One editing operation: shared settings plus the variant's parameters.
///
/// Brushes are long-lived. They hold no terrain reference; the terrain is
/// passed in on each apply.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Brush {
    pub settings: BrushSettings,
    pub kind: BrushKind,
}

impl Brush {
    pub fn raise() -> Self {
        Self {
            settings: BrushSettings::new(),
            kind: BrushKind::Height(HeightParams::new(HeightMode::Raise)),
        }
    }

    pub fn lower() -> Self {
        Self {
            settings: BrushSettings::new(),
            kind: BrushKind::Height(HeightParams::new(HeightMode::Lower)),
        }
    }

    pub fn flatten() -> Self {
        Self {
            settings: BrushSettings::new(),
            kind: BrushKind::Height(HeightParams::new(HeightMode::Flatten)),
        }
    }

    pub fn smooth_average() -> Self {
        Self {
            settings: BrushSettings::new(),
            kind: BrushKind::Smooth(SmoothParams::new(SmoothMode::Average)),
        }
    }

    pub fn smooth_gaussian() -> Self {
        Self {
            settings: BrushSettings::new(),
            kind: BrushKind::Smooth(SmoothParams::new(SmoothMode::Gaussian)),
        }
    }

    /// Short label for UI and logs
    pub fn name(&self) -> &'static str {
        match &self.kind {
            BrushKind::Height(p) => match p.mode {
                HeightMode::Raise => "raise",
                HeightMode::Lower => "lower",
                HeightMode::Flatten => "flatten",
                HeightMode::Set => "set",
            },
            BrushKind::Smooth(p) => match p.mode {
                SmoothMode::Average => "smooth",
                SmoothMode::Gaussian => "smooth-gaussian",
                SmoothMode::PreserveDetail => "smooth-preserve",
            },
        }
    }

    /// Apply one tick of this brush to a terrain.
    ///
    /// Fires only while active and past the rate-limiter interval; returns
    /// whether anything was applied.
    pub fn apply(&mut self, terrain: &mut TerrainNode, delta_time: f32) -> bool {
        if !self.settings.active || !self.settings.ready_to_apply() {
            return false;
        }

        let applied = match &self.kind {
            BrushKind::Height(params) => {
                crate::editor::height::apply(&self.settings, params, terrain, delta_time)
            }
            BrushKind::Smooth(params) => {
                crate::editor::smooth::apply(&self.settings, params, terrain, delta_time)
            }
        };

        if applied {
            self.settings.note_applied();
        }
        applied
    }

    /// RGBA preview color keyed off the brush variant and active state
    fn preview_color(&self) -> [u8; 4] {
        if self.settings.active {
            return [255, 255, 0, 255];
        }
        match &self.kind {
            BrushKind::Height(p) => match p.mode {
                HeightMode::Raise => [0, 255, 0, 200],
                HeightMode::Lower => [255, 0, 0, 200],
                HeightMode::Flatten | HeightMode::Set => [0, 128, 255, 200],
            },
            BrushKind::Smooth(_) => [255, 128, 255, 200],
        }
    }

    /// Draw the brush overlay: the radius circle, a center cross, a fainter
    /// half-radius circle unless falloff is constant, and for flatten/set a
    /// crosshair at the target height. Never touches terrain state.
    pub fn render_preview(&self, draw: &mut dyn DebugDraw) {
        if !self.settings.visible {
            return;
        }

        let color = self.preview_color();
        let pos = self.settings.position;
        let size = self.settings.size();

        // Lifted above the surface so it reads in a top-down view
        draw.circle_y(pos + Vec3::new(0.0, 2.0, 0.0), size, 32, color);

        let center = pos + Vec3::new(0.0, 2.5, 0.0);
        let cross = size * 0.1;
        let white = [255, 255, 255, 255];
        draw.line(center - Vec3::new(cross, 0.0, 0.0), center + Vec3::new(cross, 0.0, 0.0), white);
        draw.line(center - Vec3::new(0.0, 0.0, cross), center + Vec3::new(0.0, 0.0, cross), white);

        if self.settings.falloff != Falloff::Constant {
            let mut inner = color;
            inner[3] = 64;
            draw.circle_y(pos + Vec3::new(0.0, 2.0, 0.0), size * 0.5, 32, inner);
        }

        if let BrushKind::Height(params) = &self.kind {
            if matches!(params.mode, HeightMode::Flatten | HeightMode::Set) {
                let target = Vec3::new(pos.x, params.target_height, pos.z);
                let half = size * 0.5;
                let yellow = [255, 255, 0, 128];
                draw.line(target - Vec3::new(half, 0.0, 0.0), target + Vec3::new(half, 0.0, 0.0), yellow);
                draw.line(target - Vec3::new(0.0, 0.0, half), target + Vec3::new(0.0, 0.0, half), yellow);
            }
        }
    }
}
