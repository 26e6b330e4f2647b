//! The per-editor terrain editing session.
//!
//! Routes queued input events to the active brush, resolves the brush's
//! world position by ray picking against the bound terrain, and owns the
//! undo history. All session-level operations are silent no-ops when a
//! collaborator (terrain, camera) is missing or the session is disabled.

use crate::core::camera::Camera;
use crate::core::input::{EditorEvent, EditorKey, InputQueue, PointerButton};
use crate::core::types::{Vec2, Vec3};
use crate::editor::brush::{Brush, BrushKind, HeightMode};
use crate::editor::history::EditHistory;
use crate::render::DebugDraw;
use crate::terrain::{TerrainId, TerrainNode, TerrainRegistry};

/// What pointer strokes do
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionMode {
    #[default]
    Sculpt,
    /// Picking without editing; strokes never mutate the terrain
    Select,
}

/// Terrain editing controller.
///
/// State machine: disabled, enabled-idle, enabled-editing. A primary
/// pointer press while enabled captures an undo snapshot and enters
/// editing; release returns to idle. The input queue is drained once per
/// [`update`](EditSession::update) tick.
pub struct EditSession {
    pub mode: SessionMode,
    enabled: bool,
    editing: bool,
    terrain: Option<TerrainId>,
    brushes: Vec<Brush>,
    current_brush: Option<usize>,
    camera: Option<Camera>,
    viewport: (f32, f32),
    cursor: Vec2,
    queue: InputQueue,
    /// Monotonic session clock fed to the brush rate limiter
    elapsed: f32,
    history: EditHistory,
    control_held: bool,
    /// Strength before a shift boost, restored on release
    saved_strength: Option<f32>,
    /// Height mode before a temporary secondary/flatten override
    mode_override: Option<HeightMode>,
}

impl EditSession {
    pub fn new() -> Self {
        Self {
            mode: SessionMode::Sculpt,
            enabled: false,
            editing: false,
            terrain: None,
            brushes: Vec::new(),
            current_brush: None,
            camera: None,
            viewport: (1.0, 1.0),
            cursor: Vec2::ZERO,
            queue: InputQueue::new(),
            elapsed: 0.0,
            history: EditHistory::new(),
            control_held: false,
            saved_strength: None,
            mode_override: None,
        }
    }

    /// Populate the default brush set and enable the session
    pub fn initialize(&mut self) {
        self.brushes = vec![
            Brush::raise(),
            Brush::lower(),
            Brush::flatten(),
            Brush::smooth_average(),
            Brush::smooth_gaussian(),
        ];
        self.current_brush = Some(0);
        self.enabled = true;
        log::info!("edit session initialized with {} brushes", self.brushes.len());
    }

    /// Drop all brushes and history and disable the session
    pub fn shutdown(&mut self) {
        self.brushes.clear();
        self.current_brush = None;
        self.terrain = None;
        self.history.clear();
        self.queue.clear();
        self.editing = false;
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.end_stroke();
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Bind a terrain. Rebinding always clears the undo history, even when
    /// rebinding the same terrain.
    pub fn set_terrain(&mut self, terrain: Option<TerrainId>) {
        self.terrain = terrain;
        self.history.clear();
        self.end_stroke();
    }

    pub fn terrain(&self) -> Option<TerrainId> {
        self.terrain
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = (width.max(1.0), height.max(1.0));
        if let Some(camera) = &mut self.camera {
            camera.set_aspect(self.viewport.0, self.viewport.1);
        }
    }

    pub fn add_brush(&mut self, brush: Brush) -> usize {
        self.brushes.push(brush);
        if self.current_brush.is_none() {
            self.current_brush = Some(0);
        }
        self.brushes.len() - 1
    }

    pub fn remove_brush(&mut self, index: usize) -> Option<Brush> {
        if index >= self.brushes.len() {
            return None;
        }
        let brush = self.brushes.remove(index);
        self.current_brush = match self.current_brush {
            Some(_) if self.brushes.is_empty() => None,
            Some(current) if current >= index => Some(current.saturating_sub(1)),
            other => other,
        };
        Some(brush)
    }

    pub fn set_current_brush(&mut self, index: usize) -> bool {
        if index >= self.brushes.len() {
            return false;
        }
        // Selecting mid-stroke would leave the old brush active
        if self.editing {
            return false;
        }
        self.current_brush = Some(index);
        log::debug!("selected brush {}: {}", index, self.brushes[index].name());
        true
    }

    pub fn current_brush(&self) -> Option<&Brush> {
        self.current_brush.and_then(|i| self.brushes.get(i))
    }

    pub fn current_brush_mut(&mut self) -> Option<&mut Brush> {
        self.current_brush.and_then(|i| self.brushes.get_mut(i))
    }

    pub fn brush_count(&self) -> usize {
        self.brushes.len()
    }

    /// Queue an input event from the shell; processed on the next update
    pub fn push_event(&mut self, event: EditorEvent) {
        self.queue.push(event);
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Revert the bound terrain to the previous snapshot
    pub fn undo(&mut self, registry: &mut TerrainRegistry) -> bool {
        let Some(node) = self.terrain.and_then(|id| registry.get_mut(id)) else {
            return false;
        };
        self.history.undo(node)
    }

    /// Reapply the snapshot undone last
    pub fn redo(&mut self, registry: &mut TerrainRegistry) -> bool {
        let Some(node) = self.terrain.and_then(|id| registry.get_mut(id)) else {
            return false;
        };
        self.history.redo(node)
    }

    /// One simulation tick: drain input, re-pick the brush position under
    /// the cursor, apply the active brush, and push terrain edits into the
    /// mesh.
    pub fn update(&mut self, delta_time: f32, registry: &mut TerrainRegistry) {
        if !self.enabled {
            self.queue.clear();
            return;
        }

        self.elapsed += delta_time;

        while let Some(event) = self.queue.pop() {
            self.handle_event(event, registry);
        }

        let Some(id) = self.terrain else {
            return;
        };
        let Some(node) = registry.get_mut(id) else {
            return;
        };

        if let Some(hit) = Self::pick(&self.camera, self.cursor, self.viewport, node) {
            if let Some(brush) = self.current_brush.and_then(|i| self.brushes.get_mut(i)) {
                brush.settings.position = Vec3::new(hit.x, node.height_at(hit), hit.z);
            }
        }

        if let Some(brush) = self.current_brush.and_then(|i| self.brushes.get_mut(i)) {
            brush.settings.current_time = self.elapsed;

            if self.editing {
                brush.apply(node, delta_time);
                // Keep the brush glued to the surface it just moved
                let pos = brush.settings.position;
                brush.settings.position.y = node.height_at(pos);
            }
        }

        node.update();
    }

    /// Draw the active brush overlay
    pub fn render(&self, draw: &mut dyn DebugDraw) {
        if !self.enabled {
            return;
        }
        if let Some(brush) = self.current_brush() {
            brush.render_preview(draw);
        }
    }

    fn handle_event(&mut self, event: EditorEvent, registry: &mut TerrainRegistry) {
        match event {
            EditorEvent::PointerMoved { x, y } => {
                self.cursor = Vec2::new(x, y);
            }
            EditorEvent::PointerPressed { button, x, y } => {
                self.cursor = Vec2::new(x, y);
                match button {
                    PointerButton::Primary => self.begin_stroke(registry, false),
                    PointerButton::Secondary => self.begin_stroke(registry, true),
                    PointerButton::Middle => {}
                }
            }
            EditorEvent::PointerReleased { button, x, y } => {
                self.cursor = Vec2::new(x, y);
                if matches!(button, PointerButton::Primary | PointerButton::Secondary) {
                    self.end_stroke();
                }
            }
            EditorEvent::Scroll { delta } => {
                if let Some(brush) = self.current_brush_mut() {
                    let size = brush.settings.size();
                    let factor = if delta > 0.0 { 1.2 } else { 0.8 };
                    brush.settings.set_size(size * factor);
                }
            }
            EditorEvent::KeyPressed { key, ctrl } => self.handle_key(key, ctrl, registry),
            EditorEvent::KeyReleased { key } => match key {
                EditorKey::Shift => {
                    if let Some(strength) = self.saved_strength.take() {
                        if let Some(brush) = self.current_brush_mut() {
                            brush.settings.set_strength(strength);
                        }
                    }
                }
                EditorKey::Control => {
                    self.control_held = false;
                }
                _ => {}
            },
        }
    }

    fn handle_key(&mut self, key: EditorKey, ctrl: bool, registry: &mut TerrainRegistry) {
        match key {
            EditorKey::Digit1 => _ = self.set_current_brush(0),
            EditorKey::Digit2 => _ = self.set_current_brush(1),
            EditorKey::Digit3 => _ = self.set_current_brush(2),
            EditorKey::Digit4 => _ = self.set_current_brush(3),
            EditorKey::Digit5 => _ = self.set_current_brush(4),
            EditorKey::KeyZ if ctrl => _ = self.undo(registry),
            EditorKey::KeyY if ctrl => _ = self.redo(registry),
            EditorKey::Shift => {
                if self.saved_strength.is_none() {
                    if let Some(brush) = self.current_brush.and_then(|i| self.brushes.get_mut(i)) {
                        let strength = brush.settings.strength();
                        self.saved_strength = Some(strength);
                        brush.settings.set_strength(strength * 1.5);
                    }
                }
            }
            EditorKey::Control => {
                self.control_held = true;
            }
            _ => {}
        }
    }

    /// Pointer-down: snapshot the whole heightmap and activate the brush.
    ///
    /// The secondary button temporarily flips a raise brush to lower;
    /// holding control flattens toward the height under the cursor.
    fn begin_stroke(&mut self, registry: &mut TerrainRegistry, secondary: bool) {
        if self.mode != SessionMode::Sculpt || self.editing {
            return;
        }
        let Some(node) = self.terrain.and_then(|id| registry.get_mut(id)) else {
            return;
        };
        let Some(index) = self.current_brush else {
            return;
        };

        // Resolve the press coordinates now so the stroke starts where the
        // pointer went down rather than at last tick's brush position
        let pressed_at = Self::pick(&self.camera, self.cursor, self.viewport, node);

        let brush = &mut self.brushes[index];
        if let Some(hit) = pressed_at {
            brush.settings.position = Vec3::new(hit.x, node.height_at(hit), hit.z);
        }

        if let BrushKind::Height(params) = &mut brush.kind {
            if self.control_held {
                self.mode_override = Some(params.mode);
                params.mode = HeightMode::Flatten;
                params.target_height = node.height_at(brush.settings.position);
            } else if secondary && params.mode == HeightMode::Raise {
                self.mode_override = Some(params.mode);
                params.mode = HeightMode::Lower;
            }
        }

        self.history.capture(&node.heightmap);
        brush.settings.active = true;
        self.editing = true;
    }

    /// Pointer-up: deactivate without another snapshot
    fn end_stroke(&mut self) {
        self.editing = false;
        if let Some(index) = self.current_brush {
            if let Some(brush) = self.brushes.get_mut(index) {
                brush.settings.active = false;
                if let (Some(mode), BrushKind::Height(params)) =
                    (self.mode_override.take(), &mut brush.kind)
                {
                    params.mode = mode;
                }
            }
        }
        self.mode_override = None;
    }

    /// Resolve the world position under the cursor: direct surface hit,
    /// then a horizontal plane at the bounds center height, then Y = 0.
    fn pick(
        camera: &Option<Camera>,
        cursor: Vec2,
        viewport: (f32, f32),
        node: &TerrainNode,
    ) -> Option<Vec3> {
        let camera = camera.as_ref()?;
        let ray = camera.ray_from_screen(cursor, viewport);

        if let Some(hit) = node.intersect_ray(&ray) {
            return Some(hit);
        }
        if let Some(hit) = ray.intersect_plane_y(node.world_bounds().center().y) {
            return Some(hit);
        }
        ray.intersect_plane_y(0.0)
    }
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::brush::Falloff;

    fn session_with_terrain(size: u32) -> (EditSession, TerrainRegistry, TerrainId) {
        let mut registry = TerrainRegistry::new();
        let mut node = TerrainNode::new();
        node.create_heightmap(size, 0.0).unwrap();
        let id = registry.insert(node);

        let mut session = EditSession::new();
        session.initialize();
        session.set_terrain(Some(id));
        (session, registry, id)
    }

    fn press_primary(session: &mut EditSession, x: f32, y: f32) {
        session.push_event(EditorEvent::PointerPressed {
            button: PointerButton::Primary,
            x,
            y,
        });
    }

    #[test]
    fn test_initialize_populates_default_brushes() {
        let mut session = EditSession::new();
        session.initialize();
        assert_eq!(session.brush_count(), 5);
        assert_eq!(session.current_brush().unwrap().name(), "raise");
    }

    #[test]
    fn test_disabled_session_ignores_input() {
        let (mut session, mut registry, id) = session_with_terrain(65);
        session.set_enabled(false);

        press_primary(&mut session, 0.0, 0.0);
        session.update(0.1, &mut registry);

        assert!(!session.is_editing());
        assert_eq!(registry.get(id).unwrap().heightmap.max_height(), 0.0);
    }

    #[test]
    fn test_stroke_without_terrain_is_noop() {
        let mut session = EditSession::new();
        session.initialize();
        let mut registry = TerrainRegistry::new();

        press_primary(&mut session, 0.0, 0.0);
        session.update(0.1, &mut registry);
        assert!(!session.is_editing());
    }

    #[test]
    fn test_press_apply_release() {
        let (mut session, mut registry, id) = session_with_terrain(65);
        {
            let brush = session.current_brush_mut().unwrap();
            brush.settings.set_strength(1.0);
            brush.settings.falloff = Falloff::Constant;
        }

        // Without a camera the brush stays at the origin, which maps to
        // grid cell (0,0)
        press_primary(&mut session, 10.0, 10.0);
        session.update(0.1, &mut registry);
        assert!(session.is_editing());

        let raised = registry.get(id).unwrap().heightmap.height(0, 0);
        assert!(raised > 0.0);

        session.push_event(EditorEvent::PointerReleased {
            button: PointerButton::Primary,
            x: 10.0,
            y: 10.0,
        });
        session.update(0.1, &mut registry);
        assert!(!session.is_editing());

        // Idle ticks no longer modify the terrain
        let before = registry.get(id).unwrap().heightmap.height(0, 0);
        session.update(0.1, &mut registry);
        assert_eq!(registry.get(id).unwrap().heightmap.height(0, 0), before);
    }

    #[test]
    fn test_rate_limiter_throttles_within_interval() {
        let (mut session, mut registry, id) = session_with_terrain(65);
        session.current_brush_mut().unwrap().settings.set_strength(1.0);

        press_primary(&mut session, 0.0, 0.0);
        session.update(0.1, &mut registry);
        let after_first = registry.get(id).unwrap().heightmap.height(0, 0);
        assert!(after_first > 0.0);

        // A tick much shorter than the 1/15 s interval cannot fire
        session.update(0.001, &mut registry);
        assert_eq!(registry.get(id).unwrap().heightmap.height(0, 0), after_first);
    }

    #[test]
    fn test_undo_redo_through_session() {
        let (mut session, mut registry, id) = session_with_terrain(65);
        session.current_brush_mut().unwrap().settings.set_strength(1.0);

        press_primary(&mut session, 0.0, 0.0);
        session.update(0.1, &mut registry);
        session.push_event(EditorEvent::PointerReleased {
            button: PointerButton::Primary,
            x: 0.0,
            y: 0.0,
        });
        session.update(0.1, &mut registry);

        let edited = registry.get(id).unwrap().heightmap.height(0, 0);
        assert!(edited > 0.0);
        assert!(session.can_undo());

        assert!(session.undo(&mut registry));
        assert_eq!(registry.get(id).unwrap().heightmap.height(0, 0), 0.0);

        assert!(session.redo(&mut registry));
        assert_eq!(registry.get(id).unwrap().heightmap.height(0, 0), edited);
    }

    #[test]
    fn test_ctrl_z_key_binding() {
        let (mut session, mut registry, id) = session_with_terrain(65);
        session.current_brush_mut().unwrap().settings.set_strength(1.0);

        press_primary(&mut session, 0.0, 0.0);
        session.update(0.1, &mut registry);
        session.push_event(EditorEvent::PointerReleased {
            button: PointerButton::Primary,
            x: 0.0,
            y: 0.0,
        });
        session.push_event(EditorEvent::KeyPressed {
            key: EditorKey::KeyZ,
            ctrl: true,
        });
        session.update(0.1, &mut registry);

        assert_eq!(registry.get(id).unwrap().heightmap.height(0, 0), 0.0);
    }

    #[test]
    fn test_rebinding_terrain_clears_history() {
        let (mut session, mut registry, id) = session_with_terrain(65);
        session.current_brush_mut().unwrap().settings.set_strength(1.0);

        press_primary(&mut session, 0.0, 0.0);
        session.update(0.1, &mut registry);
        assert!(session.can_undo());

        session.set_terrain(Some(id));
        assert!(!session.can_undo());
        assert!(!session.is_editing());
    }

    #[test]
    fn test_scroll_resizes_brush() {
        let mut session = EditSession::new();
        session.initialize();
        let mut registry = TerrainRegistry::new();

        let start = session.current_brush().unwrap().settings.size();
        session.push_event(EditorEvent::Scroll { delta: 1.0 });
        session.update(0.016, &mut registry);
        let grown = session.current_brush().unwrap().settings.size();
        assert!((grown - start * 1.2).abs() < 1e-5);

        session.push_event(EditorEvent::Scroll { delta: -1.0 });
        session.update(0.016, &mut registry);
        let shrunk = session.current_brush().unwrap().settings.size();
        assert!((shrunk - grown * 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_digit_keys_select_brushes() {
        let mut session = EditSession::new();
        session.initialize();
        let mut registry = TerrainRegistry::new();

        session.push_event(EditorEvent::KeyPressed {
            key: EditorKey::Digit4,
            ctrl: false,
        });
        session.update(0.016, &mut registry);
        assert_eq!(session.current_brush().unwrap().name(), "smooth");
    }

    #[test]
    fn test_secondary_button_lowers_with_raise_brush() {
        let (mut session, mut registry, id) = session_with_terrain(65);
        // Start above zero so lowering is visible
        registry.get_mut(id).unwrap().heightmap.update_region(
            0,
            0,
            1,
            1,
            &[10.0],
        );
        session.current_brush_mut().unwrap().settings.set_strength(1.0);

        session.push_event(EditorEvent::PointerPressed {
            button: PointerButton::Secondary,
            x: 0.0,
            y: 0.0,
        });
        session.update(0.1, &mut registry);
        assert!(registry.get(id).unwrap().heightmap.height(0, 0) < 10.0);

        // Release restores the raise mode
        session.push_event(EditorEvent::PointerReleased {
            button: PointerButton::Secondary,
            x: 0.0,
            y: 0.0,
        });
        session.update(0.1, &mut registry);
        match &session.current_brush().unwrap().kind {
            BrushKind::Height(p) => assert_eq!(p.mode, HeightMode::Raise),
            _ => panic!("expected height brush"),
        }
    }

    #[test]
    fn test_control_click_flattens_to_surface_height() {
        let (mut session, mut registry, _id) = session_with_terrain(65);
        session.current_brush_mut().unwrap().settings.set_strength(1.0);

        session.push_event(EditorEvent::KeyPressed {
            key: EditorKey::Control,
            ctrl: true,
        });
        press_primary(&mut session, 0.0, 0.0);
        session.update(0.1, &mut registry);

        match &session.current_brush().unwrap().kind {
            BrushKind::Height(p) => {
                assert_eq!(p.mode, HeightMode::Flatten);
                assert_eq!(p.target_height, 0.0);
            }
            _ => panic!("expected height brush"),
        }
    }

    #[test]
    fn test_control_flatten_target_uses_press_position() {
        let (mut session, mut registry, id) = session_with_terrain(65);
        session.current_brush_mut().unwrap().settings.set_strength(1.0);

        // Plateau at height 8 under the screen center
        let heights = vec![8.0; 25];
        registry
            .get_mut(id)
            .unwrap()
            .heightmap
            .update_region(30, 30, 5, 5, &heights);

        let camera = Camera::look_at(
            Vec3::new(32.0, 50.0, 32.01),
            Vec3::new(32.0, 0.0, 32.0),
            Vec3::Y,
        );
        session.set_camera(camera);
        session.set_viewport(800.0, 600.0);

        // The press itself carries the cursor position; the flatten target
        // must come from the surface under it, not from a previous pick
        session.push_event(EditorEvent::KeyPressed {
            key: EditorKey::Control,
            ctrl: true,
        });
        press_primary(&mut session, 400.0, 300.0);
        session.update(0.1, &mut registry);

        match &session.current_brush().unwrap().kind {
            BrushKind::Height(p) => {
                assert_eq!(p.mode, HeightMode::Flatten);
                assert!((p.target_height - 8.0).abs() < 0.5);
            }
            _ => panic!("expected height brush"),
        }
    }

    #[test]
    fn test_shift_boosts_strength_while_held() {
        let mut session = EditSession::new();
        session.initialize();
        let mut registry = TerrainRegistry::new();
        session.current_brush_mut().unwrap().settings.set_strength(0.8);

        session.push_event(EditorEvent::KeyPressed {
            key: EditorKey::Shift,
            ctrl: false,
        });
        session.update(0.016, &mut registry);
        // 0.8 * 1.5 caps at 1.0
        assert_eq!(session.current_brush().unwrap().settings.strength(), 1.0);

        session.push_event(EditorEvent::KeyReleased { key: EditorKey::Shift });
        session.update(0.016, &mut registry);
        assert!((session.current_brush().unwrap().settings.strength() - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_picking_with_camera_places_brush() {
        let (mut session, mut registry, id) = session_with_terrain(65);
        let camera = Camera::look_at(
            Vec3::new(32.0, 50.0, 32.01),
            Vec3::new(32.0, 0.0, 32.0),
            Vec3::Y,
        );
        session.set_camera(camera);
        session.set_viewport(800.0, 600.0);

        session.push_event(EditorEvent::PointerMoved { x: 400.0, y: 300.0 });
        session.update(0.016, &mut registry);

        let pos = session.current_brush().unwrap().settings.position;
        assert!((pos.x - 32.0).abs() < 0.5);
        assert!((pos.z - 32.0).abs() < 0.5);
        assert!(pos.y.abs() < 0.1);
        let _ = registry.get(id).unwrap();
    }
}
