//! Height-brush application: raise, lower, flatten, set.

use crate::editor::brush::{BrushSettings, HeightMode, HeightParams};
use crate::terrain::TerrainNode;

/// Apply one height-brush tick centered at the brush's world position.
///
/// No-op when the center falls off the grid. Every in-radius cell gets a
/// signed delta from the brush mode, optionally damped on steep areas, and
/// clamped to the per-application maximum.
pub fn apply(
    settings: &BrushSettings,
    params: &HeightParams,
    terrain: &mut TerrainNode,
    delta_time: f32,
) -> bool {
    let size = terrain.heightmap.size();
    if size == 0 {
        return false;
    }

    let grid = terrain.world_to_heightmap(settings.position);
    let center_x = grid.x as i32;
    let center_z = grid.y as i32;
    if center_x < 0 || center_z < 0 || center_x as u32 >= size || center_z as u32 >= size {
        return false;
    }

    let radius = (settings.size() / terrain.scale.x).ceil() as i32 + 1;
    let min_x = (center_x - radius).max(0);
    let max_x = (center_x + radius).min(size as i32 - 1);
    let min_z = (center_z - radius).max(0);
    let max_z = (center_z + radius).min(size as i32 - 1);

    // Sparse neighborhood average for the adaptive damping
    let avg_height = if params.adaptive_strength {
        let mut sum = 0.0;
        let mut count = 0u32;
        let mut z = min_z;
        while z <= max_z {
            let mut x = min_x;
            while x <= max_x {
                sum += terrain.heightmap.height(x as u32, z as u32);
                count += 1;
                x += 2;
            }
            z += 2;
        }
        if count > 0 { sum / count as f32 } else { 0.0 }
    } else {
        0.0
    };

    for z in min_z..=max_z {
        for x in min_x..=max_x {
            let world = terrain.heightmap_to_world(x as f32, z as f32);
            let dx = world.x - settings.position.x;
            let dz = world.z - settings.position.z;
            let distance = (dx * dx + dz * dz).sqrt();

            if distance >= settings.size() {
                continue;
            }

            let current = terrain.heightmap.height(x as u32, z as u32);
            let mut delta = height_delta(settings, params, current, distance, delta_time);

            if params.adaptive_strength {
                delta *= adaptive_multiplier(settings, current, avg_height);
            }

            delta = delta.clamp(-params.max_delta(), params.max_delta());
            terrain.update_height(x, z, current + delta);
        }
    }

    true
}

/// Signed height change for one cell before adaptive damping and clamping
fn height_delta(
    settings: &BrushSettings,
    params: &HeightParams,
    current: f32,
    distance: f32,
    delta_time: f32,
) -> f32 {
    let effective = settings.effective_strength(distance, delta_time);

    match params.mode {
        HeightMode::Raise => effective,
        HeightMode::Lower => -effective,
        HeightMode::Flatten | HeightMode::Set => {
            // Move toward the target, never overshooting
            let diff = params.target_height - current;
            if diff.abs() <= effective {
                diff
            } else if diff > 0.0 {
                effective
            } else {
                -effective
            }
        }
    }
}

/// Damp the stroke where the cell deviates from the neighborhood average by
/// more than 10% of the brush size, down to half strength
fn adaptive_multiplier(settings: &BrushSettings, current: f32, avg_height: f32) -> f32 {
    let diff = (current - avg_height).abs();
    let threshold = settings.size() * 0.1;

    if diff < threshold {
        1.0
    } else {
        1.0 - ((diff - threshold) / threshold).clamp(0.0, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;
    use crate::editor::brush::Falloff;

    fn flat_terrain(size: u32, height: f32) -> TerrainNode {
        let mut node = TerrainNode::new();
        node.create_heightmap(size, height).unwrap();
        node
    }

    fn raise_settings(size: f32, strength: f32, at: Vec3) -> BrushSettings {
        let mut settings = BrushSettings::new();
        settings.set_size(size);
        settings.set_strength(strength);
        settings.position = at;
        settings
    }

    #[test]
    fn test_create_and_raise() {
        let mut terrain = flat_terrain(257, 0.0);
        let settings = raise_settings(20.0, 1.0, Vec3::new(128.0, 0.0, 128.0));
        let params = HeightParams::new(HeightMode::Raise);

        assert!(apply(&settings, &params, &mut terrain, 0.1));

        let center = terrain.heightmap.height(128, 128);
        assert!(center > 0.0);
        assert!(center <= params.max_delta());

        // Cells beyond the radius are untouched
        assert_eq!(terrain.heightmap.height(128, 160), 0.0);
        assert_eq!(terrain.heightmap.height(0, 0), 0.0);
    }

    #[test]
    fn test_lower_mirrors_raise() {
        let mut raised = flat_terrain(65, 10.0);
        let mut lowered = flat_terrain(65, 10.0);
        let settings = raise_settings(10.0, 0.5, Vec3::new(32.0, 0.0, 32.0));

        apply(&settings, &HeightParams::new(HeightMode::Raise), &mut raised, 0.1);
        apply(&settings, &HeightParams::new(HeightMode::Lower), &mut lowered, 0.1);

        let up = raised.heightmap.height(32, 32) - 10.0;
        let down = 10.0 - lowered.heightmap.height(32, 32);
        assert!(up > 0.0);
        assert!((up - down).abs() < 1e-5);
    }

    #[test]
    fn test_flatten_converges_without_overshoot() {
        let mut terrain = flat_terrain(65, 20.0);
        let mut settings = raise_settings(10.0, 1.0, Vec3::new(32.0, 0.0, 32.0));
        settings.falloff = Falloff::Constant;
        let mut params = HeightParams::new(HeightMode::Flatten);
        params.target_height = 5.0;

        let mut previous = 20.0;
        for _ in 0..100 {
            apply(&settings, &params, &mut terrain, 0.1);
            let h = terrain.heightmap.height(32, 32);
            assert!(h >= 5.0, "overshot below target: {h}");
            assert!(h <= previous);
            previous = h;
        }
        assert!((previous - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_delta_clamped_to_max() {
        let mut terrain = flat_terrain(65, 0.0);
        let mut settings = raise_settings(10.0, 1.0, Vec3::new(32.0, 0.0, 32.0));
        settings.falloff = Falloff::Constant;
        let params = HeightParams::new(HeightMode::Raise);

        // Huge tick would give delta 1.0 * 1.0 * 10 * 10 = 100 without the clamp
        apply(&settings, &params, &mut terrain, 10.0);
        assert!((terrain.heightmap.height(32, 32) - params.max_delta()).abs() < 1e-5);
    }

    #[test]
    fn test_center_off_grid_is_noop() {
        let mut terrain = flat_terrain(65, 0.0);
        let settings = raise_settings(10.0, 1.0, Vec3::new(-50.0, 0.0, 32.0));
        let params = HeightParams::new(HeightMode::Raise);

        assert!(!apply(&settings, &params, &mut terrain, 0.1));
        assert_eq!(terrain.heightmap.max_height(), 0.0);
    }

    #[test]
    fn test_falloff_shapes_the_stroke() {
        let mut terrain = flat_terrain(65, 0.0);
        let settings = raise_settings(10.0, 1.0, Vec3::new(32.0, 0.0, 32.0));
        let params = HeightParams::new(HeightMode::Raise);

        apply(&settings, &params, &mut terrain, 0.1);

        let center = terrain.heightmap.height(32, 32);
        let edge = terrain.heightmap.height(40, 32);
        assert!(center > edge);
        assert!(edge > 0.0);
    }

    #[test]
    fn test_adaptive_damps_spikes() {
        let mut plain = flat_terrain(65, 0.0);
        let mut spiked = flat_terrain(65, 0.0);
        // A spike well above 10% of the brush size at the stroke center
        spiked.heightmap.set_height(32, 32, 50.0);
        plain.heightmap.set_height(32, 32, 50.0);

        let mut settings = raise_settings(10.0, 1.0, Vec3::new(32.0, 0.0, 32.0));
        settings.falloff = Falloff::Constant;
        let mut adaptive = HeightParams::new(HeightMode::Raise);
        adaptive.adaptive_strength = true;

        apply(&settings, &HeightParams::new(HeightMode::Raise), &mut plain, 0.05);
        apply(&settings, &adaptive, &mut spiked, 0.05);

        let plain_delta = plain.heightmap.height(32, 32) - 50.0;
        let damped_delta = spiked.heightmap.height(32, 32) - 50.0;
        assert!(damped_delta < plain_delta);
        // Damping bottoms out at half strength
        assert!(damped_delta >= plain_delta * 0.5 - 1e-5);
    }
}
