//! Smooth-brush application: box, Gaussian, and detail-preserving filters.

use crate::editor::brush::{BrushSettings, SmoothMode, SmoothParams};
use crate::terrain::{Heightmap, TerrainNode};

/// Apply one smooth-brush tick centered at the brush's world position.
///
/// Each in-radius cell is pulled `effective_strength` of the way from its
/// current height toward the filtered height. Multiple iterations rerun the
/// filter over the previous pass's output.
pub fn apply(
    settings: &BrushSettings,
    params: &SmoothParams,
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

    let radius = (settings.size() / terrain.scale.x) as i32 + 1;
    let min_x = (center_x - radius).max(0);
    let max_x = (center_x + radius).min(size as i32 - 1);
    let min_z = (center_z - radius).max(0);
    let max_z = (center_z + radius).min(size as i32 - 1);

    let mut touched = false;
    let mut updates: Vec<(i32, i32, f32)> = Vec::new();

    for _ in 0..params.iterations() {
        updates.clear();

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
                let smoothed = match params.mode {
                    SmoothMode::Average => box_average(&terrain.heightmap, x, z),
                    SmoothMode::Gaussian => {
                        gaussian_average(&terrain.heightmap, x, z, settings.size())
                    }
                    SmoothMode::PreserveDetail => {
                        detail_preserving(&terrain.heightmap, x, z, current, params)
                    }
                };

                let effective = settings.effective_strength(distance, delta_time);
                updates.push((x, z, current + (smoothed - current) * effective));
            }
        }

        for &(x, z, height) in &updates {
            terrain.update_height(x, z, height);
            touched = true;
        }
    }

    touched
}

/// 3x3 box average clipped at the grid border
fn box_average(heightmap: &Heightmap, x: i32, z: i32) -> f32 {
    let size = heightmap.size() as i32;
    let mut sum = 0.0;
    let mut count = 0u32;

    for dz in -1..=1 {
        for dx in -1..=1 {
            let sx = x + dx;
            let sz = z + dz;
            if sx >= 0 && sx < size && sz >= 0 && sz < size {
                sum += heightmap.height(sx as u32, sz as u32);
                count += 1;
            }
        }
    }

    if count > 0 {
        sum / count as f32
    } else {
        heightmap.height(x as u32, z as u32)
    }
}

/// Gaussian average with a kernel sized from the brush radius,
/// `sigma = kernel_radius / 3`
fn gaussian_average(heightmap: &Heightmap, x: i32, z: i32, brush_size: f32) -> f32 {
    let size = heightmap.size() as i32;
    let radius = ((brush_size / 10.0) as i32).max(1);
    let sigma = radius as f32 / 3.0;

    let mut weighted = 0.0;
    let mut total_weight = 0.0;

    for dz in -radius..=radius {
        for dx in -radius..=radius {
            let sx = x + dx;
            let sz = z + dz;
            if sx >= 0 && sx < size && sz >= 0 && sz < size {
                let d = ((dx * dx + dz * dz) as f32).sqrt();
                let weight = gaussian_weight(d, sigma);
                weighted += heightmap.height(sx as u32, sz as u32) * weight;
                total_weight += weight;
            }
        }
    }

    if total_weight > 0.0 {
        weighted / total_weight
    } else {
        heightmap.height(x as u32, z as u32)
    }
}

fn gaussian_weight(distance: f32, sigma: f32) -> f32 {
    if sigma <= 0.0 {
        return if distance == 0.0 { 1.0 } else { 0.0 };
    }
    let sigma_sq = sigma * sigma;
    (-(distance * distance) / (2.0 * sigma_sq)).exp() / (2.0 * std::f32::consts::PI * sigma_sq)
}

/// Box average that hands back up to 70% of the original height once the
/// change exceeds the preservation threshold
fn detail_preserving(
    heightmap: &Heightmap,
    x: i32,
    z: i32,
    original: f32,
    params: &SmoothParams,
) -> f32 {
    let smoothed = box_average(heightmap, x, z);
    let diff = (smoothed - original).abs();

    if diff < params.preserve_threshold() {
        smoothed
    } else {
        let preservation =
            ((diff - params.preserve_threshold()) / params.preserve_threshold()).clamp(0.0, 0.7);
        smoothed + (original - smoothed) * preservation
    }
}
