//! Headless sculpting tool — applies a scripted brush pass to a heightmap
//! and writes the result as a grayscale image.
//!
//! Usage: cargo run --release --bin sculpt_heightmap -- [OPTIONS]
//!
//! Options:
//!   --size <N>        Heightmap side length in samples (default: 257)
//!   --input <PATH>    Heightmap image to start from (default: flat)
//!   --output <PATH>   Output image path (default: sculpted.png)
//!   --hills <N>       Number of scripted raise strokes (default: 8)
//!   --smooth <N>      Box-smoothing iterations after sculpting (default: 1)

use std::path::PathBuf;
use std::time::Instant;

use glam::Vec3;

use relief::editor::{Brush, Falloff};
use relief::terrain::TerrainNode;

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let args: Vec<String> = std::env::args().collect();
    let size = parse_u32_arg(&args, "--size").unwrap_or(257);
    let input = parse_str_arg(&args, "--input").map(PathBuf::from);
    let output = parse_str_arg(&args, "--output").unwrap_or_else(|| "sculpted.png".to_string());
    let hills = parse_u32_arg(&args, "--hills").unwrap_or(8);
    let smooth = parse_u32_arg(&args, "--smooth").unwrap_or(1);

    let start = Instant::now();

    let mut node = TerrainNode::new();
    match &input {
        Some(path) => {
            if let Err(err) = node.load_heightmap(path, 0.5) {
                log::error!("failed to load {}: {err}", path.display());
                std::process::exit(1);
            }
        }
        None => {
            if let Err(err) = node.create_heightmap(size, 0.0) {
                log::error!("failed to create {size}x{size} heightmap: {err}");
                std::process::exit(1);
            }
        }
    }

    let grid = node.heightmap.size();
    log::info!("sculpting {}x{} heightmap with {} strokes", grid, grid, hills);

    let mut brush = Brush::raise();
    brush.settings.set_size(grid as f32 * 0.12);
    brush.settings.set_strength(1.0);
    brush.settings.falloff = Falloff::Smooth;
    brush.settings.active = true;

    // Deterministic ring of hills around the center
    let center = grid as f32 * 0.5;
    let ring = grid as f32 * 0.3;
    for hill in 0..hills {
        let angle = hill as f32 / hills as f32 * std::f32::consts::TAU;
        brush.settings.position = Vec3::new(
            center + angle.cos() * ring,
            0.0,
            center + angle.sin() * ring,
        );

        // Drive the session clock past the rate limiter for each stroke tick
        for tick in 0..20 {
            brush.settings.current_time += 0.1;
            brush.apply(&mut node, 0.1);
            if tick == 0 {
                log::debug!("stroke {hill} at {:?}", brush.settings.position);
            }
        }
    }

    if smooth > 0 {
        node.smooth_terrain(smooth);
    }
    node.update();

    log::info!(
        "height range [{:.2}, {:.2}], {} triangles, sculpted in {:.1?}",
        node.heightmap.min_height(),
        node.heightmap.max_height(),
        node.mesh.triangle_count(),
        start.elapsed()
    );

    if let Err(err) = node.save_heightmap(&output) {
        log::error!("failed to save {output}: {err}");
        std::process::exit(1);
    }
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.clone())
}
