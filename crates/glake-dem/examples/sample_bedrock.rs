//! Example: Sample a bedrock raster at a projected coordinate.
//!
//! Usage: cargo run --example sample_bedrock -- <bedrock.tif> <x> <y>

use glake_dem::BedrockRaster;
use std::env;
use std::time::Instant;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 4 {
        eprintln!("Usage: {} <bedrock.tif> <x> <y>", args[0]);
        eprintln!("Example: {} RGI60-14.00005/bedrock.tif 452130 3912455", args[0]);
        std::process::exit(1);
    }

    let x: f64 = args[2].parse().expect("Invalid easting");
    let y: f64 = args[3].parse().expect("Invalid northing");

    println!("Loading bedrock raster {}...", args[1]);
    let start = Instant::now();
    let raster = BedrockRaster::from_file(&args[1]).expect("Failed to load raster");
    let (width, height) = raster.dimensions();
    let (cell_w, cell_h) = raster.cell_size();
    println!(
        "Loaded {}x{} cells of {:.1}x{:.1} m in {:.3}s",
        width,
        height,
        cell_w,
        cell_h,
        start.elapsed().as_secs_f64()
    );

    let bounds = raster.bounds();
    println!(
        "Coverage: x {:.1} to {:.1}, y {:.1} to {:.1}",
        bounds.min_x, bounds.max_x, bounds.min_y, bounds.max_y
    );

    match raster.value_at(x, y) {
        Ok(elevation) => println!("Cell value at ({}, {}): {:.2} m", x, y, elevation),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
