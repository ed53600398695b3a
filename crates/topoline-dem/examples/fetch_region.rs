//! Example: Download the terrarium tiles for a region and print their range.
//!
//! Usage: cargo run --example fetch_region -- <west> <south> <east> <north> [zoom] [cache_dir]

use std::env;
use std::time::Instant;
use topoline_dem::{terrarium_cache, CacheConfig, GeoBounds, TileRange, DEFAULT_ZOOM};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 5 {
        eprintln!("Usage: {} <west> <south> <east> <north> [zoom] [cache_dir]", args[0]);
        eprintln!("Example: {} -122.45 47.55 -122.25 47.70 12 ./elevation_cache", args[0]);
        std::process::exit(1);
    }

    let coord = |i: usize| -> f64 { args[i].parse().expect("Invalid coordinate") };
    let bounds = GeoBounds::new(coord(1), coord(2), coord(3), coord(4));
    let zoom: u8 = args.get(5).map(|z| z.parse().expect("Invalid zoom")).unwrap_or(DEFAULT_ZOOM);
    let cache_dir = args.get(6).map(|s| s.as_str()).unwrap_or("elevation_cache");

    let range = TileRange::covering(&bounds, zoom).expect("Invalid region");
    println!("Region covers {} tiles at zoom {}", range.len(), zoom);

    let cache = terrarium_cache(CacheConfig::new(cache_dir)).expect("Failed to create cache");
    let start = Instant::now();
    for key in range.with_stitch_neighbors() {
        cache.ensure(key).expect("Failed to queue tile");
    }
    match cache.wait() {
        Ok(report) => println!(
            "Fetched {} tiles ({} already cached) in {:.2}s",
            report.fetched,
            report.already_cached,
            start.elapsed().as_secs_f64()
        ),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    for key in range.iter() {
        match cache.get_stitched(key) {
            Ok(tile) => println!(
                "{}: {:.1} m to {:.1} m",
                key,
                tile.min_elevation(),
                tile.max_elevation()
            ),
            Err(e) => eprintln!("{}: {}", key, e),
        }
    }

    let stats = cache.download_stats();
    println!("Downloaded {} bytes", stats.bytes_downloaded);
}
