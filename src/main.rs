use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use dustmap::builder::{BuildConfig, OutOfRangeReplicates, build_map};
use dustmap::catalog::read_catalog;
use dustmap::grid::{AxisSpec, GridSpec};
use dustmap::map::{MapSample, VoxelMap, is_no_data, is_undefined_spread};

#[derive(Parser)]
#[command(name = "dustmap", about = "Monte-Carlo binned 3D reddening/extinction maps")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a discretized map from a star catalog.
    Build {
        /// Catalog file: one star per line, columns b l dist dist_err E E_err A A_err.
        catalog: PathBuf,

        /// Output path for the map file.
        #[arg(short, long)]
        output: PathBuf,

        /// Number of bins in galactic latitude.
        #[arg(long, default_value = "180")]
        bins_b: usize,

        /// Number of bins in galactic longitude.
        #[arg(long, default_value = "360")]
        bins_l: usize,

        /// Number of bins in distance.
        #[arg(long, default_value = "15")]
        bins_r: usize,

        /// Lower distance limit in kpc.
        #[arg(long, default_value = "0.0")]
        r_min: f64,

        /// Upper distance limit in kpc.
        #[arg(long, default_value = "2.5")]
        r_max: f64,

        /// Number of Monte-Carlo replicate rounds per star.
        #[arg(long, default_value = "10")]
        niters: usize,

        /// Relative-error cut: stars with err/value at or above this are dropped.
        #[arg(long, default_value = "0.5")]
        rel_err_limit: f64,

        /// Distance slack beyond r-max when filtering the catalog.
        #[arg(long, default_value = "0.5")]
        dist_margin: f64,

        /// Clip negative perturbed reddening/extinction draws to zero.
        #[arg(long)]
        clip_negative: bool,

        /// Clamp out-of-range replicate distances into the edge bins
        /// instead of dropping them.
        #[arg(long)]
        clamp_replicates: bool,

        /// RNG seed for a reproducible build.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Query a saved map at one or more sky positions.
    Query {
        /// Path to a saved map file.
        map: PathBuf,

        /// Query points as "b,l,r" triples (degrees, degrees, kpc).
        #[arg(required = true)]
        points: Vec<String>,
    },
}

fn parse_point(s: &str) -> (f64, f64, f64) {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        eprintln!("point must be three comma-separated values (e.g. \"12.5,240.0,1.2\"): {s}");
        process::exit(1);
    }
    let mut vals = [0.0f64; 3];
    for (v, part) in vals.iter_mut().zip(&parts) {
        *v = part.trim().parse().unwrap_or_else(|_| {
            eprintln!("invalid coordinate '{part}' in point '{s}'");
            process::exit(1);
        });
    }
    (vals[0], vals[1], vals[2])
}

fn fmt_value(v: f64) -> String {
    if is_no_data(v) {
        "nodata".to_string()
    } else if is_undefined_spread(v) {
        "undef".to_string()
    } else {
        format!("{v:.4}")
    }
}

fn cmd_build(catalog_path: &Path, output_path: &Path, grid: GridSpec, config: &BuildConfig) {
    let catalog = read_catalog(catalog_path).unwrap_or_else(|e| {
        eprintln!("Failed to read catalog {}: {e}", catalog_path.display());
        process::exit(1);
    });
    eprintln!("Loaded catalog: {} stars", catalog.len());

    let (nb, nl, nr) = grid.shape();
    eprintln!(
        "Grid: {nb} x {nl} x {nr} voxels, r in [{}, {}] kpc, {} replicate rounds",
        grid.r.lim0, grid.r.lim1, config.niters
    );

    let map = build_map(&catalog, &grid, config).unwrap_or_else(|e| {
        eprintln!("Build failed: {e}");
        process::exit(1);
    });

    map.save(output_path).unwrap_or_else(|e| {
        eprintln!("Failed to save map {}: {e}", output_path.display());
        process::exit(1);
    });
    eprintln!("Saved map to {}", output_path.display());
}

fn cmd_query(map_path: &Path, points: &[String]) {
    let map = VoxelMap::load(map_path).unwrap_or_else(|e| {
        eprintln!("Failed to load map {}: {e}", map_path.display());
        process::exit(1);
    });
    eprintln!("Loaded map: {:?}", map);

    for point in points {
        let (b, l, r) = parse_point(point);
        let MapSample {
            reddening,
            extinction,
            reddening_err,
            extinction_err,
        } = map.lookup_one(b, l, r);
        println!(
            "b={b:+8.3} l={l:8.3} r={r:6.3}  E={} +/- {}  A={} +/- {}",
            fmt_value(reddening),
            fmt_value(reddening_err),
            fmt_value(extinction),
            fmt_value(extinction_err),
        );
    }
}

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Build {
            catalog,
            output,
            bins_b,
            bins_l,
            bins_r,
            r_min,
            r_max,
            niters,
            rel_err_limit,
            dist_margin,
            clip_negative,
            clamp_replicates,
            seed,
        } => {
            let grid = GridSpec::new(
                AxisSpec { lim0: -90.0, lim1: 90.0, bins: *bins_b },
                AxisSpec { lim0: 0.0, lim1: 360.0, bins: *bins_l },
                AxisSpec { lim0: *r_min, lim1: *r_max, bins: *bins_r },
            )
            .unwrap_or_else(|e| {
                eprintln!("Invalid grid: {e}");
                process::exit(1);
            });

            let config = BuildConfig {
                niters: *niters,
                rel_err_limit: *rel_err_limit,
                dist_margin: *dist_margin,
                clip_negative: *clip_negative,
                oor_replicates: if *clamp_replicates {
                    OutOfRangeReplicates::ClampToEdge
                } else {
                    OutOfRangeReplicates::Discard
                },
                seed: *seed,
            };
            cmd_build(catalog, output, grid, &config);
        }
        Commands::Query { map, points } => {
            cmd_query(map, points);
        }
    }
}
