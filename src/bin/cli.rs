//! densitypeak CLI - cluster gridded demand into spatial units
//!
//! Usage:
//!   densitypeak-cli cluster --cells <csv> (--demand <csv> | --trips <csv>) [--output <csv>]
//!   densitypeak-cli decision-graph --cells <csv> (--demand <csv> | --trips <csv>) [--top <n>]
//!
//! Input files:
//!   cells:  id,x,y                                   (projected cell centroids)
//!   demand: id,rho                                   (density per cell)
//!   trips:  pickup_time,pickup_cell,dropoff_time,dropoff_cell
//!
//! With `--trips` the density of a cell is its pickup plus dropoff count.

use clap::{Args, Parser, Subcommand};
use densitypeak::{
    bucket_secs, cell_demand, coord_map, demand_series, ClusterConfig, DensityPeakCluster,
    PlanarPoint, Propagation, Trip, UnitId, UnitSet,
};
use log::{debug, info};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

/// Thresholds used when neither a config file nor a flag provides one.
const DEFAULT_RHO_THRESHOLD: f64 = 500.0;
const DEFAULT_DELTA_THRESHOLD: f64 = 0.00001;

#[derive(Parser)]
#[command(name = "densitypeak-cli")]
#[command(about = "Density-peak clustering of gridded demand", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct InputArgs {
    /// CSV of cell centroids (id,x,y)
    #[arg(long)]
    cells: PathBuf,

    /// CSV of density per cell (id,rho)
    #[arg(long, conflicts_with = "trips", required_unless_present = "trips")]
    demand: Option<PathBuf>,

    /// CSV of gridded trips; density is derived from endpoint counts
    #[arg(long)]
    trips: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Select cluster centers and assign every cell to one
    Cluster {
        #[command(flatten)]
        input: InputArgs,

        /// JSON file with a cluster config (flags below override it)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Minimum rho for a cluster center
        #[arg(long)]
        rho_threshold: Option<f64>,

        /// Minimum delta for a cluster center
        #[arg(long)]
        delta_threshold: Option<f64>,

        /// Use multi-round fixpoint propagation instead of the single pass
        #[arg(long)]
        fixpoint: bool,

        /// Output CSV for the per-cell result
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output CSV for per-unit demand per time bucket (requires --trips)
        #[arg(long)]
        series: Option<PathBuf>,

        /// Width of a time bucket in minutes
        #[arg(long, default_value = "15")]
        bucket_minutes: i64,
    },

    /// Show the units that stand out in the rho/delta decision graph
    DecisionGraph {
        #[command(flatten)]
        input: InputArgs,

        /// Number of units to show, ranked by rho * delta
        #[arg(long, default_value = "20")]
        top: usize,
    },
}

#[derive(Deserialize)]
struct CellRow {
    id: UnitId,
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
struct DemandRow {
    id: UnitId,
    rho: f64,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let outcome = match cli.command {
        Commands::Cluster {
            input,
            config,
            rho_threshold,
            delta_threshold,
            fixpoint,
            output,
            series,
            bucket_minutes,
        } => resolve_config(config.as_deref(), rho_threshold, delta_threshold, fixpoint).and_then(
            |config| {
                run_cluster(
                    &input,
                    &config,
                    output.as_deref(),
                    series.as_deref(),
                    bucket_minutes,
                )
            },
        ),
        Commands::DecisionGraph { input, top } => run_decision_graph(&input, top),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Merge the config file (if any) with command-line overrides.
fn resolve_config(
    path: Option<&Path>,
    rho_threshold: Option<f64>,
    delta_threshold: Option<f64>,
    fixpoint: bool,
) -> Result<ClusterConfig, String> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .map_err(|e| format!("reading {}: {}", path.display(), e))?;
            serde_json::from_str::<ClusterConfig>(&content)
                .map_err(|e| format!("parsing {}: {}", path.display(), e))?
        }
        None => ClusterConfig::new(DEFAULT_RHO_THRESHOLD, DEFAULT_DELTA_THRESHOLD),
    };

    if let Some(rho) = rho_threshold {
        config.rho_threshold = rho;
    }
    if let Some(delta) = delta_threshold {
        config.delta_threshold = delta;
    }
    if fixpoint {
        config.propagation = Propagation::Fixpoint;
    }
    Ok(config)
}

/// Read every row of a headed CSV file.
fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, String> {
    let mut reader =
        csv::Reader::from_path(path).map_err(|e| format!("opening {}: {}", path.display(), e))?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| format!("reading {}: {}", path.display(), e))
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), String> {
    let mut writer =
        csv::Writer::from_path(path).map_err(|e| format!("creating {}: {}", path.display(), e))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| format!("writing {}: {}", path.display(), e))?;
    }
    writer
        .flush()
        .map_err(|e| format!("writing {}: {}", path.display(), e))
}

/// Load cells and density, returning validated units and any trips read.
fn load_units(input: &InputArgs) -> Result<(UnitSet, Vec<Trip>), String> {
    println!("\n{}", "=".repeat(60));
    println!("Loading cells from: {}", input.cells.display());
    println!("{}", "=".repeat(60));

    let coords = coord_map(
        read_csv::<CellRow>(&input.cells)?
            .into_iter()
            .map(|row| (row.id, PlanarPoint::new(row.x, row.y))),
    )
    .map_err(|e| format!("{}: {}", input.cells.display(), e))?;
    println!("  Loaded {} cells", coords.len());

    let (rho, trips): (Vec<(UnitId, f64)>, Vec<Trip>) = match (&input.demand, &input.trips) {
        (Some(path), _) => {
            let rows = read_csv::<DemandRow>(path)?;
            println!("  Loaded {} demand rows from {}", rows.len(), path.display());
            (rows.into_iter().map(|r| (r.id, r.rho)).collect(), Vec::new())
        }
        (None, Some(path)) => {
            let trips = read_csv::<Trip>(path)?;
            println!("  Loaded {} trips from {}", trips.len(), path.display());
            (cell_demand(&trips).into_iter().collect(), trips)
        }
        (None, None) => return Err("either --demand or --trips is required".to_string()),
    };

    let units = UnitSet::from_parts(rho, &coords).map_err(|e| e.to_string())?;
    println!("  Validated {} units", units.len());
    Ok((units, trips))
}

fn run_cluster(
    input: &InputArgs,
    config: &ClusterConfig,
    output: Option<&Path>,
    series: Option<&Path>,
    bucket_minutes: i64,
) -> Result<(), String> {
    if series.is_some() && input.trips.is_none() {
        return Err("--series requires --trips".to_string());
    }
    let bucket_width = bucket_secs(bucket_minutes).map_err(|e| e.to_string())?;

    let (units, trips) = load_units(input)?;

    println!("\n{}", "=".repeat(60));
    println!("CLUSTERING");
    println!("{}", "=".repeat(60));
    println!("  rho_threshold: {}", config.rho_threshold);
    println!("  delta_threshold: {}", config.delta_threshold);
    println!("  propagation: {:?}", config.propagation);

    let dpc = DensityPeakCluster::new(units);
    let result = dpc.cluster(config).map_err(|e| e.to_string())?;

    println!("\n{}", "-".repeat(60));
    println!(
        "RESULTS: {} units in {} clusters",
        result.len(),
        result.centers().len()
    );
    println!("{}", "-".repeat(60));

    let sizes = result.cluster_sizes();
    for center in result.centers() {
        let Some(unit) = result.get(*center) else {
            continue;
        };
        println!(
            "  Center {} - rho {:.1}, delta {:.4}, {} units",
            center,
            unit.rho,
            unit.delta,
            sizes.get(center).copied().unwrap_or(0)
        );
        debug!("    members: {:?}", result.members(*center));
    }

    if let Some(path) = output {
        write_csv(path, result.units())?;
        info!("Wrote {} rows to {}", result.len(), path.display());
    }

    if let Some(path) = series {
        let buckets =
            demand_series(&trips, &result, bucket_width).map_err(|e| e.to_string())?;
        write_csv(path, &buckets)?;
        info!("Wrote {} demand buckets to {}", buckets.len(), path.display());
    }

    Ok(())
}

fn run_decision_graph(input: &InputArgs, top: usize) -> Result<(), String> {
    let (units, _) = load_units(input)?;
    let dpc = DensityPeakCluster::new(units);

    let mut graph = dpc.table().decision_graph();
    // The densest unit has infinite delta; it always ranks first
    graph.sort_by(|a, b| {
        (b.1 * b.2)
            .partial_cmp(&(a.1 * a.2))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    println!("\n{}", "-".repeat(60));
    println!("DECISION GRAPH (top {} by rho * delta)", top.min(graph.len()));
    println!("{}", "-".repeat(60));
    println!("  {:>12} {:>12} {:>14}", "unit", "rho", "delta");
    for (id, rho, delta) in graph.iter().take(top) {
        println!("  {:>12} {:>12.1} {:>14.6}", id, rho, delta);
    }

    Ok(())
}
