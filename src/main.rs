//! CVRP Ant Colony Solver - Command Line Interface

use clap::{Args, Parser, Subcommand};
use cvrp_aco::benchmark::{load_datasets, load_manifest, Benchmark, BenchmarkConfig};
use cvrp_aco::heuristics::colony::{Colony, ColonyConfig};
use cvrp_aco::instance::CvrpInstance;
use indicatif::{ProgressBar, ProgressStyle};

use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "cvrp-aco")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Ant Colony Optimization for the Capacitated Vehicle Routing Problem")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single dataset
    Solve {
        #[arg(short, long)]
        instance: PathBuf,

        /// Best-known cost, used to report the gap
        #[arg(short, long)]
        best: Option<f64>,

        #[command(flatten)]
        colony: ColonyArgs,

        /// Output solution to file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run benchmarks on the datasets listed in a manifest (CSV `file,best`)
    Benchmark {
        #[arg(short, long)]
        manifest: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of runs per dataset
        #[arg(short, long, default_value = "5")]
        runs: usize,

        #[command(flatten)]
        colony: ColonyArgs,
    },

    /// Analyze a dataset
    Analyze {
        #[arg(short, long)]
        instance: PathBuf,
    },
}

/// Colony parameters shared by `solve` and `benchmark`
#[derive(Args, Debug, Clone)]
struct ColonyArgs {
    /// JSON file with colony parameters; overrides the flags below
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ants
    #[arg(long, default_value = "50")]
    ants: usize,

    /// Pheromone influence
    #[arg(long, default_value = "6")]
    alpha: f64,

    /// Distance influence
    #[arg(long, default_value = "5")]
    beta: f64,

    /// Depot saving influence
    #[arg(long, default_value = "5")]
    gamma: f64,

    /// Capacity usage influence
    #[arg(long, default_value = "5")]
    lambda: f64,

    /// Evaporation rate
    #[arg(long, default_value = "0.4")]
    rho: f64,

    /// Pheromone deposit factor
    #[arg(long, default_value = "1")]
    sigma: f64,

    /// Number of iterations
    #[arg(long, default_value = "100")]
    iterations: usize,

    /// Initial pheromone level
    #[arg(long, default_value = "5")]
    initial_pheromone: f64,

    /// Forced returns to the depot without progress before an ant gives up
    #[arg(long)]
    max_retries: Option<usize>,

    /// Worker threads (defaults to all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Random seed
    #[arg(short, long, default_value = "42")]
    seed: u64,
}

impl ColonyArgs {
    fn to_config(&self) -> Result<ColonyConfig, String> {
        if let Some(path) = &self.config {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {:?}: {}", path, e))?;
            return serde_json::from_str(&text).map_err(|e| format!("Invalid config {:?}: {}", path, e));
        }

        Ok(ColonyConfig {
            colony_size: self.ants,
            alpha: self.alpha,
            beta: self.beta,
            gamma: self.gamma,
            lambda: self.lambda,
            rho: self.rho,
            sigma: self.sigma,
            iterations: self.iterations,
            initial_pheromone: self.initial_pheromone,
            max_retries: self.max_retries,
            seed: self.seed,
            threads: self.threads,
        })
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve { instance, best, colony, output, verbose } => {
            solve_instance(&instance, best, &colony, output, verbose);
        }

        Commands::Benchmark { manifest, output, runs, colony } => {
            run_benchmark(&manifest, &output, runs, &colony);
        }

        Commands::Analyze { instance } => {
            analyze_instance(&instance);
        }
    }
}

fn load_instance(path: &Path) -> CvrpInstance {
    match CvrpInstance::from_file(path) {
        Ok(inst) => inst,
        Err(e) => {
            eprintln!("Error loading instance: {}", e);
            process::exit(1);
        }
    }
}

fn colony_config(args: &ColonyArgs) -> ColonyConfig {
    match args.to_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

fn solve_instance(path: &Path, best: Option<f64>, args: &ColonyArgs, output: Option<PathBuf>, verbose: bool) {
    println!("Loading instance from {:?}...", path);

    let mut instance = load_instance(path);
    if let Some(best) = best {
        instance = instance.with_best_known(best);
    }
    let config = colony_config(args);

    if verbose {
        println!("{}", instance.statistics());
        println!("Parameters: {:?}", config);
    }

    println!("Solving with {} ants for {} iterations...", config.colony_size, config.iterations);

    let mut colony = match Colony::new(&instance, config) {
        Ok(colony) => colony,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let solution = match colony.run() {
        Ok(solution) => solution,
        Err(e) => {
            eprintln!("No feasible solution: {}", e);
            process::exit(2);
        }
    };

    println!("\n========== Results ==========");
    print!("{}", solution);
    println!("Complete: {}", solution.is_complete(&instance));
    println!("Within capacity: {}", solution.respects_capacity(&instance));
    if let Some(best) = instance.best_known {
        println!("Best known: {:.2} (gap {:.2}%)", best, solution.gap_to(best));
    }

    if verbose {
        println!("Visit sequence: {:?}", solution.tour());
        for (i, profile) in solution.load_profiles(&instance).iter().enumerate() {
            println!("Load profile {}: {:?}", i + 1, profile);
        }
        for stats in colony.history() {
            println!(
                "  iter {:>4}: iteration best {:>10.2}  overall best {:>10.2}  stagnation {}",
                stats.iteration, stats.best_iteration_cost, stats.best_overall_cost, stats.stagnation
            );
        }
    }

    if let Some(out_path) = output {
        let written = serde_json::to_string_pretty(&solution)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&out_path, json).map_err(|e| e.to_string()));
        match written {
            Ok(()) => println!("\nSolution saved to {:?}", out_path),
            Err(e) => eprintln!("Cannot save solution: {}", e),
        }
    }
}

fn run_benchmark(manifest: &Path, output: &Path, runs: usize, args: &ColonyArgs) {
    println!("Loading datasets from {:?}...", manifest);

    let instances = match load_manifest(manifest).and_then(|entries| load_datasets(&entries)) {
        Ok(instances) => instances,
        Err(e) => {
            eprintln!("Error loading datasets: {}", e);
            process::exit(1);
        }
    };

    println!("Found {} datasets", instances.len());

    if instances.is_empty() {
        eprintln!("No datasets found!");
        return;
    }

    if let Err(e) = std::fs::create_dir_all(output) {
        eprintln!("Cannot create output directory: {}", e);
        process::exit(1);
    }

    let config = BenchmarkConfig {
        num_runs: runs,
        colony: colony_config(args),
    };
    let mut benchmark = Benchmark::new(config);

    let progress = ProgressBar::new(instances.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for instance in &instances {
        progress.set_message(format!("{} (n={})", instance.name, instance.dimension));
        benchmark.run_instance(instance);
        progress.inc(1);
    }
    progress.finish_with_message("done");

    let results_path = output.join("results.csv");
    match benchmark.export_to_csv(&results_path) {
        Ok(()) => println!("\nResults exported to {:?}", results_path),
        Err(e) => eprintln!("Failed to export results: {}", e),
    }

    let stats_path = output.join("statistics.csv");
    match benchmark.export_statistics_csv(&stats_path) {
        Ok(()) => println!("Statistics exported to {:?}", stats_path),
        Err(e) => eprintln!("Failed to export statistics: {}", e),
    }

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    if let Err(e) = std::fs::write(&report_path, &report) {
        eprintln!("Failed to save report: {}", e);
    } else {
        println!("Report saved to {:?}", report_path);
    }
}

fn analyze_instance(path: &Path) {
    let instance = load_instance(path);

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let infeasible: Vec<usize> = (1..instance.dimension)
        .filter(|&i| instance.demand[i].abs() > instance.capacity)
        .collect();
    if !infeasible.is_empty() {
        println!("Nodes whose demand exceeds the capacity: {:?}", infeasible);
    }
}
