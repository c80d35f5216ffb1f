//! Benchmarking module for the CVRP colony.
//!
//! Runs the colony several times per dataset, compares each result with the
//! best-known cost from the literature, and exports results, statistics and
//! a text report.

use crate::error::InstanceError;
use crate::heuristics::colony::{Colony, ColonyConfig};
use crate::instance::CvrpInstance;
use crate::solution::Solution;

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// One line of a benchmark manifest (`file,best`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetEntry {
    /// Dataset path, relative paths resolve against the manifest directory
    pub file: PathBuf,
    /// Best-known cost, if published
    pub best: Option<f64>,
}

/// Result of a single colony run on a dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub dataset: String,
    pub dimension: usize,
    pub capacity: i32,
    pub run: usize,
    pub seed: u64,
    /// Best cost found, `None` when the run aborted
    pub cost: Option<f64>,
    pub feasible: bool,
    pub routes: usize,
    /// Computation time in seconds
    pub time: f64,
    pub iterations: Option<usize>,
    pub stagnation: Option<usize>,
    pub best_known: Option<f64>,
    /// Gap to best known in percent
    pub gap_to_best: Option<f64>,
    pub error: Option<String>,
}

/// Aggregated statistics for a dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStatistics {
    pub dataset: String,
    pub num_runs: usize,
    pub num_feasible: usize,
    pub best_cost: f64,
    pub worst_cost: f64,
    pub avg_cost: f64,
    pub std_cost: f64,
    pub avg_time: f64,
    pub best_known: Option<f64>,
    pub best_gap: Option<f64>,
    pub avg_gap: Option<f64>,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of runs per dataset, each with its own seed
    pub num_runs: usize,
    /// Colony parameters; run `r` uses `colony.seed + r`
    pub colony: ColonyConfig,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            colony: ColonyConfig::default(),
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<RunResult>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
        }
    }

    /// Run the colony `num_runs` times on an instance and record every run
    pub fn run_instance(&mut self, instance: &CvrpInstance) {
        log::info!("Running benchmark on instance: {}", instance.name);

        for run in 0..self.config.num_runs {
            let config = ColonyConfig {
                seed: self.config.colony.seed.wrapping_add(run as u64),
                ..self.config.colony.clone()
            };
            let seed = config.seed;

            let mut result = RunResult {
                dataset: instance.name.clone(),
                dimension: instance.dimension,
                capacity: instance.capacity,
                run,
                seed,
                cost: None,
                feasible: false,
                routes: 0,
                time: 0.0,
                iterations: None,
                stagnation: None,
                best_known: instance.best_known,
                gap_to_best: None,
                error: None,
            };

            let start = std::time::Instant::now();
            match Colony::new(instance, config).and_then(|mut colony| colony.run()) {
                Ok(solution) => {
                    result.cost = Some(solution.cost);
                    result.feasible = run_is_feasible(instance, &solution);
                    result.routes = solution.num_routes();
                    result.iterations = solution.iterations;
                    result.stagnation = solution.stagnation;
                    result.gap_to_best = instance.best_known.map(|best| solution.gap_to(best));
                }
                Err(e) => {
                    log::warn!("{} run {} failed: {}", instance.name, run, e);
                    result.error = Some(e.to_string());
                }
            }
            result.time = start.elapsed().as_secs_f64();

            self.results.push(result);
        }
    }

    /// Run benchmark on multiple instances
    pub fn run_on_instances(&mut self, instances: &[CvrpInstance]) {
        for instance in instances {
            self.run_instance(instance);
        }
    }

    /// Compute statistics for each dataset over its feasible runs
    pub fn compute_statistics(&self) -> Vec<DatasetStatistics> {
        let mut by_dataset: BTreeMap<&str, Vec<&RunResult>> = BTreeMap::new();
        for result in &self.results {
            by_dataset.entry(result.dataset.as_str()).or_default().push(result);
        }

        let mut statistics = Vec::new();

        for (dataset, results) in by_dataset {
            let feasible: Vec<&RunResult> = results.iter().copied().filter(|r| r.feasible).collect();
            let costs: Vec<f64> = feasible.iter().filter_map(|r| r.cost).collect();
            if costs.is_empty() {
                continue;
            }
            let times: Vec<f64> = feasible.iter().map(|r| r.time).collect();
            let gaps: Vec<f64> = feasible.iter().filter_map(|r| r.gap_to_best).collect();

            let std_cost = if costs.len() > 1 { costs.iter().std_dev() } else { 0.0 };

            statistics.push(DatasetStatistics {
                dataset: dataset.to_string(),
                num_runs: results.len(),
                num_feasible: feasible.len(),
                best_cost: costs.iter().cloned().fold(f64::INFINITY, f64::min),
                worst_cost: costs.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                avg_cost: costs.iter().mean(),
                std_cost,
                avg_time: times.iter().mean(),
                best_known: results.first().and_then(|r| r.best_known),
                best_gap: if gaps.is_empty() {
                    None
                } else {
                    Some(gaps.iter().cloned().fold(f64::INFINITY, f64::min))
                },
                avg_gap: if gaps.is_empty() { None } else { Some(gaps.iter().mean()) },
            });
        }

        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), InstanceError> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), InstanceError> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("       CVRP Ant Colony Benchmark\n");
        report.push_str("========================================\n");
        report.push_str(&format!("Generated: {}\n", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")));
        report.push_str(&format!(
            "Runs per dataset: {}, ants: {}, iterations: {}\n\n",
            self.config.num_runs, self.config.colony.colony_size, self.config.colony.iterations
        ));

        report.push_str("-".repeat(92).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<24} {:>9} {:>12} {:>12} {:>12} {:>9} {:>9} {:>10}\n",
            "Dataset", "Feasible", "Best", "Avg", "Best known", "Best gap", "Avg gap", "Avg time"
        ));
        report.push_str("-".repeat(92).as_str());
        report.push('\n');

        let fmt_gap = |gap: Option<f64>| gap.map(|g| format!("{:.2}%", g)).unwrap_or_else(|| "-".to_string());

        for stat in self.compute_statistics() {
            report.push_str(&format!(
                "{:<24} {:>9} {:>12.2} {:>12.2} {:>12} {:>9} {:>9} {:>10.2}\n",
                stat.dataset,
                format!("{}/{}", stat.num_feasible, stat.num_runs),
                stat.best_cost,
                stat.avg_cost,
                stat.best_known.map(|b| format!("{:.0}", b)).unwrap_or_else(|| "-".to_string()),
                fmt_gap(stat.best_gap),
                fmt_gap(stat.avg_gap),
                stat.avg_time
            ));
        }

        report.push_str("-".repeat(92).as_str());
        report.push('\n');

        let failures: Vec<&RunResult> = self.results.iter().filter(|r| r.error.is_some()).collect();
        if !failures.is_empty() {
            report.push_str("\nFailed runs:\n");
            for r in failures {
                report.push_str(&format!(
                    "  {} run {}: {}\n",
                    r.dataset,
                    r.run,
                    r.error.as_deref().unwrap_or_default()
                ));
            }
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[RunResult] {
        &self.results
    }
}

/// Read a benchmark manifest: a CSV file with `file,best` columns
pub fn load_manifest<P: AsRef<Path>>(path: P) -> Result<Vec<DatasetEntry>, InstanceError> {
    let base = path.as_ref().parent().map(Path::to_path_buf).unwrap_or_default();
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(&path)?;

    let mut entries = Vec::new();
    for record in reader.deserialize() {
        let mut entry: DatasetEntry = record?;
        if entry.file.is_relative() {
            entry.file = base.join(&entry.file);
        }
        entries.push(entry);
    }
    Ok(entries)
}

/// Load every dataset of a manifest, attaching its best-known cost
pub fn load_datasets(entries: &[DatasetEntry]) -> Result<Vec<CvrpInstance>, InstanceError> {
    entries
        .iter()
        .map(|entry| {
            let instance = CvrpInstance::from_file(&entry.file)?;
            Ok(match entry.best {
                Some(best) => instance.with_best_known(best),
                None => instance,
            })
        })
        .collect()
}

/// Feasibility of a benchmark run. The capacity check only applies to
/// delivery-only instances, where no route leaves the depot full.
fn run_is_feasible(instance: &CvrpInstance, solution: &Solution) -> bool {
    if instance.pickup_nodes().is_empty() {
        solution.is_feasible(instance)
    } else {
        solution.is_complete(instance) && solution.is_depot_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_instance() -> CvrpInstance {
        CvrpInstance::new(
            "square",
            vec![0, 3, 3, 3, 3],
            6,
            vec![
                vec![0.0, 1.0, 1.0, 1.0, 1.0],
                vec![1.0, 0.0, 1.4, 2.0, 1.4],
                vec![1.0, 1.4, 0.0, 1.4, 2.0],
                vec![1.0, 2.0, 1.4, 0.0, 1.4],
                vec![1.0, 1.4, 2.0, 1.4, 0.0],
            ],
        )
        .unwrap()
        .with_best_known(6.8)
    }

    fn small_config(num_runs: usize) -> BenchmarkConfig {
        BenchmarkConfig {
            num_runs,
            colony: ColonyConfig { colony_size: 4, iterations: 5, ..Default::default() },
        }
    }

    #[test]
    fn test_benchmark_config() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.num_runs, 5);
    }

    #[test]
    fn test_runs_are_recorded_with_gap() {
        let instance = create_test_instance();
        let mut benchmark = Benchmark::new(small_config(3));
        benchmark.run_instance(&instance);

        let results = benchmark.results();
        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().map(|r| r.seed).collect::<Vec<_>>(), vec![42, 43, 44]);
        for r in results {
            assert!(r.feasible);
            assert!(r.gap_to_best.is_some());
            assert!(r.cost.unwrap() >= 6.8 - 1e-9);
        }

        let stats = benchmark.compute_statistics();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].num_feasible, 3);
        assert!(stats[0].best_cost <= stats[0].avg_cost + 1e-9);
        assert!(stats[0].avg_cost <= stats[0].worst_cost + 1e-9);
    }

    #[test]
    fn test_feasibility_checks_capacity_without_pickups() {
        let instance = create_test_instance();
        let overloaded = Solution::from_routes(&instance, vec![vec![0, 1, 2, 3, 4, 0]], "test");
        let split = Solution::from_routes(&instance, vec![vec![0, 1, 2, 0], vec![0, 3, 4, 0]], "test");
        assert!(!run_is_feasible(&instance, &overloaded));
        assert!(run_is_feasible(&instance, &split));

        let mixed = CvrpInstance::new(
            "mixed",
            vec![0, -4, 3],
            5,
            vec![vec![0.0, 1.0, 1.0], vec![1.0, 0.0, 1.0], vec![1.0, 1.0, 0.0]],
        )
        .unwrap();
        let pickup_first = Solution::from_routes(&mixed, vec![vec![0, 1, 2, 0]], "test");
        assert!(run_is_feasible(&mixed, &pickup_first));
    }

    #[test]
    fn test_failed_runs_are_reported() {
        let instance = CvrpInstance::new(
            "too-heavy",
            vec![0, 9],
            5,
            vec![vec![0.0, 1.0], vec![1.0, 0.0]],
        )
        .unwrap();
        let mut benchmark = Benchmark::new(small_config(2));
        benchmark.run_instance(&instance);

        assert!(benchmark.results().iter().all(|r| !r.feasible && r.error.is_some()));
        assert!(benchmark.compute_statistics().is_empty());
        assert!(benchmark.generate_report().contains("Failed runs"));
    }

    #[test]
    fn test_manifest_and_exports() {
        let dir = std::env::temp_dir().join(format!("cvrp-aco-bench-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("tiny.txt"), "3\n0 2 2\n4\n0 1 1\n1 0 1\n1 1 0\n").unwrap();
        std::fs::write(dir.join("manifest.csv"), "file,best\ntiny.txt,3\n").unwrap();

        let entries = load_manifest(dir.join("manifest.csv")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].best, Some(3.0));

        let instances = load_datasets(&entries).unwrap();
        assert_eq!(instances[0].name, "tiny");
        assert_eq!(instances[0].best_known, Some(3.0));

        let mut benchmark = Benchmark::new(small_config(1));
        benchmark.run_on_instances(&instances);
        benchmark.export_to_csv(dir.join("results.csv")).unwrap();
        benchmark.export_statistics_csv(dir.join("statistics.csv")).unwrap();

        let csv_text = std::fs::read_to_string(dir.join("results.csv")).unwrap();
        assert!(csv_text.starts_with("dataset,"));
        assert!(csv_text.contains("tiny"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
