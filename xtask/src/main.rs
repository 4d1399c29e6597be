use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Tether workspace automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the list benchmarks and write a comparison report
    Bench {
        /// Run quickly (lower sample size/time)
        #[arg(long, default_value_t = false)]
        quick: bool,

        /// Generate report only (skip running benchmarks)
        #[arg(long, default_value_t = false)]
        report_only: bool,

        /// Implementation the other columns are compared against
        #[arg(long, default_value = "mutex_deque")]
        baseline: String,
    },
    /// Run the loom model tests
    Loom,
}

const BENCH: &str = "list_benchmark";
const CRITERION_DIR: &str = "target/criterion";
const REPORT_PATH: &str = "benchmark_results/report.md";

/// Workload row -> implementation column -> operations per second.
type Results = BTreeMap<String, BTreeMap<String, f64>>;

#[derive(Deserialize)]
struct Estimates {
    mean: Estimate,
}

#[derive(Deserialize)]
struct Estimate {
    point_estimate: f64,
}

#[derive(Deserialize)]
struct BenchmarkInfo {
    group_id: String,
    function_id: Option<String>,
    value_str: Option<String>,
    throughput: Option<Throughput>,
}

#[derive(Deserialize)]
enum Throughput {
    Elements(u64),
    Bytes(u64),
    BytesDecimal(u64),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bench {
            quick,
            report_only,
            baseline,
        } => {
            if !report_only {
                run_benchmarks(quick)?;
            }
            generate_report(&baseline)?;
        }
        Commands::Loom => run_loom()?,
    }

    Ok(())
}

fn run_benchmarks(quick: bool) -> Result<()> {
    println!("Running list benchmarks...");
    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.env("CARGO_INCREMENTAL", "0")
        .args(["bench", "--bench", BENCH]);

    // Args for the test runner (Criterion) go after --
    cmd.arg("--");
    if quick {
        cmd.args(["--measurement-time", "0.5", "--noplot", "--sample-size", "10"]);
    }

    let status = cmd.status().context("failed to run cargo bench")?;
    if !status.success() {
        bail!("benchmark run failed");
    }
    println!("Finished in {:.2?}", start.elapsed());
    Ok(())
}

fn run_loom() -> Result<()> {
    let status = Command::new("cargo")
        .env("RUSTFLAGS", "--cfg loom")
        .args(["test", "--release", "--test", "loom_tests"])
        .status()
        .context("failed to run cargo test")?;
    if !status.success() {
        bail!("loom models failed");
    }
    Ok(())
}

fn generate_report(baseline: &str) -> Result<()> {
    println!("\n>>> Generating Report...");

    let criterion_dir = Path::new(CRITERION_DIR);
    if !criterion_dir.exists() {
        eprintln!("No criterion output found at {}", criterion_dir.display());
        return Ok(());
    }

    let mut results = Results::new();
    collect_results(criterion_dir, &mut results)?;

    let report_path = PathBuf::from(REPORT_PATH);
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(&report_path)?;
    write_report(&mut file, &results, baseline)?;

    println!("Report written to {}", report_path.display());
    Ok(())
}

fn write_report(out: &mut impl Write, results: &Results, baseline: &str) -> Result<()> {
    let columns: BTreeSet<&str> = results
        .values()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();

    writeln!(out, "# List Benchmark Report")?;
    writeln!(out)?;

    write!(out, "| Workload |")?;
    for column in &columns {
        write!(out, " {column} (Ops/s) | vs {baseline} |")?;
    }
    writeln!(out)?;

    write!(out, "|---|")?;
    for _ in &columns {
        write!(out, "---|---|")?;
    }
    writeln!(out)?;

    for (workload, row) in results {
        write!(out, "| {workload} |")?;
        let base = row.get(baseline).copied().unwrap_or(0.0);

        for column in &columns {
            match row.get(*column) {
                Some(&ops) => {
                    let rel = if base > 0.0 { ops / base } else { 0.0 };
                    write!(out, " {} | **{rel:.2}x** |", format_ops(ops))?;
                }
                None => write!(out, " N/A | - |")?,
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

fn format_ops(ops: f64) -> String {
    if ops > 1_000_000.0 {
        format!("{:.2}M", ops / 1_000_000.0)
    } else if ops > 1_000.0 {
        format!("{:.2}K", ops / 1_000.0)
    } else {
        format!("{ops:.0}")
    }
}

/// Walks criterion's output and records every `new/` measurement.
fn collect_results(dir: &Path, results: &mut Results) -> Result<()> {
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if path.file_name().and_then(|s| s.to_str()) == Some("new") {
            if let Some((workload, function, ops)) = read_measurement(&path)? {
                results.entry(workload).or_default().insert(function, ops);
            }
        } else {
            collect_results(&path, results)?;
        }
    }
    Ok(())
}

fn read_measurement(dir: &Path) -> Result<Option<(String, String, f64)>> {
    let info_path = dir.join("benchmark.json");
    let estimates_path = dir.join("estimates.json");
    if !info_path.exists() || !estimates_path.exists() {
        return Ok(None);
    }

    let info: BenchmarkInfo = serde_json::from_str(&fs::read_to_string(&info_path)?)
        .with_context(|| format!("malformed {}", info_path.display()))?;
    let estimates: Estimates = serde_json::from_str(&fs::read_to_string(&estimates_path)?)
        .with_context(|| format!("malformed {}", estimates_path.display()))?;

    let time_ns = estimates.mean.point_estimate;
    if time_ns <= 0.0 {
        return Ok(None);
    }
    let elements = match info.throughput {
        Some(Throughput::Elements(n) | Throughput::Bytes(n) | Throughput::BytesDecimal(n)) => n as f64,
        None => 1.0,
    };

    let workload = match info.value_str {
        Some(value) => format!("{}/{value}", info.group_id),
        None => info.group_id,
    };
    let function = info.function_id.unwrap_or_else(|| "default".to_string());
    Ok(Some((workload, function, elements * 1e9 / time_ns)))
}
