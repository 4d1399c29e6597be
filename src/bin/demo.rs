//! Replays the reference batch against the reference list on several threads.
//!
//! Usage: `tether-demo [CONFIG.json] [THREADS]`
//!
//! The optional config is a [`tether::ListConfig`] in JSON form, e.g.
//! `{"capacity": 16, "retry": "spin"}`.

use anyhow::{ensure, Context, Result};
use serde::Serialize;
use std::fs;
use tether::workload::{self, REFERENCE_CAPACITY, REFERENCE_OPS};
use tether::{ListConfig, ListStats, NodeId};

#[derive(Serialize)]
struct Report {
    members: Vec<NodeId>,
    stats: ListStats,
}

fn main() -> Result<()> {
    #[cfg(feature = "demo-tracing")]
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => {
            let text = fs::read_to_string(&path).with_context(|| format!("failed to read {path}"))?;
            ListConfig::from_json(&text).with_context(|| format!("failed to load {path}"))?
        }
        None => ListConfig::new(REFERENCE_CAPACITY),
    };
    let threads = match args.next() {
        Some(arg) => arg.parse().with_context(|| format!("invalid thread count {arg:?}"))?,
        None => std::thread::available_parallelism().map_or(4, usize::from),
    };
    ensure!(threads > 0, "thread count must be positive");
    ensure!(
        config.capacity >= REFERENCE_CAPACITY,
        "capacity {} is too small for the reference batch (needs {REFERENCE_CAPACITY})",
        config.capacity
    );

    let list = workload::reference_list(&config)?;
    let ops = workload::decode_signed(&REFERENCE_OPS).context("reference batch does not fit a node id")?;

    println!("{list}");
    workload::run_scoped(&list, &ops, threads);
    println!("{list}");

    list.check_invariants().context("list is corrupt after the batch")?;

    let report = Report {
        members: list.snapshot(),
        stats: list.stats(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
