// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context as _, Result};
use shardmesh::config::{load_and_validate_config, RuntimeBuilder};
use shardmesh::core::Core;
use shardmesh::engine::{lock_wire, run_until_idle, RunOptions, RunSummary, WireRef};
use shardmesh::types::to_json;
use std::env;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Parsed command line: config files plus an optional tick limit.
struct Args {
    configs: Vec<String>,
    max_ticks: Option<u64>,
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {} <config.yaml|config.toml> [more configs ...] [--ticks N]\n\
         Example: {} configs/counter.yaml\n\
         Example: {} configs/pause.yaml --ticks 20",
        program, program, program
    )
}

fn parse_args(args: &[String]) -> Result<Args> {
    let program = args.first().map(String::as_str).unwrap_or("shardmesh");
    let mut configs = Vec::new();
    let mut max_ticks = None;
    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        if arg == "--ticks" {
            let Some(value) = rest.next() else {
                bail!("--ticks needs a value\n{}", usage(program));
            };
            let ticks = value
                .parse::<u64>()
                .with_context(|| format!("--ticks expects a number, got {:?}", value))?;
            max_ticks = Some(ticks);
        } else {
            configs.push(arg.clone());
        }
    }
    if configs.is_empty() {
        bail!("{}", usage(program));
    }
    Ok(Args { configs, max_ticks })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = env::args().collect();
    let args = parse_args(&args)?;

    println!("🚀 Shard Mesh");
    println!("═════════════");
    println!("Config files: {:?}", args.configs);

    let core = Core::new();
    let mut failed = false;
    for (i, config_file) in args.configs.iter().enumerate() {
        if i > 0 {
            println!("\n{}", "─".repeat(80));
        }
        match run_single_config(&core, config_file, args.max_ticks).await {
            Ok(summary) => failed |= !summary.healthy,
            Err(e) => {
                eprintln!("❌ Failed to run {}: {:#}", config_file, e);
                failed = true;
            }
        }
    }

    if failed {
        bail!("one or more wires failed");
    }
    println!("\n🎉 Done!");
    Ok(())
}

async fn run_single_config(core: &Core, config_file: &str, max_ticks: Option<u64>) -> Result<RunSummary> {
    let start_time = Instant::now();

    let config = load_and_validate_config(config_file, core)
        .with_context(|| format!("loading {}", config_file))?;
    let (mut mesh, wires) = RuntimeBuilder::from_config(core, &config)
        .with_context(|| format!("building {}", config_file))?;

    let mut options = RunOptions::from_config(&config.mesh);
    if max_ticks.is_some() {
        options.max_ticks = max_ticks;
    }

    println!("📋 Configuration: {}", config_file);
    println!("🔧 Tick quantum: {:?}", config.mesh.tick_quantum);
    println!("⏱️  Clock: {:?} (step {}s)", config.mesh.clock, config.mesh.time_step);
    println!("🔢 Wires: {}", wires.len());

    let summary = run_until_idle(&mut mesh, &options).await;

    println!("\n📊 Run Results:");
    println!("   Ticks: {}", summary.ticks);
    println!("   Healthy: {}", summary.healthy);
    println!("   Finished: {}", summary.idle);
    for failure in &summary.failures {
        println!("   ❌ {} failed at {}: {}", failure.wire, failure.shard, failure.error);
    }

    println!("\n🔄 Wires:");
    for (i, wire) in wires.iter().enumerate() {
        print_wire(i + 1, wire);
    }

    mesh.terminate();
    println!("\n⏱️  Total Time (including config load): {:?}", start_time.elapsed());
    Ok(summary)
}

fn print_wire(position: usize, wire: &WireRef) {
    let info = lock_wire(wire).info();
    println!(
        "  {}. {} [{:?}] iterations={} output={}",
        position,
        info.name,
        info.state,
        info.iterations,
        to_json(info.output.var())
    );
    if let Some(failure) = &info.failure {
        println!("     📝 {}", failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn configs_and_tick_limit_are_parsed() {
        let parsed = parse_args(&args(&["shardmesh", "a.yaml", "--ticks", "7", "b.toml"])).unwrap();
        assert_eq!(parsed.configs, vec!["a.yaml", "b.toml"]);
        assert_eq!(parsed.max_ticks, Some(7));
    }

    #[test]
    fn missing_configs_print_usage() {
        let error = parse_args(&args(&["shardmesh"])).err().unwrap();
        assert!(error.to_string().starts_with("Usage:"));
        assert!(parse_args(&args(&["shardmesh", "a.yaml", "--ticks"])).is_err());
        assert!(parse_args(&args(&["shardmesh", "a.yaml", "--ticks", "x"])).is_err());
    }
}
