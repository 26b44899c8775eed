// Scenario Runner - Load and execute scenario YAML files
//
// Usage:
//   cargo run --bin scenario_runner scenarios/hna_incremental.yaml
//   cargo run --bin scenario_runner scenarios/  (runs all .yaml files in directory)
//   cargo run --bin scenario_runner scenarios/hna_incremental.yaml --seed 1234

mod hna_scenario;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use simple_logger::SimpleLogger;

use hna_scenario::{ScenarioConfig, ScenarioRunner};

fn main() {
    SimpleLogger::new().init().unwrap();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <scenario.yaml | directory/> [--seed SEED]",
            args[0]
        );
        eprintln!("\nExamples:");
        eprintln!("  {} scenarios/hna_incremental.yaml", args[0]);
        eprintln!("  {} scenarios/", args[0]);
        eprintln!("  {} scenarios/hna_incremental.yaml --seed 1234", args[0]);
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);

    // Parse optional seed override
    let seed: Option<u64> = if args.len() >= 4 && args[2] == "--seed" {
        match args[3].parse() {
            Ok(seed) => Some(seed),
            Err(_) => {
                eprintln!("Error: invalid seed: {}", args[3]);
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    if path.is_file() {
        run_scenario_file(path, seed);
    } else if path.is_dir() {
        run_scenario_directory(path, seed);
    } else {
        eprintln!("Error: Path does not exist: {}", path.display());
        std::process::exit(1);
    }
}

fn run_scenario_directory(dir: &Path, seed: Option<u64>) {
    let mut scenarios: Vec<PathBuf> = Vec::new();

    match fs::read_dir(dir) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().map(|e| e == "yaml").unwrap_or(false) {
                    scenarios.push(path);
                }
            }
        }
        Err(e) => {
            eprintln!("Error reading directory {}: {}", dir.display(), e);
            std::process::exit(1);
        }
    }

    if scenarios.is_empty() {
        eprintln!("No .yaml files found in {}", dir.display());
        std::process::exit(1);
    }

    scenarios.sort();
    for scenario in &scenarios {
        run_scenario_file(scenario, seed);
    }
}

fn run_scenario_file(path: &Path, seed: Option<u64>) {
    info!("loading scenario {}", path.display());

    let yaml_content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };

    let mut config: ScenarioConfig = match serde_yaml::from_str(&yaml_content) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error parsing {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };

    if let Some(seed) = seed {
        config.seed = Some(seed);
    }

    if let Some(name) = &config.meta.name {
        info!("scenario: {}", name);
    }
    if let Some(description) = &config.meta.description {
        info!("  {}", description);
    }

    let result = ScenarioRunner::new(config).run();
    result.log_summary();
}
