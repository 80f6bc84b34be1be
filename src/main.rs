use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use oceanid::{
    baseline_divergence, compare_profiles, consistency_report, AnalysisConfig, CacheKey,
    ConvergenceAnalysis, DirectoryLoader, IdentifiabilitySummary, IdentifiabilityWorkflow,
    ReportCache, ReportDetail, SqliteVectorStore,
};

const USAGE: &str = "usage: oceanid <command> ...
  identify <dir> [config.json]
  consistency <file.db> [config.json]
  compare <a.db> <b.db> [config.json]
  divergence <baseline.db> <dir> [config.json]";

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

enum Command {
    Identify { dir: PathBuf },
    Consistency { file: PathBuf },
    Compare { a: PathBuf, b: PathBuf },
    Divergence { baseline: PathBuf, dir: PathBuf },
}

struct Invocation {
    command: Command,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Invocation> {
    let mut args = env::args().skip(1);
    let Some(name) = args.next() else {
        anyhow::bail!("missing command\n{USAGE}");
    };
    let mut positional: Vec<PathBuf> = args.map(PathBuf::from).collect();
    let required = match name.as_str() {
        "identify" | "consistency" => 1,
        "compare" | "divergence" => 2,
        other => anyhow::bail!("unknown command {other}\n{USAGE}"),
    };
    if positional.len() < required {
        anyhow::bail!("{name} expects {required} path argument(s)\n{USAGE}");
    }
    if positional.len() > required + 1 {
        anyhow::bail!(
            "Unexpected extra argument: {:?}",
            positional[required + 1]
        );
    }
    let config = (positional.len() == required + 1).then(|| positional.remove(required));
    let mut paths = positional.into_iter();
    let mut next = || paths.next().unwrap_or_default();
    let command = match name.as_str() {
        "identify" => Command::Identify { dir: next() },
        "consistency" => Command::Consistency { file: next() },
        "compare" => Command::Compare {
            a: next(),
            b: next(),
        },
        _ => Command::Divergence {
            baseline: next(),
            dir: next(),
        },
    };
    Ok(Invocation { command, config })
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::from_path(path),
        None => Ok(AnalysisConfig::default()),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct IdentifyReport {
    identifiability: IdentifiabilitySummary,
    convergence: ConvergenceAnalysis,
}

fn identify(dir: &Path, config: AnalysisConfig) -> Result<IdentifyReport> {
    let loader = DirectoryLoader::new(dir);
    let paths = loader.paths()?;
    let cache = ReportCache::default();
    let key = CacheKey::new(&paths, &config).context("build report cache key")?;
    let mut computed = false;
    let report = cache.get_or_compute(&key, || {
        computed = true;
        let profiles = loader
            .load_profiles()
            .with_context(|| format!("load profiles from {:?}", dir))?;
        info!("Loaded {} profiles from {:?}", profiles.len(), dir);
        let convergence = ConvergenceAnalysis::run(&profiles, &config)?;
        let identifiability = IdentifiabilityWorkflow::new(config.clone(), profiles).execute()?;
        info!(
            "Identifiability ARI {:.4}, total {:?}",
            identifiability.ari(),
            identifiability.total_duration
        );
        Ok(IdentifyReport {
            identifiability,
            convergence,
        })
    })?;
    if !computed {
        info!(
            "Identify report for {:?} served from cache (ARI {:.4})",
            dir,
            report.identifiability.ari()
        );
    }
    Ok(report)
}

fn print_json<T: Serialize>(report: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize report")?;
    println!("{json}");
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    let invocation = parse_args()?;
    let config = load_config(invocation.config.as_deref())?;
    let start = Instant::now();

    match invocation.command {
        Command::Identify { dir } => print_json(&identify(&dir, config)?)?,
        Command::Consistency { file } => {
            let profile = SqliteVectorStore::load_path(&file)?;
            print_json(&consistency_report(&profile, &config, ReportDetail::Summary)?)?;
        }
        Command::Compare { a, b } => {
            let a = SqliteVectorStore::load_path(&a)?;
            let b = SqliteVectorStore::load_path(&b)?;
            print_json(&compare_profiles(&a, &b, &config)?)?;
        }
        Command::Divergence { baseline, dir } => {
            let baseline = SqliteVectorStore::load_path(&baseline)?;
            let profiles = DirectoryLoader::new(&dir).load_profiles()?;
            print_json(&baseline_divergence(&baseline, &profiles, &config)?)?;
        }
    }

    info!("Completed in {:?}", start.elapsed());
    Ok(())
}
