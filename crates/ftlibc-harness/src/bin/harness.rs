//! CLI entrypoint for the ftlibc conformance harness.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use clap::{Parser, Subcommand};
use ftlibc_abi::runtime_policy;
use ftlibc_harness::structured_log::{LogEmitter, utc_timestamp};
use ftlibc_harness::{
    FixtureSet, HarnessConfig, IsolationMode, SuiteReport, SuiteRun, SuiteRunner, TrackingAllocator,
};

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

/// Conformance tooling for ftlibc.
#[derive(Debug, Parser)]
#[command(name = "ftlibc-harness")]
#[command(about = "Conformance testing harness for ftlibc")]
struct Cli {
    /// Runtime mode for the ABI under test (overrides FTLIBC_MODE).
    #[arg(long, global = true)]
    mode: Option<String>,
    /// Where each case runs (overrides FTLIBC_HARNESS_ISOLATION).
    #[arg(long, global = true, value_enum)]
    isolation: Option<IsolationMode>,
    /// JSONL structured log path (overrides FTLIBC_HARNESS_LOG).
    #[arg(long, global = true)]
    log: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the built-in ft_strncmp suite.
    Run {
        /// Output report path (markdown; JSON is written alongside).
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Verify our implementation against fixture files.
    Verify {
        /// Directory containing fixture JSON files.
        #[arg(long)]
        fixture: PathBuf,
        /// Output report path (markdown; JSON is written alongside).
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Write the built-in suites as fixture JSON files.
    EmitFixtures {
        /// Output directory for fixture JSON files.
        #[arg(long)]
        output: PathBuf,
    },
}

fn resolve_config(cli: &Cli) -> HarnessConfig {
    if let Some(raw) = cli.mode.as_deref() {
        runtime_policy::set_mode(runtime_policy::parse_mode_value(raw));
    }
    let mut config = HarnessConfig::from_env();
    if let Some(isolation) = cli.isolation {
        config = config.with_isolation(isolation);
    }
    if let Some(log) = cli.log.clone() {
        config = config.with_log_path(log);
    }
    config
}

fn run_sets(
    config: &HarnessConfig,
    sets: &[FixtureSet],
    echo: bool,
) -> Result<Vec<SuiteRun>, Box<dyn std::error::Error>> {
    let mut emitter = match &config.log_path {
        Some(path) => Some(LogEmitter::to_file(path, "ftlibc-harness")?),
        None => None,
    };
    let runner = SuiteRunner::new(config.clone()).echo(echo);

    let mut runs = Vec::with_capacity(sets.len());
    for set in sets {
        runs.push(runner.run(set, emitter.as_mut())?);
    }
    Ok(runs)
}

fn finish(
    config: &HarnessConfig,
    runs: Vec<SuiteRun>,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = SuiteReport::new(
        "ftlibc Conformance Report",
        config.mode.as_str(),
        config.isolation.as_str(),
        utc_timestamp(SystemTime::now()),
        runs,
    );

    eprintln!(
        "Verification complete: total={}, passed={}, failed={}, faulted={}, leaked={}",
        report.summary.total,
        report.summary.passed,
        report.summary.failed,
        report.summary.faulted,
        report.summary.leaked
    );

    if let Some(report_path) = report_path {
        eprintln!("Writing report to {}", report_path.display());
        std::fs::write(report_path, report.to_markdown())?;
        let json_path = report_path.with_extension("json");
        std::fs::write(&json_path, report.to_json())?;
    }

    if !report.summary.all_passed() {
        return Err("Conformance verification failed".into());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli);

    match cli.command {
        Command::Run { report } => {
            let runs = run_sets(&config, &[FixtureSet::builtin_strncmp()], true)?;
            finish(&config, runs, report.as_deref())?;
        }
        Command::Verify { fixture, report } => {
            eprintln!("Verifying against fixtures in {}", fixture.display());
            let mut entries: Vec<PathBuf> = std::fs::read_dir(&fixture)?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<Result<_, _>>()?;
            entries.sort();

            let mut fixture_sets = Vec::new();
            for path in entries {
                if path.extension().and_then(|s| s.to_str()) != Some("json") {
                    continue;
                }
                match FixtureSet::from_file(&path) {
                    Ok(set) => fixture_sets.push(set),
                    Err(err) => {
                        eprintln!("Skipping {}: {}", path.display(), err);
                    }
                }
            }
            if fixture_sets.is_empty() {
                return Err(format!("No fixture JSON files found in {}", fixture.display()).into());
            }

            let runs = run_sets(&config, &fixture_sets, true)?;
            finish(&config, runs, report.as_deref())?;
        }
        Command::EmitFixtures { output } => {
            std::fs::create_dir_all(&output)?;
            for set in [
                FixtureSet::builtin_strncmp(),
                FixtureSet::builtin_strncmp_null(),
            ] {
                let file_name = format!("{}.v1.json", set.family.replace('/', "_"));
                let path = output.join(file_name);
                std::fs::write(&path, set.to_json()?)?;
                eprintln!("Wrote {} ({} cases)", path.display(), set.cases.len());
            }
        }
    }

    Ok(())
}
