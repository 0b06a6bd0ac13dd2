//! `sentinel`: drive one mission from a query to a verified report.
//!
//! With `--state-dir`, the mission is persisted after every step and resumed on the
//! next invocation, so a crashed or `--step`-limited run picks up where it stopped.

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use tracing::{debug, warn};

use sentinel::agents::WorkerRegistry;
use sentinel::agents::planner::{ModelPlanner, Planner, StaticPlanner};
use sentinel::core::types::DriveMode;
use sentinel::exit_codes;
use sentinel::io::backend::{CommandBackend, ModelBackend};
use sentinel::io::config::{DEFAULT_CONFIG_PATH, PlannerKind, SentinelConfig, load_config};
use sentinel::io::knowledge_base::{KnowledgeBase, SearchIndex};
use sentinel::io::mission_store::MissionStore;
use sentinel::logging;
use sentinel::looping::{LoopOutcome, LoopStop, MissionDriver, run_mission};
use sentinel::mission::MissionRecord;
use sentinel::pipeline::Pipeline;
use sentinel::step::{Coordinator, CoordinatorConfig};

#[derive(Parser)]
#[command(
    name = "sentinel",
    version,
    about = "Drive a research mission through retrieval, synthesis, filtering and verification"
)]
struct Cli {
    /// Config file (TOML). Missing file means defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Drive path for a new mission. Overrides `mode` from the config.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Persist the mission here and resume it on the next run.
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Run a single step, then stop.
    #[arg(long)]
    step: bool,

    /// Mission query, e.g. "network outage".
    query: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Plan,
    Pipeline,
}

impl From<ModeArg> for DriveMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Plan => DriveMode::Plan,
            ModeArg::Pipeline => DriveMode::Pipeline,
        }
    }
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                exit_codes::INVALID
            } else {
                exit_codes::OK
            };
            err.print()?;
            return Ok(code);
        }
    };
    if cli.query.trim().is_empty() {
        bail!("query must not be empty");
    }

    let config = load_config(&cli.config)?;
    let mode = cli.mode.map_or(config.mode, DriveMode::from);

    let mut store = cli.state_dir.as_deref().map(MissionStore::open).transpose()?;
    let record = match store.as_mut() {
        Some(store) => match store.load()? {
            Some(record) => resume(record, &cli.query, mode)?,
            None => MissionRecord::new(cli.query.as_str(), mode),
        },
        None => MissionRecord::new(cli.query.as_str(), mode),
    };

    let driver = build_driver(&config, record.mode())?;
    let max_steps = if cli.step { 1 } else { config.max_steps };
    let outcome = run_mission(driver.as_ref(), record, store.as_mut(), max_steps, |step| {
        debug!(from = %step.from, to = %step.to, delegated = ?step.delegated, "step finished");
    })?;

    print_summary(&outcome);
    Ok(exit_codes::OK)
}

fn resume(record: MissionRecord, query: &str, mode: DriveMode) -> Result<MissionRecord> {
    if record.query() != query {
        bail!(
            "state directory holds mission {} for query '{}', not '{}'",
            record.mission_id(),
            record.query(),
            query
        );
    }
    if record.mode() != mode {
        warn!(
            stored = record.mode().as_str(),
            requested = mode.as_str(),
            "resumed mission keeps its original mode"
        );
    }
    Ok(record)
}

fn build_driver(config: &SentinelConfig, mode: DriveMode) -> Result<Box<dyn MissionDriver>> {
    let backend: Rc<dyn ModelBackend> = Rc::new(CommandBackend::from_config(&config.backend)?);
    let top_n = config.retrieval.top_n;
    let index: Rc<dyn SearchIndex> = match &config.retrieval.knowledge_base {
        Some(path) => Rc::new(KnowledgeBase::from_path(path, top_n)?),
        None => Rc::new(KnowledgeBase::builtin(top_n)),
    };
    let registry = WorkerRegistry::standard(
        Rc::clone(&backend),
        index,
        config.verification.pass_threshold,
    );

    Ok(match mode {
        DriveMode::Plan => {
            let planner: Box<dyn Planner> = match config.planner.kind {
                PlannerKind::Model => Box::new(ModelPlanner::new(backend)),
                PlannerKind::Static => Box::new(StaticPlanner),
            };
            let coordinator = CoordinatorConfig {
                max_revisions: config.orchestrator.max_revisions,
            };
            Box::new(Coordinator::new(planner, registry, coordinator))
        }
        DriveMode::Pipeline => Box::new(Pipeline::new(registry)),
    })
}

fn print_summary(outcome: &LoopOutcome) {
    let record = &outcome.record;
    println!("Mission: {}", record.mission_id());
    println!("Status: {}", record.status);
    match record.artifacts.verification_score() {
        Some(score) => println!("Verification score: {score:.1}/5.0"),
        None => println!("Verification score: N/A"),
    }
    if let LoopStop::MaxStepsExceeded { max_steps } = outcome.stop {
        println!("Stopped after {max_steps} step(s); rerun with the same --state-dir to resume.");
    }

    println!();
    match &record.artifacts.final_report {
        Some(report) => {
            println!("Final report:");
            println!("{report}");
        }
        None => println!("No final report generated (status: {}).", record.status),
    }

    println!();
    println!("Trace ({} entries):", record.trajectory().len());
    for entry in record.trajectory() {
        println!(
            "  {} {:<8} {:<28} {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            entry.agent_id,
            entry.action.as_str(),
            entry.reasoning
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query_with_defaults() {
        let cli = Cli::parse_from(["sentinel", "network outage"]);
        assert_eq!(cli.query, "network outage");
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(cli.mode.is_none());
        assert!(!cli.step);
    }

    #[test]
    fn parse_mode_and_state_dir() {
        let cli = Cli::parse_from([
            "sentinel",
            "--mode",
            "pipeline",
            "--state-dir",
            "/tmp/m",
            "--step",
            "q",
        ]);
        assert!(matches!(cli.mode, Some(ModeArg::Pipeline)));
        assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/m")));
        assert!(cli.step);
    }

    #[test]
    fn query_is_required() {
        assert!(Cli::try_parse_from(["sentinel"]).is_err());
    }

    #[test]
    fn resume_rejects_other_query() {
        let record = MissionRecord::with_id("m-1", "network outage", DriveMode::Plan);
        let err = resume(record, "flood", DriveMode::Plan).expect_err("mismatch");
        assert!(err.to_string().contains("network outage"));
    }
}
