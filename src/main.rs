//! Command-line entry point: load the airport world, schedule the
//! departures with the requested solver(s), drive the simulation and
//! append one summary row per run.

use anyhow::{anyhow, Context, Result};
use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::time::Instant;
use surface_scheduler::airport::graph::{generate_abstract_graph, AirportGraph};
use surface_scheduler::airport::instance::{generate_instance, InstanceSpec};
use surface_scheduler::airport::model::load_models;
use surface_scheduler::metrics::RunSummary;
use surface_scheduler::scheduler::{Scheduler, Strategy};
use surface_scheduler::sim_warn;
use surface_scheduler::simulation::Simulator;
use surface_scheduler::Config;

/// Scheduling solver selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SolverArg {
    /// First-come-first-served
    #[value(name = "FCFS")]
    Fcfs,
    /// First-leave-first-served
    #[value(name = "FLFS")]
    Flfs,
    /// Both solvers, FLFS first
    #[value(name = "ALL")]
    All,
}

#[derive(Parser, Debug)]
#[command(name = "surface-scheduler", version, about)]
struct Cli {
    /// input graph file; assembled from the node/link/spot/runway/depart
    /// files when absent
    #[arg(short, long)]
    graph: Option<PathBuf>,

    /// input aircraft model file
    #[arg(short, long)]
    model: PathBuf,

    /// input itinerary file; generated when the file does not exist
    #[arg(short, long)]
    instance: PathBuf,

    /// input config file
    #[arg(short, long, default_value = "../config.yaml")]
    config: PathBuf,

    /// output schedule file
    #[arg(short, long)]
    output: PathBuf,

    /// solvers (FCFS, FLFS, ALL)
    #[arg(short, long, value_enum)]
    solver: SolverArg,

    /// number of agents for instance generation
    #[arg(short = 'k', long = "agentNum", default_value_t = 0)]
    agent_num: usize,

    /// smallest appearance gap for instance generation
    #[arg(long = "interval_min", default_value_t = 0)]
    interval_min: u32,

    /// largest appearance gap for instance generation
    #[arg(long = "interval_max", default_value_t = 0)]
    interval_max: u32,

    /// node model
    #[arg(long)]
    node: Option<PathBuf>,

    /// link model
    #[arg(long)]
    link: Option<PathBuf>,

    /// spot model
    #[arg(long)]
    spot: Option<PathBuf>,

    /// runway model
    #[arg(long)]
    runway: Option<PathBuf>,

    /// depart routing table
    #[arg(long)]
    depart: Option<PathBuf>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{e}");
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    };

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::try_from_file(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    surface_scheduler::init_logger(&config);

    // one process-wide stream; every draw of the run consumes from it
    let mut rng = StdRng::seed_from_u64(chrono::Utc::now().timestamp() as u64);

    let graph = load_or_generate_graph(&cli)?;
    let models = load_models(&cli.model)
        .with_context(|| format!("loading models {}", cli.model.display()))?;

    let instance = if cli.instance.exists() {
        InstanceSpec::load(&cli.instance)
            .with_context(|| format!("loading instance {}", cli.instance.display()))?
    } else {
        let spec = generate_instance(
            &graph,
            &models,
            cli.agent_num,
            cli.interval_min,
            cli.interval_max,
            &mut rng,
        )?;
        spec.save(&cli.instance)
            .with_context(|| format!("writing instance {}", cli.instance.display()))?;
        spec
    };
    let mut departures = instance.to_aircraft(&graph, &models)?;

    let strategies = match cli.solver {
        SolverArg::Fcfs => vec![Strategy::Fcfs],
        SolverArg::Flfs => vec![Strategy::Flfs],
        SolverArg::All => vec![Strategy::Flfs, Strategy::Fcfs],
    };

    let mut scheduler = Scheduler::new(&config)?;
    let instance_name = cli.instance.display().to_string();

    for (round, strategy) in strategies.iter().enumerate() {
        if round > 0 {
            scheduler.clear_plans(&mut departures);
        }

        let started = Instant::now();
        scheduler.run(&graph, *strategy, &mut departures, &mut rng);
        let runtime = started.elapsed().as_secs_f64();

        let mut simulator = Simulator::new(&config, &mut departures);
        let outcome = simulator.run(&graph, &mut departures);
        if !outcome.finished() {
            sim_warn!(
                "(run) {} simulation finished {}/{} departures.",
                strategy,
                outcome.completed_count,
                outcome.scheduled_count
            );
        }

        let summary = RunSummary::from_departures(
            &strategy.to_string(),
            runtime,
            &departures,
            scheduler.expanded_nodes(),
            scheduler.generated_nodes(),
            &instance_name,
        );
        println!(
            "{}, {}, {}, {}, {}, {}, {}, {}, {}",
            summary.solver,
            summary.runtime,
            summary.avg_wait_time,
            summary.avg_travel_time,
            summary.total_cost,
            summary.makespan,
            summary.expanded_nodes,
            summary.generated_nodes,
            summary.instance_file
        );
        summary
            .append_to(&cli.output)
            .with_context(|| format!("appending to {}", cli.output.display()))?;
    }

    Ok(())
}

fn load_or_generate_graph(cli: &Cli) -> Result<AirportGraph> {
    if let Some(path) = &cli.graph {
        return AirportGraph::load(path)
            .with_context(|| format!("loading graph {}", path.display()));
    }

    let require = |path: &Option<PathBuf>, flag: &str| -> Result<PathBuf> {
        path.clone()
            .ok_or_else(|| anyhow!("--{flag} is required when --graph is not given"))
    };
    let node = require(&cli.node, "node")?;
    let link = require(&cli.link, "link")?;
    let spot = require(&cli.spot, "spot")?;
    let runway = require(&cli.runway, "runway")?;
    let depart = require(&cli.depart, "depart")?;

    let graph_output = graph_output_path(&cli.output);
    generate_abstract_graph(&node, &link, &spot, &runway, &depart, &graph_output)
        .context("generating abstract graph")
}

/// The generated graph lands next to the schedule output.
fn graph_output_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("generated"));
    name.push_str(".graph.yaml");
    output.with_file_name(name)
}
