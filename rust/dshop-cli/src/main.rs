//! dshop — disassembly job-shop simulation driver
//!
//! Runs LUMS COR order-release scenarios over generated order streams and
//! writes the event log and KPI summaries as CSV.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod generate;
mod output;
mod tracing;

use anyhow::{bail, Context, Result};
use clap::Parser;
use dshop_config::{load_config, scenarios, Scenario, SimulationConfig};
use dshop_engine::{kpi, Simulation};
use generate::OrderGenerator;
use output::{OrderCsvRow, StationCsvRow};
use std::path::PathBuf;

/// Disassembly job-shop simulator with LUMS COR order release
#[derive(Debug, Parser)]
#[command(name = "dshop", version, about)]
struct Cli {
    /// Configuration file (TOML); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single simulation with the configured rules instead of all
    /// nine scenarios
    #[arg(long)]
    single: bool,

    /// Run only the named scenario, e.g. "Simulation3"
    #[arg(long, conflicts_with = "single")]
    scenario: Option<String>,

    /// Directory holding the JSON disassembly process plans
    #[arg(long, default_value = "plans")]
    plans: PathBuf,

    /// Output directory for the CSV files
    #[arg(long, default_value = "output")]
    output: PathBuf,
}

fn main() -> Result<()> {
    if let Err(e) = tracing::init_tracing() {
        eprintln!("Warning: {}", e);
    }

    let args = Cli::parse();
    let config = load_config(args.config.as_deref()).context("loading configuration")?;
    let plans = generate::load_plans(&args.plans)?;
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let selected: Vec<Scenario> = if args.single {
        vec![Scenario {
            id: "ConfigRun".to_string(),
            pool: config.pool_sequencing_rule,
            dispatch: config.dispatching_rule,
        }]
    } else {
        let all = scenarios();
        match &args.scenario {
            Some(id) => {
                let found: Vec<Scenario> =
                    all.into_iter().filter(|s| &s.id == id).collect();
                if found.is_empty() {
                    bail!("unknown scenario {}", id);
                }
                found
            }
            None => all,
        }
    };

    let mut event_rows = Vec::new();
    let mut order_rows = Vec::new();
    let mut station_rows = Vec::new();
    let mut run_rows = Vec::new();

    for scenario in &selected {
        let mut scenario_config = config.clone();
        scenario_config.pool_sequencing_rule = scenario.pool;
        scenario_config.dispatching_rule = scenario.dispatch;
        run_scenario(
            &scenario_config,
            scenario,
            &plans,
            &mut event_rows,
            &mut order_rows,
            &mut station_rows,
            &mut run_rows,
        )?;
    }

    output::write_events(&args.output, &event_rows)?;
    output::write_order_summaries(&args.output, &order_rows)?;
    output::write_station_summaries(&args.output, &station_rows)?;
    output::write_run_summaries(&args.output, &run_rows)?;
    println!(
        "{} simulation(s) completed, results in {}",
        selected.len(),
        args.output.display()
    );
    Ok(())
}

fn run_scenario(
    config: &SimulationConfig,
    scenario: &Scenario,
    plans: &[generate::DisassemblyPlan],
    event_rows: &mut Vec<(String, String, dshop_engine::EventRecord)>,
    order_rows: &mut Vec<OrderCsvRow>,
    station_rows: &mut Vec<StationCsvRow>,
    run_rows: &mut Vec<dshop_engine::RunSummary>,
) -> Result<()> {
    // every scenario draws its order stream from a fresh seeded RNG
    let mut generator = OrderGenerator::new(config.order_generation.clone(), config.seed);
    let orders = generator.generate(plans)?;

    let mut sim = Simulation::new(config, orders);
    sim.run()
        .with_context(|| format!("running {}", scenario.id))?;

    let rules = sim.rules_label();
    output::collect_event_rows(event_rows, &sim.log, &scenario.id, &rules);
    for summary in kpi::order_summaries(&sim) {
        order_rows.push(OrderCsvRow::new(&scenario.id, &rules, &summary));
    }
    for summary in kpi::station_summaries(&sim) {
        station_rows.push(StationCsvRow::new(&scenario.id, &rules, &summary));
    }
    run_rows.push(kpi::run_summary(&sim, &scenario.id));

    println!("Simulation {} with {} completed.", scenario.id, rules);
    Ok(())
}
