//! CLI for manually replaying a scenario file against the planner and
//! dumping its per-cycle status trace, for offline inspection or golden-
//! trace comparison in CI.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use tp_sim::Scenario;

/// Replay a planner scenario file and dump its per-cycle status trace.
#[derive(Parser, Debug)]
#[command(name = "scenario_runner", version, about)]
struct Args {
    /// Path to the scenario JSON file.
    scenario: PathBuf,

    /// Where to write the recorded trace (JSON).
    #[arg(long, default_value = "trace.json")]
    out: PathBuf,

    /// Segment queue capacity for this run.
    #[arg(long, default_value_t = 32)]
    capacity: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let scenario = Scenario::load(&args.scenario)?;
    info!(path = %args.scenario.display(), moves = scenario.moves.len(), "loaded scenario");

    // The queue capacity is a compile-time const generic; dispatch to the
    // handful of sizes this tool supports rather than requiring a rebuild
    // per scenario.
    let max_ticks = scenario.max_ticks;
    let (ticks_run, done) = match args.capacity {
        0..=8 => run::<8>(&scenario, max_ticks, &args.out)?,
        9..=16 => run::<16>(&scenario, max_ticks, &args.out)?,
        17..=32 => run::<32>(&scenario, max_ticks, &args.out)?,
        _ => run::<64>(&scenario, max_ticks, &args.out)?,
    };

    info!(ticks_run, done, out = %args.out.display(), "scenario finished");
    if !done {
        anyhow::bail!("scenario did not reach idle within {max_ticks} ticks");
    }
    Ok(())
}

fn run<const CAP: usize>(
    scenario: &Scenario,
    max_ticks: u64,
    out: &std::path::Path,
) -> anyhow::Result<(u64, bool)> {
    let mut harness = scenario.build::<CAP>().map_err(anyhow::Error::from)?;
    let done = harness.run_to_idle(max_ticks);
    harness.dump_trace(out)?;
    Ok((harness.trace().len() as u64, done))
}
