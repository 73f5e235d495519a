#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a skirmish scenario headlessly.

mod logging;
mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use scenario::Scenario;
use skirmish_core::Event;
use skirmish_system_unit_update::{service_path_requests, UnitUpdate};
use skirmish_world::{apply, query, DirectPathfinder, World};

/// Command-line arguments accepted by the runner.
#[derive(Debug, Parser)]
#[command(name = "skirmish", about = "Runs a skirmish scenario without a renderer")]
struct Cli {
    /// Path of the RON scenario to simulate.
    scenario: PathBuf,
    /// Overrides the number of ticks stored in the scenario.
    #[arg(long)]
    ticks: Option<u64>,
    /// Logs state transitions of every unit.
    #[arg(short, long)]
    verbose: bool,
}

/// Entry point for the skirmish command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let scenario = Scenario::load(&cli.scenario)?;
    let mut world = scenario.build_world()?;
    let mut pathfinder = DirectPathfinder::new(query::terrain(&world).clone());
    let ticks = cli.ticks.unwrap_or(scenario.ticks);

    run(&mut world, &mut pathfinder, &scenario, ticks)?;
    print_summary(&world);
    Ok(())
}

fn run(
    world: &mut World,
    pathfinder: &mut DirectPathfinder,
    scenario: &Scenario,
    ticks: u64,
) -> Result<()> {
    let mut schedule = scenario.schedule();
    let mut driver = UnitUpdate::new();
    let mut events = Vec::new();

    for tick in 0..ticks {
        for command in schedule.remove(&tick).unwrap_or_default() {
            apply(world, command.into_command(), &mut events);
        }

        driver
            .tick(world, &mut events)
            .with_context(|| format!("unit update failed on tick {tick}"))?;
        service_path_requests(world, pathfinder, &mut events);

        for event in events.drain(..) {
            log_event(&event);
        }
    }

    info!(
        "simulated {ticks} ticks, game time {}",
        query::game_time(world).get()
    );
    Ok(())
}

fn log_event(event: &Event) {
    match event {
        Event::TimeAdvanced { .. } => {}
        Event::UnitDied { unit } => info!("unit {} destroyed", unit.get()),
        Event::PauseChanged { paused } => info!("paused: {paused}"),
        other => debug!("{other:?}"),
    }
}

fn print_summary(world: &World) {
    for unit in query::unit_view(world).iter() {
        println!(
            "unit {:>3} player {} at ({:>7.1}, {:>7.1}) hp {:>4} orders {} {}",
            unit.id.get(),
            unit.owner.get(),
            unit.position.x,
            unit.position.z,
            unit.hit_points,
            unit.queued_orders,
            if unit.moving { "moving" } else { "idle" },
        );
    }
}
