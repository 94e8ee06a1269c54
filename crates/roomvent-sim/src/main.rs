//! Headless roomvent simulation harness.
//!
//! Loads a building description from JSON, wires a deterministic stub
//! chemistry solver into the scheduler, and runs a full transport/chemistry
//! coupling loop entirely in-process — no database, no network, no real
//! mechanism solver.
//!
//! Usage:
//!   cargo run -p roomvent-sim
//!   cargo run -p roomvent-sim -- path/to/building.json

use anyhow::{Context, Result};
use roomvent_core::flow_model::ZeroExchangePolicy;
use roomvent_core::room_evolver::{InitialCondition, RoomEvolver};
use roomvent_core::scheduler::{GlobalSettings, Scheduler};
use roomvent_sim::building_spec::parse_building;
use roomvent_sim::stub_evolver::{default_seed, StubEvolver};

const SAMPLE_BUILDING_JSON: &str = include_str!("../../../data/sample_building.json");

const TRANSPORT_INTERVAL_S: f64 = 60.0;
const TOTAL_DURATION_S: f64 = 3600.0;
const DECAY_RATE_PER_SECOND: f64 = 2.0e-5;

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args().nth(1);
    let json = match &path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("failed to read {p}"))?,
        None => SAMPLE_BUILDING_JSON.to_string(),
    };

    println!("=== roomvent-sim ===\n");

    let parsed = parse_building(&json).context("failed to parse building")?;

    let room_count = parsed.graph.rooms().len();
    println!(
        "building: {} room(s), {} aperture(s), {} transport path(s)",
        room_count,
        parsed.graph.apertures().len(),
        parsed.paths.len()
    );

    let evolvers: Vec<Box<dyn RoomEvolver>> = (0..room_count)
        .map(|_| {
            Box::new(StubEvolver::new(
                default_seed(),
                DECAY_RATE_PER_SECOND,
                parsed.ambient_pressure_hpa,
                TRANSPORT_INTERVAL_S,
            )) as Box<dyn RoomEvolver>
        })
        .collect();

    let settings = GlobalSettings {
        dt_chem: TRANSPORT_INTERVAL_S,
        physics_constants: parsed.physics,
    };
    let policy = ZeroExchangePolicy;

    let mut scheduler = Scheduler::new(
        &parsed.graph,
        &parsed.paths,
        &parsed.wind,
        settings,
        &policy,
        evolvers,
    )
    .context("failed to build scheduler")?;

    let initial = (0..room_count)
        .map(|_| InitialCondition::TextHandle("seed".to_string()))
        .collect();

    let log = scheduler
        .run(0.0, TOTAL_DURATION_S, TRANSPORT_INTERVAL_S, initial)
        .context("run failed")?;

    for (room_idx, result) in log.per_room.iter().enumerate() {
        println!("\nroom {room_idx}: {} archived interval(s)", result.times.len());
        if let Some(row) = result.last_row() {
            let mut species: Vec<_> = row.iter().collect();
            species.sort_by(|a, b| a.0.cmp(b.0));
            for (name, value) in species {
                println!("  {name:<10} {value:e}");
            }
        }
    }

    println!("\n=== RESULT: run completed, solved through t={TOTAL_DURATION_S}s ===");
    Ok(())
}
