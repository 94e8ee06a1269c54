//! Operator-splitting scheduler (C8): alternates parallel per-room
//! chemistry with a sequential transport reconciliation pass, keeping
//! every room's `solved_time` in lockstep.

use serde::{Deserialize, Serialize};

use crate::building::BuildingGraph;
use crate::error::{CoreError, CoreResult};
use crate::flow_matrix::assemble_flow_matrix;
use crate::flow_model::{ExchangeFlowPolicy, PhysicsConstants, WindState};
use crate::paths::TransportPath;
use crate::room_evolver::{ChemistryResult, InitialCondition, RoomEvolver};
use crate::transport::reconcile_transport_step;

/// The non-wind, non-geometric knobs a run needs: the chemistry solver's
/// own integration step, and the physics constants every aperture shares.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GlobalSettings {
    pub dt_chem: f64,
    pub physics_constants: PhysicsConstants,
}

/// Per-room accumulated chemistry output for an entire run, one archive
/// per room in building-graph order — the map spec.md §6 calls the
/// "Persisted state layout", handed to whatever driver pickles or otherwise
/// persists it outside the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunLog {
    pub per_room: Vec<ChemistryResult>,
}

impl RunLog {
    fn new(room_count: usize) -> Self {
        Self {
            per_room: (0..room_count)
                .map(|_| ChemistryResult {
                    times: Vec::new(),
                    rows: Vec::new(),
                })
                .collect(),
        }
    }

    fn extend(&mut self, room: usize, mut result: ChemistryResult) {
        let log = &mut self.per_room[room];
        log.times.append(&mut result.times);
        log.rows.append(&mut result.rows);
    }
}

/// Drives one full simulation run: Phase A (parallel chemistry, one task
/// per room) alternating with Phase B (sequential transport
/// reconciliation), per `spec.md` §5's two-phase model.
pub struct Scheduler<'a> {
    graph: &'a BuildingGraph,
    paths: &'a [TransportPath],
    wind: &'a WindState,
    settings: GlobalSettings,
    policy: &'a dyn ExchangeFlowPolicy,
    evolvers: Vec<Box<dyn RoomEvolver + 'a>>,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        graph: &'a BuildingGraph,
        paths: &'a [TransportPath],
        wind: &'a WindState,
        settings: GlobalSettings,
        policy: &'a dyn ExchangeFlowPolicy,
        evolvers: Vec<Box<dyn RoomEvolver + 'a>>,
    ) -> CoreResult<Self> {
        if evolvers.len() != graph.rooms().len() {
            return Err(CoreError::EvolverCountMismatch {
                expected: graph.rooms().len(),
                got: evolvers.len(),
            });
        }
        Ok(Self {
            graph,
            paths,
            wind,
            settings,
            policy,
            evolvers,
        })
    }

    /// Run `[t0, t0+total_duration)` in `transport_interval`-sized chemistry
    /// steps, reconciling transport at every boundary.
    pub fn run(
        &mut self,
        t0: f64,
        total_duration: f64,
        transport_interval: f64,
        initial: Vec<InitialCondition>,
    ) -> CoreResult<RunLog> {
        let room_count = self.graph.rooms().len();
        let mut log = RunLog::new(room_count);

        let mut solved_time = t0;
        let mut current_initial = initial;

        let results = self.run_chemistry_interval(solved_time, transport_interval, current_initial)?;
        solved_time = Self::check_lockstep(&results, t0 + transport_interval)?;
        for (room, result) in results.into_iter().enumerate() {
            log.extend(room, result);
        }
        current_initial = self.reconcile(solved_time, transport_interval, &log)?;

        while solved_time + transport_interval <= t0 + total_duration {
            let results =
                self.run_chemistry_interval(solved_time, transport_interval, current_initial)?;
            solved_time = Self::check_lockstep(&results, solved_time + transport_interval)?;
            for (room, result) in results.into_iter().enumerate() {
                log.extend(room, result);
            }
            current_initial = self.reconcile(solved_time, transport_interval, &log)?;
        }

        if solved_time < t0 + total_duration {
            let remaining = t0 + total_duration - solved_time;
            let results = self.run_chemistry_interval(solved_time, remaining, current_initial)?;
            let final_time = Self::check_lockstep(&results, solved_time + remaining)?;
            for (room, result) in results.into_iter().enumerate() {
                log.extend(room, result);
            }
            solved_time = final_time;
        }

        let _ = solved_time;
        Ok(log)
    }

    fn check_lockstep(results: &[ChemistryResult], expected_end: f64) -> CoreResult<f64> {
        for (room, result) in results.iter().enumerate() {
            let got = result.last_time();
            if (got - expected_end).abs() > 1e-9 {
                log::warn!(
                    "room {room}: chemistry reported last time {got}, commanded {expected_end}"
                );
                return Err(CoreError::IncompleteChemistry {
                    room,
                    expected: expected_end,
                    got,
                });
            }
        }
        Ok(expected_end)
    }

    #[cfg(feature = "parallel")]
    fn run_chemistry_interval(
        &mut self,
        t0: f64,
        duration: f64,
        initial: Vec<InitialCondition>,
    ) -> CoreResult<Vec<ChemistryResult>> {
        use rayon::prelude::*;

        let rooms = self.graph.rooms();
        let mut slots: Vec<CoreResult<ChemistryResult>> = initial
            .into_iter()
            .enumerate()
            .collect::<Vec<_>>()
            .into_par_iter()
            .zip(self.evolvers.par_iter_mut())
            .map(|((room_idx, room_initial), evolver)| {
                evolver.run(&rooms[room_idx], t0, duration, room_initial)
            })
            .collect();

        slots.drain(..).collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn run_chemistry_interval(
        &mut self,
        t0: f64,
        duration: f64,
        initial: Vec<InitialCondition>,
    ) -> CoreResult<Vec<ChemistryResult>> {
        let rooms = self.graph.rooms();
        let mut results: Vec<Option<CoreResult<ChemistryResult>>> =
            (0..self.evolvers.len()).map(|_| None).collect();

        std::thread::scope(|scope| {
            let mut handles = Vec::new();
            for ((room_idx, room_initial), evolver) in
                initial.into_iter().enumerate().zip(self.evolvers.iter_mut())
            {
                let room = &rooms[room_idx];
                handles.push((
                    room_idx,
                    scope.spawn(move || evolver.run(room, t0, duration, room_initial)),
                ));
            }
            for (room_idx, handle) in handles {
                let outcome = handle
                    .join()
                    .unwrap_or_else(|_| panic!("chemistry task for room {room_idx} panicked"));
                results[room_idx] = Some(outcome);
            }
        });

        results
            .into_iter()
            .map(|r| r.expect("every room slot filled by its own thread"))
            .collect()
    }

    /// Reconcile transport across `transport_interval` seconds (the
    /// reconciliation interval τ, not the chemistry solver's own `dt_chem`
    /// sub-step) — `Q = f * Δt` in spec.md §4.7 is over τ.
    fn reconcile(
        &self,
        solved_time: f64,
        transport_interval: f64,
        log: &RunLog,
    ) -> CoreResult<Vec<InitialCondition>> {
        let wind = self.wind.at(solved_time)?;
        let matrix = assemble_flow_matrix(
            self.graph,
            self.paths,
            &wind,
            self.settings.physics_constants,
            self.policy,
        )?;

        let mut rooms: Vec<_> = log
            .per_room
            .iter()
            .map(|result| {
                result
                    .last_row()
                    .cloned()
                    .expect("just-extended log always has at least one row")
            })
            .collect();
        let volumes: Vec<f64> = self.graph.rooms().iter().map(|r| r.volume_in_m3).collect();

        reconcile_transport_step(&mut rooms, &volumes, &matrix, transport_interval);

        Ok(rooms.into_iter().map(InitialCondition::Snapshot).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::{Aperture, Composition, Endpoint, Room, Side};
    use crate::flow_matrix::FlowMatrix;
    use crate::flow_model::ZeroExchangePolicy;
    use crate::paths::enumerate_transport_paths;
    use crate::time_series::{Continuity, TimeDependentValue};
    use std::collections::HashMap;

    fn flat(v: f64) -> TimeDependentValue<f64> {
        TimeDependentValue::new(vec![(0.0, v), (1e6, v)], Continuity::Step).unwrap()
    }
    fn flat_bool(v: bool) -> TimeDependentValue<bool> {
        TimeDependentValue::new(vec![(0.0, v), (1e6, v)], Continuity::Step).unwrap()
    }
    fn flat_u32(v: u32) -> TimeDependentValue<u32> {
        TimeDependentValue::new(vec![(0.0, v), (1e6, v)], Continuity::Step).unwrap()
    }

    fn room() -> Room {
        Room {
            volume_in_m3: 10.0,
            surf_area_in_m2: 40.0,
            composition: Composition {
                concrete: 100.0,
                ..Default::default()
            },
            light_type: "LED".into(),
            glass_type: "double".into(),
            temp_in_kelvin: flat(293.0),
            rh_in_percent: flat(50.0),
            airchange_in_per_second: flat(0.0005),
            light_switch: flat_bool(false),
            n_adults: flat_u32(1),
            n_children: flat_u32(0),
            emissions: HashMap::new(),
        }
    }

    /// A stub evolver that advances the clock without changing
    /// concentrations, used to exercise the scheduler's lockstep bookkeeping
    /// without a real chemistry mechanism.
    struct StaticEvolver;

    impl RoomEvolver for StaticEvolver {
        fn run(
            &mut self,
            _room: &Room,
            t0: f64,
            duration: f64,
            initial: InitialCondition,
        ) -> CoreResult<ChemistryResult> {
            let snapshot = match initial {
                InitialCondition::TextHandle(_) => {
                    let mut c = crate::transport::Concentrations::new();
                    c.insert("O3".to_string(), 10.0);
                    c
                }
                InitialCondition::Snapshot(c) => c,
            };
            Ok(ChemistryResult {
                times: vec![t0 + duration],
                rows: vec![snapshot],
            })
        }
    }

    #[test]
    fn scheduler_rejects_evolver_count_mismatch() {
        let rooms = vec![room(), room()];
        let graph = BuildingGraph::new(rooms, vec![]).unwrap();
        let paths = enumerate_transport_paths(&graph);
        let wind = WindState {
            speed: flat(0.0),
            direction: flat(0.0),
            building_orientation: 0.0,
        };
        let settings = GlobalSettings {
            dt_chem: 60.0,
            physics_constants: PhysicsConstants {
                air_density: 1.2,
                upwind_pressure_coefficient: 0.6,
                downwind_pressure_coefficient: -0.3,
            },
        };
        let policy = ZeroExchangePolicy;
        let evolvers: Vec<Box<dyn RoomEvolver>> = vec![Box::new(StaticEvolver)];
        let err = Scheduler::new(&graph, &paths, &wind, settings, &policy, evolvers).unwrap_err();
        assert!(matches!(err, CoreError::EvolverCountMismatch { .. }));
    }

    #[test]
    fn single_room_run_advances_solved_time_and_logs_every_interval() {
        let rooms = vec![room()];
        let apertures = vec![
            Aperture {
                origin: 0,
                destination: Endpoint::Outside(Side::Front),
                area: 1.0,
                side_of_room_1: Side::Front,
            },
            Aperture {
                origin: 0,
                destination: Endpoint::Outside(Side::Back),
                area: 1.0,
                side_of_room_1: Side::Back,
            },
        ];
        let graph = BuildingGraph::new(rooms, apertures).unwrap();
        let paths = enumerate_transport_paths(&graph);
        let wind = WindState {
            speed: flat(0.0),
            direction: flat(0.0),
            building_orientation: 0.0,
        };
        let settings = GlobalSettings {
            dt_chem: 60.0,
            physics_constants: PhysicsConstants {
                air_density: 1.2,
                upwind_pressure_coefficient: 0.6,
                downwind_pressure_coefficient: -0.3,
            },
        };
        let policy = ZeroExchangePolicy;
        let evolvers: Vec<Box<dyn RoomEvolver>> = vec![Box::new(StaticEvolver)];
        let mut scheduler = Scheduler::new(&graph, &paths, &wind, settings, &policy, evolvers).unwrap();

        let initial = vec![InitialCondition::TextHandle("restart.pickle".to_string())];
        let log = scheduler.run(0.0, 180.0, 60.0, initial).unwrap();

        assert_eq!(log.per_room.len(), 1);
        assert_eq!(log.per_room[0].times, vec![60.0, 120.0, 180.0]);
    }

    #[test]
    fn short_final_stub_is_archived() {
        let rooms = vec![room()];
        let graph = BuildingGraph::new(rooms, vec![]).unwrap();
        let paths = enumerate_transport_paths(&graph);
        let wind = WindState {
            speed: flat(0.0),
            direction: flat(0.0),
            building_orientation: 0.0,
        };
        let settings = GlobalSettings {
            dt_chem: 60.0,
            physics_constants: PhysicsConstants {
                air_density: 1.2,
                upwind_pressure_coefficient: 0.6,
                downwind_pressure_coefficient: -0.3,
            },
        };
        let policy = ZeroExchangePolicy;
        let evolvers: Vec<Box<dyn RoomEvolver>> = vec![Box::new(StaticEvolver)];
        let mut scheduler = Scheduler::new(&graph, &paths, &wind, settings, &policy, evolvers).unwrap();

        let initial = vec![InitialCondition::TextHandle("restart.pickle".to_string())];
        let log = scheduler.run(0.0, 150.0, 60.0, initial).unwrap();

        assert_eq!(log.per_room[0].times, vec![60.0, 120.0, 150.0]);
    }

    /// Transport must integrate flow over the transport interval tau, not
    /// the chemistry solver's own `dt_chem` sub-step — regression test for
    /// a case where tau != dt_chem and the flow is nonzero, so a `delta_time`
    /// mix-up actually changes the result.
    #[test]
    fn reconcile_uses_transport_interval_not_dt_chem() {
        let rooms = vec![room()];
        let apertures = vec![
            Aperture {
                origin: 0,
                destination: Endpoint::Outside(Side::Front),
                area: 10.0,
                side_of_room_1: Side::Front,
            },
            Aperture {
                origin: 0,
                destination: Endpoint::Outside(Side::Back),
                area: 10.0,
                side_of_room_1: Side::Back,
            },
        ];
        let graph = BuildingGraph::new(rooms, apertures).unwrap();
        let paths = enumerate_transport_paths(&graph);
        let wind = WindState {
            speed: flat(1.0),
            direction: flat(0.0),
            building_orientation: std::f64::consts::PI,
        };
        let dt_chem = 30.0;
        let tau = 60.0;
        let settings = GlobalSettings {
            dt_chem,
            physics_constants: PhysicsConstants {
                air_density: 1.2,
                upwind_pressure_coefficient: 0.6,
                downwind_pressure_coefficient: -0.3,
            },
        };
        let policy = ZeroExchangePolicy;
        let evolvers: Vec<Box<dyn RoomEvolver>> = vec![Box::new(StaticEvolver)];
        let mut scheduler = Scheduler::new(&graph, &paths, &wind, settings, &policy, evolvers).unwrap();

        let wind_at_tau = wind.at(tau).unwrap();
        let matrix = assemble_flow_matrix(
            &graph,
            &paths,
            &wind_at_tau,
            settings.physics_constants,
            &policy,
        )
        .unwrap();
        let flow_in = matrix.get(FlowMatrix::OUTSIDE, FlowMatrix::room_index(0));
        assert!(flow_in > 0.0, "test needs a nonzero advective flow");

        let mut seed = crate::transport::Concentrations::new();
        seed.insert("O3".to_string(), 10.0);
        let mut expected_rooms = vec![seed.clone()];
        reconcile_transport_step(&mut expected_rooms, &[10.0], &matrix, tau);

        // StaticEvolver echoes its `initial` back unchanged, so the row
        // archived for the *second* interval is exactly the post-reconcile
        // state produced after the first interval.
        let initial = vec![InitialCondition::TextHandle("seed".to_string())];
        let log = scheduler.run(0.0, 2.0 * tau, tau, initial).unwrap();
        let got = &log.per_room[0].rows[1];

        assert!(
            (got["O3"] - expected_rooms[0]["O3"]).abs() < 1e-9,
            "got {}, expected {} (flow integrated over tau={tau}, not dt_chem={dt_chem})",
            got["O3"],
            expected_rooms[0]["O3"],
        );
    }
}
