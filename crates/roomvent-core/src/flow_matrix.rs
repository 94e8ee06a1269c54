//! Dense flow matrix assembly (C5): every aperture's signed [`Fluxes`]
//! folded into one `(N+1) x (N+1)` volumetric-flow matrix, outside at
//! index 0 and rooms at `1..=N`.

use serde::{Deserialize, Serialize};

use crate::building::{BuildingGraph, Endpoint};
use crate::error::CoreResult;
use crate::flow_model::{ApertureCalculation, ExchangeFlowPolicy, Fluxes, PhysicsConstants, Wind};
use crate::paths::TransportPath;

/// Row-major `(N+1) x (N+1)` matrix of volumetric flow rates (m^3/s),
/// `matrix[from][to]`, outside at index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowMatrix {
    n: usize,
    cells: Vec<f64>,
}

impl FlowMatrix {
    fn zeros(room_count: usize) -> Self {
        let n = room_count + 1;
        Self {
            n,
            cells: vec![0.0; n * n],
        }
    }

    /// Index of a room in the matrix; outside is always `0`.
    pub fn room_index(room: usize) -> usize {
        room + 1
    }

    pub const OUTSIDE: usize = 0;

    pub fn dimension(&self) -> usize {
        self.n
    }

    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.cells[from * self.n + to]
    }

    fn add(&mut self, from: usize, to: usize, amount: f64) {
        self.cells[from * self.n + to] += amount;
    }
}

fn endpoint_index(endpoint: Endpoint) -> usize {
    match endpoint {
        Endpoint::Room(r) => FlowMatrix::room_index(r),
        Endpoint::Outside(_) => FlowMatrix::OUTSIDE,
    }
}

/// Assemble the flow matrix for one instant, folding every aperture's
/// [`Fluxes`] into the `(origin, destination)` / `(destination, origin)`
/// cells.
pub fn assemble_flow_matrix(
    graph: &BuildingGraph,
    all_paths: &[TransportPath],
    wind: &Wind,
    constants: PhysicsConstants,
    policy: &dyn ExchangeFlowPolicy,
) -> CoreResult<FlowMatrix> {
    let mut matrix = FlowMatrix::zeros(graph.rooms().len());

    for (i, aperture) in graph.apertures().iter().enumerate() {
        let calc = ApertureCalculation::build(i, graph, all_paths, constants)?;
        let Fluxes {
            from_origin_to_destination,
            from_destination_to_origin,
        } = calc.fluxes_at(graph, all_paths, wind, policy)?;

        let origin_idx = FlowMatrix::room_index(aperture.origin);
        let dest_idx = endpoint_index(aperture.destination);

        matrix.add(origin_idx, dest_idx, from_origin_to_destination);
        matrix.add(dest_idx, origin_idx, from_destination_to_origin);
    }

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::{Aperture, Composition, Room, Side};
    use crate::flow_model::ZeroExchangePolicy;
    use crate::paths::enumerate_transport_paths;
    use crate::time_series::{Continuity, TimeDependentValue};
    use std::collections::HashMap;

    fn flat(v: f64) -> TimeDependentValue<f64> {
        TimeDependentValue::new(vec![(0.0, v), (100.0, v)], Continuity::Step).unwrap()
    }
    fn flat_bool(v: bool) -> TimeDependentValue<bool> {
        TimeDependentValue::new(vec![(0.0, v), (100.0, v)], Continuity::Step).unwrap()
    }
    fn flat_u32(v: u32) -> TimeDependentValue<u32> {
        TimeDependentValue::new(vec![(0.0, v), (100.0, v)], Continuity::Step).unwrap()
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

    fn constants() -> PhysicsConstants {
        PhysicsConstants {
            air_density: 1.2,
            upwind_pressure_coefficient: 0.6,
            downwind_pressure_coefficient: -0.3,
        }
    }

    #[test]
    fn single_room_front_back_wind_produces_opposite_matrix_entries() {
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
        let wind = Wind {
            speed: 3.0,
            direction: 0.0,
            building_orientation: 0.0,
        };
        let policy = ZeroExchangePolicy;
        let matrix = assemble_flow_matrix(&graph, &paths, &wind, constants(), &policy).unwrap();

        let room_idx = FlowMatrix::room_index(0);
        assert_eq!(matrix.dimension(), 2);
        let out_to_room = matrix.get(FlowMatrix::OUTSIDE, room_idx);
        let room_to_out = matrix.get(room_idx, FlowMatrix::OUTSIDE);
        assert!(out_to_room > 0.0 || room_to_out > 0.0);
        assert!((out_to_room * room_to_out).abs() < 1e-9);
    }

    #[test]
    fn zero_wind_with_zero_policy_gives_empty_matrix() {
        let rooms = vec![room()];
        let apertures = vec![Aperture {
            origin: 0,
            destination: Endpoint::Outside(Side::Front),
            area: 1.0,
            side_of_room_1: Side::Front,
        }];
        let graph = BuildingGraph::new(rooms, apertures).unwrap();
        let paths = enumerate_transport_paths(&graph);
        let wind = Wind {
            speed: 0.0,
            direction: 0.0,
            building_orientation: 0.0,
        };
        let policy = ZeroExchangePolicy;
        let matrix = assemble_flow_matrix(&graph, &paths, &wind, constants(), &policy).unwrap();
        assert!(matrix.cells.iter().all(|&v| v == 0.0));
    }
}
