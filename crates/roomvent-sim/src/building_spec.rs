//! JSON description of a building, and its conversion into
//! `roomvent_core`'s in-memory graph. This is the only place in the
//! workspace that knows about JSON — `roomvent-core` never parses
//! anything.

use std::collections::HashMap;

use roomvent_core::building::{Aperture, BuildingGraph, Composition, Endpoint, Room, Side};
use roomvent_core::flow_model::{PhysicsConstants, WindState};
use roomvent_core::time_series::{Continuity, TimeBracketedValue, TimeDependentValue};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] roomvent_core::CoreError),
}

#[derive(Debug, Deserialize)]
pub struct BuildingSpec {
    pub building_orientation_radians: f64,
    pub ambient_pressure_hpa: f64,
    pub physics: PhysicsSpec,
    pub wind: WindSpec,
    pub rooms: Vec<RoomSpec>,
    pub apertures: Vec<ApertureSpec>,
}

#[derive(Debug, Deserialize)]
pub struct PhysicsSpec {
    pub air_density: f64,
    pub upwind_pressure_coefficient: f64,
    pub downwind_pressure_coefficient: f64,
}

#[derive(Debug, Deserialize)]
pub struct WindSpec {
    pub speed: Vec<(f64, f64)>,
    pub direction: Vec<(f64, f64)>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CompositionSpec {
    #[serde(default)]
    pub soft: f64,
    #[serde(default)]
    pub paint: f64,
    #[serde(default)]
    pub wood: f64,
    #[serde(default)]
    pub metal: f64,
    #[serde(default)]
    pub concrete: f64,
    #[serde(default)]
    pub paper: f64,
    #[serde(default)]
    pub lino: f64,
    #[serde(default)]
    pub plastic: f64,
    #[serde(default)]
    pub glass: f64,
    #[serde(default)]
    pub human: f64,
    /// Absent when the document relies on spec.md §6's "missing `other` is
    /// computed so the composition sums to 100" rule.
    #[serde(default)]
    pub other: Option<f64>,
}

impl CompositionSpec {
    fn named_sum(&self) -> f64 {
        self.soft
            + self.paint
            + self.wood
            + self.metal
            + self.concrete
            + self.paper
            + self.lino
            + self.plastic
            + self.glass
            + self.human
    }
}

#[derive(Debug, Deserialize)]
pub struct RoomSpec {
    pub volume_in_m3: f64,
    pub surf_area_in_m2: f64,
    pub composition: CompositionSpec,
    pub light_type: String,
    pub glass_type: String,
    pub temp_in_kelvin: Vec<(f64, f64)>,
    pub rh_in_percent: Vec<(f64, f64)>,
    pub airchange_in_per_second: Vec<(f64, f64)>,
    pub light_switch: Vec<(f64, bool)>,
    pub n_adults: Vec<(f64, u32)>,
    pub n_children: Vec<(f64, u32)>,
    #[serde(default)]
    pub emissions: HashMap<String, Vec<(f64, f64, f64)>>,
}

#[derive(Debug, Deserialize)]
pub enum EndpointSpec {
    Room(usize),
    Outside(SideSpec),
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub enum SideSpec {
    Front,
    Back,
    Left,
    Right,
    Upward,
    Downward,
    Unknown,
}

impl From<SideSpec> for Side {
    fn from(s: SideSpec) -> Self {
        match s {
            SideSpec::Front => Side::Front,
            SideSpec::Back => Side::Back,
            SideSpec::Left => Side::Left,
            SideSpec::Right => Side::Right,
            SideSpec::Upward => Side::Upward,
            SideSpec::Downward => Side::Downward,
            SideSpec::Unknown => Side::Unknown,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApertureSpec {
    pub origin: usize,
    pub destination: EndpointSpec,
    pub area: f64,
    pub side_of_room_1: SideSpec,
}

/// Everything a run needs besides the `RoomEvolver`s: the building graph,
/// its enumerated transport paths, the wind series, and the shared
/// physics constants.
pub struct ParsedBuilding {
    pub graph: BuildingGraph,
    pub paths: Vec<roomvent_core::paths::TransportPath>,
    pub wind: WindState,
    pub physics: PhysicsConstants,
    pub ambient_pressure_hpa: f64,
}

pub fn parse_building(json: &str) -> Result<ParsedBuilding, SpecError> {
    let spec: BuildingSpec = serde_json::from_str(json)?;

    let rooms = spec
        .rooms
        .into_iter()
        .map(room_from_spec)
        .collect::<Result<Vec<_>, SpecError>>()?;

    let apertures = spec
        .apertures
        .into_iter()
        .map(|a| Aperture {
            origin: a.origin,
            destination: match a.destination {
                EndpointSpec::Room(r) => Endpoint::Room(r),
                EndpointSpec::Outside(s) => Endpoint::Outside(s.into()),
            },
            area: a.area,
            side_of_room_1: a.side_of_room_1.into(),
        })
        .collect();

    let graph = BuildingGraph::new(rooms, apertures)?;
    let paths = roomvent_core::paths::enumerate_transport_paths(&graph);

    let wind = WindState {
        speed: TimeDependentValue::new(spec.wind.speed, Continuity::Linear)?,
        direction: TimeDependentValue::new(spec.wind.direction, Continuity::Linear)?,
        building_orientation: spec.building_orientation_radians,
    };

    let physics = PhysicsConstants {
        air_density: spec.physics.air_density,
        upwind_pressure_coefficient: spec.physics.upwind_pressure_coefficient,
        downwind_pressure_coefficient: spec.physics.downwind_pressure_coefficient,
    }
    .validate()?;

    Ok(ParsedBuilding {
        graph,
        paths,
        wind,
        physics,
        ambient_pressure_hpa: spec.ambient_pressure_hpa,
    })
}

fn room_from_spec(spec: RoomSpec) -> Result<Room, SpecError> {
    let emissions = spec
        .emissions
        .into_iter()
        .map(|(name, intervals)| Ok((name, TimeBracketedValue::new(intervals)?)))
        .collect::<Result<HashMap<_, _>, SpecError>>()?;

    Ok(Room {
        volume_in_m3: spec.volume_in_m3,
        surf_area_in_m2: spec.surf_area_in_m2,
        composition: Composition {
            soft: spec.composition.soft,
            paint: spec.composition.paint,
            wood: spec.composition.wood,
            metal: spec.composition.metal,
            concrete: spec.composition.concrete,
            paper: spec.composition.paper,
            lino: spec.composition.lino,
            plastic: spec.composition.plastic,
            glass: spec.composition.glass,
            human: spec.composition.human,
            other: spec
                .composition
                .other
                .unwrap_or_else(|| 100.0 - spec.composition.named_sum()),
        },
        light_type: spec.light_type,
        glass_type: spec.glass_type,
        temp_in_kelvin: TimeDependentValue::new(spec.temp_in_kelvin, Continuity::Linear)?,
        rh_in_percent: TimeDependentValue::new(spec.rh_in_percent, Continuity::Linear)?,
        airchange_in_per_second: TimeDependentValue::new(spec.airchange_in_per_second, Continuity::Step)?,
        light_switch: TimeDependentValue::new(spec.light_switch, Continuity::Step)?,
        n_adults: TimeDependentValue::new(spec.n_adults, Continuity::Step)?,
        n_children: TimeDependentValue::new(spec.n_children, Continuity::Step)?,
        emissions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    {
        "building_orientation_radians": 0.0,
        "ambient_pressure_hpa": 1013.25,
        "physics": { "air_density": 1.2, "upwind_pressure_coefficient": 0.6, "downwind_pressure_coefficient": -0.3 },
        "wind": { "speed": [[0.0, 1.0], [3600.0, 1.0]], "direction": [[0.0, 0.0], [3600.0, 0.0]] },
        "rooms": [
            {
                "volume_in_m3": 30.0,
                "surf_area_in_m2": 70.0,
                "composition": { "concrete": 100.0 },
                "light_type": "LED",
                "glass_type": "double",
                "temp_in_kelvin": [[0.0, 293.0], [3600.0, 293.0]],
                "rh_in_percent": [[0.0, 45.0], [3600.0, 45.0]],
                "airchange_in_per_second": [[0.0, 0.0005], [3600.0, 0.0005]],
                "light_switch": [[0.0, true], [3600.0, false]],
                "n_adults": [[0.0, 1], [3600.0, 1]],
                "n_children": [[0.0, 0], [3600.0, 0]],
                "emissions": { "LIMONENE": [[0.0, 1800.0, 2.5e-9]] }
            }
        ],
        "apertures": [
            { "origin": 0, "destination": { "Outside": "Front" }, "area": 1.0, "side_of_room_1": "Front" },
            { "origin": 0, "destination": { "Outside": "Back" }, "area": 1.0, "side_of_room_1": "Back" }
        ]
    }
    "#;

    #[test]
    fn parses_single_room_building() {
        let parsed = parse_building(SAMPLE).unwrap();
        assert_eq!(parsed.graph.rooms().len(), 1);
        assert_eq!(parsed.graph.apertures().len(), 2);
        assert_eq!(parsed.paths.len(), 1);
    }

    #[test]
    fn missing_other_is_backfilled_to_sum_to_100() {
        let json = SAMPLE.replace(
            r#""composition": { "concrete": 100.0 },"#,
            r#""composition": { "concrete": 40.0, "paint": 35.0, "wood": 15.0 },"#,
        );
        let parsed = parse_building(&json).unwrap();
        assert_eq!(parsed.graph.rooms()[0].composition.other, 10.0);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse_building("{ not json").unwrap_err();
        assert!(matches!(err, SpecError::Json(_)));
    }
}
