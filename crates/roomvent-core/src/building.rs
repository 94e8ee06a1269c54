//! Rooms, apertures, and the building graph (C2).
//!
//! Rooms and apertures live in fixed-order arrays; a room's identity is its
//! index into [`BuildingGraph::rooms`], an aperture's identity is its index
//! into [`BuildingGraph::apertures`]. There are no reference cycles: a
//! [`crate::paths::TransportPath`] holds only `(usize, bool)` pairs back
//! into these arrays.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::time_series::{TimeBracketedValue, TimeDependentValue};

/// One of the building's outside faces, or a room-internal wall with no
/// defined orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Unknown,
    Front,
    Back,
    Left,
    Right,
    Upward,
    Downward,
}

impl Side {
    /// The four sides that are valid transport-path endpoints.
    pub const CARDINAL: [Side; 4] = [Side::Front, Side::Back, Side::Left, Side::Right];

    pub fn is_cardinal(self) -> bool {
        matches!(self, Side::Front | Side::Back | Side::Left | Side::Right)
    }
}

/// Non-negative surface-material composition percentages; must sum to 100
/// within tolerance.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Composition {
    pub soft: f64,
    pub paint: f64,
    pub wood: f64,
    pub metal: f64,
    pub concrete: f64,
    pub paper: f64,
    pub lino: f64,
    pub plastic: f64,
    pub glass: f64,
    pub human: f64,
    pub other: f64,
}

impl Composition {
    fn sum(&self) -> f64 {
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
            + self.other
    }

    fn fields(&self) -> [f64; 11] {
        [
            self.soft,
            self.paint,
            self.wood,
            self.metal,
            self.concrete,
            self.paper,
            self.lino,
            self.plastic,
            self.glass,
            self.human,
            self.other,
        ]
    }

    fn validate(&self, room: usize) -> CoreResult<()> {
        let sum = self.sum();
        if (sum - 100.0).abs() > 1e-12 {
            return Err(CoreError::CompositionSum { room, sum });
        }
        if self.fields().iter().any(|&p| !(0.0..=100.0).contains(&p)) {
            return Err(CoreError::CompositionSum { room, sum });
        }
        Ok(())
    }
}

/// A single well-mixed room: fixed geometry/composition plus the
/// time-indexed ambient series the chemistry solver reads at each step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub volume_in_m3: f64,
    pub surf_area_in_m2: f64,
    pub composition: Composition,
    pub light_type: String,
    pub glass_type: String,
    pub temp_in_kelvin: TimeDependentValue<f64>,
    pub rh_in_percent: TimeDependentValue<f64>,
    pub airchange_in_per_second: TimeDependentValue<f64>,
    pub light_switch: TimeDependentValue<bool>,
    pub n_adults: TimeDependentValue<u32>,
    pub n_children: TimeDependentValue<u32>,
    pub emissions: HashMap<String, TimeBracketedValue>,
}

impl Room {
    /// Light-on intervals within `[t0, t_end)`, derived from the
    /// left-continuous `light_switch` step series: each maximal run of
    /// `true` samples becomes one `(start, end)` pair, clipped to the
    /// window. Mirrors the original `interpret_light_on_times` behavior.
    pub fn light_intervals(&self, t0: f64, t_end: f64) -> Vec<(f64, f64)> {
        let times = self.light_switch.times();
        let values = self.light_switch.values();
        let mut out = Vec::new();
        for i in 0..times.len() {
            if !values[i] {
                continue;
            }
            let start = times[i];
            let end = if i + 1 < times.len() {
                times[i + 1]
            } else {
                times[i] + 3600.0
            };
            let clipped_start = start.max(t0);
            let clipped_end = end.min(t_end);
            if clipped_start < clipped_end {
                out.push((clipped_start, clipped_end));
            }
        }
        out
    }
}

/// The endpoint of an [`Aperture`]: another room, or an outside side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endpoint {
    Room(usize),
    Outside(Side),
}

/// A directed opening: `origin` is always a room index; `destination` is
/// either another room or an outside side. Each physical opening is
/// represented exactly once — an interior door between rooms A and B is
/// either `(A, Room(B))` or `(B, Room(A))`, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aperture {
    pub origin: usize,
    pub destination: Endpoint,
    pub area: f64,
    pub side_of_room_1: Side,
}

/// Immutable owner of all [`Room`]s and [`Aperture`]s for a run.
#[derive(Debug, Clone)]
pub struct BuildingGraph {
    rooms: Vec<Room>,
    apertures: Vec<Aperture>,
    incident: Vec<Vec<usize>>,
}

impl BuildingGraph {
    /// Validate and take ownership of rooms and apertures.
    pub fn new(rooms: Vec<Room>, apertures: Vec<Aperture>) -> CoreResult<Self> {
        for (i, room) in rooms.iter().enumerate() {
            room.composition.validate(i)?;
        }
        for (i, ap) in apertures.iter().enumerate() {
            if ap.origin >= rooms.len() {
                return Err(CoreError::BadAperture { aperture: i });
            }
            if let Endpoint::Room(dest) = ap.destination {
                if dest >= rooms.len() {
                    return Err(CoreError::BadAperture { aperture: i });
                }
            }
        }

        let mut incident = vec![Vec::new(); rooms.len()];
        for (i, ap) in apertures.iter().enumerate() {
            incident[ap.origin].push(i);
            if let Endpoint::Room(dest) = ap.destination {
                incident[dest].push(i);
            }
        }

        Ok(Self {
            rooms,
            apertures,
            incident,
        })
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn apertures(&self) -> &[Aperture] {
        &self.apertures
    }

    /// Indices of every aperture incident to `room` (as origin or
    /// destination).
    pub fn apertures_incident_to(&self, room: usize) -> &[usize] {
        &self.incident[room]
    }

    /// Whether `room` has any aperture opening directly to the outside.
    pub fn room_has_outdoor_aperture(&self, room: usize) -> bool {
        self.apertures_incident_to(room).iter().any(|&i| {
            let ap = &self.apertures[i];
            ap.origin == room && matches!(ap.destination, Endpoint::Outside(_))
        })
    }
}
