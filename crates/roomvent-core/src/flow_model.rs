//! Wind-driven aperture flow model (C4): per-aperture signed advective
//! flow, or a symmetric exchange-category flow when wind gives nothing.

use serde::{Deserialize, Serialize};

use crate::building::{BuildingGraph, Endpoint, Side};
use crate::error::{CoreError, CoreResult};
use crate::paths::TransportPath;
use crate::time_series::TimeDependentValue;

/// Wind speed/direction at a point in time, plus the building's fixed
/// compass orientation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Wind {
    /// m/s, >= 0.
    pub speed: f64,
    /// Radians, normalized.
    pub direction: f64,
    /// Compass angle of the building's Front side, radians.
    pub building_orientation: f64,
}

/// Read-only time-indexed wind speed and direction, queried at each
/// reconciliation boundary; `building_orientation` is fixed for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindState {
    pub speed: TimeDependentValue<f64>,
    pub direction: TimeDependentValue<f64>,
    pub building_orientation: f64,
}

impl WindState {
    pub fn at(&self, t: f64) -> CoreResult<Wind> {
        Ok(Wind {
            speed: self.speed.value_at(t)?,
            direction: self.direction.value_at(t)?,
            building_orientation: self.building_orientation,
        })
    }
}

/// Physical constants shared by every aperture's flow calculation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhysicsConstants {
    pub air_density: f64,
    pub upwind_pressure_coefficient: f64,
    pub downwind_pressure_coefficient: f64,
}

impl PhysicsConstants {
    pub fn validate(self) -> CoreResult<Self> {
        if self.downwind_pressure_coefficient > self.upwind_pressure_coefficient {
            return Err(CoreError::GraphConfig {
                upwind: self.upwind_pressure_coefficient,
                downwind: self.downwind_pressure_coefficient,
            });
        }
        Ok(self)
    }
}

const ZERO_ADVECTION_TOLERANCE: f64 = 1.0e-5;

/// Angular offset of `(start, end)` relative to the building's front axis.
/// Only the four cardinal sides are defined; any other pair is a
/// [`CoreError::PathTableMiss`].
fn angular_offset(start: Side, end: Side) -> CoreResult<f64> {
    use std::f64::consts::PI;
    let offset = match (start, end) {
        (Side::Front, Side::Back) => PI,
        (Side::Front, Side::Left) => -3.0 * PI / 4.0,
        (Side::Front, Side::Right) => 3.0 * PI / 4.0,

        (Side::Back, Side::Front) => 0.0,
        (Side::Back, Side::Left) => -PI / 4.0,
        (Side::Back, Side::Right) => PI / 4.0,

        (Side::Left, Side::Front) => PI / 4.0,
        (Side::Left, Side::Back) => 3.0 * PI / 4.0,
        (Side::Left, Side::Right) => PI / 2.0,

        (Side::Right, Side::Front) => -PI / 4.0,
        (Side::Right, Side::Back) => -3.0 * PI / 4.0,
        (Side::Right, Side::Left) => -PI / 2.0,

        _ => {
            return Err(CoreError::PathTableMiss {
                from: format!("{start:?}"),
                to: format!("{end:?}"),
            })
        }
    };
    Ok(offset)
}

/// Signed component of `wind` along `path`'s geometric orientation.
pub fn path_wind_speed(path: &TransportPath, wind: &Wind) -> CoreResult<f64> {
    let offset = angular_offset(path.start, path.end)?;
    let path_angle = wind.building_orientation + offset;
    Ok(wind.speed * (wind.direction - path_angle).cos())
}

/// `0.7 / (1 + position)`, the discharge coefficient used in the orifice
/// relation below.
fn discharge_coefficient(position: f64) -> f64 {
    0.7 / (1.0 + position)
}

/// Orifice-flow relation: `C_d * A * sqrt(2/rho) * dP^0.5`, with
/// `dP = 0.5*rho*w^2*(Cp_up - Cp_down)`.
fn flow_advection(io_windspeed: f64, area: f64, discharge_coeff: f64, constants: &PhysicsConstants) -> f64 {
    let w2 = io_windspeed * io_windspeed;
    let p_up = 0.5 * constants.air_density * w2 * constants.upwind_pressure_coefficient;
    let p_down = 0.5 * constants.air_density * w2 * constants.downwind_pressure_coefficient;
    let delta_p = (p_up - p_down).max(0.0);
    discharge_coeff * area * (2.0 / constants.air_density).sqrt() * delta_p.sqrt()
}

/// Volumetric flow in both directions through one aperture at one instant.
/// Either advection-only (exactly one slot nonzero) or exchange-only (both
/// slots equal) — never both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fluxes {
    pub from_origin_to_destination: f64,
    pub from_destination_to_origin: f64,
}

/// The neighbourhood category used to pick an exchange flow when no path
/// gives nonzero advection through the aperture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeCategory {
    /// Either endpoint room is cross-ventilated.
    CrossVentilatedNeighbour = 1,
    /// The aperture itself opens to outside.
    OpensToOutside = 2,
    /// Neither of the above, but an endpoint room has some outside opening.
    CoastalNeighbour = 3,
    /// Landlocked on both sides.
    Landlocked = 4,
}

/// Supplies the symmetric exchange flow for a category; the default policy
/// returns zero for every category (open question, see `spec.md` §9 — the
/// buoyancy/stack closure is left to a future policy module).
pub trait ExchangeFlowPolicy {
    fn exchange_flow(&self, category: ExchangeCategory) -> f64;
}

/// The default exchange policy: always zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroExchangePolicy;

impl ExchangeFlowPolicy for ZeroExchangePolicy {
    fn exchange_flow(&self, _category: ExchangeCategory) -> f64 {
        0.0
    }
}

/// Pre-computed, cacheable per-aperture contributions: which paths the
/// aperture sits on, and at what position, built once from the building
/// graph and the enumerated paths.
pub struct ApertureCalculation<'a> {
    aperture_index: usize,
    area: f64,
    is_outdoor_aperture: bool,
    has_room_with_outdoor_aperture: bool,
    contributions: Vec<Contribution<'a>>,
    constants: PhysicsConstants,
}

struct Contribution<'a> {
    path: &'a TransportPath,
    reversed: bool,
    position_down_path: f64,
}

impl<'a> ApertureCalculation<'a> {
    pub fn build(
        aperture_index: usize,
        graph: &BuildingGraph,
        all_paths: &'a [TransportPath],
        constants: PhysicsConstants,
    ) -> CoreResult<Self> {
        let constants = constants.validate()?;
        let aperture = &graph.apertures()[aperture_index];
        let is_outdoor_aperture = matches!(aperture.destination, Endpoint::Outside(_));
        let has_room_with_outdoor_aperture = graph.room_has_outdoor_aperture(aperture.origin)
            || matches!(aperture.destination, Endpoint::Room(dest) if graph.room_has_outdoor_aperture(dest));

        let mut contributions = Vec::new();
        for path in all_paths {
            if let Some(pos) = path.position_of(aperture_index) {
                let step = path.route[pos];
                contributions.push(Contribution {
                    path,
                    reversed: step.reversed,
                    position_down_path: if path.len() > 1 {
                        pos as f64 / (path.len() - 1) as f64
                    } else {
                        0.0
                    },
                });
            }
        }

        Ok(Self {
            aperture_index,
            area: aperture.area,
            is_outdoor_aperture,
            has_room_with_outdoor_aperture,
            contributions,
            constants,
        })
    }

    fn exchange_category(
        &self,
        graph: &BuildingGraph,
        all_paths: &[TransportPath],
        wind: &Wind,
    ) -> CoreResult<ExchangeCategory> {
        let aperture = &graph.apertures()[self.aperture_index];
        let origin_cross = room_is_cross_ventilated(aperture.origin, all_paths, graph, wind)?;
        let dest_cross = match aperture.destination {
            Endpoint::Room(r) => room_is_cross_ventilated(r, all_paths, graph, wind)?,
            Endpoint::Outside(_) => false,
        };
        if origin_cross || dest_cross {
            return Ok(ExchangeCategory::CrossVentilatedNeighbour);
        }
        if self.is_outdoor_aperture {
            return Ok(ExchangeCategory::OpensToOutside);
        }
        if self.has_room_with_outdoor_aperture {
            return Ok(ExchangeCategory::CoastalNeighbour);
        }
        Ok(ExchangeCategory::Landlocked)
    }

    fn advection_flow_rate(&self, wind: &Wind) -> CoreResult<f64> {
        let mut sum = 0.0;
        for contribution in &self.contributions {
            let path_windspeed = path_wind_speed(contribution.path, wind)?;
            let position = if path_windspeed > 0.0 {
                contribution.position_down_path
            } else {
                1.0 - contribution.position_down_path
            };
            let wind_sign = if path_windspeed < 0.0 { -1.0 } else { 1.0 };
            let reversed_sign = if contribution.reversed { -1.0 } else { 1.0 };
            let sign = wind_sign * reversed_sign;

            let coeff = discharge_coefficient(position);
            let magnitude = flow_advection(path_windspeed, self.area, coeff, &self.constants);
            sum += sign * magnitude;
        }
        Ok(sum)
    }

    /// The combined advective/exchange `Fluxes` through this aperture at
    /// the given wind state, using `policy` for the exchange category.
    pub fn fluxes_at(
        &self,
        graph: &BuildingGraph,
        all_paths: &[TransportPath],
        wind: &Wind,
        policy: &dyn ExchangeFlowPolicy,
    ) -> CoreResult<Fluxes> {
        let advection = self.advection_flow_rate(wind)?;
        if advection > ZERO_ADVECTION_TOLERANCE {
            return Ok(Fluxes {
                from_origin_to_destination: advection,
                from_destination_to_origin: 0.0,
            });
        }
        if advection < -ZERO_ADVECTION_TOLERANCE {
            return Ok(Fluxes {
                from_origin_to_destination: 0.0,
                from_destination_to_origin: -advection,
            });
        }
        let category = self.exchange_category(graph, all_paths, wind)?;
        let exchange = policy.exchange_flow(category);
        Ok(Fluxes {
            from_origin_to_destination: exchange,
            from_destination_to_origin: exchange,
        })
    }
}

fn path_contains_room(path: &TransportPath, room: usize, graph: &BuildingGraph) -> bool {
    path.route.iter().any(|step| {
        let ap = &graph.apertures()[step.aperture];
        ap.origin == room || matches!(ap.destination, Endpoint::Room(r) if r == room)
    })
}

fn room_is_cross_ventilated(
    room: usize,
    all_paths: &[TransportPath],
    graph: &BuildingGraph,
    wind: &Wind,
) -> CoreResult<bool> {
    for path in all_paths {
        if path_contains_room(path, room, graph) && path_wind_speed(path, wind)?.abs() > ZERO_ADVECTION_TOLERANCE {
            return Ok(true);
        }
    }
    Ok(false)
}
