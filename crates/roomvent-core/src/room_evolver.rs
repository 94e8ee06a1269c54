//! Room-evolver adapter (C9): the seam between the transport/scheduling
//! engine and an external chemistry solver. The engine never integrates a
//! reaction mechanism itself — it resolves ambient inputs for the interval
//! and hands them across this boundary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::building::Room;
use crate::transport::Concentrations;

/// Avogadro's number, divided into the ambient-density formula as in the
/// original mechanism driver.
const AVOGADRO: f64 = 6.0221408e23;
/// Universal gas constant, J/(mol*K).
const GAS_CONSTANT: f64 = 8.3144626;

/// O2/N2/H2 mole fractions and a fixed aerosol surface-area concentration,
/// used to build every interval's constant-species map.
const O2_FRACTION: f64 = 0.2095;
const N2_FRACTION: f64 = 0.7809;
const H2_FRACTION: f64 = 550e-9;
const AEROSOL_SURFACE_AREA: f64 = 1.3e-2;

/// Ambient conditions resolved for one room at the start of a chemistry
/// interval, everything the evolver needs to hand to the external solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmbientSample {
    pub temperature_kelvin: f64,
    pub relative_humidity_percent: f64,
    pub n_adults: u32,
    pub n_children: u32,
    pub light_intervals: Vec<(f64, f64)>,
    pub emissions: HashMap<String, f64>,
    pub airchange_per_second: f64,
    pub ambient_number_density: f64,
    pub constant_species: HashMap<String, f64>,
}

/// Resolve [`AmbientSample`] for `room` over `[t0, t0 + duration)`, given
/// the ambient pressure in hPa used by the number-density formula.
pub fn resolve_ambient_sample(
    room: &Room,
    t0: f64,
    duration: f64,
    ambient_pressure_hpa: f64,
) -> crate::error::CoreResult<AmbientSample> {
    let temperature_kelvin = room.temp_in_kelvin.value_at(t0)?;
    let relative_humidity_percent = room.rh_in_percent.value_at(t0)?;
    let n_adults = room.n_adults.value_at(t0)?;
    let n_children = room.n_children.value_at(t0)?;
    let airchange_per_second = room.airchange_in_per_second.value_at(t0)?;
    let light_intervals = room.light_intervals(t0, t0 + duration);

    let emissions = room
        .emissions
        .iter()
        .map(|(species, series)| (species.clone(), series.value_at(t0)))
        .collect();

    let m = ((100.0 * ambient_pressure_hpa) / (GAS_CONSTANT * temperature_kelvin)) * (AVOGADRO / 1e6);

    let mut constant_species = HashMap::new();
    constant_species.insert("O2".to_string(), O2_FRACTION * m);
    constant_species.insert("N2".to_string(), N2_FRACTION * m);
    constant_species.insert("H2".to_string(), H2_FRACTION * m);
    constant_species.insert("saero".to_string(), AEROSOL_SURFACE_AREA);

    Ok(AmbientSample {
        temperature_kelvin,
        relative_humidity_percent,
        n_adults,
        n_children,
        light_intervals,
        emissions,
        airchange_per_second,
        ambient_number_density: m,
        constant_species,
    })
}

/// How a chemistry interval is seeded: the very first call in a run hands
/// the evolver an opaque handle it resolves once (e.g. a restart file
/// path); every later call hands back the concentration snapshot produced
/// by the previous interval's transport reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InitialCondition {
    TextHandle(String),
    Snapshot(Concentrations),
}

/// One interval's result from the external chemistry solver: concentration
/// rows at each solved time within `[t0, t0+duration)`, always including
/// the row at the interval's final time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChemistryResult {
    pub times: Vec<f64>,
    pub rows: Vec<Concentrations>,
}

impl ChemistryResult {
    /// The last solved time, or `f64::NAN` if the solver returned no rows
    /// (callers should treat that as an immediate `IncompleteChemistry`).
    pub fn last_time(&self) -> f64 {
        self.times.last().copied().unwrap_or(f64::NAN)
    }

    pub fn last_row(&self) -> Option<&Concentrations> {
        self.rows.last()
    }
}

/// The seam a room's chemistry solver is plugged in through. Implementors
/// own whatever solver state (jacobians, mechanism handles) needs to
/// survive across calls for the same run; the engine calls `run` once per
/// scheduler interval and never inspects solver internals.
pub trait RoomEvolver: Send {
    fn run(
        &mut self,
        room: &Room,
        t0: f64,
        duration: f64,
        initial: InitialCondition,
    ) -> crate::error::CoreResult<ChemistryResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_series::{Continuity, TimeDependentValue};
    use crate::time_series::TimeBracketedValue;

    fn room() -> Room {
        Room {
            volume_in_m3: 20.0,
            surf_area_in_m2: 60.0,
            composition: crate::building::Composition {
                concrete: 100.0,
                ..Default::default()
            },
            light_type: "LED".into(),
            glass_type: "double".into(),
            temp_in_kelvin: TimeDependentValue::new(vec![(0.0, 293.15), (3600.0, 293.15)], Continuity::Linear).unwrap(),
            rh_in_percent: TimeDependentValue::new(vec![(0.0, 45.0), (3600.0, 45.0)], Continuity::Linear).unwrap(),
            airchange_in_per_second: TimeDependentValue::new(vec![(0.0, 0.0005), (3600.0, 0.0005)], Continuity::Step).unwrap(),
            light_switch: TimeDependentValue::new(vec![(0.0, true), (3600.0, false)], Continuity::Step).unwrap(),
            n_adults: TimeDependentValue::new(vec![(0.0, 2u32), (3600.0, 2u32)], Continuity::Step).unwrap(),
            n_children: TimeDependentValue::new(vec![(0.0, 0u32), (3600.0, 0u32)], Continuity::Step).unwrap(),
            emissions: {
                let mut m = HashMap::new();
                m.insert(
                    "LIMONENE".to_string(),
                    TimeBracketedValue::new(vec![(0.0, 1800.0, 2.5e-9)]).unwrap(),
                );
                m
            },
        }
    }

    #[test]
    fn ambient_density_matches_ideal_gas_formula() {
        let r = room();
        let sample = resolve_ambient_sample(&r, 0.0, 3600.0, 1013.25).unwrap();
        let expected = ((100.0 * 1013.25) / (GAS_CONSTANT * 293.15)) * (AVOGADRO / 1e6);
        assert!((sample.ambient_number_density - expected).abs() < 1e-6);
    }

    #[test]
    fn constant_species_use_fixed_mole_fractions() {
        let r = room();
        let sample = resolve_ambient_sample(&r, 0.0, 3600.0, 1013.25).unwrap();
        let m = sample.ambient_number_density;
        assert!((sample.constant_species["O2"] - 0.2095 * m).abs() < 1e-6);
        assert!((sample.constant_species["N2"] - 0.7809 * m).abs() < 1e-6);
    }

    #[test]
    fn emissions_sampled_at_interval_start() {
        let r = room();
        let sample = resolve_ambient_sample(&r, 0.0, 3600.0, 1013.25).unwrap();
        assert_eq!(sample.emissions["LIMONENE"], 2.5e-9);
    }

    #[test]
    fn light_on_at_start_is_captured_as_an_interval() {
        let r = room();
        let sample = resolve_ambient_sample(&r, 0.0, 3600.0, 1013.25).unwrap();
        assert_eq!(sample.light_intervals, vec![(0.0, 3600.0)]);
    }
}
