//! A deterministic stand-in chemistry solver.
//!
//! The real mechanism solver (e.g. an INCHEM-Py-style box model) is an
//! external collaborator the engine only reaches through
//! `roomvent_core::room_evolver::RoomEvolver` — this harness never embeds
//! one. `StubEvolver` instead applies exponential first-order decay plus
//! constant-rate emission over the interval, at `ACH` and a fixed decay
//! rate, so a full building run can be exercised without a real mechanism.

use std::collections::HashMap;

use roomvent_core::building::Room;
use roomvent_core::error::CoreResult;
use roomvent_core::room_evolver::{resolve_ambient_sample, ChemistryResult, InitialCondition, RoomEvolver};
use roomvent_core::transport::Concentrations;

/// Seed concentrations used the first time a room's evolver is called with
/// an opaque text handle, since this stub has no restart file to resolve.
pub struct StubEvolver {
    pub seed: Concentrations,
    pub decay_rate_per_second: f64,
    pub ambient_pressure_hpa: f64,
    pub sample_interval_s: f64,
}

impl StubEvolver {
    pub fn new(seed: Concentrations, decay_rate_per_second: f64, ambient_pressure_hpa: f64, sample_interval_s: f64) -> Self {
        Self {
            seed,
            decay_rate_per_second,
            ambient_pressure_hpa,
            sample_interval_s,
        }
    }
}

impl RoomEvolver for StubEvolver {
    fn run(
        &mut self,
        room: &Room,
        t0: f64,
        duration: f64,
        initial: InitialCondition,
    ) -> CoreResult<ChemistryResult> {
        let mut state = match initial {
            InitialCondition::TextHandle(_) => self.seed.clone(),
            InitialCondition::Snapshot(c) => c,
        };

        let mut times = Vec::new();
        let mut rows = Vec::new();

        let mut t = t0;
        while t < t0 + duration {
            let step = self.sample_interval_s.min(t0 + duration - t);
            let sample = resolve_ambient_sample(room, t, step, self.ambient_pressure_hpa)?;

            for (species, emission_rate) in &sample.emissions {
                let entry = state.entry(species.clone()).or_insert(0.0);
                *entry += emission_rate * step;
            }
            for (species, concentration) in state.iter_mut() {
                if !sample.constant_species.contains_key(species) {
                    *concentration *= (-self.decay_rate_per_second * step).exp();
                }
            }
            for (species, value) in &sample.constant_species {
                state.insert(species.clone(), *value);
            }

            t += step;
            times.push(t);
            rows.push(state.clone());
        }

        if times.is_empty() {
            times.push(t0 + duration);
            rows.push(state);
        }

        Ok(ChemistryResult { times, rows })
    }
}

pub fn default_seed() -> HashMap<String, f64> {
    let mut seed = HashMap::new();
    seed.insert("O3".to_string(), 20.0);
    seed.insert("NO2".to_string(), 10.0);
    seed.insert("LIMONENE".to_string(), 0.0);
    seed
}
