//! Aperture transport operator (C7): turning a flow matrix row into
//! absolute concentration deltas for the species that actually move
//! through an opening, over one explicit-Euler transport step.

use crate::flow_matrix::FlowMatrix;
use crate::species::{classify, indoor_species_name, SpeciesClass};
use std::collections::HashMap;

/// A room's mutable concentration state during one transport step: a flat
/// map from mechanism variable name to concentration, large enough to hold
/// both indoor species and their `"<name>OUT"` sidecars.
pub type Concentrations = HashMap<String, f64>;

/// The per-species concentration change one interior aperture's flow would
/// cause over `delta_time` seconds, computed purely from the given
/// snapshots — `conc_1`/`conc_2` are read only, never mutated. Returns
/// `(delta_1, delta_2)`, each a sparse map over [`SpeciesClass::Indoor`]
/// variables only.
fn interior_flow_deltas(
    conc_1: &Concentrations,
    conc_2: &Concentrations,
    volume_1: f64,
    volume_2: f64,
    flow_1_to_2: f64,
    flow_2_to_1: f64,
    delta_time: f64,
) -> (Concentrations, Concentrations) {
    let moved_1_to_2 = flow_1_to_2 * delta_time;
    let moved_2_to_1 = flow_2_to_1 * delta_time;

    let mut names: Vec<String> = conc_1
        .keys()
        .chain(conc_2.keys())
        .filter(|n| classify(n) == SpeciesClass::Indoor)
        .cloned()
        .collect();
    names.sort_unstable();
    names.dedup();

    let mut delta_1 = Concentrations::new();
    let mut delta_2 = Concentrations::new();
    for name in names {
        let c1 = *conc_1.get(&name).unwrap_or(&0.0);
        let c2 = *conc_2.get(&name).unwrap_or(&0.0);

        let quantity_out = moved_1_to_2 * c1;
        let quantity_in = moved_2_to_1 * c2;

        delta_1.insert(name.clone(), (quantity_in - quantity_out) / volume_1);
        delta_2.insert(name, (quantity_out - quantity_in) / volume_2);
    }
    (delta_1, delta_2)
}

/// The per-species concentration change a room-to-outside aperture's flow
/// would cause over `delta_time` seconds, computed purely from `conc` —
/// read only, never mutated. Reads the inbound concentration from `conc`'s
/// own `"<species>OUT"` sidecar variables where present, otherwise treats
/// the ambient concentration as zero.
fn outdoor_flow_deltas(
    conc: &Concentrations,
    volume: f64,
    flow_out: f64,
    flow_in: f64,
    delta_time: f64,
) -> Concentrations {
    let moved_out = flow_out * delta_time;
    let moved_in = flow_in * delta_time;

    let mut deltas = Concentrations::new();
    for name in conc.keys().filter(|n| classify(n) == SpeciesClass::Indoor) {
        let c = *conc.get(name).unwrap_or(&0.0);
        let sidecar = format!("{name}OUT");
        let ambient = conc.get(&sidecar).copied().unwrap_or(0.0);

        let quantity_out = moved_out * c;
        let quantity_in = moved_in * ambient;

        deltas.insert(name.clone(), (quantity_in - quantity_out) / volume);
    }
    deltas
}

/// Add every delta onto `accum`, in place. Several apertures can each
/// contribute a delta for the same room/species; they sum (`spec.md` §5:
/// "the updates commute — addition on independent species slots").
fn add_into(accum: &mut Concentrations, deltas: &Concentrations) {
    for (name, delta) in deltas {
        *accum.entry(name.clone()).or_insert(0.0) += delta;
    }
}

/// Add each of `deltas` onto `room`'s current value. A result below zero is
/// left as-is and logged as a warning: too large a `τ` relative to the flow
/// can drive an explicit-Euler step negative, and the source only warns
/// about it rather than correcting it (`spec.md` §4.7/§7, §9 Open
/// Questions) — the engine does the same so downstream behavior matches the
/// documented numerical result.
fn apply_deltas(room: &mut Concentrations, deltas: &Concentrations, room_label: &str) {
    for (name, delta) in deltas {
        let current = *room.get(name).unwrap_or(&0.0);
        let value = current + delta;
        if value < 0.0 {
            log::warn!(
                "room {room_label}: concentration of {name} went negative ({value:e})"
            );
        }
        room.insert(name.clone(), value);
    }
}

/// Sidecars themselves never move; warn if an outdoor-sidecar variable has
/// no matching indoor species in the same room, as a sanity net for
/// malformed mechanism output.
fn warn_on_unmatched_sidecars(room: &Concentrations, room_label: &str) {
    for name in room.keys() {
        if classify(name) == SpeciesClass::OutdoorSidecar {
            if let Some(indoor) = indoor_species_name(name) {
                if !room.contains_key(indoor) {
                    log::warn!(
                        "room {room_label}: outdoor sidecar {name} has no matching indoor species {indoor}"
                    );
                }
            }
        }
    }
}

/// Apply one interior aperture's flow to two rooms' concentrations over
/// `delta_time` seconds, in place. Only [`SpeciesClass::Indoor`] variables
/// move; everything else is left untouched.
pub fn apply_interior_flow(
    room_1: &mut Concentrations,
    room_2: &mut Concentrations,
    volume_1: f64,
    volume_2: f64,
    flow_1_to_2: f64,
    flow_2_to_1: f64,
    delta_time: f64,
    room_1_label: &str,
    room_2_label: &str,
) {
    let (delta_1, delta_2) = interior_flow_deltas(
        room_1, room_2, volume_1, volume_2, flow_1_to_2, flow_2_to_1, delta_time,
    );
    apply_deltas(room_1, &delta_1, room_1_label);
    apply_deltas(room_2, &delta_2, room_2_label);
}

/// Apply a room-to-outside aperture's flow over `delta_time`, reading the
/// inbound concentration from `room`'s own `"<species>OUT"` sidecar
/// variables where present, otherwise treating the ambient concentration
/// as zero.
pub fn apply_outdoor_flow(
    room: &mut Concentrations,
    volume: f64,
    flow_out: f64,
    flow_in: f64,
    delta_time: f64,
    room_label: &str,
) {
    let deltas = outdoor_flow_deltas(room, volume, flow_out, flow_in, delta_time);
    apply_deltas(room, &deltas, room_label);
    warn_on_unmatched_sidecars(room, room_label);
}

/// Reconcile every room's concentrations for one transport step, reading
/// flows from `matrix`. `rooms[i]` corresponds to matrix room index
/// `FlowMatrix::room_index(i)`; `volumes[i]` is that room's volume.
///
/// Every aperture's delta is computed from one frozen snapshot of `rooms`
/// taken at the start of the step and only summed into a per-room
/// accumulator; `rooms` itself is mutated only once, after every aperture
/// has been visited. This makes the result independent of aperture visit
/// order — an aperture's contribution never sees another aperture's delta
/// from the same step (`spec.md` §5).
pub fn reconcile_transport_step(
    rooms: &mut [Concentrations],
    volumes: &[f64],
    matrix: &FlowMatrix,
    delta_time: f64,
) {
    let n = rooms.len();
    let frozen: Vec<Concentrations> = rooms.to_vec();
    let mut accum: Vec<Concentrations> = vec![Concentrations::new(); n];
    let mut touched_by_outdoor_flow = vec![false; n];

    for i in 0..n {
        let out_idx = FlowMatrix::room_index(i);
        let flow_out = matrix.get(out_idx, FlowMatrix::OUTSIDE);
        let flow_in = matrix.get(FlowMatrix::OUTSIDE, out_idx);
        if flow_out != 0.0 || flow_in != 0.0 {
            let deltas = outdoor_flow_deltas(&frozen[i], volumes[i], flow_out, flow_in, delta_time);
            add_into(&mut accum[i], &deltas);
            touched_by_outdoor_flow[i] = true;
        }
    }

    for i in 0..n {
        for j in (i + 1)..n {
            let i_idx = FlowMatrix::room_index(i);
            let j_idx = FlowMatrix::room_index(j);
            let flow_i_to_j = matrix.get(i_idx, j_idx);
            let flow_j_to_i = matrix.get(j_idx, i_idx);
            if flow_i_to_j == 0.0 && flow_j_to_i == 0.0 {
                continue;
            }
            let (delta_i, delta_j) = interior_flow_deltas(
                &frozen[i],
                &frozen[j],
                volumes[i],
                volumes[j],
                flow_i_to_j,
                flow_j_to_i,
                delta_time,
            );
            add_into(&mut accum[i], &delta_i);
            add_into(&mut accum[j], &delta_j);
        }
    }

    for i in 0..n {
        let label = format!("room{i}");
        apply_deltas(&mut rooms[i], &accum[i], &label);
        if touched_by_outdoor_flow[i] {
            warn_on_unmatched_sidecars(&rooms[i], &label);
        }
    }
}
