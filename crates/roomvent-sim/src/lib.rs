//! Headless harness for `roomvent-core`: JSON building loader plus a
//! deterministic stub chemistry solver, wired together to drive a full
//! scheduler run without a database, network layer, or real mechanism
//! solver.

pub mod building_spec;
pub mod stub_evolver;
