//! Multi-room transport/chemistry coupling engine.
//!
//! This crate contains the transport-path enumeration, wind-driven aperture
//! flow model, and operator-splitting scheduler that couple a stiff
//! per-room chemistry solver across a multi-room building. It is
//! independent of any concrete chemistry solver, configuration format, or
//! output layer — those are reached through the [`room_evolver::RoomEvolver`]
//! trait and plain data, making the engine unit-testable and portable
//! across whatever harness drives it.

pub mod building;
pub mod error;
pub mod flow_matrix;
pub mod flow_model;
pub mod paths;
pub mod room_evolver;
pub mod scheduler;
pub mod species;
pub mod time_series;
pub mod transport;

pub use error::CoreError;
