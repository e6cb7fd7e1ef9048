//! # Prop Link Library
//!
//! Telemetry and command link between the flight computer and the
//! propulsion board of a liquid-rocket test vehicle.
//!
//! The core is a Q9.6 fixed-point codec, two byte-exact packet layouts and a
//! non-blocking duplex pump that exchanges them over a serial line once per
//! control-loop tick, merging received values into the shared object
//! dictionary.

pub mod config;
pub mod error;
pub mod capsule;
pub mod dictionary;
pub mod link;
pub mod serial;
pub mod telemetry;
