//! Unit system
//!
//! Every base unit is 1: lengths in meters, times in nanoseconds and frequencies in GHz.
//! Multiply a value by its unit to bring it into the system, divide to read it back.

pub const M: f64 = 1f64;
pub const KM: f64 = 1e3 * M;
pub const CM: f64 = 1e-2 * M;

pub const NS: f64 = 1f64;
pub const S: f64 = 1e9 * NS;
pub const US: f64 = 1e3 * NS;

pub const GHZ: f64 = 1f64;
pub const MHZ: f64 = 1e-3 * GHZ;
pub const HZ: f64 = 1e-9 * GHZ;

/// Speed of light in vacuum
pub const SPEED_OF_LIGHT: f64 = 299_792_458f64 * M / S;
