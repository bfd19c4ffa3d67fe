//! Named constants for the simulation core

/// Tolerance within which a slightly negative indirect load is clipped to zero
pub const LOAD_TOLERANCE: f64 = 1e-10;

/// Tolerance for the debug-build load conservation check
pub const CONSERVATION_EPSILON: f64 = 1e-9;
