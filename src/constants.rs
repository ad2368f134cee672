//! # Constants and type definitions for tlefit
//!
//! This module centralizes the **physical constants**, **conversion factors** and **common type
//! aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Gravity model constants (WGS-72, the set SGP4-class propagators are tuned against)
//! - Earth ellipsoid constants for sensor sites (WGS-84)
//! - Unit conversions (degrees ↔ radians, days ↔ minutes ↔ seconds)
//! - The `ds50` time origin used by the propagator
//! - Core type aliases used across the crate

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Number of minutes in a day
pub const MINUTES_PER_DAY: f64 = 1_440.0;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → degrees
pub const ARCSEC_TO_DEG: f64 = 1.0 / 3600.0;

/// Earth gravitational parameter μ in km³/s² (WGS-72)
pub const GM_EARTH: f64 = 398_600.8;

/// Earth equatorial radius in kilometers (WGS-72)
pub const EARTH_RADIUS_KM: f64 = 6_378.135;

/// Second zonal harmonic J2 (WGS-72)
pub const J2: f64 = 0.001_082_616;

/// Half of J2 in Earth-radius units, the `k2` of the SGP4 initialization
pub const CK2: f64 = 0.5 * J2;

/// sqrt(μ) in Earth radii^1.5 per minute
pub const XKE: f64 = 0.074_366_916_133_173_4;

/// WGS-84 equatorial radius in kilometers, used for sensor sites
pub const WGS84_MAJOR_AXIS_KM: f64 = 6_378.137;

/// WGS-84 flattening
pub const WGS84_FLATTENING: f64 = 1.0 / 298.257_223_563;

/// Offset between MJD (UTC) and ds50: `ds50 = mjd - MJD_DS50_OFFSET`.
///
/// 1950-01-01T00:00 UTC is MJD 33282 and ds50 1.0 (day one of 1950, day zero is 1949-12-31).
pub const MJD_DS50_OFFSET: f64 = 33_281.0;

/// MJD of the J2000.0 epoch
pub const T2000: f64 = 51_544.5;

/// Default satellite number given to fitted element sets
pub const DEFAULT_FIT_SATNO: u32 = 99_999;

/// First satellite number handed out to perturbed element families
pub const DEFAULT_PERTURB_SATNO: u32 = 90_000;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in kilometers
pub type Kilometer = f64;
/// Days since 1950-01-00 00:00 UTC
pub type Ds50 = f64;
/// Mean motion in revolutions per day
pub type RevPerDay = f64;
