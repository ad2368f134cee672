use hifitime::Epoch;
use std::str::FromStr;

use crate::constants::{Ds50, DPI, MJD_DS50_OFFSET, T2000};
use crate::fit_errors::FitError;

/// Convert an epoch to days since 1950 (UTC).
///
/// Argument
/// --------
/// * `epoch`: the epoch to convert
///
/// Return
/// ------
/// * the ds50 value, 1950-01-01T00:00:00 UTC being 1.0
pub fn epoch_to_ds50(epoch: &Epoch) -> Ds50 {
    epoch.to_mjd_utc_days() - MJD_DS50_OFFSET
}

/// Convert days since 1950 (UTC) back to an epoch.
pub fn ds50_to_epoch(ds50: Ds50) -> Epoch {
    Epoch::from_mjd_utc(ds50 + MJD_DS50_OFFSET)
}

/// Parse an ISO 8601 date into an epoch.
///
/// Argument
/// --------
/// * `date`: a date in the format YYYY-MM-ddTHH:mm:ss(.fff), optionally suffixed with a time
///   scale or with `Z` for UTC
///
/// Return
/// ------
/// * the parsed epoch or a [`FitError::TimeConversion`]
pub fn parse_epoch(date: &str) -> Result<Epoch, FitError> {
    let trimmed = date.trim();
    let parsed = match trimmed.strip_suffix('Z') {
        Some(utc) => Epoch::from_str(&format!("{utc} UTC")),
        None => Epoch::from_str(trimmed),
    };
    parsed.map_err(|e| FitError::TimeConversion(format!("unable to parse '{date}': {e}")))
}

/// Expand a two-digit TLE year: 57..=99 is 19xx, 00..=56 is 20xx.
pub fn expand_tle_year(yy: u32) -> i32 {
    if yy < 57 {
        2000 + yy as i32
    } else {
        1900 + yy as i32
    }
}

fn ds50_of_new_year(year: i32) -> Ds50 {
    epoch_to_ds50(&Epoch::from_gregorian_utc_at_midnight(year, 1, 1))
}

/// Transformation from a TLE epoch (two-digit year, fractional day of year) to ds50.
///
/// Argument
/// --------
/// * `yy`: two-digit year, expanded with [`expand_tle_year`]
/// * `day_of_year`: day of the year, 1.0 being January 1st at 00:00 UTC
///
/// Return
/// ------
/// * the epoch in ds50 (UTC)
pub fn tle_epoch_to_ds50(yy: u32, day_of_year: f64) -> Ds50 {
    ds50_of_new_year(expand_tle_year(yy)) + day_of_year - 1.0
}

/// Transformation from ds50 to a TLE epoch.
///
/// Return
/// ------
/// * `(yy, day_of_year)` with `yy` in `0..100`
pub fn ds50_to_tle_epoch(ds50: Ds50) -> (u32, f64) {
    let mut year = 1950 + (ds50 / 365.25).floor() as i32;
    while ds50_of_new_year(year) > ds50 {
        year -= 1;
    }
    while ds50_of_new_year(year + 1) <= ds50 {
        year += 1;
    }
    let day = ds50 - ds50_of_new_year(year) + 1.0;
    (year.rem_euclid(100) as u32, day)
}

/// Compute the Greenwich Mean Sidereal Time (GMST) in radians
/// for a given Modified Julian Date (UT1 time scale).
///
/// This function implements the IAU 1982/2000 polynomial formula
/// for the mean sidereal time at 0h UT1, plus the fractional-day
/// correction term due to Earth's rotation rate.
///
/// # Arguments
/// * `tjm` - Modified Julian Date (MJD, UT1 time scale)
///
/// # Returns
/// * GMST angle in radians, normalized to the interval [0, 2π).
///
/// # References
/// * IAU 1982, IERS Conventions 1996/2000.
/// * Explanatory Supplement to the Astronomical Almanac (1992).
pub fn gmst(tjm: f64) -> f64 {
    // Polynomial coefficients for GMST at 0h UT1 (in seconds)
    const C0: f64 = 24110.54841;
    const C1: f64 = 8640184.812866;
    const C2: f64 = 9.3104e-2;
    const C3: f64 = -6.2e-6;

    // Ratio of sidereal day to solar day
    const RAP: f64 = 1.00273790934;

    let itjm = tjm.floor();
    let t = (itjm - T2000) / 36525.0;

    let gmst0 = (((C3 * t + C2) * t + C1) * t + C0) * DPI / 86400.0;

    let h = tjm.fract() * DPI;
    (gmst0 + h * RAP).rem_euclid(DPI)
}

/// GMST in radians at a ds50 (UTC) time, UTC standing in for UT1.
pub fn gmst_ds50(ds50: Ds50) -> f64 {
    gmst(ds50 + MJD_DS50_OFFSET)
}
