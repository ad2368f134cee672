//! # Two-line element text
//!
//! Parsing and formatting of the fixed-column two-line element format.
//!
//! ## Column layout (1-based, inclusive)
//!
//! Line 1:
//!
//! | Columns | Content                                                        |
//! |---------|----------------------------------------------------------------|
//! | 1       | line number `1`                                                |
//! | 3–7     | satellite number                                               |
//! | 8       | classification                                                 |
//! | 10–17   | international designator                                       |
//! | 19–20   | epoch year (two digits)                                        |
//! | 21–32   | epoch day of year with fraction                                |
//! | 34–43   | `NDot` (types 0/2) or `AgomGp` (type 4), decimal               |
//! | 45–52   | `NDotDot` (types 0/2) or `NDot` (type 4), implied exponent      |
//! | 54–61   | `BStar` (types 0/2) or `BTerm` (type 4), implied exponent      |
//! | 63      | ephemeris type                                                 |
//! | 65–68   | element set number                                             |
//! | 69      | checksum                                                       |
//!
//! Line 2:
//!
//! | Columns | Content                          |
//! |---------|----------------------------------|
//! | 3–7     | satellite number                 |
//! | 9–16    | inclination (deg)                |
//! | 18–25   | right ascension of node (deg)    |
//! | 27–33   | eccentricity, implied leading `0.` |
//! | 35–42   | argument of perigee (deg)        |
//! | 44–51   | mean anomaly (deg)               |
//! | 53–63   | mean motion (rev/day)            |
//! | 64–68   | revolution number                |
//! | 69      | checksum                         |
//!
//! Checksums are written on output but not verified on input.

use crate::element_record::{ElementField, ElementRecord, EphemerisType};
use crate::fit_errors::FitError;
use crate::time::{ds50_to_tle_epoch, tle_epoch_to_ds50};

const TLE_LINE_LENGTH: usize = 69;

/// Modulo-10 checksum: digits count their value, `-` counts one.
pub fn checksum(line: &str) -> u32 {
    line.chars()
        .take(TLE_LINE_LENGTH - 1)
        .map(|c| match c {
            '0'..='9' => c as u32 - '0' as u32,
            '-' => 1,
            _ => 0,
        })
        .sum::<u32>()
        % 10
}

fn column<'a>(line: &'a str, range: std::ops::Range<usize>, name: &str) -> Result<&'a str, FitError> {
    line.get(range)
        .ok_or_else(|| FitError::TleParse(format!("missing {name} columns")))
}

fn parse_f64(line: &str, range: std::ops::Range<usize>, name: &str) -> Result<f64, FitError> {
    let text = column(line, range, name)?.trim();
    if text.is_empty() {
        return Ok(0.0);
    }
    text.parse::<f64>()
        .map_err(|_| FitError::TleParse(format!("invalid {name}: '{text}'")))
}

fn parse_u32(line: &str, range: std::ops::Range<usize>, name: &str) -> Result<u32, FitError> {
    let text = column(line, range, name)?.trim();
    if text.is_empty() {
        return Ok(0);
    }
    text.parse::<u32>()
        .map_err(|_| FitError::TleParse(format!("invalid {name}: '{text}'")))
}

/// Parse an implied-decimal, implied-exponent field such as ` 12345-3` (0.12345e-3).
fn parse_implied_exponent(
    line: &str,
    range: std::ops::Range<usize>,
    name: &str,
) -> Result<f64, FitError> {
    let text = column(line, range, name)?;
    if text.trim().is_empty() {
        return Ok(0.0);
    }
    let invalid = || FitError::TleParse(format!("invalid {name}: '{text}'"));
    let split = text.len().checked_sub(2).ok_or_else(invalid)?;
    let (mantissa, exponent) = text.split_at(split);
    let mantissa = mantissa.trim();
    let (sign, digits) = match mantissa.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, mantissa.trim_start_matches('+')),
    };
    let digits_value = digits.parse::<f64>().map_err(|_| invalid())?;
    let exponent = exponent.trim().parse::<i32>().map_err(|_| invalid())?;
    let scale = 10f64.powi(digits.len() as i32);
    Ok(sign * digits_value / scale * 10f64.powi(exponent))
}

/// Format a value in implied-exponent notation, 8 characters wide.
///
/// Exponents below -9 are written at -9 with the digits rescaled; values too small even for
/// that are written as zero.
fn format_implied_exponent(value: f64) -> Result<String, FitError> {
    const ZERO: &str = " 00000-0";
    if value == 0.0 || !value.is_finite() {
        return Ok(ZERO.to_string());
    }
    let sign = if value < 0.0 { '-' } else { ' ' };
    let magnitude = value.abs();
    let mut exponent = (magnitude.log10().floor() as i32 + 1).max(-9);
    let mut digits = (magnitude / 10f64.powi(exponent) * 1e5).round() as u32;
    if digits >= 100_000 {
        digits /= 10;
        exponent += 1;
    }
    if digits == 0 {
        return Ok(ZERO.to_string());
    }
    if exponent > 9 {
        return Err(FitError::TleParse(format!(
            "{value} does not fit in the implied-exponent field"
        )));
    }
    let exponent_sign = if exponent < 0 { '-' } else { '+' };
    Ok(format!("{sign}{digits:05}{exponent_sign}{}", exponent.abs()))
}

/// Format a signed decimal in 10 columns, dropping the leading zero below one (` .00001234`).
///
/// The value is rounded before the layout is chosen, so `0.999999999` is written as `1.0000000`.
fn format_decimal(value: f64) -> Result<String, FitError> {
    let sign = if value < 0.0 { '-' } else { ' ' };
    let magnitude = value.abs();
    if let Some(fraction) = format!("{magnitude:.8}").strip_prefix("0.") {
        return Ok(format!("{sign}.{fraction}"));
    }
    (0..=7usize)
        .rev()
        .map(|decimals| format!("{magnitude:.decimals$}"))
        .find(|text| text.len() <= 9)
        .map(|text| format!("{sign}{text:>9}"))
        .ok_or_else(|| {
            FitError::TleParse(format!("{value} does not fit in the ten-column decimal field"))
        })
}

fn format_angle(value: f64) -> String {
    format!("{:8.4}", value.rem_euclid(360.0))
}

/// Parse two lines of element text into a record.
///
/// Arguments
/// ---------
/// * `line1`, `line2`: the two lines, at least 69 characters each
///
/// Return
/// ------
/// * the record, or [`FitError::TleParse`] naming the offending field
pub fn parse_tle(line1: &str, line2: &str) -> Result<ElementRecord, FitError> {
    let line1 = line1.trim_end();
    let line2 = line2.trim_end();
    if !line1.is_ascii() || !line2.is_ascii() {
        return Err(FitError::TleParse("non-ASCII characters".into()));
    }
    if line1.len() < TLE_LINE_LENGTH - 1 || line2.len() < TLE_LINE_LENGTH - 1 {
        return Err(FitError::TleParse(format!(
            "lines must be {TLE_LINE_LENGTH} columns, got {} and {}",
            line1.len(),
            line2.len()
        )));
    }
    if !line1.starts_with('1') || !line2.starts_with('2') {
        return Err(FitError::TleParse("line numbers must be 1 and 2".into()));
    }

    let sat_num = parse_u32(line1, 2..7, "satellite number")?;
    let ephemeris_type = match column(line1, 62..63, "ephemeris type")?.trim() {
        "" => EphemerisType::Type0,
        code => {
            let code = code
                .parse::<i32>()
                .map_err(|_| FitError::TleParse(format!("invalid ephemeris type '{code}'")))?;
            EphemerisType::try_from(code)?
        }
    };

    let mut record = ElementRecord::new(sat_num, ephemeris_type);
    record.classification = line1[7..8].chars().next().unwrap_or('U');
    record.designator = column(line1, 9..17, "designator")?.trim().to_string();
    record.element_number = parse_u32(line1, 64..68, "element set number")?;

    let yy = parse_u32(line1, 18..20, "epoch year")?;
    let day = parse_f64(line1, 20..32, "epoch day")?;
    record[ElementField::Epoch] = tle_epoch_to_ds50(yy, day);

    let decimal_slot = parse_f64(line1, 33..43, "first derivative")?;
    let middle_slot = parse_implied_exponent(line1, 44..52, "second derivative")?;
    let drag_slot = parse_implied_exponent(line1, 53..61, "drag term")?;
    match ephemeris_type {
        EphemerisType::Type0 | EphemerisType::Type2 => {
            record[ElementField::NDot] = decimal_slot;
            record[ElementField::NDotDot] = middle_slot;
            record[ElementField::BStar] = drag_slot;
        }
        EphemerisType::Type4 => {
            record[ElementField::AgomGp] = decimal_slot;
            record[ElementField::NDot] = middle_slot;
            record[ElementField::BTerm] = drag_slot;
        }
    }

    record[ElementField::Inclination] = parse_f64(line2, 8..16, "inclination")?;
    record[ElementField::Node] = parse_f64(line2, 17..25, "node")?;
    let ecc_text = column(line2, 26..33, "eccentricity")?.trim();
    record[ElementField::Eccentricity] = format!("0.{ecc_text}")
        .parse::<f64>()
        .map_err(|_| FitError::TleParse(format!("invalid eccentricity: '{ecc_text}'")))?;
    record[ElementField::ArgPerigee] = parse_f64(line2, 34..42, "argument of perigee")?;
    record[ElementField::MeanAnomaly] = parse_f64(line2, 43..51, "mean anomaly")?;
    record[ElementField::MeanMotion] = parse_f64(line2, 52..63, "mean motion")?;
    record.rev_number = parse_u32(line2, 63..68, "revolution number")?;

    Ok(record)
}

/// Format a record as two lines of element text, checksums included.
///
/// Return
/// ------
/// * `(line1, line2)`, or [`FitError::TleParse`] when a value cannot be represented
///   in its columns (satellite number above 99999, eccentricity outside `[0, 1)`,
///   non-finite fields)
pub fn format_tle(record: &ElementRecord) -> Result<(String, String), FitError> {
    if record.sat_num > 99_999 {
        return Err(FitError::TleParse(format!(
            "satellite number {} does not fit in five columns",
            record.sat_num
        )));
    }
    if !record.is_finite() {
        return Err(FitError::TleParse("non-finite element value".into()));
    }
    let ecc = record[ElementField::Eccentricity];
    if !(0.0..1.0).contains(&ecc) {
        return Err(FitError::TleParse(format!("eccentricity {ecc} out of range")));
    }

    let (decimal_slot, middle_slot, drag_slot) = match record.ephemeris_type {
        EphemerisType::Type0 | EphemerisType::Type2 => (
            record[ElementField::NDot],
            record[ElementField::NDotDot],
            record[ElementField::BStar],
        ),
        EphemerisType::Type4 => (
            record[ElementField::AgomGp],
            record[ElementField::NDot],
            record[ElementField::BTerm],
        ),
    };

    let (yy, day) = ds50_to_tle_epoch(record.epoch());
    let mut line1 = format!(
        "1 {:05}{} {:<8} {:02}{:012.8} {} {} {} {} {:>4}",
        record.sat_num,
        record.classification,
        record.designator,
        yy,
        day,
        format_decimal(decimal_slot)?,
        format_implied_exponent(middle_slot)?,
        format_implied_exponent(drag_slot)?,
        record.ephemeris_type.code(),
        record.element_number % 10_000,
    );
    line1.push_str(&checksum(&line1).to_string());

    let ecc_digits = ((ecc * 1e7).round() as u64).min(9_999_999);
    let mut line2 = format!(
        "2 {:05} {} {} {:07} {} {} {:11.8}{:>5}",
        record.sat_num,
        format_angle(record[ElementField::Inclination]),
        format_angle(record[ElementField::Node]),
        ecc_digits,
        format_angle(record[ElementField::ArgPerigee]),
        format_angle(record[ElementField::MeanAnomaly]),
        record[ElementField::MeanMotion],
        record.rev_number % 100_000,
    );
    line2.push_str(&checksum(&line2).to_string());

    Ok((line1, line2))
}
