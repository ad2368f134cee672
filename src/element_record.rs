//! # Mean element records
//!
//! This module defines the [`ElementRecord`], the fixed-layout field array that describes one
//! TLE-like mean element set, together with the [`ElementField`] names used to address it and the
//! [`EphemerisType`] that selects the propagation theory.
//!
//! ## Layout
//!
//! An element record carries twelve numeric slots, addressed by [`ElementField`]:
//!
//! | Field           | Unit          | Notes                                              |
//! |-----------------|---------------|----------------------------------------------------|
//! | `Epoch`         | ds50 (UTC)    | days since 1950, see [`crate::time`]               |
//! | `NDot`          | rev/day²      | first derivative of mean motion divided by 2       |
//! | `NDotDot`       | rev/day³      | second derivative of mean motion divided by 6      |
//! | `BStar`         | 1/earth radii | SGP4 drag term, types 0 and 2                      |
//! | `AgomGp`        | m²/kg         | solar radiation pressure coefficient, type 4       |
//! | `BTerm`         | m²/kg         | ballistic coefficient, type 4                      |
//! | `Inclination`   | degrees       |                                                    |
//! | `Node`          | degrees       | right ascension of the ascending node              |
//! | `Eccentricity`  | unitless      |                                                    |
//! | `ArgPerigee`    | degrees       |                                                    |
//! | `MeanAnomaly`   | degrees       |                                                    |
//! | `MeanMotion`    | rev/day       | Kozai or Brouwer depending on the ephemeris type   |
//!
//! Non-numeric metadata (satellite number, classification, designator, element set and
//! revolution numbers) travels next to the field array.
//!
//! ## Ephemeris types and fitted fields
//!
//! * [`EphemerisType::Type0`]: SGP4, Kozai mean motion, fits [`FIT_TYPE0`].
//! * [`EphemerisType::Type2`]: SGP4 with Brouwer mean motion, same fitted fields as type 0.
//! * [`EphemerisType::Type4`]: SGP4-XP, Kozai mean motion, fits [`FIT_TYPE4`].
//!
//! [`NON_CONSERVATIVES`] lists the drag and radiation pressure terms that can be cleared in one call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::constants::Ds50;
use crate::fit_errors::FitError;

/// Name of one numeric slot of an [`ElementRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementField {
    Epoch,
    NDot,
    NDotDot,
    BStar,
    AgomGp,
    BTerm,
    Inclination,
    Node,
    Eccentricity,
    ArgPerigee,
    MeanAnomaly,
    MeanMotion,
}

impl ElementField {
    /// Number of numeric slots in a record.
    pub const COUNT: usize = 12;

    /// Every field, in storage order.
    pub const ALL: [ElementField; ElementField::COUNT] = [
        ElementField::Epoch,
        ElementField::NDot,
        ElementField::NDotDot,
        ElementField::BStar,
        ElementField::AgomGp,
        ElementField::BTerm,
        ElementField::Inclination,
        ElementField::Node,
        ElementField::Eccentricity,
        ElementField::ArgPerigee,
        ElementField::MeanAnomaly,
        ElementField::MeanMotion,
    ];

    /// Position of the field in the record array.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short upper-case mnemonic, as printed in summaries.
    pub fn mnemonic(self) -> &'static str {
        match self {
            ElementField::Epoch => "EPOCH",
            ElementField::NDot => "NDOT",
            ElementField::NDotDot => "NDOTDOT",
            ElementField::BStar => "BSTAR",
            ElementField::AgomGp => "AGOMGP",
            ElementField::BTerm => "BTERM",
            ElementField::Inclination => "INCLI",
            ElementField::Node => "NODE",
            ElementField::Eccentricity => "ECCEN",
            ElementField::ArgPerigee => "OMEGA",
            ElementField::MeanAnomaly => "MNANOM",
            ElementField::MeanMotion => "MNMOTN",
        }
    }

    /// `true` for fields expressed in degrees.
    pub fn is_angle(self) -> bool {
        matches!(
            self,
            ElementField::Inclination
                | ElementField::Node
                | ElementField::ArgPerigee
                | ElementField::MeanAnomaly
        )
    }
}

impl fmt::Display for ElementField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Fields adjusted when fitting a type 0 or type 2 element set.
pub const FIT_TYPE0: [ElementField; 7] = [
    ElementField::Inclination,
    ElementField::Node,
    ElementField::Eccentricity,
    ElementField::ArgPerigee,
    ElementField::MeanAnomaly,
    ElementField::MeanMotion,
    ElementField::BStar,
];

/// Fields adjusted when fitting a type 4 element set.
pub const FIT_TYPE4: [ElementField; 9] = [
    ElementField::BTerm,
    ElementField::NDot,
    ElementField::AgomGp,
    ElementField::Inclination,
    ElementField::Node,
    ElementField::Eccentricity,
    ElementField::ArgPerigee,
    ElementField::MeanAnomaly,
    ElementField::MeanMotion,
];

/// Drag and radiation pressure terms.
pub const NON_CONSERVATIVES: [ElementField; 5] = [
    ElementField::AgomGp,
    ElementField::NDot,
    ElementField::NDotDot,
    ElementField::BStar,
    ElementField::BTerm,
];

/// Which mean motion convention an ephemeris type stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeanMotionKind {
    Kozai,
    Brouwer,
}

/// Propagation theory of an element set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EphemerisType {
    Type0,
    Type2,
    Type4,
}

impl EphemerisType {
    /// Numeric code written in column 63 of line 1.
    pub fn code(self) -> i32 {
        match self {
            EphemerisType::Type0 => 0,
            EphemerisType::Type2 => 2,
            EphemerisType::Type4 => 4,
        }
    }

    /// Default fitted fields for this type.
    pub fn fit_fields(self) -> &'static [ElementField] {
        match self {
            EphemerisType::Type0 | EphemerisType::Type2 => &FIT_TYPE0,
            EphemerisType::Type4 => &FIT_TYPE4,
        }
    }

    pub fn mean_motion_kind(self) -> MeanMotionKind {
        match self {
            EphemerisType::Type2 => MeanMotionKind::Brouwer,
            EphemerisType::Type0 | EphemerisType::Type4 => MeanMotionKind::Kozai,
        }
    }

    /// Whether the propagation theory reads `field`.
    ///
    /// Types 0 and 2 have no radiation pressure or ballistic coefficient; type 4 replaces
    /// `BStar` and `NDotDot` with them.
    pub fn defines(self, field: ElementField) -> bool {
        match self {
            EphemerisType::Type0 | EphemerisType::Type2 => {
                !matches!(field, ElementField::AgomGp | ElementField::BTerm)
            }
            EphemerisType::Type4 => !matches!(field, ElementField::BStar | ElementField::NDotDot),
        }
    }
}

impl TryFrom<i32> for EphemerisType {
    type Error = FitError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(EphemerisType::Type0),
            2 => Ok(EphemerisType::Type2),
            4 => Ok(EphemerisType::Type4),
            other => Err(FitError::InvalidEphemerisType(other)),
        }
    }
}

impl fmt::Display for EphemerisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TYPE{}", self.code())
    }
}

/// One TLE-like mean element set.
///
/// The numeric slots are addressed with [`ElementField`] through `Index`/`IndexMut`, so a
/// record can be read and written like `record[ElementField::MeanMotion]`.
///
/// See also
/// --------
/// * [`crate::astrolib::tle_text`] – two-line text parsing and formatting.
/// * [`crate::fit_session::FitSession`] – owner of the seed and working records during a fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub sat_num: u32,
    pub ephemeris_type: EphemerisType,
    pub classification: char,
    pub designator: String,
    pub element_number: u32,
    pub rev_number: u32,
    values: [f64; ElementField::COUNT],
}

impl ElementRecord {
    /// Create a record with every numeric slot set to zero.
    pub fn new(sat_num: u32, ephemeris_type: EphemerisType) -> Self {
        ElementRecord {
            sat_num,
            ephemeris_type,
            classification: 'U',
            designator: String::new(),
            element_number: 0,
            rev_number: 0,
            values: [0.0; ElementField::COUNT],
        }
    }

    /// Create a record from a raw field array in [`ElementField::ALL`] order.
    ///
    /// Arguments
    /// ---------
    /// * `sat_num`: satellite number
    /// * `ephemeris_type`: propagation theory
    /// * `values`: exactly [`ElementField::COUNT`] values
    ///
    /// Return
    /// ------
    /// * the record, or [`FitError::InvalidElementLoad`] when the array has the wrong length
    pub fn from_field_array(
        sat_num: u32,
        ephemeris_type: EphemerisType,
        values: &[f64],
    ) -> Result<Self, FitError> {
        let values: [f64; ElementField::COUNT] = values.try_into().map_err(|_| {
            FitError::InvalidElementLoad(format!(
                "expected {} fields, got {}",
                ElementField::COUNT,
                values.len()
            ))
        })?;
        Ok(ElementRecord {
            values,
            ..ElementRecord::new(sat_num, ephemeris_type)
        })
    }

    /// The raw field array in [`ElementField::ALL`] order.
    pub fn field_array(&self) -> &[f64; ElementField::COUNT] {
        &self.values
    }

    pub fn epoch(&self) -> Ds50 {
        self[ElementField::Epoch]
    }

    /// Values of `fields`, in the given order.
    pub fn values_of(&self, fields: &[ElementField]) -> Vec<f64> {
        fields.iter().map(|&f| self[f]).collect()
    }

    /// Write `values` into `fields`, pairwise.
    ///
    /// Return
    /// ------
    /// * [`FitError::FieldCountMismatch`] when the lengths differ; the record is left untouched
    pub fn apply(&mut self, fields: &[ElementField], values: &[f64]) -> Result<(), FitError> {
        if fields.len() != values.len() {
            return Err(FitError::FieldCountMismatch {
                expected: fields.len(),
                got: values.len(),
            });
        }
        for (&field, &value) in fields.iter().zip(values) {
            self[field] = value;
        }
        Ok(())
    }

    /// Copy `fields` from `other` into `self`.
    pub fn copy_fields_from(&mut self, other: &ElementRecord, fields: &[ElementField]) {
        for &field in fields {
            self[field] = other[field];
        }
    }

    /// `true` when every numeric slot is finite.
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

impl Index<ElementField> for ElementRecord {
    type Output = f64;

    fn index(&self, field: ElementField) -> &f64 {
        &self.values[field.index()]
    }
}

impl IndexMut<ElementField> for ElementRecord {
    fn index_mut(&mut self, field: ElementField) -> &mut f64 {
        &mut self.values[field.index()]
    }
}

impl fmt::Display for ElementRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Element set {:05} ({}) @ epoch (ds50 UTC): {:.8}",
            self.sat_num,
            self.ephemeris_type,
            self.epoch()
        )?;
        writeln!(f, "-------------------------------------------")?;
        for field in ElementField::ALL.iter().skip(1) {
            if self.ephemeris_type.defines(*field) {
                writeln!(f, "  {:<8} = {:.10e}", field.mnemonic(), self[*field])?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod element_record_test {
    use super::*;

    #[test]
    fn test_index_by_field() {
        let mut record = ElementRecord::new(25544, EphemerisType::Type0);
        record[ElementField::MeanMotion] = 15.5;
        record[ElementField::Inclination] = 51.64;

        assert_eq!(record.field_array()[11], 15.5);
        assert_eq!(record.field_array()[6], 51.64);
        assert_eq!(
            record.values_of(&[ElementField::MeanMotion, ElementField::Inclination]),
            vec![15.5, 51.64]
        );
    }

    #[test]
    fn test_apply_and_copy() {
        let mut a = ElementRecord::new(1, EphemerisType::Type4);
        a.apply(&FIT_TYPE4, &[1., 2., 3., 4., 5., 6., 7., 8., 9.]).unwrap();
        assert_eq!(a[ElementField::BTerm], 1.0);
        assert_eq!(a[ElementField::MeanMotion], 9.0);

        assert_eq!(
            a.apply(&FIT_TYPE4, &[0.0; 3]),
            Err(FitError::FieldCountMismatch {
                expected: 9,
                got: 3
            })
        );
        assert_eq!(a[ElementField::BTerm], 1.0);

        let mut b = ElementRecord::new(1, EphemerisType::Type4);
        b.copy_fields_from(&a, &[ElementField::NDot]);
        assert_eq!(b[ElementField::NDot], 2.0);
        assert_eq!(b[ElementField::AgomGp], 0.0);
    }

    #[test]
    fn test_from_field_array() {
        let values: Vec<f64> = (0..12).map(f64::from).collect();
        let record = ElementRecord::from_field_array(7, EphemerisType::Type2, &values).unwrap();
        assert_eq!(record[ElementField::Eccentricity], 8.0);

        let err = ElementRecord::from_field_array(7, EphemerisType::Type2, &values[..5]);
        assert!(matches!(err, Err(FitError::InvalidElementLoad(_))));
    }

    #[test]
    fn test_ephemeris_type() {
        assert_eq!(EphemerisType::try_from(4).unwrap(), EphemerisType::Type4);
        assert_eq!(
            EphemerisType::try_from(3),
            Err(FitError::InvalidEphemerisType(3))
        );

        assert!(EphemerisType::Type0.defines(ElementField::BStar));
        assert!(!EphemerisType::Type0.defines(ElementField::AgomGp));
        assert!(EphemerisType::Type4.defines(ElementField::BTerm));
        assert!(!EphemerisType::Type4.defines(ElementField::BStar));

        assert_eq!(
            EphemerisType::Type2.mean_motion_kind(),
            MeanMotionKind::Brouwer
        );
        assert_eq!(EphemerisType::Type4.fit_fields().len(), 9);
    }
}
