//! Hue family membership
//!
//! A [`ColorRange`] describes the HSL region a sprite family's team color
//! occupies. Families that straddle the 0°/360° seam (reds) use a second hue
//! interval; membership is the OR of both intervals, no modular arithmetic.

use std::fmt;
use std::hash::{Hash, Hasher};

use thiserror::Error;

use crate::hsl::Hsl;

/// Error type for invalid range bounds
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangeError {
    /// min > max for one of the intervals
    #[error("{what} interval is inverted: min {min} > max {max}")]
    Inverted { what: &'static str, min: f64, max: f64 },
    /// A bound lies outside its channel's domain
    #[error("{what} bound {value} is outside 0..={limit}")]
    OutOfDomain { what: &'static str, value: f64, limit: f64 },
}

/// HSL bounds for one sprite family. All intervals are closed.
///
/// Equality and hashing compare the exact bounds, so a range can be part of a
/// cache key.
#[derive(Debug, Clone)]
pub struct ColorRange {
    hue: (f64, f64),
    hue2: Option<(f64, f64)>,
    saturation: (f64, f64),
    lightness: (f64, f64),
}

impl ColorRange {
    /// Create a validated range from `[min, max]` pairs.
    ///
    /// Hue bounds are degrees in `0..=360`; saturation and lightness are
    /// percentages in `0..=100`.
    ///
    /// # Errors
    ///
    /// Returns `RangeError` if an interval is inverted or a bound is out of
    /// its domain.
    pub fn new(hue: [f64; 2], saturation: [f64; 2], lightness: [f64; 2]) -> Result<Self, RangeError> {
        check_interval("hue", hue, 360.0)?;
        check_interval("saturation", saturation, 100.0)?;
        check_interval("lightness", lightness, 100.0)?;
        Ok(Self {
            hue: (hue[0], hue[1]),
            hue2: None,
            saturation: (saturation[0], saturation[1]),
            lightness: (lightness[0], lightness[1]),
        })
    }

    /// Add the second hue interval used for families spanning the seam.
    ///
    /// # Errors
    ///
    /// Returns `RangeError` if the interval is inverted or outside `0..=360`.
    pub fn with_second_hue(mut self, hue2: [f64; 2]) -> Result<Self, RangeError> {
        check_interval("second hue", hue2, 360.0)?;
        self.hue2 = Some((hue2[0], hue2[1]));
        Ok(self)
    }

    /// Built-in ranges are authored as constants and checked by tests.
    pub(crate) const fn from_bounds(
        hue: (f64, f64),
        hue2: Option<(f64, f64)>,
        saturation: (f64, f64),
        lightness: (f64, f64),
    ) -> Self {
        Self { hue, hue2, saturation, lightness }
    }

    pub fn hue(&self) -> (f64, f64) {
        self.hue
    }

    pub fn second_hue(&self) -> Option<(f64, f64)> {
        self.hue2
    }

    pub fn saturation(&self) -> (f64, f64) {
        self.saturation
    }

    pub fn lightness(&self) -> (f64, f64) {
        self.lightness
    }

    /// Check whether an HSL color belongs to this family.
    pub fn contains(&self, hsl: Hsl) -> bool {
        in_range(hsl.h, hsl.s, hsl.l, self)
    }

    /// Bit patterns of every bound. Bounds are never NaN; `+ 0.0` folds -0 into 0.
    fn bits(&self) -> [u64; 9] {
        let bit = |v: f64| (v + 0.0).to_bits();
        let (hue2_set, hue2) = match self.hue2 {
            Some(hue2) => (1, hue2),
            None => (0, (0.0, 0.0)),
        };
        [
            bit(self.hue.0),
            bit(self.hue.1),
            hue2_set,
            bit(hue2.0),
            bit(hue2.1),
            bit(self.saturation.0),
            bit(self.saturation.1),
            bit(self.lightness.0),
            bit(self.lightness.1),
        ]
    }
}

impl PartialEq for ColorRange {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for ColorRange {}

impl Hash for ColorRange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

impl fmt::Display for ColorRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hue {}-{}", self.hue.0, self.hue.1)?;
        if let Some((min, max)) = self.hue2 {
            write!(f, " | {}-{}", min, max)?;
        }
        write!(
            f,
            ", sat {}-{}%, light {}-{}%",
            self.saturation.0, self.saturation.1, self.lightness.0, self.lightness.1
        )
    }
}

/// Decide whether `(h, s, l)` falls inside `range`.
///
/// Saturation and lightness are checked first; then the hue must fall in the
/// primary interval or, when present, the second one.
///
/// # Examples
///
/// ```
/// use spritetint::range::{in_range, ColorRange};
///
/// let reds = ColorRange::new([0.0, 25.0], [30.0, 100.0], [20.0, 80.0])
///     .unwrap()
///     .with_second_hue([335.0, 360.0])
///     .unwrap();
/// assert!(in_range(350.0, 80.0, 50.0, &reds));
/// assert!(!in_range(180.0, 80.0, 50.0, &reds));
/// ```
pub fn in_range(h: f64, s: f64, l: f64, range: &ColorRange) -> bool {
    if !within(s, range.saturation) || !within(l, range.lightness) {
        return false;
    }

    within(h, range.hue) || range.hue2.is_some_and(|hue2| within(h, hue2))
}

fn within(value: f64, (min, max): (f64, f64)) -> bool {
    value >= min && value <= max
}

fn check_interval(what: &'static str, [min, max]: [f64; 2], limit: f64) -> Result<(), RangeError> {
    for value in [min, max] {
        if !(0.0..=limit).contains(&value) {
            return Err(RangeError::OutOfDomain { what, value, limit });
        }
    }
    if min > max {
        return Err(RangeError::Inverted { what, min, max });
    }
    Ok(())
}
