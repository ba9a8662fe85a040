//! Threshold pair and ramp rounding configuration.

use crate::error::{Error, Result};

/// Default low threshold: brightness below this becomes fully transparent.
pub const DEFAULT_LOW: u8 = 10;

/// Default high threshold: brightness above this stays fully opaque.
pub const DEFAULT_HIGH: u8 = 40;

/// A validated `(low, high)` brightness pair with `low < high`.
///
/// Brightness values below `low` map to alpha 0, values above `high` map to
/// alpha 255, and `low..=high` is the linear ramp in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    low: u8,
    high: u8,
}

impl Thresholds {
    /// Create a threshold pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `low >= high`, since the
    /// ramp width would be zero or negative.
    pub fn new(low: u8, high: u8) -> Result<Self> {
        if low >= high {
            return Err(Error::InvalidConfiguration {
                low: i64::from(low),
                high: i64::from(high),
                reason: "low must be below high",
            });
        }
        Ok(Self { low, high })
    }

    /// Lower bound of the ramp.
    #[must_use]
    pub fn low(self) -> u8 {
        self.low
    }

    /// Upper bound of the ramp.
    #[must_use]
    pub fn high(self) -> u8 {
        self.high
    }

    /// Width of the ramp, always at least 1.
    #[must_use]
    pub fn span(self) -> u8 {
        self.high - self.low
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low: DEFAULT_LOW,
            high: DEFAULT_HIGH,
        }
    }
}

impl TryFrom<(i64, i64)> for Thresholds {
    type Error = Error;

    /// Validate an untyped pair, e.g. one parsed from the command line.
    fn try_from((low, high): (i64, i64)) -> Result<Self> {
        let out_of_range = || Error::InvalidConfiguration {
            low,
            high,
            reason: "thresholds must lie within 0..=255",
        };
        let low_u8 = u8::try_from(low).map_err(|_| out_of_range())?;
        let high_u8 = u8::try_from(high).map_err(|_| out_of_range())?;
        Self::new(low_u8, high_u8)
    }
}

/// How the fractional ramp value is turned into an 8-bit alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RampRounding {
    /// Round half away from zero, so the midpoint of a 30-wide ramp is 128.
    #[default]
    Nearest,
    /// Drop the fractional part, matching a plain integer cast.
    Truncate,
}

impl RampRounding {
    /// Convert a ramp value to `u8`, clamping to `0..=255`.
    #[must_use]
    pub fn to_u8(self, value: f32) -> u8 {
        let value = match self {
            Self::Nearest => value.round(),
            Self::Truncate => value.trunc(),
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            value.clamp(0.0, 255.0) as u8
        }
    }
}

/// Options for a compositor or matte job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatteOptions {
    /// Brightness thresholds.
    pub thresholds: Thresholds,
    /// Ramp rounding policy.
    pub rounding: RampRounding,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_are_ten_and_forty() {
        let t = Thresholds::default();
        assert_eq!(t.low(), 10);
        assert_eq!(t.high(), 40);
        assert_eq!(t.span(), 30);
    }

    #[test]
    fn equal_or_inverted_thresholds_are_rejected() {
        assert!(matches!(
            Thresholds::new(20, 20),
            Err(Error::InvalidConfiguration { low: 20, high: 20, .. })
        ));
        assert!(matches!(
            Thresholds::new(40, 10),
            Err(Error::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn full_range_is_accepted() {
        let t = Thresholds::new(0, 255).unwrap();
        assert_eq!(t.span(), 255);
    }

    #[test]
    fn untyped_pairs_outside_byte_range_are_rejected() {
        assert!(Thresholds::try_from((-1, 40)).is_err());
        assert!(Thresholds::try_from((10, 256)).is_err());
        assert!(Thresholds::try_from((50, 40)).is_err());
        assert_eq!(
            Thresholds::try_from((10, 40)).unwrap(),
            Thresholds::default()
        );
    }

    #[test]
    fn rounding_policies_differ_only_on_fractions() {
        assert_eq!(RampRounding::Nearest.to_u8(127.5), 128);
        assert_eq!(RampRounding::Truncate.to_u8(127.5), 127);
        assert_eq!(RampRounding::Nearest.to_u8(127.4), 127);
        assert_eq!(RampRounding::Truncate.to_u8(255.0), 255);
    }

    #[test]
    fn rounding_clamps_out_of_range_values() {
        assert_eq!(RampRounding::Nearest.to_u8(-3.0), 0);
        assert_eq!(RampRounding::Nearest.to_u8(300.0), 255);
        assert_eq!(RampRounding::Truncate.to_u8(255.9), 255);
    }
}
