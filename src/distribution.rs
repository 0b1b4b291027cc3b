//! Dimensionless cumulative rainfall distributions.
//!
//! Curves are keyed by the regional distribution letter and the storm
//! duration and sampled at every burst boundary over `[0, D]`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{HydroError, Result};
use crate::storm::StormDuration;

/// Regional rainfall distribution curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistributionCurve {
    TypeII,
    TypeIII,
    NoaaA,
    NoaaB,
    NoaaC,
    NoaaD,
}

/// Letter, curve number in the SC Synthetic UH workbook.
const CURVE_NUMBERS: [(DistributionCurve, &str, u8); 6] = [
    (DistributionCurve::TypeII, "II", 2),
    (DistributionCurve::TypeIII, "III", 3),
    (DistributionCurve::NoaaA, "A", 4),
    (DistributionCurve::NoaaB, "B", 5),
    (DistributionCurve::NoaaC, "C", 6),
    (DistributionCurve::NoaaD, "D", 7),
];

impl DistributionCurve {
    pub fn letter(self) -> &'static str {
        CURVE_NUMBERS
            .iter()
            .find(|(curve, _, _)| *curve == self)
            .map(|(_, letter, _)| *letter)
            .unwrap_or_default()
    }

    /// Curve number used by the workbook (II = 2, III = 3, NOAA A..D = 4..7).
    pub fn curve_number(self) -> u8 {
        CURVE_NUMBERS
            .iter()
            .find(|(curve, _, _)| *curve == self)
            .map(|(_, _, number)| *number)
            .unwrap_or_default()
    }
}

impl FromStr for DistributionCurve {
    type Err = HydroError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_uppercase();
        let key = key
            .strip_prefix("TYPE")
            .or_else(|| key.strip_prefix("NOAA"))
            .unwrap_or(&key)
            .trim();
        CURVE_NUMBERS
            .iter()
            .find(|(_, letter, _)| *letter == key)
            .map(|(curve, _, _)| *curve)
            .ok_or_else(|| HydroError::UnknownDistribution(s.to_string()))
    }
}

impl fmt::Display for DistributionCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionCurve::TypeII | DistributionCurve::TypeIII => {
                write!(f, "Type {}", self.letter())
            }
            _ => write!(f, "NOAA {}", self.letter()),
        }
    }
}

/// Cumulative rainfall fractions by curve and duration. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct DistributionTable {
    curves: HashMap<(DistributionCurve, StormDuration), Vec<f64>>,
}

impl DistributionTable {
    pub fn new() -> Self {
        DistributionTable {
            curves: HashMap::new(),
        }
    }

    /// Add one curve. It must hold `D·10 + 1` non-decreasing values in `[0, 1]`.
    pub fn insert(
        &mut self,
        curve: DistributionCurve,
        duration: StormDuration,
        fractions: Vec<f64>,
    ) -> Result<()> {
        let invalid = |message: String| HydroError::InvalidDistributionCurve {
            curve: curve.to_string(),
            duration,
            message,
        };

        let expected = duration.rain_bursts() + 1;
        if fractions.len() != expected {
            return Err(invalid(format!(
                "expected {} ordinates, found {}",
                expected,
                fractions.len()
            )));
        }
        if let Some(i) = fractions.iter().position(|f| !(0.0..=1.0).contains(f)) {
            return Err(invalid(format!(
                "fraction {} at index {} is outside [0, 1]",
                fractions[i], i
            )));
        }
        if let Some(i) = fractions.windows(2).position(|w| w[1] < w[0]) {
            return Err(invalid(format!("fraction decreases at index {}", i + 1)));
        }

        self.curves.insert((curve, duration), fractions);
        Ok(())
    }

    pub fn fractions(&self, curve: DistributionCurve, duration: StormDuration) -> Result<&[f64]> {
        self.curves
            .get(&(curve, duration))
            .map(Vec::as_slice)
            .ok_or_else(|| HydroError::MissingDistributionCurve {
                curve: curve.to_string(),
                duration,
            })
    }

    /// Confirm every storm duration is present for `curve`.
    pub fn check_complete(&self, curve: DistributionCurve) -> Result<()> {
        for duration in StormDuration::ALL {
            self.fractions(curve, duration)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}
