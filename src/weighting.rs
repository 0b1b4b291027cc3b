//! Basin-wide PRF and CN from sub-area values.

use serde::Deserialize;

use crate::error::{HydroError, Result};
use crate::storm::{Retention, cn_from_rainfall_runoff};

/// A sub-area value (CN or PRF) and its area in any consistent unit.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SubArea {
    pub value: f64,
    pub area: f64,
}

/// How sub-area curve numbers are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CnWeighting {
    Area,
    Runoff,
}

impl std::str::FromStr for CnWeighting {
    type Err = HydroError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "area" => Ok(CnWeighting::Area),
            "runoff" => Ok(CnWeighting::Runoff),
            _ => Err(HydroError::UnknownCnWeighting(s.to_string())),
        }
    }
}

fn total_area(subareas: &[SubArea]) -> Result<f64> {
    let total: f64 = subareas.iter().map(|s| s.area).sum();
    if subareas.is_empty() || total <= 0.0 {
        return Err(HydroError::InvalidParameter {
            name: "sub-area total",
            value: total,
            reason: "sub-areas must cover a positive area",
        });
    }
    Ok(total)
}

/// Area-weighted average of the sub-area values.
pub fn area_weighted(subareas: &[SubArea]) -> Result<f64> {
    let total = total_area(subareas)?;
    Ok(subareas.iter().map(|s| s.value * s.area).sum::<f64>() / total)
}

/// Runoff-weighted CN for the 24-hour depth `p24`.
///
/// Each sub-area's 24-hour runoff is area-averaged and the CN that yields
/// that runoff from `p24` is returned.
pub fn runoff_weighted_cn(subareas: &[SubArea], p24: f64) -> Result<f64> {
    let total = total_area(subareas)?;
    let mut weighted_runoff = 0.0;
    for sub in subareas {
        let q = if sub.value > 0.0 {
            Retention::from_cn(sub.value)?.runoff(p24)
        } else {
            0.0
        };
        weighted_runoff += sub.area * q;
    }
    let cn = cn_from_rainfall_runoff(p24, weighted_runoff / total);
    Ok(cn.max(0.0))
}

/// Composite retention for the basin under the chosen weighting.
pub fn weighted_retention(subareas: &[SubArea], weighting: CnWeighting, p24: f64) -> Result<Retention> {
    let cn = match weighting {
        CnWeighting::Area => area_weighted(subareas)?,
        CnWeighting::Runoff => runoff_weighted_cn(subareas, p24)?,
    };
    Retention::from_cn(cn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn halves(a: f64, b: f64) -> Vec<SubArea> {
        vec![
            SubArea { value: a, area: 50.0 },
            SubArea { value: b, area: 50.0 },
        ]
    }

    #[test]
    fn test_area_weighted_prf() {
        assert_relative_eq!(area_weighted(&halves(180.0, 300.0)).unwrap(), 240.0);
    }

    #[test]
    fn test_uniform_cn_is_unchanged_by_runoff_weighting() {
        let cn = runoff_weighted_cn(&halves(78.0, 78.0), 5.2).unwrap();
        assert_relative_eq!(cn, 78.0, epsilon = 1e-9);
    }

    #[test]
    fn test_runoff_weighting_favours_impervious_area() {
        let subareas = halves(55.0, 98.0);
        let by_area = area_weighted(&subareas).unwrap();
        let by_runoff = runoff_weighted_cn(&subareas, 3.0).unwrap();
        assert!(by_runoff > by_area);
    }

    #[test]
    fn test_empty_subareas_rejected() {
        assert!(area_weighted(&[]).is_err());
    }
}
