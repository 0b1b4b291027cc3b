//! Dimensionless gamma unit hydrograph for the SC Synthetic UH method.
//!
//! Ordinates follow `UH(t) = Qp·((t/Tp)·e^(1 - t/Tp))^(n - 1)` with the shape
//! exponent `n` (Gamma_n) looked up from the basin Peak Rate Factor.

use crate::error::{Advisory, HydroError, Result};
use crate::storm::BURST_MINUTES;

/// PRF -> Gamma_n, ascending in PRF.
const PRF_GAMMA_N: [(f64, f64); 12] = [
    (50.0, 1.05),
    (100.0, 1.25),
    (156.0, 1.50),
    (237.0, 2.00),
    (298.0, 2.50),
    (349.0, 3.00),
    (393.0, 3.50),
    (433.0, 4.00),
    (470.0, 4.50),
    (484.0, 4.70),
    (504.0, 5.00),
    (566.0, 6.00),
];

/// Acres per square mile.
const ACRES_PER_SQ_MILE: f64 = 640.0;

/// Round minutes to the nearest whole burst step.
pub fn round_to_step(minutes: f64) -> f64 {
    (minutes / BURST_MINUTES).round() * BURST_MINUTES
}

/// Gamma_n for `prf` by piecewise-linear interpolation of the PRF table.
///
/// Outside the tabulated range the nearest end segment is extended and an
/// advisory is returned with the value.
pub fn gamma_n_for_prf(prf: f64) -> (f64, Option<Advisory>) {
    let last = PRF_GAMMA_N.len() - 1;
    let upper = PRF_GAMMA_N
        .iter()
        .position(|&(p, _)| prf < p)
        .unwrap_or(last)
        .clamp(1, last);

    let (p0, g0) = PRF_GAMMA_N[upper - 1];
    let (p1, g1) = PRF_GAMMA_N[upper];
    let gamma_n = g0 + (g1 - g0) / (p1 - p0) * (prf - p0);

    let extrapolated = prf < PRF_GAMMA_N[0].0 || prf > PRF_GAMMA_N[last].0;
    let advisory = extrapolated.then_some(Advisory::PrfExtrapolated { prf, gamma_n });
    (gamma_n, advisory)
}

/// Unit hydrograph parameters derived once per basin. Independent of the
/// storm duration.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitHydrograph {
    pub prf: f64,
    pub gamma_n: f64,
    /// Tc rounded to the burst step (min).
    pub adj_tc: f64,
    /// Time to peak (min), a whole number of bursts.
    pub tp: f64,
    /// Peak ordinate (cfs per inch of runoff).
    pub qp: f64,
}

impl UnitHydrograph {
    /// Derive the unit hydrograph for a basin of `area_acres` with time of
    /// concentration `tc_minutes`.
    pub fn from_basin(prf: f64, tc_minutes: f64, area_acres: f64) -> Result<(Self, Vec<Advisory>)> {
        if !(tc_minutes > 0.0) {
            return Err(HydroError::InvalidParameter {
                name: "Tc",
                value: tc_minutes,
                reason: "time of concentration must be positive",
            });
        }
        if !(area_acres > 0.0) {
            return Err(HydroError::InvalidParameter {
                name: "area",
                value: area_acres,
                reason: "basin area must be positive",
            });
        }
        if !(prf > 0.0) {
            return Err(HydroError::InvalidParameter {
                name: "PRF",
                value: prf,
                reason: "peak rate factor must be positive",
            });
        }

        let (gamma_n, advisory) = gamma_n_for_prf(prf);
        if gamma_n <= 1.0 {
            return Err(HydroError::InvalidParameter {
                name: "PRF",
                value: prf,
                reason: "extrapolated shape parameter Gamma_n must exceed 1",
            });
        }

        let adj_tc = round_to_step(tc_minutes);
        let tp = round_to_step(0.6 * adj_tc + BURST_MINUTES);
        let qp = prf * area_acres * 60.0 / (tp * ACRES_PER_SQ_MILE);

        let uh = UnitHydrograph {
            prf,
            gamma_n,
            adj_tc,
            tp,
            qp,
        };
        Ok((uh, advisory.into_iter().collect()))
    }

    /// Ordinate (cfs/in) at `minutes` after the burst.
    pub fn ordinate(&self, minutes: f64) -> f64 {
        if minutes <= 0.0 {
            return 0.0;
        }
        let ratio = minutes / self.tp;
        self.qp * (ratio * (1.0 - ratio).exp()).powf(self.gamma_n - 1.0)
    }

    /// Ordinates at every burst boundary `0..=steps`.
    pub fn ordinates(&self, steps: usize) -> Vec<f64> {
        (0..=steps)
            .map(|i| self.ordinate(i as f64 * BURST_MINUTES))
            .collect()
    }

    /// Burst index of the peak ordinate.
    pub fn peak_step(&self) -> usize {
        (self.tp / BURST_MINUTES).round() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gamma_n_at_table_nodes() {
        for (prf, gamma) in PRF_GAMMA_N {
            let (g, advisory) = gamma_n_for_prf(prf);
            assert_relative_eq!(g, gamma, epsilon = 1e-12);
            assert!(advisory.is_none());
        }
    }

    #[test]
    fn test_gamma_n_interpolates() {
        let (g, _) = gamma_n_for_prf(216.0);
        assert_relative_eq!(g, 1.5 + 0.5 * 60.0 / 81.0, epsilon = 1e-12);
        let (g, _) = gamma_n_for_prf(240.0);
        assert_relative_eq!(g, 2.0 + 0.5 * 3.0 / 61.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gamma_n_extrapolates_with_advisory() {
        let (g, advisory) = gamma_n_for_prf(600.0);
        assert_relative_eq!(g, 5.0 + (1.0 / 62.0) * 96.0, epsilon = 1e-12);
        assert!(matches!(advisory, Some(Advisory::PrfExtrapolated { .. })));

        let (g, advisory) = gamma_n_for_prf(45.0);
        assert!(g < 1.05);
        assert!(advisory.is_some());
    }

    #[test]
    fn test_parameters_for_reference_basin() {
        let (uh, advisories) = UnitHydrograph::from_basin(240.0, 64.5, 100.0).unwrap();
        assert!(advisories.is_empty());
        assert_relative_eq!(uh.adj_tc, 66.0);
        assert_relative_eq!(uh.tp, 48.0);
        assert_relative_eq!(uh.qp, 240.0 * 100.0 * 60.0 / (48.0 * 640.0));
        assert_eq!(uh.peak_step(), 8);
    }

    #[test]
    fn test_single_maximum_at_time_to_peak() {
        let (uh, _) = UnitHydrograph::from_basin(240.0, 64.5, 100.0).unwrap();
        let ords = uh.ordinates(480);
        assert_eq!(ords[0], 0.0);

        let (peak_idx, &peak) = ords
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert_eq!(peak_idx, uh.peak_step());
        assert_relative_eq!(peak, uh.qp, epsilon = 1e-9);

        assert!(ords[..=peak_idx].windows(2).all(|w| w[1] >= w[0]));
        assert!(ords[peak_idx..].windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_degenerate_tc_is_fatal() {
        assert!(UnitHydrograph::from_basin(240.0, 0.0, 100.0).is_err());
        assert!(UnitHydrograph::from_basin(240.0, -5.0, 100.0).is_err());
    }
}
