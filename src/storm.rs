//! Design storms, burst discretization and the Curve Number runoff transform.
//!
//! Rainfall, runoff and hydrograph ordinates all share one fixed 6-minute
//! burst step. A storm of nominal duration `D` rains over `[0, D]` hours and
//! its burst series is carried out to `2·D` hours so the unit hydrograph tail
//! is captured; every hydrograph is finally laid on the common 48-hour window
//! of the longest storm so durations can be compared ordinate by ordinate.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{HydroError, Result};

/// Burst step in minutes.
pub const BURST_MINUTES: f64 = 6.0;
/// Bursts per hour of storm.
pub const BURSTS_PER_HOUR: usize = 10;
/// Routing interval in seconds (one burst).
pub const STEP_SECONDS: f64 = BURST_MINUTES * 60.0;
/// Steps in the common extended window (2 x 24 hours).
pub const WINDOW_STEPS: usize = 2 * 24 * BURSTS_PER_HOUR;

/// Elapsed time in hours at the start of burst `step`.
pub fn elapsed_hours(step: usize) -> f64 {
    step as f64 * BURST_MINUTES / 60.0
}

/// The six standard design storm durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StormDuration {
    OneHour,
    TwoHour,
    ThreeHour,
    SixHour,
    TwelveHour,
    TwentyFourHour,
}

impl StormDuration {
    /// All durations in ascending order.
    pub const ALL: [StormDuration; 6] = [
        StormDuration::OneHour,
        StormDuration::TwoHour,
        StormDuration::ThreeHour,
        StormDuration::SixHour,
        StormDuration::TwelveHour,
        StormDuration::TwentyFourHour,
    ];

    pub fn hours(self) -> usize {
        match self {
            StormDuration::OneHour => 1,
            StormDuration::TwoHour => 2,
            StormDuration::ThreeHour => 3,
            StormDuration::SixHour => 6,
            StormDuration::TwelveHour => 12,
            StormDuration::TwentyFourHour => 24,
        }
    }

    pub fn from_hours(hours: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.hours() == hours)
    }

    /// Number of raining bursts, `D x 10`.
    pub fn rain_bursts(self) -> usize {
        self.hours() * BURSTS_PER_HOUR
    }

    /// Number of bursts in the extended `2·D` window.
    pub fn window_bursts(self) -> usize {
        2 * self.rain_bursts()
    }

    /// Column label used in output files, e.g. `6_hour`.
    pub fn label(self) -> String {
        format!("{}_hour", self.hours())
    }
}

impl fmt::Display for StormDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-hour", self.hours())
    }
}

/// Rainfall depth (inches) for each storm duration at one AEP.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RainfallDepths {
    pub d1: f64,
    pub d2: f64,
    pub d3: f64,
    pub d6: f64,
    pub d12: f64,
    pub d24: f64,
}

impl RainfallDepths {
    pub fn depth(&self, duration: StormDuration) -> f64 {
        match duration {
            StormDuration::OneHour => self.d1,
            StormDuration::TwoHour => self.d2,
            StormDuration::ThreeHour => self.d3,
            StormDuration::SixHour => self.d6,
            StormDuration::TwelveHour => self.d12,
            StormDuration::TwentyFourHour => self.d24,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for duration in StormDuration::ALL {
            let depth = self.depth(duration);
            if !(depth > 0.0) {
                return Err(HydroError::InvalidParameter {
                    name: "rainfall depth",
                    value: depth,
                    reason: "depths must be positive inches",
                });
            }
        }
        Ok(())
    }
}

/// Curve Number infiltration parameters: CN, retention S and initial
/// abstraction Ia, the latter two in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Retention {
    pub cn: f64,
    pub s: f64,
    pub ia: f64,
}

impl Retention {
    /// Derive S = 1000/CN - 10 and Ia = 0.2·S.
    pub fn from_cn(cn: f64) -> Result<Self> {
        if !(cn > 0.0 && cn <= 100.0) {
            return Err(HydroError::InvalidParameter {
                name: "CN",
                value: cn,
                reason: "curve number must be in (0, 100]",
            });
        }
        let s = 1000.0 / cn - 10.0;
        Ok(Retention { cn, s, ia: 0.2 * s })
    }

    /// Explicit S and Ia; CN is back-computed from S.
    pub fn from_s_ia(s: f64, ia: f64) -> Result<Self> {
        if s < 0.0 || ia < 0.0 {
            return Err(HydroError::InvalidParameter {
                name: "S/Ia",
                value: s.min(ia),
                reason: "retention and initial abstraction must be non-negative",
            });
        }
        Ok(Retention {
            cn: 1000.0 / (s + 10.0),
            s,
            ia,
        })
    }

    /// Cumulative runoff depth for cumulative rainfall `p`.
    pub fn runoff(&self, p: f64) -> f64 {
        runoff_depth(p, self.s, self.ia)
    }
}

/// Curve Number excess: `max(0, P - Ia)² / (P + 0.8·S)`.
pub fn runoff_depth(p: f64, s: f64, ia: f64) -> f64 {
    let excess = (p - ia).max(0.0);
    if excess == 0.0 {
        return 0.0;
    }
    excess * excess / (p + 0.8 * s)
}

/// Curve number that reproduces runoff `q` from rainfall `p` under Ia = 0.2·S.
pub fn cn_from_rainfall_runoff(p: f64, q: f64) -> f64 {
    let cn = 1000.0 / (10.0 + 5.0 * p + 10.0 * q - 10.0 * (q * q + 1.25 * p * q).sqrt());
    cn.min(100.0)
}

/// How the 24-hour retention is adapted to a shorter storm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentPolicy {
    /// Re-derive CN from the duration's own rainfall depth, with runoff taken
    /// against the unadjusted 24-hour S and Ia. CN is unchanged whenever P_D > Ia.
    A,
    /// Spread the 24-hour infiltration loss proportionally over the duration
    /// and re-derive CN from the remaining runoff.
    B,
}

impl FromStr for AdjustmentPolicy {
    type Err = HydroError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(AdjustmentPolicy::A),
            "B" => Ok(AdjustmentPolicy::B),
            _ => Err(HydroError::UnknownAdjustmentPolicy(s.to_string())),
        }
    }
}

impl AdjustmentPolicy {
    /// Duration-adjusted retention for a storm of `duration`.
    ///
    /// `base` is the unadjusted 24-hour retention and `depths` supplies both
    /// the duration's depth and the 24-hour total.
    pub fn adjust(
        self,
        duration: StormDuration,
        depths: &RainfallDepths,
        base: &Retention,
    ) -> Result<Retention> {
        let p = depths.depth(duration);
        let q = match self {
            // Runoff from the duration depth against the unadjusted 24-hour S and Ia.
            AdjustmentPolicy::A => base.runoff(p),
            AdjustmentPolicy::B => {
                let p24 = depths.d24;
                let loss_24 = p24 - base.runoff(p24);
                let loss = loss_24 * duration.hours() as f64 / 24.0;
                (p - loss).max(0.0)
            }
        };
        Retention::from_cn(cn_from_rainfall_runoff(p, q))
    }
}

/// One design storm: depth, adjusted retention and the burst series.
#[derive(Debug, Clone)]
pub struct StormEvent {
    pub duration: StormDuration,
    pub rainfall_depth: f64,
    pub retention: Retention,
    /// Cumulative runoff (in) at each burst boundary, `0..=2·D·10`.
    pub cumulative_runoff: Vec<f64>,
    /// Runoff increment (in) of each burst, `2·D·10` values.
    pub bursts: Vec<f64>,
}

impl StormEvent {
    /// Build the burst series from a cumulative rainfall fraction curve.
    ///
    /// `fractions` holds the cumulative fraction at each burst boundary over
    /// `[0, D]`; past its end the storm is over and the fraction stays at
    /// its final value.
    pub fn new(
        duration: StormDuration,
        rainfall_depth: f64,
        retention: Retention,
        fractions: &[f64],
    ) -> Result<Self> {
        let final_fraction = *fractions.last().ok_or(HydroError::MissingParameter(
            "cumulative rainfall fractions",
        ))?;

        let cumulative_runoff: Vec<f64> = (0..=duration.window_bursts())
            .map(|i| {
                let fraction = fractions.get(i).copied().unwrap_or(final_fraction);
                retention.runoff(fraction * rainfall_depth)
            })
            .collect();

        let bursts = cumulative_runoff
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).max(0.0))
            .collect();

        Ok(StormEvent {
            duration,
            rainfall_depth,
            retention,
            cumulative_runoff,
            bursts,
        })
    }

    /// Total runoff depth Q_CN (in) for the storm.
    pub fn runoff_depth(&self) -> f64 {
        self.cumulative_runoff.last().copied().unwrap_or(0.0)
    }
}
