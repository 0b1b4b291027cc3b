//! Basin hydrograph synthesis: burst generation and unit hydrograph
//! convolution for each of the six design storms.

use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::distribution::{DistributionCurve, DistributionTable};
use crate::error::{Advisory, Result};
use crate::storm::{
    AdjustmentPolicy, RainfallDepths, Retention, STEP_SECONDS, StormDuration, StormEvent,
    WINDOW_STEPS, elapsed_hours,
};
use crate::unit_hydrograph::UnitHydrograph;

/// Everything the synthesis engine needs for one basin and one AEP.
#[derive(Debug, Clone)]
pub struct SynthesisInputs {
    pub area_acres: f64,
    pub tc_minutes: f64,
    pub prf: f64,
    /// Unadjusted 24-hour retention.
    pub retention: Retention,
    pub depths: RainfallDepths,
    pub curve: DistributionCurve,
    pub adjustment: AdjustmentPolicy,
}

/// Outflow hydrograph of the basin for one storm duration.
#[derive(Debug, Clone)]
pub struct BasinHydrograph {
    pub duration: StormDuration,
    /// Discharge (cfs) at each burst boundary of the common window.
    pub flows: Vec<f64>,
    pub peak_flow: f64,
    pub peak_step: usize,
}

impl BasinHydrograph {
    pub fn from_flows(duration: StormDuration, flows: Vec<f64>) -> Self {
        let (peak_step, peak_flow) = first_maximum(&flows);
        BasinHydrograph {
            duration,
            flows,
            peak_flow,
            peak_step,
        }
    }

    pub fn peak_time_hours(&self) -> f64 {
        elapsed_hours(self.peak_step)
    }

    /// Volume (cubic feet) under the hydrograph, trapezoidal rule.
    pub fn volume_cubic_feet(&self) -> f64 {
        self.flows
            .windows(2)
            .map(|w| 0.5 * (w[0] + w[1]) * STEP_SECONDS)
            .sum()
    }
}

/// Index and value of the first largest element.
pub(crate) fn first_maximum(values: &[f64]) -> (usize, f64) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| {
            if v > best.1 { (i, v) } else { best }
        })
}

/// Discrete unit hydrograph convolution.
///
/// Burst `k` contributes `bursts[k]·uh[j - k]` to ordinate `j`. The output
/// holds `len` ordinates; contributions past the end are dropped.
pub fn convolve(bursts: &[f64], uh: &[f64], len: usize) -> Vec<f64> {
    let mut flows = vec![0.0; len];
    for (k, &burst) in bursts.iter().enumerate() {
        if burst == 0.0 {
            continue;
        }
        for (flow, &ordinate) in flows.iter_mut().skip(k).zip(uh) {
            *flow += burst * ordinate;
        }
    }
    flows
}

/// Convolve one storm's bursts with the unit hydrograph ordinates over the
/// common window.
pub fn synthesize_storm(storm: &StormEvent, uh_ordinates: &[f64]) -> BasinHydrograph {
    let flows = convolve(&storm.bursts, uh_ordinates, WINDOW_STEPS + 1);
    BasinHydrograph::from_flows(storm.duration, flows)
}

/// Per-duration synthesis output.
#[derive(Debug, Clone)]
pub struct StormResult {
    pub storm: StormEvent,
    pub hydrograph: BasinHydrograph,
}

/// Hydrographs for all six durations plus the critical durations.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub unit_hydrograph: UnitHydrograph,
    /// Ascending by duration.
    pub storms: Vec<StormResult>,
    /// Duration with the largest runoff volume.
    pub critical_volume: StormDuration,
    /// Duration with the largest peak discharge.
    pub critical_peak: StormDuration,
    pub advisories: Vec<Advisory>,
}

impl SynthesisResult {
    pub fn hydrographs(&self) -> impl Iterator<Item = &BasinHydrograph> {
        self.storms.iter().map(|s| &s.hydrograph)
    }

    pub fn get(&self, duration: StormDuration) -> Option<&StormResult> {
        self.storms.iter().find(|s| s.storm.duration == duration)
    }
}

/// First duration, in ascending order, with the strictly largest key.
fn critical_duration(storms: &[StormResult], key: impl Fn(&StormResult) -> f64) -> StormDuration {
    let keys: Vec<f64> = storms.iter().map(&key).collect();
    let (idx, _) = first_maximum(&keys);
    storms
        .get(idx)
        .map(|s| s.storm.duration)
        .unwrap_or(StormDuration::TwentyFourHour)
}

fn run_storm(
    inputs: &SynthesisInputs,
    table: &DistributionTable,
    duration: StormDuration,
    uh_ordinates: &[f64],
) -> Result<StormResult> {
    let retention = inputs
        .adjustment
        .adjust(duration, &inputs.depths, &inputs.retention)?;
    let fractions = table.fractions(inputs.curve, duration)?;
    let storm = StormEvent::new(duration, inputs.depths.depth(duration), retention, fractions)?;
    let hydrograph = synthesize_storm(&storm, uh_ordinates);

    debug!(
        duration = %duration,
        cn = retention.cn,
        runoff_in = storm.runoff_depth(),
        peak_cfs = hydrograph.peak_flow,
        "storm synthesized"
    );
    Ok(StormResult { storm, hydrograph })
}

/// Synthesize basin hydrographs for all six durations in parallel.
pub fn process_synthesis_parallel(
    inputs: &SynthesisInputs,
    table: &DistributionTable,
    pb: &ProgressBar,
) -> Result<SynthesisResult> {
    inputs.depths.validate()?;
    table.check_complete(inputs.curve)?;

    let (unit_hydrograph, advisories) =
        UnitHydrograph::from_basin(inputs.prf, inputs.tc_minutes, inputs.area_acres)?;
    for advisory in &advisories {
        warn!("{}", advisory);
    }
    info!(
        gamma_n = unit_hydrograph.gamma_n,
        tp_min = unit_hydrograph.tp,
        qp_cfs = unit_hydrograph.qp,
        "unit hydrograph parameters"
    );

    let uh_ordinates = unit_hydrograph.ordinates(WINDOW_STEPS);

    let mut storms = StormDuration::ALL
        .par_iter()
        .map(|&duration| {
            let result = run_storm(inputs, table, duration, &uh_ordinates);
            pb.inc(1);
            result
        })
        .collect::<Result<Vec<_>>>()?;
    storms.sort_by_key(|s| s.storm.duration);

    let critical_volume = critical_duration(&storms, |s| s.storm.runoff_depth());
    let critical_peak = critical_duration(&storms, |s| s.hydrograph.peak_flow);

    Ok(SynthesisResult {
        unit_hydrograph,
        storms,
        critical_volume,
        critical_peak,
        advisories,
    })
}
