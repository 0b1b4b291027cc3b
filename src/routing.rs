use crate::error::Advisory;
use crate::pond::{PondStageTable, StageRow};
use crate::state::RoutingState;
use crate::storm::{StormDuration, elapsed_hours};
use crate::synthesis::{BasinHydrograph, first_maximum};
use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::{debug, warn};

/// Outflow and stage read from the stage table at one routing variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StagePoint {
    pub outflow: f64,
    pub stage: f64,
}

/// Find the rows bracketing `x` in the routing-variable column and linearly
/// interpolate outflow and stage.
///
/// Returns `None` past the last tabulated row; routing above the modeled
/// depth is not extrapolated. Below the first row the first row is returned,
/// so outflow and stage never go negative. Values at a node return that row
/// exactly.
pub fn interpolate_stage(rows: &[StageRow], x: f64) -> Option<StagePoint> {
    let first = rows.first()?;
    let last = rows.last()?;
    if x <= first.routing_variable {
        return Some(StagePoint {
            outflow: first.discharge,
            stage: first.stage,
        });
    }
    if !(x <= last.routing_variable) {
        return None;
    }
    let upper = match rows.iter().skip(1).position(|r| x < r.routing_variable) {
        Some(offset) => offset + 1,
        None => {
            return Some(StagePoint {
                outflow: last.discharge,
                stage: last.stage,
            });
        }
    };

    let lo = &rows[upper - 1];
    let hi = &rows[upper];
    let span = hi.routing_variable - lo.routing_variable;
    if span <= 0.0 {
        return Some(StagePoint {
            outflow: lo.discharge,
            stage: lo.stage,
        });
    }
    let dx = x - lo.routing_variable;
    Some(StagePoint {
        outflow: lo.discharge + (hi.discharge - lo.discharge) / span * dx,
        stage: lo.stage + (hi.stage - lo.stage) / span * dx,
    })
}

/// Routed outflow for one storm duration, aligned with its inflow.
#[derive(Debug, Clone)]
pub struct RoutedHydrograph {
    pub duration: StormDuration,
    pub inflows: Vec<f64>,
    /// `None` where the routing variable exceeded the stage table.
    pub outflows: Vec<Option<f64>>,
    pub stages: Vec<Option<f64>>,
    pub peak_inflow: f64,
    pub peak_inflow_step: usize,
    pub peak_outflow: f64,
    pub peak_outflow_step: usize,
    pub peak_stage: f64,
    /// Steps whose outflow could not be read from the table.
    pub out_of_range_steps: Vec<usize>,
}

impl RoutedHydrograph {
    pub fn time_of_peak_inflow(&self) -> f64 {
        elapsed_hours(self.peak_inflow_step)
    }

    pub fn time_of_peak_outflow(&self) -> f64 {
        elapsed_hours(self.peak_outflow_step)
    }

    pub fn is_complete(&self) -> bool {
        self.out_of_range_steps.is_empty()
    }
}

/// Storage-indication (modified Puls) routing of `inflows` through `table`.
///
/// The pond is empty at step 0. Each later step depends only on the current
/// and previous inflow and the previous step's state. The routing variable
/// is held at or above the first row, which keeps a draining pond from
/// reporting negative storage. When it leaves the top of the table the
/// ordinate is marked `None` and the state is carried at the top row's
/// outflow so later ordinates can still be read.
pub fn route_inflow(
    table: &PondStageTable,
    duration: StormDuration,
    inflows: &[f64],
) -> RoutedHydrograph {
    let rows = table.rows();
    let top_outflow = rows.last().map_or(0.0, |r| r.discharge);
    let floor = rows.first().map_or(0.0, |r| r.routing_variable);
    let mut state = RoutingState::new();
    let mut outflows = Vec::with_capacity(inflows.len());
    let mut stages = Vec::with_capacity(inflows.len());
    let mut out_of_range_steps = Vec::new();

    for (step, &inflow) in inflows.iter().enumerate() {
        if step == 0 {
            outflows.push(Some(0.0));
            stages.push(Some(0.0));
            continue;
        }
        let x = state.advance(inflows[step - 1] + inflow).max(floor);
        match interpolate_stage(rows, x) {
            Some(point) => {
                state.update(x, point.outflow);
                outflows.push(Some(point.outflow));
                stages.push(Some(point.stage));
            }
            None => {
                state.update(x, top_outflow);
                outflows.push(None);
                stages.push(None);
                out_of_range_steps.push(step);
            }
        }
    }

    let (peak_inflow_step, peak_inflow) = first_maximum(inflows);
    let valid_outflows: Vec<f64> = outflows
        .iter()
        .map(|q| q.unwrap_or(f64::NEG_INFINITY))
        .collect();
    let (peak_outflow_step, peak_outflow) = first_maximum(&valid_outflows);
    let peak_stage = stages.iter().flatten().copied().fold(0.0, f64::max);

    RoutedHydrograph {
        duration,
        inflows: inflows.to_vec(),
        outflows,
        stages,
        peak_inflow,
        peak_inflow_step,
        peak_outflow,
        peak_outflow_step,
        peak_stage,
        out_of_range_steps,
    }
}

/// Route one basin hydrograph.
pub fn route_hydrograph(table: &PondStageTable, inflow: &BasinHydrograph) -> RoutedHydrograph {
    route_inflow(table, inflow.duration, &inflow.flows)
}

/// Routed hydrographs for every duration plus the critical one.
#[derive(Debug, Clone)]
pub struct RoutingResult {
    /// Ascending by duration.
    pub routed: Vec<RoutedHydrograph>,
    /// Duration producing the largest peak outflow.
    pub critical_outflow: StormDuration,
    pub advisories: Vec<Advisory>,
}

impl RoutingResult {
    pub fn get(&self, duration: StormDuration) -> Option<&RoutedHydrograph> {
        self.routed.iter().find(|r| r.duration == duration)
    }
}

// Route every duration in parallel; the recurrence within a duration stays serial
pub fn process_routing_parallel<'a>(
    table: &PondStageTable,
    hydrographs: impl IntoIterator<Item = &'a BasinHydrograph>,
    pb: &ProgressBar,
) -> RoutingResult {
    let inflows: Vec<&BasinHydrograph> = hydrographs.into_iter().collect();

    let mut routed: Vec<RoutedHydrograph> = inflows
        .par_iter()
        .map(|&hydrograph| {
            let result = route_hydrograph(table, hydrograph);
            debug!(
                duration = %result.duration,
                peak_outflow_cfs = result.peak_outflow,
                peak_stage_ft = result.peak_stage,
                "storm routed"
            );
            pb.inc(1);
            result
        })
        .collect();
    routed.sort_by_key(|r| r.duration);

    let mut advisories = Vec::new();
    for r in &routed {
        if let Some(&first_step) = r.out_of_range_steps.first() {
            let advisory = Advisory::RoutingRangeExceeded {
                duration: r.duration,
                steps: r.out_of_range_steps.len(),
                first_step,
            };
            warn!("{}", advisory);
            advisories.push(advisory);
        }
    }

    let peaks: Vec<f64> = routed.iter().map(|r| r.peak_outflow).collect();
    let (idx, _) = first_maximum(&peaks);
    let critical_outflow = routed
        .get(idx)
        .map(|r| r.duration)
        .unwrap_or(StormDuration::TwentyFourHour);

    RoutingResult {
        routed,
        critical_outflow,
        advisories,
    }
}
