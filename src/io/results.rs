use crate::error::Advisory;
use crate::routing::RoutingResult;
use crate::storm::{BURST_MINUTES, StormDuration};
use crate::synthesis::SynthesisResult;
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

/// Default storm start, matching the reference time used for model output.
pub const DEFAULT_START: &str = "2000-01-01 00:00:00";
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Structure to store per-duration results for the summary output
#[derive(Debug, Clone, Serialize)]
pub struct DurationSummary {
    pub storm_duration_hr: usize,
    pub rainfall_depth_in: f64,
    pub adjusted_cn: f64,
    pub runoff_volume_q_cn_in: f64,
    pub peak_discharge_cfs: f64,
    pub time_of_peak_hr: f64,
    pub pond_peak_inflow_cfs: Option<f64>,
    pub time_of_pond_peak_inflow_hr: Option<f64>,
    pub pond_peak_outflow_cfs: Option<f64>,
    pub time_of_pond_peak_outflow_hr: Option<f64>,
    pub pond_max_depth_ft: Option<f64>,
    pub out_of_range_ordinates: Option<usize>,
}

/// Join synthesis and (optional) routing results, ascending by duration.
pub fn summarize(synthesis: &SynthesisResult, routing: Option<&RoutingResult>) -> Vec<DurationSummary> {
    synthesis
        .storms
        .iter()
        .map(|s| {
            let duration = s.storm.duration;
            let routed = routing.and_then(|r| r.get(duration));
            DurationSummary {
                storm_duration_hr: duration.hours(),
                rainfall_depth_in: s.storm.rainfall_depth,
                adjusted_cn: s.storm.retention.cn,
                runoff_volume_q_cn_in: s.storm.runoff_depth(),
                peak_discharge_cfs: s.hydrograph.peak_flow,
                time_of_peak_hr: s.hydrograph.peak_time_hours(),
                pond_peak_inflow_cfs: routed.map(|r| r.peak_inflow),
                time_of_pond_peak_inflow_hr: routed.map(|r| r.time_of_peak_inflow()),
                pond_peak_outflow_cfs: routed.map(|r| r.peak_outflow),
                time_of_pond_peak_outflow_hr: routed.map(|r| r.time_of_peak_outflow()),
                pond_max_depth_ft: routed.map(|r| r.peak_stage),
                out_of_range_ordinates: routed.map(|r| r.out_of_range_steps.len()),
            }
        })
        .collect()
}

// One line of the run report: a critical duration or an advisory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRecord {
    pub record: &'static str,
    pub storm_duration_hr: Option<usize>,
    pub value: Option<f64>,
    pub message: String,
}

impl ReportRecord {
    fn critical(record: &'static str, duration: StormDuration, value: f64, message: String) -> Self {
        ReportRecord {
            record,
            storm_duration_hr: Some(duration.hours()),
            value: Some(value),
            message,
        }
    }
}

/// Critical durations followed by every advisory raised during the run.
pub fn report_records(
    synthesis: &SynthesisResult,
    routing: Option<&RoutingResult>,
    advisories: &[Advisory],
) -> Vec<ReportRecord> {
    let mut records = Vec::new();
    if let Some(s) = synthesis.get(synthesis.critical_volume) {
        records.push(ReportRecord::critical(
            "critical_volume",
            synthesis.critical_volume,
            s.storm.runoff_depth(),
            format!("{} storm has the largest runoff depth (in)", synthesis.critical_volume),
        ));
    }
    if let Some(s) = synthesis.get(synthesis.critical_peak) {
        records.push(ReportRecord::critical(
            "critical_peak",
            synthesis.critical_peak,
            s.hydrograph.peak_flow,
            format!("{} storm has the largest peak discharge (cfs)", synthesis.critical_peak),
        ));
    }
    if let Some(routing) = routing {
        if let Some(r) = routing.get(routing.critical_outflow) {
            records.push(ReportRecord::critical(
                "critical_outflow",
                routing.critical_outflow,
                r.peak_outflow,
                format!("{} storm has the largest pond outflow (cfs)", routing.critical_outflow),
            ));
        }
    }
    records.extend(advisories.iter().map(|advisory| ReportRecord {
        record: advisory.kind(),
        storm_duration_hr: advisory.duration().map(StormDuration::hours),
        value: None,
        message: advisory.to_string(),
    }));
    records
}

pub fn parse_start_time(text: Option<&str>) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text.unwrap_or(DEFAULT_START), TIME_FORMAT)
}

/// Timestamps of the first `count` burst boundaries after `start`.
pub fn timestamps(start: &NaiveDateTime, count: usize) -> Vec<String> {
    let step = Duration::minutes(BURST_MINUTES as i64);
    (0..count)
        .map(|i| (*start + step * i as i32).format("%Y-%m-%d %H:%M").to_string())
        .collect()
}
