use crate::distribution::{DistributionCurve, DistributionTable};
use crate::error::{HydroError, Result};
use crate::io::results::{DurationSummary, ReportRecord, timestamps};
use crate::routing::RoutingResult;
use crate::storm::{StormDuration, WINDOW_STEPS, elapsed_hours};
use crate::synthesis::SynthesisResult;
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, Writer, WriterBuilder};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Marker written for ordinates above the modeled pond depth.
pub const OUT_OF_RANGE: &str = "error";

// One row of a long-format distribution table
#[derive(Debug, Deserialize)]
struct FractionRecord {
    curve: String,
    duration_hr: usize,
    index: usize,
    fraction: f64,
}

// One row of an elevation-area table
#[derive(Debug, Deserialize)]
struct ElevationAreaRecord {
    elevation: f64,
    area: f64,
}

fn reader<R: Read>(rdr: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .trim(csv::Trim::All)
        .from_reader(rdr)
}

/// Read cumulative rainfall fractions with columns
/// `curve,duration_hr,index,fraction`.
pub fn read_distribution_table<R: Read>(rdr: R) -> Result<DistributionTable> {
    let mut grouped: BTreeMap<(String, usize), Vec<(usize, f64)>> = BTreeMap::new();
    for result in reader(rdr).deserialize() {
        let record: FractionRecord = result?;
        grouped
            .entry((record.curve, record.duration_hr))
            .or_default()
            .push((record.index, record.fraction));
    }

    let mut table = DistributionTable::new();
    for ((letter, hours), mut points) in grouped {
        let curve: DistributionCurve = letter.parse()?;
        let duration = StormDuration::from_hours(hours).ok_or_else(|| HydroError::InvalidParameter {
            name: "duration_hr",
            value: hours as f64,
            reason: "storm durations are 1, 2, 3, 6, 12 or 24 hours",
        })?;
        points.sort_by_key(|&(index, _)| index);
        if let Some(gap) = points.iter().enumerate().find(|&(i, &(index, _))| i != index) {
            return Err(HydroError::InvalidDistributionCurve {
                curve: curve.to_string(),
                duration,
                message: format!("burst index {} is missing or repeated", gap.0),
            });
        }
        table.insert(curve, duration, points.into_iter().map(|(_, f)| f).collect())?;
    }
    Ok(table)
}

pub fn load_distribution_table(path: &Path) -> Result<DistributionTable> {
    let table = read_distribution_table(File::open(path)?)?;
    info!("Loaded {} distribution curves from {}", table.len(), path.display());
    Ok(table)
}

/// Read a pond elevation (ft-MSL) vs surface area (sq ft) table with
/// columns `elevation,area`.
pub fn read_elevation_area<R: Read>(rdr: R) -> Result<Vec<(f64, f64)>> {
    let mut rows = Vec::new();
    for result in reader(rdr).deserialize() {
        let record: ElevationAreaRecord = result?;
        rows.push((record.elevation, record.area));
    }
    Ok(rows)
}

pub fn load_elevation_area(path: &Path) -> Result<Vec<(f64, f64)>> {
    read_elevation_area(File::open(path)?)
}

// Create CSV writer with headers
pub fn create_csv_writer(path: &Path, header: &[String]) -> Result<Writer<File>> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_path(path)?;
    wtr.write_record(header)?;
    Ok(wtr)
}

fn time_columns(step: usize, stamps: &[String]) -> Vec<String> {
    vec![
        step.to_string(),
        format!("{:.1}", elapsed_hours(step)),
        stamps[step].clone(),
    ]
}

fn fmt_option(value: Option<f64>) -> String {
    value.map_or_else(|| OUT_OF_RANGE.to_string(), |v| format!("{v:.4}"))
}

/// Basin hydrograph ordinates, one column per duration.
pub fn write_basin_hydrographs(
    path: &Path,
    synthesis: &SynthesisResult,
    start: &NaiveDateTime,
) -> Result<()> {
    let mut header = vec!["step".to_string(), "elapsed_hr".to_string(), "timestamp".to_string()];
    header.extend(synthesis.storms.iter().map(|s| format!("flow_{}", s.storm.duration.label())));
    let mut wtr = create_csv_writer(path, &header)?;

    let stamps = timestamps(start, WINDOW_STEPS + 1);
    for step in 0..=WINDOW_STEPS {
        let mut record = time_columns(step, &stamps);
        for hydrograph in synthesis.hydrographs() {
            record.push(format!("{:.4}", hydrograph.flows[step]));
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Pond inflow, outflow and stage ordinates for every duration.
pub fn write_pond_routing(path: &Path, routing: &RoutingResult, start: &NaiveDateTime) -> Result<()> {
    let mut header = vec!["step".to_string(), "elapsed_hr".to_string(), "timestamp".to_string()];
    for routed in &routing.routed {
        let label = routed.duration.label();
        header.push(format!("inflow_{label}"));
        header.push(format!("outflow_{label}"));
        header.push(format!("stage_{label}"));
    }
    let mut wtr = create_csv_writer(path, &header)?;

    let steps = routing.routed.iter().map(|r| r.inflows.len()).max().unwrap_or(0);
    let stamps = timestamps(start, steps);
    for step in 0..steps {
        let mut record = time_columns(step, &stamps);
        for routed in &routing.routed {
            record.push(format!("{:.4}", routed.inflows.get(step).copied().unwrap_or(0.0)));
            record.push(fmt_option(routed.outflows.get(step).copied().flatten()));
            record.push(fmt_option(routed.stages.get(step).copied().flatten()));
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// One summary row per storm duration.
pub fn write_summary(path: &Path, rows: &[DurationSummary]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Critical durations and advisories, one record per line.
pub fn write_report(path: &Path, records: &[ReportRecord]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_path(path)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}
