use std::f64::consts::PI;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use indicatif::ProgressBar;
use storm_ponds::distribution::{DistributionCurve, DistributionTable};
use storm_ponds::io::csv::{
    write_basin_hydrographs, write_pond_routing, write_report, write_summary,
};
use storm_ponds::io::results::{report_records, summarize};
use storm_ponds::storm::{AdjustmentPolicy, RainfallDepths, Retention, StormEvent, WINDOW_STEPS};
use storm_ponds::synthesis::{SynthesisInputs, synthesize_storm};
use storm_ponds::unit_hydrograph::UnitHydrograph;
use storm_ponds::{
    HydroError, PondStageTable, Scenario, StormDuration, process_routing_parallel,
    process_synthesis_parallel,
};

/// Centered cumulative curve: slow start, peak intensity at mid-storm.
fn centered_fractions(duration: StormDuration) -> Vec<f64> {
    let n = duration.rain_bursts();
    (0..=n)
        .map(|i| 0.5 * (1.0 - (PI * i as f64 / n as f64).cos()))
        .collect()
}

fn centered_table(curve: DistributionCurve) -> DistributionTable {
    let mut table = DistributionTable::new();
    for duration in StormDuration::ALL {
        table
            .insert(curve, duration, centered_fractions(duration))
            .unwrap();
    }
    table
}

fn reference_inputs() -> SynthesisInputs {
    SynthesisInputs {
        area_acres: 100.0,
        tc_minutes: 64.5,
        prf: 240.0,
        retention: Retention::from_s_ia(4.86, 0.97).unwrap(),
        depths: RainfallDepths {
            d1: 2.5,
            d2: 3.2,
            d3: 3.8,
            d6: 5.2,
            d12: 6.0,
            d24: 7.0,
        },
        curve: DistributionCurve::NoaaB,
        adjustment: AdjustmentPolicy::B,
    }
}

#[test]
fn loss_scaled_six_hour_hydrograph() {
    let table = centered_table(DistributionCurve::NoaaB);
    let result =
        process_synthesis_parallel(&reference_inputs(), &table, &ProgressBar::hidden()).unwrap();

    assert_eq!(result.storms.len(), 6);
    assert!(result.advisories.is_empty());
    assert!(result.unit_hydrograph.gamma_n > 1.9 && result.unit_hydrograph.gamma_n < 2.1);
    assert_eq!(result.unit_hydrograph.tp, 48.0);

    let six = result.get(StormDuration::SixHour).unwrap();
    let flows = &six.hydrograph.flows;
    assert_eq!(flows.len(), WINDOW_STEPS + 1);
    assert_eq!(flows[0], 0.0);

    let peak_time = six.hydrograph.peak_time_hours();
    assert!(peak_time > 0.0 && peak_time < 12.0, "peak at {peak_time} hr");

    // Rises to a single peak and recedes.
    let peak = six.hydrograph.peak_step;
    assert!(flows[..=peak].windows(2).all(|w| w[1] >= w[0] - 1e-9));
    assert!(flows[peak..].windows(2).all(|w| w[1] <= w[0] + 1e-9));

    // Nearly drained by 2D.
    let two_d = 2 * StormDuration::SixHour.rain_bursts();
    assert!(flows[two_d] < 0.05 * six.hydrograph.peak_flow);

    // Volume under the hydrograph matches the runoff depth over the basin.
    let expected = six.storm.runoff_depth() * 100.0 * 43_560.0 / 12.0;
    assert_relative_eq!(six.hydrograph.volume_cubic_feet(), expected, max_relative = 0.02);
}

#[test]
fn reference_basin_six_hour_storm() {
    // 100 acres, PRF 240, Tc 64.5 min, 5.2 in over 6 hours, S = 4.86 in, Ia = 0.97 in.
    let retention = Retention::from_s_ia(4.86, 0.97).unwrap();
    let duration = StormDuration::SixHour;
    let storm = StormEvent::new(duration, 5.2, retention, &centered_fractions(duration)).unwrap();
    assert_relative_eq!(storm.runoff_depth(), 1.968416, epsilon = 1e-5);

    let (uh, _) = UnitHydrograph::from_basin(240.0, 64.5, 100.0).unwrap();
    let hydrograph = synthesize_storm(&storm, &uh.ordinates(WINDOW_STEPS));
    let flows = &hydrograph.flows;
    assert_eq!(flows[0], 0.0);

    let peak_time = hydrograph.peak_time_hours();
    assert!((0.0..=12.0).contains(&peak_time), "peak at {peak_time} hr");
    let peak = hydrograph.peak_step;
    assert!(flows[..=peak].windows(2).all(|w| w[1] >= w[0] - 1e-9));
    assert!(flows[peak..].windows(2).all(|w| w[1] <= w[0] + 1e-9));

    // From 2D on the recession is below half a percent of the peak.
    let two_d = 2 * duration.rain_bursts();
    let tail = 0.005 * hydrograph.peak_flow;
    assert!(flows[two_d..].iter().all(|&q| q < tail));
}

#[test]
fn adjustment_policies_give_different_bursts() {
    let inputs = reference_inputs();
    let duration = StormDuration::SixHour;
    let fractions = centered_fractions(duration);
    let storm = |policy: AdjustmentPolicy| {
        let retention = policy
            .adjust(duration, &inputs.depths, &inputs.retention)
            .unwrap();
        StormEvent::new(duration, inputs.depths.d6, retention, &fractions).unwrap()
    };
    let a = storm(AdjustmentPolicy::A);
    let b = storm(AdjustmentPolicy::B);

    // A keeps the 24-hour retention, B spreads 6/24 of the 24-hour loss.
    assert_relative_eq!(a.runoff_depth(), 1.968416, epsilon = 1e-5);
    assert_relative_eq!(b.runoff_depth(), 4.284731, epsilon = 1e-5);
    assert_eq!(a.bursts.len(), b.bursts.len());
    assert!(a.bursts.iter().zip(&b.bursts).any(|(x, y)| (x - y).abs() > 1e-3));
}

#[test]
fn critical_durations_are_reported() {
    let table = centered_table(DistributionCurve::NoaaB);
    let result =
        process_synthesis_parallel(&reference_inputs(), &table, &ProgressBar::hidden()).unwrap();

    let volume = result.get(result.critical_volume).unwrap().storm.runoff_depth();
    assert!(result.storms.iter().all(|s| s.storm.runoff_depth() <= volume));
    let peak = result.get(result.critical_peak).unwrap().hydrograph.peak_flow;
    assert!(result.hydrographs().all(|h| h.peak_flow <= peak));
}

fn write_distribution_csv(path: &Path, letter: &str) {
    let mut text = String::from("curve,duration_hr,index,fraction\n");
    for duration in StormDuration::ALL {
        for (i, f) in centered_fractions(duration).iter().enumerate() {
            writeln!(text, "{letter},{},{i},{f}", duration.hours()).unwrap();
        }
    }
    fs::write(path, text).unwrap();
}

const SCENARIO: &str = r#"
start_time = "2024-06-01 00:00:00"

[basin]
area_acres = 10.0
tc_minutes = 30.0
prf = 484.0
cn = 75.0

[rainfall]
distribution = "B"
distribution_table = "fractions.csv"
adjustment = "B"
depths = { d1 = 1.8, d2 = 2.2, d3 = 2.5, d6 = 3.0, d12 = 3.6, d24 = 4.3 }

[pond]
option = "frustum"
bottom_elevation = 100.0
frustum = { length = 200.0, w1 = 80.0, w2 = 100.0, side_slope = 3.0, bottom_slope = 0.5 }

[pond.outlet]
first_orifice = { coefficient = 0.6, diameter = 6.0, center_elevation = 0.25, openings = 1.0 }
second_orifice = { coefficient = 0.6, diameter = 12.0, center_elevation = 3.0, openings = 2.0 }
weir = { coefficient = 3.33, exponent = 1.5, length = 4.0, crest_elevation = 5.5, count = 1.0 }
spillway = { coefficient = 2.8, exponent = 1.5, length = 20.0, crest_elevation = 8.0 }
"#;

#[test]
fn scenario_file_runs_to_csv_outputs() {
    let dir = tempfile::tempdir().unwrap();
    write_distribution_csv(&dir.path().join("fractions.csv"), "B");
    let scenario_path = dir.path().join("scenario.toml");
    fs::write(&scenario_path, SCENARIO).unwrap();

    let run = Scenario::load(&scenario_path)
        .unwrap()
        .resolve(dir.path())
        .unwrap();
    let pond = run.pond.as_ref().unwrap();
    let (table, _) =
        PondStageTable::build(&pond.geometry, pond.bottom_elevation, &pond.outlet).unwrap();

    let synthesis =
        process_synthesis_parallel(&run.synthesis, &run.distribution, &ProgressBar::hidden())
            .unwrap();
    let routing = process_routing_parallel(&table, synthesis.hydrographs(), &ProgressBar::hidden());
    assert_eq!(routing.routed.len(), 6);
    for routed in &routing.routed {
        assert_eq!(routed.outflows[0], Some(0.0));
        if routed.is_complete() {
            assert!(routed.peak_outflow <= routed.peak_inflow + 1e-9);
        }
    }

    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    write_basin_hydrographs(&out.join("basin_hydrographs.csv"), &synthesis, &run.start_time).unwrap();
    write_pond_routing(&out.join("pond_routing.csv"), &routing, &run.start_time).unwrap();
    let rows = summarize(&synthesis, Some(&routing));
    write_summary(&out.join("summary.csv"), &rows).unwrap();
    let records = report_records(&synthesis, Some(&routing), &routing.advisories);
    write_report(&out.join("report.csv"), &records).unwrap();

    let basin = fs::read_to_string(out.join("basin_hydrographs.csv")).unwrap();
    let lines: Vec<&str> = basin.lines().collect();
    assert_eq!(lines.len(), WINDOW_STEPS + 2);
    assert!(lines[0].starts_with("step,elapsed_hr,timestamp,flow_1_hour"));
    assert!(lines[0].ends_with("flow_24_hour"));
    assert!(lines[2].starts_with("1,0.1,2024-06-01 00:06,"));

    let routing_csv = fs::read_to_string(out.join("pond_routing.csv")).unwrap();
    let header = routing_csv.lines().next().unwrap();
    assert!(header.contains("inflow_6_hour,outflow_6_hour,stage_6_hour"));

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    let summary_lines: Vec<&str> = summary.lines().collect();
    assert_eq!(summary_lines.len(), 7);
    assert!(summary_lines[0].starts_with("storm_duration_hr,rainfall_depth_in,adjusted_cn"));
    assert!(summary_lines[1].starts_with("1,1.8,"));
    assert!(summary_lines[6].starts_with("24,4.3,"));

    let report = fs::read_to_string(out.join("report.csv")).unwrap();
    let report_lines: Vec<&str> = report.lines().collect();
    assert_eq!(report_lines[0], "record,storm_duration_hr,value,message");
    assert!(report_lines[1].starts_with(&format!(
        "critical_volume,{},",
        synthesis.critical_volume.hours()
    )));
    assert!(report_lines[2].starts_with(&format!(
        "critical_peak,{},",
        synthesis.critical_peak.hours()
    )));
    assert!(report_lines[3].starts_with(&format!(
        "critical_outflow,{},",
        routing.critical_outflow.hours()
    )));
    assert_eq!(report_lines.len(), 4 + routing.advisories.len());
}

#[test]
fn elevation_area_scenario_checks_bottom() {
    let dir = tempfile::tempdir().unwrap();
    write_distribution_csv(&dir.path().join("fractions.csv"), "B");
    let mut table = String::from("elevation,area\n");
    for i in 0..12 {
        writeln!(table, "{},{}", 101.0 + i as f64, 16_000.0 + 1_500.0 * i as f64).unwrap();
    }
    fs::write(dir.path().join("pond.csv"), table).unwrap();

    let text = SCENARIO
        .replace(r#"option = "frustum""#, r#"option = "elevation_area""#)
        .replace(
            "frustum = { length = 200.0, w1 = 80.0, w2 = 100.0, side_slope = 3.0, bottom_slope = 0.5 }",
            r#"elevation_area_table = "pond.csv""#,
        );
    let run = Scenario::from_toml_str(&text)
        .unwrap()
        .resolve(dir.path())
        .unwrap();
    let pond = run.pond.as_ref().unwrap();

    // The table starts one foot above the declared bottom.
    assert!(matches!(
        PondStageTable::build(&pond.geometry, pond.bottom_elevation, &pond.outlet),
        Err(HydroError::BottomElevationMismatch { .. })
    ));
    let (table, advisories) = PondStageTable::build(&pond.geometry, 101.0, &pond.outlet).unwrap();
    assert_eq!(table.rows().len(), 12);
    assert!(advisories.is_empty());
}

#[test]
fn missing_distribution_table_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = Scenario::from_toml_str(SCENARIO).unwrap();
    assert!(matches!(scenario.resolve(dir.path()), Err(HydroError::Io(_))));
}
