use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use storm_ponds::cli::{LogFormat, get_args};
use storm_ponds::io::csv::{
    write_basin_hydrographs, write_pond_routing, write_report, write_summary,
};
use storm_ponds::io::results::{TIME_FORMAT, report_records, summarize};
use storm_ponds::{
    PondStageTable, Scenario, StormDuration, process_routing_parallel, process_synthesis_parallel,
};

fn main() -> Result<()> {
    let args = get_args();
    init_logging(&args.log_level, args.log_format);

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .context("Failed to configure thread pool")?;

    // Configuration
    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("Failed to read scenario: {:?}", args.scenario))?;
    let base_dir = args.scenario.parent().unwrap_or_else(|| Path::new("."));
    let run = scenario
        .resolve(base_dir)
        .with_context(|| format!("Invalid scenario: {:?}", args.scenario))?;

    // Stage table first so bad pond geometry stops the run before any synthesis
    let mut advisories = Vec::new();
    let pond_table = match &run.pond {
        Some(pond) => {
            let (table, pond_advisories) =
                PondStageTable::build(&pond.geometry, pond.bottom_elevation, &pond.outlet)
                    .context("Failed to build pond stage table")?;
            advisories.extend(pond_advisories);
            Some(table)
        }
        None => None,
    };

    println!("\nScenario Configuration:");
    println!("  Start: {}", run.start_time.format(TIME_FORMAT));
    println!("  Area: {} acres", run.synthesis.area_acres);
    println!("  Tc: {:.1} minutes", run.synthesis.tc_minutes);
    println!("  PRF: {:.1}", run.synthesis.prf);
    println!("  CN: {:.2}", run.synthesis.retention.cn);
    println!(
        "  Distribution: {} (curve {})",
        run.synthesis.curve,
        run.synthesis.curve.curve_number()
    );
    println!("  Threads: {}", args.threads);

    // Basin hydrographs
    println!("\nSynthesizing basin hydrographs...");
    let pb = progress_bar(StormDuration::ALL.len(), args.no_progress)?;
    let synthesis = process_synthesis_parallel(&run.synthesis, &run.distribution, &pb)
        .context("Hydrograph synthesis failed")?;
    pb.finish_and_clear();
    advisories.extend(synthesis.advisories.iter().cloned());

    // Pond routing
    let routing = match &pond_table {
        Some(table) => {
            println!("Routing through pond...");
            let pb = progress_bar(synthesis.storms.len(), args.no_progress)?;
            let routing = process_routing_parallel(table, synthesis.hydrographs(), &pb);
            pb.finish_and_clear();
            advisories.extend(routing.advisories.iter().cloned());
            Some(routing)
        }
        None => None,
    };

    // Output
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", args.output_dir))?;

    let hydrograph_path = args.output_dir.join("basin_hydrographs.csv");
    write_basin_hydrographs(&hydrograph_path, &synthesis, &run.start_time)
        .with_context(|| format!("Failed to write {:?}", hydrograph_path))?;

    if let Some(routing) = &routing {
        let routing_path = args.output_dir.join("pond_routing.csv");
        write_pond_routing(&routing_path, routing, &run.start_time)
            .with_context(|| format!("Failed to write {:?}", routing_path))?;
    }

    let rows = summarize(&synthesis, routing.as_ref());
    let summary_path = args.output_dir.join("summary.csv");
    write_summary(&summary_path, &rows).with_context(|| format!("Failed to write {:?}", summary_path))?;

    let report_path = args.output_dir.join("report.csv");
    write_report(&report_path, &report_records(&synthesis, routing.as_ref(), &advisories))
        .with_context(|| format!("Failed to write {:?}", report_path))?;

    println!("\nResults:");
    println!(
        "  {:>8} {:>8} {:>8} {:>10} {:>12} {:>10}",
        "duration", "P (in)", "CN", "Q (in)", "peak (cfs)", "time (hr)"
    );
    for row in &rows {
        println!(
            "  {:>8} {:>8.2} {:>8.2} {:>10.3} {:>12.2} {:>10.1}",
            row.storm_duration_hr,
            row.rainfall_depth_in,
            row.adjusted_cn,
            row.runoff_volume_q_cn_in,
            row.peak_discharge_cfs,
            row.time_of_peak_hr
        );
    }

    println!("\nCritical durations:");
    println!("  Runoff volume: {}", synthesis.critical_volume);
    println!("  Peak discharge: {}", synthesis.critical_peak);
    if let Some(routing) = &routing {
        let routed = routing.get(routing.critical_outflow);
        match routed {
            Some(r) => println!(
                "  Peak pond outflow: {} ({:.2} cfs at {:.1} hr, stage {:.2} ft)",
                routing.critical_outflow,
                r.peak_outflow,
                r.time_of_peak_outflow(),
                r.peak_stage
            ),
            None => println!("  Peak pond outflow: {}", routing.critical_outflow),
        }
    }

    if !advisories.is_empty() {
        println!("\nAdvisories:");
        for advisory in &advisories {
            println!("  {}", advisory);
        }
    }

    println!("\nOutput saved to {}", args.output_dir.display());
    Ok(())
}

fn progress_bar(len: usize, hidden: bool) -> Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} storms ({eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init(),
    }
}
