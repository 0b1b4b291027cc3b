//! Detention pond stage-storage-discharge tables.
//!
//! A stage table is built once per routing request, from either an inverted
//! frustum or a user elevation-area table, and then shared read-only by every
//! storm duration's routing.

use serde::Deserialize;
use std::f64::consts::PI;

use crate::error::{Advisory, HydroError, Result};
use crate::storm::STEP_SECONDS;

/// Rows in a frustum stage table (pond bottom plus ten stage increments).
pub const STAGE_ROWS: usize = 11;
/// Deepest stage modeled above the pond bottom (ft).
pub const MAX_MODELED_DEPTH: f64 = 10.0;
/// 2g in ft/s².
const TWO_G: f64 = 64.4;
/// Converts in/hr over a square-foot area to cfs.
const SEEPAGE_DIVISOR: f64 = 12.0 * 3600.0;

/// Circular orifice stage of the outlet riser.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Orifice {
    pub coefficient: f64,
    /// Diameter in inches.
    pub diameter: f64,
    /// Centerline elevation above the pond bottom (ft).
    pub center_elevation: f64,
    pub openings: f64,
}

impl Orifice {
    pub fn area(&self) -> f64 {
        PI * (self.diameter / 12.0).powi(2) / 4.0
    }

    pub fn discharge(&self, stage: f64) -> f64 {
        let head = (stage - self.center_elevation).max(0.0);
        let q = (self.coefficient * self.area() * (TWO_G * head).sqrt()).max(0.0);
        self.openings * q
    }
}

/// Rectangular weir stage (`count` identical weirs).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RectangularWeir {
    pub coefficient: f64,
    pub exponent: f64,
    pub length: f64,
    /// Crest elevation above the pond bottom (ft).
    pub crest_elevation: f64,
    pub count: f64,
}

impl RectangularWeir {
    pub fn discharge(&self, stage: f64) -> f64 {
        let head = (stage - self.crest_elevation).max(0.0);
        self.coefficient * self.length * head.powf(self.exponent) * self.count
    }
}

/// Broad-crested overflow spillway.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Spillway {
    pub coefficient: f64,
    pub exponent: f64,
    pub length: f64,
    pub crest_elevation: f64,
}

impl Spillway {
    pub fn discharge(&self, stage: f64) -> f64 {
        let head = (stage - self.crest_elevation).max(0.0);
        self.coefficient * self.length * head.powf(self.exponent)
    }
}

/// Seepage rates through the pond bottom and sides (in/hr).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Seepage {
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub side: f64,
}

impl Seepage {
    /// Seepage (cfs) at a stage with surface `area`, given the pond
    /// `bottom_area`. No seepage at the bottom row.
    pub fn discharge(&self, row: usize, area: f64, bottom_area: f64) -> f64 {
        if row == 0 {
            return 0.0;
        }
        bottom_area * self.bottom / SEEPAGE_DIVISOR
            + (area - bottom_area) * self.side / SEEPAGE_DIVISOR
    }
}

/// All outlet structures of the pond.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OutletStructure {
    pub first_orifice: Orifice,
    pub second_orifice: Orifice,
    pub weir: RectangularWeir,
    pub spillway: Spillway,
    #[serde(default)]
    pub seepage: Seepage,
}

impl OutletStructure {
    /// Total discharge (cfs) for table row `row` at `stage` above the bottom.
    pub fn discharge(&self, row: usize, stage: f64, area: f64, bottom_area: f64) -> f64 {
        self.first_orifice.discharge(stage)
            + self.second_orifice.discharge(stage)
            + self.weir.discharge(stage)
            + self.spillway.discharge(stage)
            + self.seepage.discharge(row, area, bottom_area)
    }
}

/// Inverted quadrilateral frustum dimensions (ft; bottom slope in percent).
#[derive(Debug, Clone, Copy)]
pub struct FrustumGeometry {
    pub length: f64,
    pub w1: f64,
    pub w2: f64,
    pub side_slope: f64,
    pub bottom_slope: f64,
}

impl FrustumGeometry {
    /// Elevations of the stage rows and the number of rows capped at a depth
    /// limit. Row 1 sits at the top of the sloped bottom; later rows advance
    /// by one tenth of the modeled depth.
    fn stage_elevations(&self, bottom: f64) -> (Vec<f64>, usize) {
        let increment = MAX_MODELED_DEPTH / 10.0;
        let mut elevations = Vec::with_capacity(STAGE_ROWS);
        let mut clamped = 0;
        elevations.push(bottom);
        elevations.push(bottom + self.length * self.bottom_slope / 100.0);
        for row in 2..STAGE_ROWS {
            let cap = if row <= 7 {
                bottom + 0.8 * MAX_MODELED_DEPTH
            } else {
                bottom + MAX_MODELED_DEPTH
            };
            let next = elevations[row - 1] + increment;
            if next > cap {
                clamped += 1;
            }
            elevations.push(next.min(cap));
        }
        (elevations, clamped)
    }
}

/// Surface geometry of the pond.
#[derive(Debug, Clone)]
pub enum PondGeometry {
    Frustum(FrustumGeometry),
    /// (elevation ft-MSL, surface area sq ft), ascending in elevation.
    ElevationArea(Vec<(f64, f64)>),
}

/// One stage row of the storage-indication table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageRow {
    pub elevation: f64,
    /// Depth above the pond bottom (ft).
    pub stage: f64,
    pub area: f64,
    /// Cumulative storage (cu ft).
    pub storage: f64,
    pub discharge: f64,
    /// `2S/Δt + Q` (cfs).
    pub routing_variable: f64,
}

/// Ordered stage-storage-discharge table, non-decreasing in stage and in
/// the routing variable.
#[derive(Debug, Clone)]
pub struct PondStageTable {
    rows: Vec<StageRow>,
}

impl PondStageTable {
    /// Build the table for `geometry` and run the discharge aggregation.
    pub fn build(
        geometry: &PondGeometry,
        bottom_elevation: f64,
        outlet: &OutletStructure,
    ) -> Result<(Self, Vec<Advisory>)> {
        let mut advisories = Vec::new();
        let (elevations, areas) = match geometry {
            PondGeometry::Frustum(frustum) => {
                let (elevations, clamped) = frustum.stage_elevations(bottom_elevation);
                if clamped > 0 {
                    advisories.push(Advisory::StageTableClamped { rows: clamped });
                }
                let areas = frustum_areas(frustum, &elevations);
                (elevations, areas)
            }
            PondGeometry::ElevationArea(table) => {
                let first = table.first().map(|&(e, _)| e).unwrap_or(f64::NAN);
                if (first - bottom_elevation).abs() > 1e-6 {
                    return Err(HydroError::BottomElevationMismatch {
                        bottom: bottom_elevation,
                        first,
                    });
                }
                table.iter().copied().unzip()
            }
        };

        let bottom_area = areas.first().copied().unwrap_or(0.0);
        let mut rows: Vec<StageRow> = Vec::with_capacity(elevations.len());
        for (i, (&elevation, &area)) in elevations.iter().zip(&areas).enumerate() {
            let stage = elevation - bottom_elevation;
            let storage = match rows.last() {
                Some(prev) => prev.storage + 0.5 * (prev.area + area) * (stage - prev.stage),
                None => 0.0,
            };
            let discharge = outlet.discharge(i, stage, area, bottom_area);
            rows.push(StageRow {
                elevation,
                stage,
                area,
                storage,
                discharge,
                routing_variable: 2.0 * storage / STEP_SECONDS + discharge,
            });
        }

        Ok((Self::from_rows(rows)?, advisories))
    }

    /// Wrap precomputed rows, rejecting tables the routing lookup cannot use.
    pub fn from_rows(rows: Vec<StageRow>) -> Result<Self> {
        if rows.len() < STAGE_ROWS {
            return Err(HydroError::StageTableTooShort {
                required: STAGE_ROWS,
                found: rows.len(),
            });
        }
        for (i, pair) in rows.windows(2).enumerate() {
            let checks = [
                ("stage", pair[0].stage, pair[1].stage),
                ("2S/dt+Q", pair[0].routing_variable, pair[1].routing_variable),
            ];
            for (column, previous, current) in checks {
                if !(current >= previous) {
                    return Err(HydroError::NonMonotonicStageTable {
                        row: i + 1,
                        column,
                        previous,
                        current,
                    });
                }
            }
        }
        Ok(PondStageTable { rows })
    }

    pub fn rows(&self) -> &[StageRow] {
        &self.rows
    }

    pub fn max_routing_variable(&self) -> f64 {
        self.rows.last().map_or(0.0, |r| r.routing_variable)
    }
}

/// Surface area at each elevation: every side grows by `2·z` per foot of rise.
fn frustum_areas(frustum: &FrustumGeometry, elevations: &[f64]) -> Vec<f64> {
    let mut length = frustum.length;
    let mut w1 = frustum.w1;
    let mut w2 = frustum.w2;
    let mut areas = Vec::with_capacity(elevations.len());
    for (i, &elevation) in elevations.iter().enumerate() {
        if i > 0 {
            let growth = 2.0 * frustum.side_slope * (elevation - elevations[i - 1]);
            length += growth;
            w1 += growth;
            w2 += growth;
        }
        areas.push(length * (w1 + w2) / 2.0);
    }
    areas
}
