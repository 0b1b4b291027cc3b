//! Time of concentration by the travel-time method.
//!
//! Tc is the sum of travel times along the flow path: sheet flow (with any
//! length past the sheet-flow limit treated as shallow flow), shallow
//! concentrated flow, open channels, storm sewers and reaches with a
//! given velocity. Lengths are in feet, slopes in percent, times in minutes.

use serde::Deserialize;

use crate::error::{HydroError, Result};

/// Sheet-flow surface -> Manning's n.
const SHEET_FLOW_MANNINGS_N: [(&str, f64); 11] = [
    ("Smooth asphalt", 0.011),
    ("Smooth concrete", 0.012),
    ("Fallow (no residue)", 0.050),
    ("Short grass prairie", 0.150),
    ("Dense grasses", 0.240),
    ("Bermuda grass", 0.410),
    ("Light underbrush", 0.400),
    ("Dense underbrush", 0.800),
    ("Cultivated Soil with Residue cover <=20%", 0.060),
    ("Cultivated Soil with Residue cover >=20%", 0.170),
    ("Natural Range", 0.130),
];

/// Shallow-flow type -> (flow depth ft, Manning's n, velocity constant).
/// Velocity is `constant·sqrt(slope)` in ft/s.
const SHALLOW_FLOW_TYPES: [(&str, (f64, f64, f64)); 7] = [
    ("Pavement and small upland gullies", (0.2, 0.025, 20.328)),
    ("Grassed waterways", (0.4, 0.05, 16.135)),
    ("Nearly bare and untilled (overland flow)", (0.2, 0.051, 9.965)),
    ("Cultivated straight row crops", (0.2, 0.058, 8.762)),
    ("Short-grass pasture", (0.2, 0.073, 6.962)),
    (
        "Minimum cultivation, contour or strip-cropped, and woodlands",
        (0.2, 0.101, 5.032),
    ),
    ("Forest with heavy ground litter and hay meadows", (0.2, 0.202, 2.516)),
];

/// Storm sewer material -> Manning's n.
const STORM_SEWER_MANNINGS_N: [(&str, f64); 6] = [
    ("Aluminum", 0.024),
    ("CMP", 0.024),
    ("Concrete", 0.013),
    ("Corrugated HDPE", 0.02),
    ("PVC", 0.01),
    ("Steel", 0.013),
];

fn lookup<T: Copy>(table: &[(&str, T)], kind: &'static str, name: &str) -> Result<T> {
    table
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name.trim()))
        .map(|(_, value)| *value)
        .ok_or_else(|| HydroError::UnknownSurface {
            table: kind,
            name: name.to_string(),
        })
}

pub fn sheet_flow_mannings_n(surface: &str) -> Result<f64> {
    lookup(&SHEET_FLOW_MANNINGS_N, "sheet-flow surface", surface)
}

pub fn shallow_flow_velocity_constant(flow_type: &str) -> Result<f64> {
    lookup(&SHALLOW_FLOW_TYPES, "shallow-flow type", flow_type).map(|(_, _, k)| k)
}

pub fn storm_sewer_mannings_n(material: &str) -> Result<f64> {
    lookup(&STORM_SEWER_MANNINGS_N, "storm sewer material", material)
}

fn positive(name: &'static str, value: f64) -> Result<f64> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(HydroError::InvalidParameter {
            name,
            value,
            reason: "must be positive",
        })
    }
}

fn minutes(length: f64, velocity: f64) -> f64 {
    length / velocity / 60.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetFlowSegment {
    pub surface: String,
    pub length: f64,
    pub slope: f64,
}

/// Shallow-flow type that carries sheet flow beyond its limiting length.
#[derive(Debug, Clone, Deserialize)]
pub struct ExcessSheetFlow {
    pub surface: String,
    pub slope: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShallowFlowSegment {
    pub surface: String,
    pub length: f64,
    pub slope: f64,
}

/// Trapezoidal open channel flowing bank-full.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenChannelSegment {
    pub base_width: f64,
    /// Side slopes, horizontal per unit vertical.
    pub front_slope: f64,
    pub back_slope: f64,
    pub depth: f64,
    pub length: f64,
    pub bed_slope: f64,
    pub mannings_n: f64,
}

/// Circular pipe flowing full.
#[derive(Debug, Clone, Deserialize)]
pub struct StormSewerSegment {
    pub material: String,
    /// Inches.
    pub diameter: f64,
    pub length: f64,
    pub slope: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VelocitySegment {
    pub length: f64,
    /// ft/s.
    pub velocity: f64,
}

impl SheetFlowSegment {
    /// Longest length that still travels as sheet flow.
    pub fn length_limit(&self) -> Result<f64> {
        let n = sheet_flow_mannings_n(&self.surface)?;
        let slope = positive("sheet flow slope", self.slope)?;
        Ok(100.0 * (slope / 100.0).sqrt() / n)
    }

    /// Travel time over the sheet-flow part of the segment for the 2-year
    /// 24-hour rainfall `p2_24` (in).
    pub fn travel_minutes(&self, p2_24: f64) -> Result<f64> {
        let n = sheet_flow_mannings_n(&self.surface)?;
        let p2_24 = positive("2-year 24-hour rainfall", p2_24)?;
        let length = positive("sheet flow length", self.length)?.min(self.length_limit()?);
        let slope = self.slope / 100.0;
        Ok(0.42 / p2_24.sqrt() * (n * length / slope.sqrt()).powf(0.8))
    }
}

impl ShallowFlowSegment {
    pub fn travel_minutes(&self) -> Result<f64> {
        let k = shallow_flow_velocity_constant(&self.surface)?;
        let velocity = k * (positive("shallow flow slope", self.slope)? / 100.0).sqrt();
        Ok(minutes(self.length, velocity))
    }
}

impl OpenChannelSegment {
    pub fn velocity(&self) -> Result<f64> {
        let depth = positive("channel depth", self.depth)?;
        let n = positive("channel Manning's n", self.mannings_n)?;
        let slope = positive("channel bed slope", self.bed_slope)? / 100.0;
        let area = self.base_width * depth + 0.5 * depth * depth * (self.front_slope + self.back_slope);
        let wetted_perimeter = self.base_width
            + depth * (1.0 + self.front_slope.powi(2)).sqrt()
            + depth * (1.0 + self.back_slope.powi(2)).sqrt();
        let radius = area / wetted_perimeter;
        Ok(1.49 / n * radius.powf(2.0 / 3.0) * slope.sqrt())
    }

    pub fn travel_minutes(&self) -> Result<f64> {
        Ok(minutes(self.length, self.velocity()?))
    }
}

impl StormSewerSegment {
    pub fn velocity(&self) -> Result<f64> {
        let n = storm_sewer_mannings_n(&self.material)?;
        let diameter = positive("pipe diameter", self.diameter)? / 12.0;
        let slope = positive("pipe slope", self.slope)? / 100.0;
        // Hydraulic radius of a full pipe is D/4.
        Ok(1.486 / n * (diameter / 4.0).powf(2.0 / 3.0) * slope.sqrt())
    }

    pub fn travel_minutes(&self) -> Result<f64> {
        Ok(minutes(self.length, self.velocity()?))
    }
}

impl VelocitySegment {
    pub fn travel_minutes(&self) -> Result<f64> {
        Ok(minutes(self.length, positive("reach velocity", self.velocity)?))
    }
}

/// Flow path for the travel-time method (the `[basin.tc]` table).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TravelTimePath {
    /// 2-year 24-hour rainfall depth (in); needed only for sheet flow.
    pub p2_24: Option<f64>,
    #[serde(default)]
    pub sheet_flow: Vec<SheetFlowSegment>,
    pub excess_sheet_flow: Option<ExcessSheetFlow>,
    #[serde(default)]
    pub shallow_flow: Vec<ShallowFlowSegment>,
    #[serde(default)]
    pub open_channel: Vec<OpenChannelSegment>,
    #[serde(default)]
    pub storm_sewer: Vec<StormSewerSegment>,
    #[serde(default)]
    pub velocity: Vec<VelocitySegment>,
}

/// Travel time (min) of each flow regime.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TravelTimes {
    pub sheet_flow: f64,
    pub excess_sheet_flow: f64,
    pub shallow_flow: f64,
    pub open_channel: f64,
    pub storm_sewer: f64,
    pub velocity: f64,
}

impl TravelTimes {
    pub fn time_of_concentration(&self) -> f64 {
        self.sheet_flow
            + self.excess_sheet_flow
            + self.shallow_flow
            + self.open_channel
            + self.storm_sewer
            + self.velocity
    }
}

impl TravelTimePath {
    pub fn travel_times(&self) -> Result<TravelTimes> {
        let mut times = TravelTimes::default();

        if !self.sheet_flow.is_empty() {
            let p2_24 = self
                .p2_24
                .ok_or(HydroError::MissingParameter("basin.tc p2_24 for sheet flow"))?;
            let mut excess_length = 0.0;
            for segment in &self.sheet_flow {
                times.sheet_flow += segment.travel_minutes(p2_24)?;
                excess_length += (segment.length - segment.length_limit()?).max(0.0);
            }
            match &self.excess_sheet_flow {
                Some(excess) => {
                    let shallow = ShallowFlowSegment {
                        surface: excess.surface.clone(),
                        length: excess_length,
                        slope: excess.slope,
                    };
                    times.excess_sheet_flow = shallow.travel_minutes()?;
                }
                None if excess_length > 0.0 => {
                    return Err(HydroError::MissingParameter(
                        "basin.tc excess_sheet_flow for sheet flow past its length limit",
                    ));
                }
                None => {}
            }
        }

        for segment in &self.shallow_flow {
            times.shallow_flow += segment.travel_minutes()?;
        }
        for segment in &self.open_channel {
            times.open_channel += segment.travel_minutes()?;
        }
        for segment in &self.storm_sewer {
            times.storm_sewer += segment.travel_minutes()?;
        }
        for segment in &self.velocity {
            times.velocity += segment.travel_minutes()?;
        }
        Ok(times)
    }

    /// Tc (min) along the whole path. An empty path is an error.
    pub fn time_of_concentration(&self) -> Result<f64> {
        let tc = self.travel_times()?.time_of_concentration();
        positive("travel-time Tc", tc)
    }
}
