//! Scenario configuration.
//!
//! A scenario is a TOML file describing the basin, the design rainfall and
//! optionally a detention pond. [`Scenario::resolve`] turns it into engine
//! inputs and reports every configuration error before numerical work starts.

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::distribution::{DistributionCurve, DistributionTable};
use crate::error::{HydroError, Result};
use crate::io;
use crate::io::results::parse_start_time;
use crate::pond::{FrustumGeometry, OutletStructure, PondGeometry};
use crate::storm::{AdjustmentPolicy, RainfallDepths, Retention};
use crate::synthesis::SynthesisInputs;
use crate::tc::TravelTimePath;
use crate::weighting::{CnWeighting, SubArea, area_weighted, weighted_retention};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub start_time: Option<String>,
    pub basin: BasinConfig,
    pub rainfall: RainfallConfig,
    pub pond: Option<PondConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BasinConfig {
    pub area_acres: f64,
    pub tc_minutes: Option<f64>,
    /// Travel-time flow path, used when `tc_minutes` is absent.
    pub tc: Option<TravelTimePath>,
    pub prf: Option<f64>,
    #[serde(default)]
    pub prf_subareas: Vec<SubArea>,
    pub cn: Option<f64>,
    pub s: Option<f64>,
    pub ia: Option<f64>,
    #[serde(default)]
    pub cn_subareas: Vec<SubArea>,
    pub cn_weighting: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RainfallConfig {
    pub distribution: String,
    pub distribution_table: PathBuf,
    pub adjustment: String,
    pub depths: RainfallDepths,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PondConfig {
    pub option: String,
    pub bottom_elevation: f64,
    pub outlet: OutletStructure,
    pub frustum: Option<FrustumConfig>,
    pub elevation_area_table: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrustumConfig {
    pub length: Option<f64>,
    pub w1: Option<f64>,
    pub w2: Option<f64>,
    pub side_slope: Option<f64>,
    pub bottom_slope: Option<f64>,
}

impl FrustumConfig {
    fn geometry(&self) -> Result<FrustumGeometry> {
        let fields = [
            ("length", self.length),
            ("w1", self.w1),
            ("w2", self.w2),
            ("side_slope", self.side_slope),
            ("bottom_slope", self.bottom_slope),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect();
        match fields.map(|(_, v)| v) {
            [Some(length), Some(w1), Some(w2), Some(side_slope), Some(bottom_slope)] => {
                Ok(FrustumGeometry {
                    length,
                    w1,
                    w2,
                    side_slope,
                    bottom_slope,
                })
            }
            _ => Err(HydroError::MissingPondGeometry {
                option: "frustum",
                missing: missing.join(", "),
            }),
        }
    }
}

/// Which construction path fills the stage table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PondOption {
    Frustum,
    ElevationArea,
}

impl FromStr for PondOption {
    type Err = HydroError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "frustum" | "1" => Ok(PondOption::Frustum),
            "elevation_area" | "2" => Ok(PondOption::ElevationArea),
            _ => Err(HydroError::UnknownPondOption(s.to_string())),
        }
    }
}

/// Pond inputs after validation.
#[derive(Debug, Clone)]
pub struct PondInputs {
    pub bottom_elevation: f64,
    pub geometry: PondGeometry,
    pub outlet: OutletStructure,
}

/// Everything a run needs, validated.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub synthesis: SynthesisInputs,
    pub distribution: DistributionTable,
    pub pond: Option<PondInputs>,
    pub start_time: NaiveDateTime,
}

impl Scenario {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Validate the scenario and read the tables it references. Relative
    /// paths are taken from `base_dir`.
    pub fn resolve(&self, base_dir: &Path) -> Result<RunConfig> {
        // Enumerations and geometry first: no tables are read and nothing is
        // computed if any of these are wrong.
        let curve: DistributionCurve = self.rainfall.distribution.parse()?;
        let adjustment: AdjustmentPolicy = self.rainfall.adjustment.parse()?;
        let weighting = self
            .basin
            .cn_weighting
            .as_deref()
            .map(CnWeighting::from_str)
            .transpose()?
            .unwrap_or(CnWeighting::Area);
        let pond_option = self
            .pond
            .as_ref()
            .map(|p| p.option.parse::<PondOption>())
            .transpose()?;
        let frustum = match (pond_option, &self.pond) {
            (Some(PondOption::Frustum), Some(pond)) => {
                Some(pond.frustum.clone().unwrap_or_default().geometry()?)
            }
            (Some(PondOption::ElevationArea), Some(pond)) if pond.elevation_area_table.is_none() => {
                return Err(HydroError::MissingPondGeometry {
                    option: "elevation_area",
                    missing: "elevation_area_table".to_string(),
                });
            }
            _ => None,
        };
        let start_time = parse_start_time(self.start_time.as_deref()).map_err(|_| {
            HydroError::InvalidStartTime(self.start_time.clone().unwrap_or_default())
        })?;

        let tc_minutes = match (self.basin.tc_minutes, &self.basin.tc) {
            (Some(tc), _) => tc,
            (None, Some(path)) => path.time_of_concentration()?,
            (None, None) => return Err(HydroError::MissingParameter("basin tc_minutes or [basin.tc]")),
        };
        let retention = self.basin_retention(weighting)?;
        let prf = match (self.basin.prf, self.basin.prf_subareas.is_empty()) {
            (Some(prf), _) => prf,
            (None, false) => area_weighted(&self.basin.prf_subareas)?,
            (None, true) => return Err(HydroError::MissingParameter("basin prf or prf_subareas")),
        };

        let distribution =
            io::csv::load_distribution_table(&base_dir.join(&self.rainfall.distribution_table))?;
        distribution.check_complete(curve)?;

        let pond = match &self.pond {
            Some(pond) => {
                let geometry = match frustum {
                    Some(frustum) => PondGeometry::Frustum(frustum),
                    None => {
                        let table = pond
                            .elevation_area_table
                            .as_ref()
                            .ok_or(HydroError::MissingParameter("elevation_area_table"))?;
                        PondGeometry::ElevationArea(io::csv::load_elevation_area(&base_dir.join(table))?)
                    }
                };
                Some(PondInputs {
                    bottom_elevation: pond.bottom_elevation,
                    geometry,
                    outlet: pond.outlet,
                })
            }
            None => None,
        };

        info!(
            tc_min = tc_minutes,
            curve = %curve,
            adjustment = ?adjustment,
            prf,
            cn = retention.cn,
            pond = pond.is_some(),
            "scenario resolved"
        );

        Ok(RunConfig {
            synthesis: SynthesisInputs {
                area_acres: self.basin.area_acres,
                tc_minutes,
                prf,
                retention,
                depths: self.rainfall.depths,
                curve,
                adjustment,
            },
            distribution,
            pond,
            start_time,
        })
    }

    fn basin_retention(&self, weighting: CnWeighting) -> Result<Retention> {
        let basin = &self.basin;
        match (basin.s, basin.ia, basin.cn) {
            (Some(s), Some(ia), _) => Retention::from_s_ia(s, ia),
            (_, _, Some(cn)) => Retention::from_cn(cn),
            _ if !basin.cn_subareas.is_empty() => {
                weighted_retention(&basin.cn_subareas, weighting, self.rainfall.depths.d24)
            }
            _ => Err(HydroError::MissingParameter("basin cn, s and ia, or cn_subareas")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
        [basin]
        area_acres = 100.0
        tc_minutes = 64.5
        prf_subareas = [{ value = 180.0, area = 50.0 }, { value = 300.0, area = 50.0 }]
        cn_subareas = [{ value = 55.0, area = 50.0 }, { value = 78.0, area = 50.0 }]
        cn_weighting = "runoff"

        [rainfall]
        distribution = "B"
        distribution_table = "missing.csv"
        adjustment = "A"
        depths = { d1 = 2.1, d2 = 2.7, d3 = 3.0, d6 = 3.7, d12 = 4.4, d24 = 5.2 }

        [pond]
        option = "frustum"
        bottom_elevation = 100.0
        frustum = { length = 200.0, w1 = 80.0, w2 = 100.0, side_slope = 3.0 }

        [pond.outlet]
        first_orifice = { coefficient = 0.6, diameter = 6.0, center_elevation = 0.25, openings = 1.0 }
        second_orifice = { coefficient = 0.6, diameter = 12.0, center_elevation = 3.0, openings = 2.0 }
        weir = { coefficient = 3.33, exponent = 1.5, length = 4.0, crest_elevation = 5.5, count = 1.0 }
        spillway = { coefficient = 2.8, exponent = 1.5, length = 20.0, crest_elevation = 8.0 }
    "#;

    #[test]
    fn test_scenario_parses() {
        let scenario = Scenario::from_toml_str(SCENARIO).unwrap();
        assert_eq!(scenario.basin.prf_subareas.len(), 2);
        assert_eq!(scenario.pond.as_ref().unwrap().outlet.seepage.bottom, 0.0);
    }

    #[test]
    fn test_missing_frustum_field_reported_before_tables() {
        let scenario = Scenario::from_toml_str(SCENARIO).unwrap();
        match scenario.resolve(Path::new(".")) {
            Err(HydroError::MissingPondGeometry { option, missing }) => {
                assert_eq!(option, "frustum");
                assert_eq!(missing, "bottom_slope");
            }
            other => panic!("expected missing geometry, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_distribution_letter() {
        let text = SCENARIO.replace(r#"distribution = "B""#, r#"distribution = "Z""#);
        let scenario = Scenario::from_toml_str(&text).unwrap();
        assert!(matches!(
            scenario.resolve(Path::new(".")),
            Err(HydroError::UnknownDistribution(_))
        ));
    }

    #[test]
    fn test_unknown_adjustment_policy() {
        let text = SCENARIO.replace(r#"adjustment = "A""#, r#"adjustment = "linear""#);
        let scenario = Scenario::from_toml_str(&text).unwrap();
        assert!(matches!(
            scenario.resolve(Path::new(".")),
            Err(HydroError::UnknownAdjustmentPolicy(_))
        ));
    }

    #[test]
    fn test_travel_time_path_sets_tc() {
        let text = SCENARIO.replace("tc_minutes = 64.5\n", "")
            + r#"
        [basin.tc]
        velocity = [{ length = 1200.0, velocity = 2.0 }]
        storm_sewer = [{ material = "PVC", diameter = 24.0, length = 600.0, slope = 0.5 }]
    "#;
        let scenario = Scenario::from_toml_str(&text).unwrap();
        assert!(scenario.basin.tc_minutes.is_none());
        let tc = scenario.basin.tc.as_ref().unwrap().time_of_concentration().unwrap();
        // 10 min at the given velocity plus about 1.51 min in the pipe.
        assert!((tc - 11.511).abs() < 1e-2, "tc = {tc}");
    }

    #[test]
    fn test_missing_tc_reported() {
        let text = SCENARIO
            .replace("tc_minutes = 64.5\n", "")
            .replace("frustum = { length = 200.0, w1 = 80.0, w2 = 100.0, side_slope = 3.0 }", "frustum = { length = 200.0, w1 = 80.0, w2 = 100.0, side_slope = 3.0, bottom_slope = 0.5 }");
        let scenario = Scenario::from_toml_str(&text).unwrap();
        assert!(matches!(
            scenario.resolve(Path::new(".")),
            Err(HydroError::MissingParameter(_))
        ));
    }

    #[test]
    fn test_pond_option_names() {
        assert_eq!("Elevation-Area".parse::<PondOption>().unwrap(), PondOption::ElevationArea);
        assert_eq!("1".parse::<PondOption>().unwrap(), PondOption::Frustum);
        assert!("3".parse::<PondOption>().is_err());
    }
}
