use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::types::{Hazard, PerHazard};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Whether a bounding box includes its edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edges {
    #[default]
    Closed,
    Open,
}

/// Latitude/longitude box. A missing bound is unbounded on that side, so a
/// half-plane such as "north of 50°" is `min_lat: Some(50.0)` and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(default)]
    pub min_lat: Option<f64>,
    #[serde(default)]
    pub max_lat: Option<f64>,
    #[serde(default)]
    pub min_lon: Option<f64>,
    #[serde(default)]
    pub max_lon: Option<f64>,
    #[serde(default)]
    pub edges: Edges,
}

impl BoundingBox {
    pub fn closed(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        BoundingBox {
            min_lat: Some(min_lat),
            max_lat: Some(max_lat),
            min_lon: Some(min_lon),
            max_lon: Some(max_lon),
            edges: Edges::Closed,
        }
    }

    pub fn open(
        min_lat: Option<f64>,
        max_lat: Option<f64>,
        min_lon: Option<f64>,
        max_lon: Option<f64>,
    ) -> Self {
        BoundingBox { min_lat, max_lat, min_lon, max_lon, edges: Edges::Open }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let above = |v: f64, bound: Option<f64>| match (bound, self.edges) {
            (None, _) => true,
            (Some(b), Edges::Closed) => v >= b,
            (Some(b), Edges::Open) => v > b,
        };
        let below = |v: f64, bound: Option<f64>| match (bound, self.edges) {
            (None, _) => true,
            (Some(b), Edges::Closed) => v <= b,
            (Some(b), Edges::Open) => v < b,
        };
        above(lat, self.min_lat)
            && below(lat, self.max_lat)
            && above(lon, self.min_lon)
            && below(lon, self.max_lon)
    }

    /// Midpoint of a fully bounded box.
    pub fn center(&self) -> Option<(f64, f64)> {
        Some((
            (self.min_lat? + self.max_lat?) / 2.0,
            (self.min_lon? + self.max_lon?) / 2.0,
        ))
    }

    fn is_inverted(&self) -> bool {
        let inverted = |lo: Option<f64>, hi: Option<f64>| matches!((lo, hi), (Some(a), Some(b)) if a > b);
        inverted(self.min_lat, self.max_lat) || inverted(self.min_lon, self.max_lon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedBox {
    pub name: String,
    pub bounds: BoundingBox,
}

impl NamedBox {
    fn new(name: &str, bounds: BoundingBox) -> Self {
        NamedBox { name: name.to_string(), bounds }
    }
}

/// Coarse per-contract scoring rule for one hazard: `inside` if the position
/// falls in any zone, `outside` otherwise, optionally scaled by seasonality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HazardRule {
    pub zones: Vec<NamedBox>,
    pub inside: f64,
    pub outside: f64,
    pub seasonal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Horizons {
    pub short: u32,
    pub medium: u32,
    pub long: u32,
}

/// Binary compounding-event uplift: applies when both sub-scores are strictly above their triggers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationRule {
    pub seismic_above: f64,
    pub fire_above: f64,
    pub multiplier: f64,
}

/// MSK-64 intensity → structural damage factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Msk64Table {
    pub factors: BTreeMap<u32, f64>,
    /// Intensities strictly above this value take `overflow_factor`.
    pub overflow_above: f64,
    pub overflow_factor: f64,
    /// Intensity assumed for zones that carry none. Dataset convention; review
    /// against the zone source before relying on it.
    pub missing_intensity: f64,
}

impl Default for Horizons {
    fn default() -> Self {
        Horizons { short: 1, medium: 3, long: 10 }
    }
}

impl Default for CorrelationRule {
    fn default() -> Self {
        CorrelationRule { seismic_above: 50.0, fire_above: 50.0, multiplier: 1.2 }
    }
}

impl Default for Msk64Table {
    fn default() -> Self {
        Msk64Table {
            factors: BTreeMap::from([(6, 0.05), (7, 0.10), (8, 0.20), (9, 0.50), (10, 1.00)]),
            overflow_above: 9.0,
            overflow_factor: 1.0,
            missing_intensity: 9.0,
        }
    }
}

impl Msk64Table {
    /// Factor for a maximum intensity; 0 when nothing intersected.
    pub fn factor_for(&self, intensity: f64) -> f64 {
        if intensity.is_nan() || intensity <= 0.0 {
            return 0.0;
        }
        if intensity > self.overflow_above {
            return self.overflow_factor;
        }
        let key = intensity.floor();
        if key > u32::MAX as f64 {
            return 0.0;
        }
        self.factors.get(&(key as u32)).copied().unwrap_or(0.0)
    }
}

/// Loss factors applied to apportioned flood/fire exposure before the max-of-perils rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionalFactors {
    pub flood: f64,
    pub fire: f64,
}

impl Default for RegionalFactors {
    fn default() -> Self {
        RegionalFactors { flood: 0.15, fire: 0.20 }
    }
}

/// One named catastrophe scenario. A `None` zone marks the catch-all bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDef {
    pub id: String,
    pub name: String,
    pub description: String,
    pub factor: f64,
    pub zone: Option<BoundingBox>,
}

impl ScenarioDef {
    fn new(id: &str, name: &str, description: &str, factor: f64, zone: Option<BoundingBox>) -> Self {
        ScenarioDef {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            factor,
            zone,
        }
    }
}

/// Everything the engine needs, fixed at construction.
///
/// JSON overrides replace whole top-level tables; omitted tables keep their
/// canonical values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: PerHazard<f64>,
    pub base_probabilities: PerHazard<f64>,
    pub horizons: Horizons,
    pub correlation: CorrelationRule,
    pub msk64: Msk64Table,
    pub regional: RegionalFactors,
    pub scoring: PerHazard<HazardRule>,
    /// Evaluated in order; first match wins.
    pub scenarios: Vec<ScenarioDef>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::canonical()
    }
}

impl EngineConfig {
    pub fn canonical() -> Self {
        // ── Coarse scoring zones ──────────────────────────────────────────────
        let seismic_zones = vec![
            NamedBox::new("Almaty", BoundingBox::closed(43.0, 43.4, 76.7, 77.1)),
            NamedBox::new("South KZ", BoundingBox::closed(41.0, 46.0, 67.0, 71.0)),
        ];
        let cities = vec![
            NamedBox::new("Almaty", BoundingBox::open(Some(43.0), Some(43.5), Some(76.5), Some(77.5))),
            NamedBox::new("Astana", BoundingBox::open(Some(51.0), Some(51.5), None, None)),
        ];

        let scoring = PerHazard {
            seismic: HazardRule { zones: seismic_zones, inside: 90.0, outside: 10.0, seasonal: false },
            flood: HazardRule {
                zones: vec![NamedBox::new("North", BoundingBox::open(Some(50.0), None, None, None))],
                inside: 60.0,
                outside: 20.0,
                seasonal: true,
            },
            fire: HazardRule {
                zones: vec![NamedBox::new("South-East", BoundingBox::open(None, Some(45.0), Some(75.0), None))],
                inside: 70.0,
                outside: 30.0,
                seasonal: true,
            },
            wind: HazardRule {
                zones: vec![
                    NamedBox::new("Caspian", BoundingBox::open(None, None, None, Some(55.0))),
                    NamedBox::new("North", BoundingBox::open(Some(52.0), None, None, None)),
                ],
                inside: 65.0,
                outside: 25.0,
                seasonal: true,
            },
            hail: HazardRule { zones: vec![], inside: 30.0, outside: 30.0, seasonal: true },
            man_made: HazardRule { zones: cities, inside: 60.0, outside: 10.0, seasonal: false },
            social: HazardRule { zones: vec![], inside: 10.0, outside: 10.0, seasonal: false },
        };

        // ── Catastrophe scenarios, in first-match order ───────────────────────
        let scenarios = vec![
            ScenarioDef::new(
                "almaty_eq",
                "Almaty earthquake",
                "Destructive earthquake in the city of Almaty (intensity 9)",
                0.15,
                Some(BoundingBox::closed(43.0, 43.5, 76.7, 77.2)),
            ),
            ScenarioDef::new(
                "uko_eq",
                "South Kazakhstan earthquake",
                "Earthquake in the Turkestan and Zhambyl regions",
                0.08,
                Some(BoundingBox::closed(42.0, 45.0, 69.0, 75.0)),
            ),
            ScenarioDef::new(
                "north_flood",
                "Northern floods",
                "Seasonal river-valley floods in the North Kazakhstan and Akmola regions",
                0.05,
                Some(BoundingBox::open(Some(50.0), None, None, None)),
            ),
            ScenarioDef::new(
                "fire_east",
                "Eastern wildfires",
                "Large-scale summer wildfires in East Kazakhstan",
                0.10,
                Some(BoundingBox::open(Some(49.0), None, Some(80.0), None)),
            ),
            ScenarioDef::new("general", "Other risks", "Remaining portfolio exposure", 0.01, None),
        ];

        EngineConfig {
            weights: PerHazard {
                seismic: 0.35,
                flood: 0.15,
                fire: 0.20,
                wind: 0.10,
                hail: 0.05,
                man_made: 0.10,
                social: 0.05,
            },
            base_probabilities: PerHazard {
                seismic: 0.02,
                flood: 0.05,
                fire: 0.04,
                wind: 0.10,
                hail: 0.20,
                man_made: 0.01,
                social: 0.01,
            },
            horizons: Horizons::default(),
            correlation: CorrelationRule::default(),
            msk64: Msk64Table::default(),
            regional: RegionalFactors::default(),
            scoring,
            scenarios,
        }
    }

    /// Parse overrides on top of the canonical configuration and validate.
    ///
    /// Objects merge key by key at every depth, so `{"base_probabilities":
    /// {"hail": 0.1}}` changes one value. Arrays such as `scenarios` replace
    /// the canonical list whole.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let overrides: Value = serde_json::from_str(json)?;
        let mut merged = serde_json::to_value(Self::canonical())?;
        merge(&mut merged, overrides);
        let config: EngineConfig = serde_json::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (hazard, w) in self.weights.iter() {
            if !w.is_finite() || *w < 0.0 {
                return Err(ConfigError::InvalidWeight(hazard, *w));
            }
        }
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum(sum));
        }

        for (hazard, p) in self.base_probabilities.iter() {
            if !(0.0..=1.0).contains(p) {
                return Err(ConfigError::InvalidProbability(hazard, *p));
            }
        }

        let Horizons { short, medium, long } = self.horizons;
        if short == 0 || short > medium || medium > long {
            return Err(ConfigError::InvalidHorizons { short, medium, long });
        }

        let multiplier = self.correlation.multiplier;
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(ConfigError::InvalidCorrelation(multiplier));
        }

        for (intensity, f) in &self.msk64.factors {
            if !(0.0..=1.0).contains(f) {
                return Err(ConfigError::InvalidMskFactor(*intensity, *f));
            }
        }
        check_loss_factor("msk64.overflow_factor", self.msk64.overflow_factor)?;
        check_finite("msk64.overflow_above", self.msk64.overflow_above)?;
        let missing = self.msk64.missing_intensity;
        if !missing.is_finite() || missing <= 0.0 {
            return Err(ConfigError::InvalidMissingIntensity(missing));
        }
        check_finite("correlation.seismic_above", self.correlation.seismic_above)?;
        check_finite("correlation.fire_above", self.correlation.fire_above)?;
        check_loss_factor("regional.flood", self.regional.flood)?;
        check_loss_factor("regional.fire", self.regional.fire)?;

        for hazard in Hazard::ALL {
            for zone in &self.scoring.get(hazard).zones {
                if zone.bounds.is_inverted() {
                    return Err(ConfigError::InvertedBounds(zone.name.clone()));
                }
            }
        }

        let mut catch_all = 0;
        for scenario in &self.scenarios {
            check_loss_factor(&scenario.id, scenario.factor)?;
            match &scenario.zone {
                Some(zone) if zone.is_inverted() => {
                    return Err(ConfigError::InvertedBounds(scenario.id.clone()));
                }
                Some(_) => {}
                None => catch_all += 1,
            }
        }
        if catch_all != 1 {
            return Err(ConfigError::CatchAllCount(catch_all));
        }

        Ok(())
    }
}

fn merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn check_finite(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFiniteSetting(name.to_string(), value))
    }
}

fn check_loss_factor(name: &str, factor: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&factor) {
        Ok(())
    } else {
        Err(ConfigError::InvalidLossFactor(name.to_string(), factor))
    }
}
