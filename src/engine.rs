use std::sync::Arc;

use chrono::{Local, NaiveDate};
use geo::{Point, Polygon};
use tracing::info;

use crate::aggregate::{AggregatePml, aggregate_pml};
use crate::config::EngineConfig;
use crate::contract::Contract;
use crate::error::ConfigError;
use crate::geometry::{GeoBackend, HazardLayer, HazardLayers, SeismicZone, SpatialBackend, Target};
use crate::msk64::{PmlResult, msk64_pml};
use crate::regional::{RegionalRisk, regional_risk};
use crate::scenarios::{ScenarioResult, scenario_pml};
use crate::scoring::{HazardScore, score_contract, score_portfolio};

/// Risk analytics entry point.
///
/// Holds a validated, immutable configuration and the spatial capability.
/// Every method is a pure function of its arguments, so one engine can be
/// shared across threads.
#[derive(Clone)]
pub struct RiskEngine {
    config: EngineConfig,
    spatial: Option<Arc<dyn SpatialBackend>>,
}

impl RiskEngine {
    /// Engine over the `geo` backend.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_backend(config, Some(Arc::new(GeoBackend)))
    }

    /// `None` runs without spatial capability: seismic and regional queries
    /// return zero results flagged as such.
    pub fn with_backend(
        config: EngineConfig,
        spatial: Option<Arc<dyn SpatialBackend>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            spatial = spatial.is_some(),
            scenarios = config.scenarios.len(),
            "risk engine configured"
        );
        Ok(RiskEngine { config, spatial })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn backend(&self) -> Option<&dyn SpatialBackend> {
        self.spatial.as_deref()
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Score one contract; the current date stands in for a missing start date.
    pub fn score(&self, contract: &Contract) -> HazardScore {
        self.score_at(contract, Self::today())
    }

    pub fn score_at(&self, contract: &Contract, today: NaiveDate) -> HazardScore {
        score_contract(&self.config, contract, today)
    }

    pub fn score_portfolio(&self, contracts: &[Contract]) -> Vec<HazardScore> {
        self.score_portfolio_at(contracts, Self::today())
    }

    /// Parallel scoring; output order matches `contracts`.
    pub fn score_portfolio_at(&self, contracts: &[Contract], today: NaiveDate) -> Vec<HazardScore> {
        score_portfolio(&self.config, contracts, today)
    }

    pub fn msk64_pml(&self, target: &Target, sum_insured: f64, zones: &[SeismicZone]) -> PmlResult {
        msk64_pml(&self.config.msk64, target, sum_insured, zones, self.backend())
    }

    pub fn aggregate_pml(&self, contracts: &[Contract]) -> AggregatePml {
        self.aggregate_pml_at(contracts, Self::today())
    }

    pub fn aggregate_pml_at(&self, contracts: &[Contract], today: NaiveDate) -> AggregatePml {
        aggregate_pml(&self.config, contracts, today)
    }

    /// `None` means the region cannot be apportioned (zero area), not zero PML.
    pub fn regional_risk(
        &self,
        region: &Polygon<f64>,
        total_sum: f64,
        layers: &HazardLayers,
    ) -> Option<RegionalRisk> {
        regional_risk(&self.config, region, total_sum, layers, self.backend())
    }

    pub fn scenarios(&self, contracts: &[Contract]) -> Vec<ScenarioResult> {
        scenario_pml(&self.config.scenarios, contracts)
    }

    /// Buffer fire/flood observations into a layer. Empty without spatial capability.
    pub fn hazard_layer(&self, name: &str, points: &[Point<f64>], radius_km: f64) -> HazardLayer {
        match self.backend() {
            Some(backend) => HazardLayer::from_points(name, points, radius_km, backend),
            None => HazardLayer::default(),
        }
    }
}
