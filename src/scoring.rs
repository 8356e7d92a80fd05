use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, HazardRule};
use crate::contract::Contract;
use crate::seasonality::seasonal_factor;
use crate::types::{Hazard, PerHazard, RiskLevel};

/// Multi-hazard score for one contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardScore {
    /// Weighted aggregate in [0, 100]; `level` is derived from this exact value.
    pub score: f64,
    /// `score` rounded half away from zero, for display.
    pub rounded: u32,
    pub level: RiskLevel,
    /// Clamped sub-scores. `None` when the contract has no position.
    pub details: Option<PerHazard<f64>>,
}

impl HazardScore {
    pub fn unresolved() -> Self {
        HazardScore { score: 0.0, rounded: 0, level: RiskLevel::Low, details: None }
    }

    /// Sub-score for `hazard`, 0 when unresolved.
    pub fn sub_score(&self, hazard: Hazard) -> f64 {
        self.details.as_ref().map_or(0.0, |d| *d.get(hazard))
    }
}

fn rule_score(rule: &HazardRule, hazard: Hazard, lat: f64, lon: f64, month0: u32) -> f64 {
    let inside = rule.zones.iter().any(|z| z.bounds.contains(lat, lon));
    let raw = if inside { rule.inside } else { rule.outside };
    let raw = if rule.seasonal { raw * seasonal_factor(month0, hazard) } else { raw };
    raw.clamp(0.0, 100.0)
}

/// Score one contract. The coverage start month drives seasonality; `today`
/// stands in when the contract has no start date.
pub fn score_contract(config: &EngineConfig, contract: &Contract, today: NaiveDate) -> HazardScore {
    let Some((lat, lon)) = contract.position() else {
        return HazardScore::unresolved();
    };
    let month0 = contract.start_date.unwrap_or(today).month0();

    let details = PerHazard::from_fn(|h| rule_score(config.scoring.get(h), h, lat, lon, month0));
    let score: f64 = details.iter().map(|(h, s)| s * config.weights.get(h)).sum();

    HazardScore {
        score,
        rounded: score.round().max(0.0) as u32,
        level: RiskLevel::from_score(score),
        details: Some(details),
    }
}

/// Score every contract in parallel. Output order matches input order.
pub fn score_portfolio(config: &EngineConfig, contracts: &[Contract], today: NaiveDate) -> Vec<HazardScore> {
    contracts
        .par_iter()
        .map(|c| score_contract(config, c, today))
        .collect()
}

/// Dashboard counters for a scored portfolio.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub contracts: usize,
    pub located: usize,
    pub active: usize,
    /// Sum insured over active contracts.
    pub active_sum_insured: f64,
    pub by_level: BTreeMap<RiskLevel, usize>,
}

/// `scores` must be aligned with `contracts`; unlocated contracts are not counted by level.
pub fn summarize(contracts: &[Contract], scores: &[HazardScore]) -> PortfolioSummary {
    let mut summary = PortfolioSummary { contracts: contracts.len(), ..Default::default() };
    for (contract, score) in contracts.iter().zip(scores) {
        if contract.active {
            summary.active += 1;
            summary.active_sum_insured += contract.exposure();
        }
        if score.details.is_some() {
            summary.located += 1;
            *summary.by_level.entry(score.level).or_insert(0) += 1;
        }
    }
    summary
}
