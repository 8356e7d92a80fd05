use std::borrow::Cow;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{CorrelationRule, EngineConfig};
use crate::contract::Contract;
use crate::scoring::{HazardScore, score_contract};
use crate::types::{Hazard, PerHazard};

pub const FORMULA: &str = "PML = Σ (Amount × P_risk × Weight × Correlation)";

/// Expected loss at the three configured horizons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HorizonLosses {
    pub short: f64,
    pub medium: f64,
    pub long: f64,
}

/// Portfolio-level probabilistic PML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatePml {
    /// One-year expected loss.
    pub total: f64,
    pub periods: HorizonLosses,
    /// One-year expected loss per hazard.
    pub breakdown: PerHazard<f64>,
    /// Contracts with a positive insured sum.
    pub contracts_included: usize,
    pub formula: String,
}

/// Expected-loss contribution of a single contract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContractLoss {
    pub one_year: PerHazard<f64>,
    pub periods: HorizonLosses,
}

/// `base × score / 100` per hazard; zero for an unresolved score.
pub fn annual_probabilities(base: &PerHazard<f64>, score: &HazardScore) -> PerHazard<f64> {
    PerHazard::from_fn(|h| base.get(h) * (score.sub_score(h) / 100.0))
}

/// Uplift when seismic and fire are both strictly above their triggers.
pub fn correlation_factor(rule: &CorrelationRule, score: &HazardScore) -> f64 {
    if score.sub_score(Hazard::Seismic) > rule.seismic_above && score.sub_score(Hazard::Fire) > rule.fire_above {
        rule.multiplier
    } else {
        1.0
    }
}

/// Probability of at least one occurrence in `years` years: `1 − (1 − p)^years`,
/// evaluated in log space so small probabilities keep their precision.
/// One year returns `p` unchanged.
pub fn period_probability(p_annual: f64, years: u32) -> f64 {
    match years {
        0 => 0.0,
        1 => p_annual,
        n => -(f64::from(n) * (-p_annual).ln_1p()).exp_m1(),
    }
}

pub fn contract_loss(config: &EngineConfig, score: &HazardScore, amount: f64) -> ContractLoss {
    let probs = annual_probabilities(&config.base_probabilities, score);
    let correlation = correlation_factor(&config.correlation, score);

    let horizon = |years: u32| -> f64 {
        probs
            .iter()
            .map(|(h, p)| amount * period_probability(*p, years) * config.weights.get(h) * correlation)
            .sum()
    };

    ContractLoss {
        one_year: PerHazard::from_fn(|h| amount * probs.get(h) * config.weights.get(h) * correlation),
        periods: HorizonLosses {
            short: horizon(config.horizons.short),
            medium: horizon(config.horizons.medium),
            long: horizon(config.horizons.long),
        },
    }
}

/// Portfolio expected loss. Cached `risk_data` is used when present,
/// otherwise the contract is scored with `today` as the seasonality fallback.
/// Contracts with no positive insured sum are skipped.
pub fn aggregate_pml(config: &EngineConfig, contracts: &[Contract], today: NaiveDate) -> AggregatePml {
    let losses: Vec<ContractLoss> = contracts
        .par_iter()
        .filter_map(|c| {
            let amount = c.exposure();
            if amount == 0.0 {
                return None;
            }
            let score = match &c.risk_data {
                Some(s) => Cow::Borrowed(s),
                None => Cow::Owned(score_contract(config, c, today)),
            };
            Some(contract_loss(config, &score, amount))
        })
        .collect();

    let mut breakdown = PerHazard::<f64>::default();
    let mut periods = HorizonLosses::default();
    for loss in &losses {
        for (h, v) in loss.one_year.iter() {
            *breakdown.get_mut(h) += v;
        }
        periods.short += loss.periods.short;
        periods.medium += loss.periods.medium;
        periods.long += loss.periods.long;
    }
    let total: f64 = losses.iter().map(|l| l.one_year.sum()).sum();

    debug!(contracts = losses.len(), total, "aggregate pml computed");

    AggregatePml {
        total,
        periods,
        breakdown,
        contracts_included: losses.len(),
        formula: FORMULA.to_string(),
    }
}
