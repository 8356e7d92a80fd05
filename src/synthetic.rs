use chrono::{Days, Months, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, LogNormal};

use crate::contract::Contract;
use crate::error::ConfigError;
use crate::types::ContractId;

/// City clusters the generator scatters sites around: (name, lat, lon).
const CITIES: [(&str, f64, f64); 8] = [
    ("almaty", 43.25, 76.95),
    ("astana", 51.17, 71.43),
    ("shymkent", 42.32, 69.59),
    ("karaganda", 49.80, 73.10),
    ("pavlodar", 52.29, 76.97),
    ("oskemen", 49.95, 82.61),
    ("atyrau", 47.11, 51.92),
    ("aktobe", 50.28, 57.17),
];

const OBJECT_TYPES: [&str; 4] = ["residential", "commercial", "industrial", "warehouse"];

/// Parameters for a reproducible synthetic portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticPortfolio {
    pub seed: u64,
    pub contracts: usize,
    /// Coverage years start in this calendar year.
    pub year: i32,
    /// Ln-space sum insured. E[X] = exp(mu + sigma²/2).
    pub sum_mu: f64,
    pub sum_sigma: f64,
    /// Share of contracts left without coordinates (not yet geocoded).
    pub unlocated_share: f64,
    /// Max jitter around a city centre, degrees.
    pub jitter_deg: f64,
}

impl SyntheticPortfolio {
    /// 1 000 contracts, median sum ≈ 22 M.
    pub fn canonical() -> Self {
        SyntheticPortfolio {
            seed: 42,
            contracts: 1_000,
            year: 2024,
            sum_mu: 16.9,
            sum_sigma: 1.1,
            unlocated_share: 0.05,
            jitter_deg: 0.3,
        }
    }

    /// Same seed, same portfolio.
    pub fn generate(&self) -> Result<Vec<Contract>, ConfigError> {
        let invalid = ConfigError::InvalidSumDistribution { mu: self.sum_mu, sigma: self.sum_sigma };
        if !self.sum_mu.is_finite() || !self.sum_sigma.is_finite() || self.sum_sigma < 0.0 {
            return Err(invalid);
        }
        let sums = LogNormal::new(self.sum_mu, self.sum_sigma).map_err(|_| invalid)?;
        let mut rng = ChaCha20Rng::seed_from_u64(self.seed);
        let first_day = NaiveDate::from_ymd_opt(self.year, 1, 1);
        let share = if self.unlocated_share.is_nan() { 0.0 } else { self.unlocated_share.clamp(0.0, 1.0) };

        let contracts = (0..self.contracts)
            .map(|i| {
                let sum_insured = sums.sample(&mut rng).round();
                let mut contract = Contract::new(ContractId(i as u64 + 1), sum_insured);

                let (city, lat, lon) = CITIES[rng.random_range(0..CITIES.len())];
                contract.region_id = Some(city.to_string());
                contract.object_type = OBJECT_TYPES[rng.random_range(0..OBJECT_TYPES.len())].to_string();

                if !rng.random_bool(share) {
                    let j = self.jitter_deg.abs();
                    let dlat = if j > 0.0 { rng.random_range(-j..=j) } else { 0.0 };
                    let dlon = if j > 0.0 { rng.random_range(-j..=j) } else { 0.0 };
                    contract = contract.at(lat + dlat, lon + dlon);
                }

                let offset = Days::new(rng.random_range(0..365));
                if let Some(start) = first_day.and_then(|d| d.checked_add_days(offset)) {
                    contract.start_date = Some(start);
                    contract.end_date = start.checked_add_months(Months::new(12)).and_then(|d| d.pred_opt());
                }
                contract
            })
            .collect();
        Ok(contracts)
    }
}
