use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ScenarioDef;
use crate::contract::Contract;

/// Exposure and PML accumulated in one scenario bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub id: String,
    pub name: String,
    pub description: String,
    pub exposure: f64,
    pub factor: f64,
    pub pml: f64,
    pub count: usize,
}

/// Index of the bucket a position falls into: the first scenario whose zone
/// contains it, else the catch-all. `None` only if the table has no catch-all.
pub fn classify(scenarios: &[ScenarioDef], lat: f64, lon: f64) -> Option<usize> {
    scenarios
        .iter()
        .position(|s| s.zone.as_ref().is_some_and(|z| z.contains(lat, lon)))
        .or_else(|| scenarios.iter().position(|s| s.zone.is_none()))
}

/// Stable sort, descending by PML. Ties keep declaration order.
pub fn rank(mut results: Vec<ScenarioResult>) -> Vec<ScenarioResult> {
    results.sort_by(|a, b| b.pml.total_cmp(&a.pml));
    results
}

/// Bucket located contracts into scenarios and report per-bucket PML,
/// ranked by PML. Contracts without a position are left out entirely.
pub fn scenario_pml(scenarios: &[ScenarioDef], contracts: &[Contract]) -> Vec<ScenarioResult> {
    let mut results: Vec<ScenarioResult> = scenarios
        .iter()
        .map(|s| ScenarioResult {
            id: s.id.clone(),
            name: s.name.clone(),
            description: s.description.clone(),
            exposure: 0.0,
            factor: s.factor,
            pml: 0.0,
            count: 0,
        })
        .collect();

    for contract in contracts {
        let Some((lat, lon)) = contract.position() else {
            continue;
        };
        if let Some(idx) = classify(scenarios, lat, lon) {
            results[idx].exposure += contract.exposure();
            results[idx].count += 1;
        }
    }

    for r in &mut results {
        r.pml = r.exposure * r.factor;
    }

    debug!(buckets = results.len(), "scenario pml computed");
    rank(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::types::ContractId;

    fn scenarios() -> Vec<ScenarioDef> {
        EngineConfig::canonical().scenarios
    }

    fn located(id: u64, sum: f64, lat: f64, lon: f64) -> Contract {
        Contract::new(ContractId(id), sum).at(lat, lon)
    }

    fn find<'a>(results: &'a [ScenarioResult], id: &str) -> &'a ScenarioResult {
        results.iter().find(|r| r.id == id).unwrap()
    }

    fn result(id: &str, pml: f64) -> ScenarioResult {
        ScenarioResult {
            id: id.to_string(),
            name: String::new(),
            description: String::new(),
            exposure: 0.0,
            factor: 0.0,
            pml,
            count: 0,
        }
    }

    #[test]
    fn almaty_centre_goes_to_almaty_only() {
        let defs = scenarios();
        let (lat, lon) = defs[0].zone.as_ref().unwrap().center().unwrap();
        let results = scenario_pml(&defs, &[located(1, 1_000_000.0, lat, lon)]);
        let almaty = find(&results, "almaty_eq");
        assert_eq!(almaty.count, 1);
        assert_eq!(almaty.exposure, 1_000_000.0);
        assert_eq!(almaty.pml, 150_000.0);
        assert_eq!(find(&results, "general").count, 0);
    }

    /// Almaty sits inside the South-KZ box as well; first match wins.
    #[test]
    fn first_matching_rule_wins() {
        let defs = scenarios();
        assert_eq!(classify(&defs, 43.25, 76.95), Some(0));
        assert_eq!(classify(&defs, 43.6, 71.0), Some(1));
        // north of 50 and east of 80: flood rule precedes the fire rule
        assert_eq!(classify(&defs, 50.5, 82.0), Some(2));
        assert_eq!(classify(&defs, 49.5, 82.6), Some(3));
        assert_eq!(classify(&defs, 47.1, 51.9), Some(4));
    }

    #[test]
    fn unlocated_contracts_are_excluded_everywhere() {
        let defs = scenarios();
        let results = scenario_pml(&defs, &[Contract::new(ContractId(1), 5_000.0)]);
        assert!(results.iter().all(|r| r.count == 0 && r.exposure == 0.0));
    }

    #[test]
    fn total_exposure_is_preserved_across_buckets() {
        let defs = scenarios();
        let contracts = vec![
            located(1, 100.0, 43.25, 76.95),
            located(2, 200.0, 42.3, 69.6),
            located(3, 300.0, 54.9, 69.1),
            located(4, 400.0, 49.9, 82.6),
            located(5, 500.0, 47.1, 51.9),
            Contract::new(ContractId(6), 600.0),
        ];
        let results = scenario_pml(&defs, &contracts);
        let total: f64 = results.iter().map(|r| r.exposure).sum();
        assert_eq!(total, 1_500.0);
        let count: usize = results.iter().map(|r| r.count).sum();
        assert_eq!(count, 5);
        assert_eq!(find(&results, "general").pml, 5.0);
    }

    #[test]
    fn results_are_sorted_descending_by_pml() {
        let defs = scenarios();
        let contracts = vec![located(1, 1_000.0, 47.1, 51.9), located(2, 1_000.0, 43.25, 76.95)];
        let results = scenario_pml(&defs, &contracts);
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].id, "almaty_eq");
        assert_eq!(results[1].id, "general");
        assert!(results.windows(2).all(|w| w[0].pml >= w[1].pml));
    }

    #[test]
    fn equal_pml_buckets_keep_declaration_order() {
        let ranked = rank(vec![
            result("a", 1_000.0),
            result("b", 5_000.0),
            result("c", 5_000.0),
            result("d", 200.0),
        ]);
        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn empty_portfolio_keeps_declaration_order() {
        let results = scenario_pml(&scenarios(), &[]);
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["almaty_eq", "uko_eq", "north_flood", "fire_east", "general"]);
    }
}
