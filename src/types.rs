use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContractId(pub u64);

/// The seven independently scored hazard categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hazard {
    Seismic,
    Flood,
    Fire,
    Wind,
    Hail,
    ManMade,
    Social,
}

impl Hazard {
    /// Declaration order; every per-hazard sum iterates in this order.
    pub const ALL: [Hazard; 7] = [
        Hazard::Seismic,
        Hazard::Flood,
        Hazard::Fire,
        Hazard::Wind,
        Hazard::Hail,
        Hazard::ManMade,
        Hazard::Social,
    ];
}

/// One value per hazard. Used for weights, base probabilities, sub-scores
/// and per-hazard loss breakdowns alike.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerHazard<T> {
    pub seismic: T,
    pub flood: T,
    pub fire: T,
    pub wind: T,
    pub hail: T,
    pub man_made: T,
    pub social: T,
}

impl<T> PerHazard<T> {
    pub fn from_fn(mut f: impl FnMut(Hazard) -> T) -> Self {
        PerHazard {
            seismic: f(Hazard::Seismic),
            flood: f(Hazard::Flood),
            fire: f(Hazard::Fire),
            wind: f(Hazard::Wind),
            hail: f(Hazard::Hail),
            man_made: f(Hazard::ManMade),
            social: f(Hazard::Social),
        }
    }

    pub fn get(&self, hazard: Hazard) -> &T {
        match hazard {
            Hazard::Seismic => &self.seismic,
            Hazard::Flood => &self.flood,
            Hazard::Fire => &self.fire,
            Hazard::Wind => &self.wind,
            Hazard::Hail => &self.hail,
            Hazard::ManMade => &self.man_made,
            Hazard::Social => &self.social,
        }
    }

    pub fn get_mut(&mut self, hazard: Hazard) -> &mut T {
        match hazard {
            Hazard::Seismic => &mut self.seismic,
            Hazard::Flood => &mut self.flood,
            Hazard::Fire => &mut self.fire,
            Hazard::Wind => &mut self.wind,
            Hazard::Hail => &mut self.hail,
            Hazard::ManMade => &mut self.man_made,
            Hazard::Social => &mut self.social,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Hazard, &T)> {
        Hazard::ALL.into_iter().map(move |h| (h, self.get(h)))
    }
}

impl PerHazard<f64> {
    pub fn sum(&self) -> f64 {
        self.iter().map(|(_, v)| *v).sum()
    }
}

/// Discrete risk band for a 0–100 aggregate score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    /// Lower bounds are inclusive: [0,25) Low, [25,50) Medium, [50,75) High,
    /// [75,∞) Extreme. NaN falls through to Low.
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            RiskLevel::Extreme
        } else if score >= 50.0 {
            RiskLevel::High
        } else if score >= 25.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}
