use crate::types::Hazard;

/// Seasonal multiplier for `hazard` in `month0` (0 = January … 11 = December).
///
/// Flood peaks in the spring thaw, fire and hail in summer, wind through
/// winter into early spring. Hazards without a seasonal profile return 1.0.
pub fn seasonal_factor(month0: u32, hazard: Hazard) -> f64 {
    match hazard {
        Hazard::Flood => {
            if (2..=4).contains(&month0) { 2.0 } else { 0.5 }
        }
        Hazard::Fire => {
            if (5..=8).contains(&month0) { 2.5 } else { 0.2 }
        }
        Hazard::Hail => {
            if (4..=7).contains(&month0) { 1.8 } else { 0.1 }
        }
        Hazard::Wind => {
            if month0 <= 2 || month0 >= 10 { 1.5 } else { 0.8 }
        }
        Hazard::Seismic | Hazard::ManMade | Hazard::Social => 1.0,
    }
}
