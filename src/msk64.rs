use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Msk64Table;
use crate::error::GeometryError;
use crate::geometry::{SeismicZone, SpatialBackend, Target, absorb_failures};

/// Seismic PML for one target. Always `pml == sum_insured * factor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmlResult {
    pub pml: f64,
    /// Highest intensity among intersecting zones; 0 when none intersect.
    pub max_intensity: f64,
    pub factor: f64,
    pub description: String,
    /// Zones whose geometry test failed and were left out.
    pub skipped_zones: usize,
}

impl PmlResult {
    fn zero(description: &str) -> Self {
        PmlResult {
            pml: 0.0,
            max_intensity: 0.0,
            factor: 0.0,
            description: description.to_string(),
            skipped_zones: 0,
        }
    }
}

pub const NO_GEOMETRY: &str = "Geometry capability unavailable";
pub const NO_ZONE_DATA: &str = "No seismic zone data";
pub const OUTSIDE_ZONES: &str = "Outside seismic risk zones";

/// MSK-64 lookup PML: maximum intensity over the zones `target` touches,
/// mapped through `table`. Zones without an intensity take
/// `table.missing_intensity`.
pub fn msk64_pml(
    table: &Msk64Table,
    target: &Target,
    sum_insured: f64,
    zones: &[SeismicZone],
    backend: Option<&dyn SpatialBackend>,
) -> PmlResult {
    let Some(backend) = backend else {
        return PmlResult::zero(NO_GEOMETRY);
    };
    if zones.is_empty() {
        return PmlResult::zero(NO_ZONE_DATA);
    }

    let hits = absorb_failures(
        "earthquake",
        zones.iter().map(|zone| -> Result<Option<f64>, GeometryError> {
            let hit = target.intersects(&zone.polygon, backend)?;
            Ok(hit.then(|| zone.intensity.unwrap_or(table.missing_intensity)))
        }),
    );

    let max_intensity = hits
        .values
        .iter()
        .flatten()
        .fold(0.0_f64, |max, &i| if i > max { i } else { max });
    let factor = table.factor_for(max_intensity);
    let pml = sum_insured * factor;

    debug!(max_intensity, factor, pml, skipped = hits.skipped, "msk-64 pml computed");

    let description = if max_intensity > 0.0 {
        format!("MSK-64 intensity {max_intensity} (factor {:.0}%)", factor * 100.0)
    } else {
        OUTSIDE_ZONES.to_string()
    };

    PmlResult { pml, max_intensity, factor, description, skipped_zones: hits.skipped }
}
