use geo::Polygon;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::geometry::{HazardLayer, HazardLayers, SpatialBackend, Target, absorb_failures};
use crate::msk64::{PmlResult, msk64_pml};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Peril {
    Earthquake,
    Flood,
    Fire,
}

/// Region-level risk: seismic PML plus area-apportioned flood and fire exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalRisk {
    /// Seismic PML for the region.
    pub earthquake: f64,
    pub earthquake_details: PmlResult,
    /// Insured sum apportioned to the flood footprint.
    pub flood: f64,
    /// Insured sum apportioned to the fire footprint.
    pub fire: f64,
    /// Worst single peril: `max(earthquake, flood × f_flood, fire × f_fire)`.
    pub pml: f64,
    /// Peril behind `pml`; `None` when every candidate is zero.
    pub dominant_peril: Option<Peril>,
    /// Flood and fire features whose intersection failed.
    pub skipped_features: usize,
}

/// Share of `total_sum` covered by `layer`, by summed intersection area over
/// `region_area`, capped at the full sum.
pub fn apportioned_exposure(
    region: &Polygon<f64>,
    region_area: f64,
    total_sum: f64,
    layer: &HazardLayer,
    name: &str,
    backend: &dyn SpatialBackend,
) -> (f64, usize) {
    let overlaps = absorb_failures(name, layer.features.iter().map(|f| backend.intersection_area(region, f)));
    let covered: f64 = overlaps.values.iter().sum();
    let ratio = (covered / region_area).min(1.0);
    (total_sum * ratio, overlaps.skipped)
}

/// Regional PML with the max-of-perils rule.
///
/// Returns `None` when the region has zero (or unmeasurable) area, since an
/// area ratio is undefined there. Without a spatial backend every figure
/// degrades to zero and the seismic description says why.
pub fn regional_risk(
    config: &EngineConfig,
    region: &Polygon<f64>,
    total_sum: f64,
    layers: &HazardLayers,
    backend: Option<&dyn SpatialBackend>,
) -> Option<RegionalRisk> {
    let target = Target::Polygon(region.clone());
    let seismic = msk64_pml(&config.msk64, &target, total_sum, &layers.earthquake, backend);

    let Some(backend) = backend else {
        return Some(RegionalRisk {
            earthquake: 0.0,
            earthquake_details: seismic,
            flood: 0.0,
            fire: 0.0,
            pml: 0.0,
            dominant_peril: None,
            skipped_features: 0,
        });
    };

    let region_area = match backend.area(region) {
        Ok(a) if a.is_finite() && a > 0.0 => a,
        Ok(_) => {
            debug!("region has zero area, refusing apportionment");
            return None;
        }
        Err(error) => {
            warn!(%error, "region geometry is invalid, refusing apportionment");
            return None;
        }
    };

    let (flood, flood_skipped) =
        apportioned_exposure(region, region_area, total_sum, &layers.flood, "flood", backend);
    let (fire, fire_skipped) = apportioned_exposure(region, region_area, total_sum, &layers.fire, "fire", backend);

    let candidates = [
        (Peril::Earthquake, seismic.pml),
        (Peril::Flood, flood * config.regional.flood),
        (Peril::Fire, fire * config.regional.fire),
    ];
    let (dominant, pml) = candidates
        .into_iter()
        .fold((None, 0.0_f64), |(best, max), (peril, v)| if v > max { (Some(peril), v) } else { (best, max) });

    debug!(earthquake = seismic.pml, flood, fire, pml, "regional risk computed");

    Some(RegionalRisk {
        earthquake: seismic.pml,
        earthquake_details: seismic,
        flood,
        fire,
        pml,
        dominant_peril: dominant,
        skipped_features: flood_skipped + fire_skipped,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use geo::LineString;

    use super::*;
    use crate::geometry::test_shapes::rect;
    use crate::geometry::{GeoBackend, SeismicZone};
    use crate::msk64::NO_GEOMETRY;

    const TOTAL: f64 = 10_000_000.0;

    fn region() -> Polygon<f64> {
        rect(70.0, 45.0, 71.0, 46.0)
    }

    fn layer(features: Vec<Polygon<f64>>) -> HazardLayer {
        HazardLayer { features }
    }

    #[test]
    fn fully_covering_feature_apportions_everything() {
        let area = GeoBackend.area(&region()).unwrap();
        let cover = layer(vec![rect(69.0, 44.0, 72.0, 47.0)]);
        let (exposure, skipped) = apportioned_exposure(&region(), area, TOTAL, &cover, "flood", &GeoBackend);
        assert_eq!(exposure, TOTAL);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn feature_outside_region_apportions_nothing() {
        let area = GeoBackend.area(&region()).unwrap();
        let away = layer(vec![rect(80.0, 50.0, 81.0, 51.0)]);
        let (exposure, _) = apportioned_exposure(&region(), area, TOTAL, &away, "fire", &GeoBackend);
        assert_eq!(exposure, 0.0);
    }

    #[test]
    fn overlapping_features_are_capped_at_full_sum() {
        let area = GeoBackend.area(&region()).unwrap();
        let doubled = layer(vec![rect(69.0, 44.0, 72.0, 47.0), rect(69.5, 44.5, 71.5, 46.5)]);
        let (exposure, _) = apportioned_exposure(&region(), area, TOTAL, &doubled, "flood", &GeoBackend);
        assert_eq!(exposure, TOTAL);
    }

    #[test]
    fn half_covering_feature_apportions_about_half() {
        let area = GeoBackend.area(&region()).unwrap();
        let west = layer(vec![rect(69.0, 44.0, 70.5, 47.0)]);
        let (exposure, _) = apportioned_exposure(&region(), area, TOTAL, &west, "flood", &GeoBackend);
        assert_relative_eq!(exposure, TOTAL / 2.0, max_relative = 1e-2);
    }

    #[test]
    fn sliver_feature_apportions_its_share() {
        let area = GeoBackend.area(&region()).unwrap();
        let sliver = layer(vec![rect(70.9, 44.5, 72.0, 46.5)]);
        let (exposure, _) = apportioned_exposure(&region(), area, 1_000_000.0, &sliver, "flood", &GeoBackend);
        assert_relative_eq!(exposure, 100_000.0, max_relative = 2e-2);
    }

    #[test]
    fn buffered_circle_inside_region_apportions_a_fraction() {
        let area = GeoBackend.area(&region()).unwrap();
        let circle = GeoBackend.buffer_point(&geo::Point::new(70.5, 45.5), 5.0).unwrap();
        let (exposure, _) = apportioned_exposure(&region(), area, 1_000_000.0, &layer(vec![circle]), "fire", &GeoBackend);
        let expected = 1_000_000.0 * std::f64::consts::PI * 25.0e6 / area;
        assert_relative_eq!(exposure, expected, max_relative = 0.02);
        assert!(exposure < 10_000.0);
    }

    #[test]
    fn broken_feature_is_skipped() {
        let area = GeoBackend.area(&region()).unwrap();
        let broken = Polygon::new(LineString::from(vec![(70.2, 45.2), (f64::INFINITY, 45.3), (70.4, 45.5)]), vec![]);
        let features = layer(vec![broken, rect(69.0, 44.0, 72.0, 47.0)]);
        let (exposure, skipped) = apportioned_exposure(&region(), area, TOTAL, &features, "fire", &GeoBackend);
        assert_eq!(skipped, 1);
        assert_eq!(exposure, TOTAL);
    }

    #[test]
    fn combined_pml_is_max_not_sum() {
        let config = EngineConfig::canonical();
        let layers = HazardLayers {
            earthquake: vec![SeismicZone { polygon: rect(69.0, 44.0, 72.0, 47.0), intensity: Some(7.0) }],
            flood: layer(vec![rect(69.0, 44.0, 72.0, 47.0)]),
            fire: layer(vec![rect(69.0, 44.0, 72.0, 47.0)]),
        };
        let r = regional_risk(&config, &region(), TOTAL, &layers, Some(&GeoBackend)).unwrap();
        assert_eq!(r.earthquake, TOTAL * 0.10);
        assert_eq!(r.flood, TOTAL);
        assert_eq!(r.fire, TOTAL);
        assert_eq!(r.pml, TOTAL * 0.20);
        assert_eq!(r.dominant_peril, Some(Peril::Fire));
        assert!(r.pml < r.earthquake + r.flood * 0.15 + r.fire * 0.20);
    }

    #[test]
    fn seismic_dominates_high_intensity_region() {
        let config = EngineConfig::canonical();
        let layers = HazardLayers {
            earthquake: vec![SeismicZone { polygon: rect(70.5, 45.5, 72.0, 47.0), intensity: Some(9.0) }],
            flood: layer(vec![rect(69.0, 44.0, 72.0, 47.0)]),
            fire: HazardLayer::default(),
        };
        let r = regional_risk(&config, &region(), TOTAL, &layers, Some(&GeoBackend)).unwrap();
        assert_eq!(r.pml, TOTAL * 0.5);
        assert_eq!(r.dominant_peril, Some(Peril::Earthquake));
        assert_eq!(r.fire, 0.0);
    }

    #[test]
    fn empty_layers_give_zero_pml() {
        let config = EngineConfig::canonical();
        let r = regional_risk(&config, &region(), TOTAL, &HazardLayers::default(), Some(&GeoBackend)).unwrap();
        assert_eq!(r.pml, 0.0);
        assert_eq!(r.dominant_peril, None);
    }

    #[test]
    fn zero_area_region_is_refused() {
        let config = EngineConfig::canonical();
        // collinear ring: valid vertex count, zero area
        let flat = Polygon::new(LineString::from(vec![(70.0, 45.0), (70.5, 45.0), (71.0, 45.0)]), vec![]);
        let layers = HazardLayers { flood: layer(vec![rect(69.0, 44.0, 72.0, 47.0)]), ..Default::default() };
        assert_eq!(regional_risk(&config, &flat, TOTAL, &layers, Some(&GeoBackend)), None);
    }

    #[test]
    fn missing_backend_degrades_to_zero_result() {
        let config = EngineConfig::canonical();
        let layers = HazardLayers { flood: layer(vec![rect(69.0, 44.0, 72.0, 47.0)]), ..Default::default() };
        let r = regional_risk(&config, &region(), TOTAL, &layers, None).unwrap();
        assert_eq!(r.pml, 0.0);
        assert_eq!(r.earthquake_details.description, NO_GEOMETRY);
    }
}
