//! Spatial primitives behind a small capability trait.
//!
//! The calculators never touch `geo` directly: they go through
//! [`SpatialBackend`], and every per-feature test returns a `Result` so a
//! single malformed zone can be skipped via [`absorb_failures`] instead of
//! failing a whole batch.

use geo::orient::{Direction, Orient};
use geo::{Area, BooleanOps, Contains, Coord, CoordsIter, GeodesicArea, Intersects, LineString, Point, Polygon};
use tracing::warn;

use crate::error::GeometryError;

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0088;
/// Vertices used to approximate a buffered circle.
const BUFFER_STEPS: usize = 64;

pub trait SpatialBackend: Send + Sync {
    /// Boundary counts as inside.
    fn point_in_polygon(&self, point: &Point<f64>, polygon: &Polygon<f64>) -> Result<bool, GeometryError>;

    fn polygons_intersect(&self, a: &Polygon<f64>, b: &Polygon<f64>) -> Result<bool, GeometryError>;

    /// Area of `a ∩ b` in square metres.
    fn intersection_area(&self, a: &Polygon<f64>, b: &Polygon<f64>) -> Result<f64, GeometryError>;

    /// Area in square metres.
    fn area(&self, polygon: &Polygon<f64>) -> Result<f64, GeometryError>;

    /// Geodesic circle of `radius_km` around `point`.
    fn buffer_point(&self, point: &Point<f64>, radius_km: f64) -> Result<Polygon<f64>, GeometryError>;
}

/// [`SpatialBackend`] over the `geo` crate. Coordinates are (x = longitude, y = latitude).
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoBackend;

impl SpatialBackend for GeoBackend {
    fn point_in_polygon(&self, point: &Point<f64>, polygon: &Polygon<f64>) -> Result<bool, GeometryError> {
        check_point(point)?;
        check_polygon(polygon)?;
        Ok(point.intersects(polygon))
    }

    fn polygons_intersect(&self, a: &Polygon<f64>, b: &Polygon<f64>) -> Result<bool, GeometryError> {
        check_polygon(a)?;
        check_polygon(b)?;
        Ok(a.intersects(b))
    }

    fn intersection_area(&self, a: &Polygon<f64>, b: &Polygon<f64>) -> Result<f64, GeometryError> {
        check_polygon(a)?;
        check_polygon(b)?;
        if !a.intersects(b) {
            return Ok(0.0);
        }
        if b.contains(a) {
            return Ok(geodesic_area(a));
        }
        if a.contains(b) {
            return Ok(geodesic_area(b));
        }
        Ok(geodesic_area(&a.intersection(b)))
    }

    fn area(&self, polygon: &Polygon<f64>) -> Result<f64, GeometryError> {
        check_polygon(polygon)?;
        // collinear rings can pick up geodesic noise; planar zero is authoritative
        if polygon.unsigned_area() == 0.0 {
            return Ok(0.0);
        }
        Ok(geodesic_area(polygon))
    }

    fn buffer_point(&self, point: &Point<f64>, radius_km: f64) -> Result<Polygon<f64>, GeometryError> {
        check_point(point)?;
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(GeometryError::InvalidRadius(radius_km));
        }
        let lat1 = point.y().to_radians();
        let lon1 = point.x().to_radians();
        let delta = radius_km / EARTH_RADIUS_KM;

        // negative bearings walk north, west, south, east: counter-clockwise in lon/lat
        let ring: Vec<Coord<f64>> = (0..BUFFER_STEPS)
            .map(|i| {
                let bearing = -(i as f64) * std::f64::consts::TAU / BUFFER_STEPS as f64;
                let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * bearing.cos()).asin();
                let lon2 = lon1
                    + (bearing.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());
                Coord { x: lon2.to_degrees(), y: lat2.to_degrees() }
            })
            .collect();
        Ok(Polygon::new(LineString::from(ring), vec![]))
    }
}

/// Geodesic area with the exterior forced counter-clockwise. A clockwise ring
/// measures the rest of the globe.
fn geodesic_area<G>(geometry: &G) -> f64
where
    G: Orient + GeodesicArea<f64>,
{
    geometry.orient(Direction::Default).geodesic_area_unsigned()
}

fn check_point(point: &Point<f64>) -> Result<(), GeometryError> {
    if point.x().is_finite() && point.y().is_finite() {
        Ok(())
    } else {
        Err(GeometryError::NonFinite)
    }
}

fn check_polygon(polygon: &Polygon<f64>) -> Result<(), GeometryError> {
    if polygon.coords_iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(GeometryError::NonFinite);
    }
    let exterior = polygon.exterior();
    let mut vertices: Vec<Coord<f64>> = exterior.coords().copied().collect();
    if exterior.is_closed() {
        vertices.pop();
    }
    vertices.dedup();
    if vertices.len() < 3 {
        return Err(GeometryError::DegenerateRing(vertices.len()));
    }
    Ok(())
}

/// Successes of a per-feature computation plus how many features failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Absorbed<T> {
    pub values: Vec<T>,
    pub skipped: usize,
}

/// Collect successes, log and count failures. `layer` names the source in the log.
pub fn absorb_failures<T>(
    layer: &str,
    results: impl IntoIterator<Item = Result<T, GeometryError>>,
) -> Absorbed<T> {
    let mut values = Vec::new();
    let mut skipped = 0;
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(v) => values.push(v),
            Err(error) => {
                skipped += 1;
                warn!(layer, feature = index, %error, "skipping feature with invalid geometry");
            }
        }
    }
    Absorbed { values, skipped }
}

/// What a seismic PML is computed for: a single site or an area.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Point(Point<f64>),
    Polygon(Polygon<f64>),
}

impl Target {
    pub fn site(latitude: f64, longitude: f64) -> Self {
        Target::Point(Point::new(longitude, latitude))
    }

    pub fn intersects(&self, zone: &Polygon<f64>, backend: &dyn SpatialBackend) -> Result<bool, GeometryError> {
        match self {
            Target::Point(p) => backend.point_in_polygon(p, zone),
            Target::Polygon(poly) => backend.polygons_intersect(poly, zone),
        }
    }
}

/// An MSK-64 intensity zone. `intensity` is `None` when the source omitted it.
#[derive(Debug, Clone, PartialEq)]
pub struct SeismicZone {
    pub polygon: Polygon<f64>,
    pub intensity: Option<f64>,
}

/// Fire or flood footprint, already buffered to polygons.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HazardLayer {
    pub features: Vec<Polygon<f64>>,
}

impl HazardLayer {
    /// Buffer point observations to circles of `radius_km`; invalid points are skipped.
    pub fn from_points(
        name: &str,
        points: &[Point<f64>],
        radius_km: f64,
        backend: &dyn SpatialBackend,
    ) -> Self {
        let absorbed = absorb_failures(name, points.iter().map(|p| backend.buffer_point(p, radius_km)));
        HazardLayer { features: absorbed.values }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// The named layers a regional query runs against. Empty layers mean "no data".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HazardLayers {
    pub earthquake: Vec<SeismicZone>,
    pub flood: HazardLayer,
    pub fire: HazardLayer,
}


#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::test_shapes::rect;
    use super::*;

    #[test]
    fn point_inside_and_outside() {
        let zone = rect(76.0, 43.0, 77.0, 44.0);
        let backend = GeoBackend;
        assert!(backend.point_in_polygon(&Point::new(76.5, 43.5), &zone).unwrap());
        assert!(!backend.point_in_polygon(&Point::new(78.0, 43.5), &zone).unwrap());
    }

    #[test]
    fn non_finite_point_is_an_error() {
        let zone = rect(76.0, 43.0, 77.0, 44.0);
        assert_eq!(
            GeoBackend.point_in_polygon(&Point::new(f64::NAN, 43.5), &zone),
            Err(GeometryError::NonFinite)
        );
    }

    #[test]
    fn degenerate_ring_is_an_error() {
        let line = Polygon::new(LineString::from(vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]), vec![]);
        assert_eq!(GeoBackend.area(&line), Err(GeometryError::DegenerateRing(2)));
    }

    #[test]
    fn covering_polygon_overlap_is_exactly_the_inner_area() {
        let region = rect(70.0, 45.0, 71.0, 46.0);
        let cover = rect(69.0, 44.0, 72.0, 47.0);
        let area = GeoBackend.area(&region).unwrap();
        assert_eq!(GeoBackend.intersection_area(&region, &cover).unwrap(), area);
        assert_eq!(GeoBackend.intersection_area(&cover, &region).unwrap(), area);
    }

    #[test]
    fn collinear_ring_has_zero_area() {
        let flat = Polygon::new(LineString::from(vec![(70.0, 45.0), (70.5, 45.0), (71.0, 45.0)]), vec![]);
        assert_eq!(GeoBackend.area(&flat), Ok(0.0));
    }

    #[test]
    fn disjoint_polygons_have_no_overlap() {
        let a = rect(70.0, 45.0, 71.0, 46.0);
        let b = rect(72.0, 45.0, 73.0, 46.0);
        assert!(!GeoBackend.polygons_intersect(&a, &b).unwrap());
        assert_eq!(GeoBackend.intersection_area(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn half_overlap_is_roughly_half_the_area() {
        let a = rect(70.0, 45.0, 72.0, 46.0);
        let b = rect(71.0, 45.0, 73.0, 46.0);
        let ratio = GeoBackend.intersection_area(&a, &b).unwrap() / GeoBackend.area(&a).unwrap();
        assert_relative_eq!(ratio, 0.5, max_relative = 1e-2);
    }

    #[test]
    fn buffered_point_contains_its_centre_and_has_circle_area() {
        let centre = Point::new(76.9, 43.25);
        let circle = GeoBackend.buffer_point(&centre, 10.0).unwrap();
        assert!(GeoBackend.point_in_polygon(&centre, &circle).unwrap());
        let expected = std::f64::consts::PI * 10_000.0 * 10_000.0;
        let area = GeoBackend.area(&circle).unwrap();
        assert_relative_eq!(area, expected, max_relative = 0.02);
    }

    #[test]
    fn clockwise_ring_measures_the_same_as_counter_clockwise() {
        let ccw = rect(70.0, 45.0, 71.0, 46.0);
        let cw = Polygon::new(
            LineString::from(vec![(70.0, 45.0), (70.0, 46.0), (71.0, 46.0), (71.0, 45.0), (70.0, 45.0)]),
            vec![],
        );
        let area = GeoBackend.area(&ccw).unwrap();
        assert_relative_eq!(GeoBackend.area(&cw).unwrap(), area, max_relative = 1e-9);
        // 1° × 1° near 45°N is under 1e10 m², nowhere near the globe
        assert!(area < 1.0e10);
    }

    #[test]
    fn small_partial_overlap_is_a_small_area() {
        let region = rect(70.0, 45.0, 71.0, 46.0);
        let sliver = rect(70.9, 44.5, 72.0, 46.5);
        let ratio = GeoBackend.intersection_area(&region, &sliver).unwrap() / GeoBackend.area(&region).unwrap();
        assert_relative_eq!(ratio, 0.1, max_relative = 2e-2);
    }

    #[test]
    fn buffered_circle_inside_region_measures_as_circle() {
        let region = rect(76.0, 43.0, 78.0, 44.0);
        let circle = GeoBackend.buffer_point(&Point::new(77.0, 43.5), 5.0).unwrap();
        let overlap = GeoBackend.intersection_area(&region, &circle).unwrap();
        let expected = std::f64::consts::PI * 5_000.0 * 5_000.0;
        assert_relative_eq!(overlap, expected, max_relative = 0.02);
    }

    #[test]
    fn buffer_rejects_non_positive_radius() {
        let centre = Point::new(76.9, 43.25);
        assert_eq!(GeoBackend.buffer_point(&centre, 0.0), Err(GeometryError::InvalidRadius(0.0)));
        assert!(GeoBackend.buffer_point(&centre, -1.0).is_err());
    }

    #[test]
    fn absorb_failures_keeps_successes_and_counts_skips() {
        let results = vec![Ok(1), Err(GeometryError::NonFinite), Ok(3), Err(GeometryError::DegenerateRing(1))];
        let absorbed = absorb_failures("test", results);
        assert_eq!(absorbed.values, vec![1, 3]);
        assert_eq!(absorbed.skipped, 2);
    }

    #[test]
    fn layer_from_points_skips_bad_observations() {
        let points = [Point::new(76.9, 43.25), Point::new(f64::NAN, 0.0)];
        let layer = HazardLayer::from_points("fire", &points, 5.0, &GeoBackend);
        assert_eq!(layer.features.len(), 1);
    }

    #[test]
    fn target_site_uses_lon_lat_order() {
        let zone = rect(76.0, 43.0, 77.0, 44.0);
        assert!(Target::site(43.5, 76.5).intersects(&zone, &GeoBackend).unwrap());
        assert!(!Target::site(76.5, 43.5).intersects(&zone, &GeoBackend).unwrap());
    }
}
