//! Area of interest geometry.
//!
//! The AOI is a WKT polygon. Coverage decisions only look at the four
//! corners of its bounding box: a set of tiles covers the AOI when every
//! corner falls inside (or on the edge of) at least one tile footprint.

use geo::{BoundingRect, Coord, Geometry, Intersects, LineString, MultiPolygon, Point, Polygon};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use wkt::TryFromWkt;

/// Errors from building an area of interest.
#[derive(Debug, Error)]
pub enum AoiError {
    #[error("invalid AOI polygon: {0}")]
    InvalidWkt(String),

    #[error("AOI polygon is empty")]
    Empty,

    #[error("failed to read AOI file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Corners of the AOI bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::UpperLeft,
        Corner::UpperRight,
        Corner::LowerLeft,
        Corner::LowerRight,
    ];

    fn bit(self) -> u8 {
        match self {
            Corner::UpperLeft => 0b0001,
            Corner::UpperRight => 0b0010,
            Corner::LowerLeft => 0b0100,
            Corner::LowerRight => 0b1000,
        }
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Corner::UpperLeft => write!(f, "UL"),
            Corner::UpperRight => write!(f, "UR"),
            Corner::LowerLeft => write!(f, "LL"),
            Corner::LowerRight => write!(f, "LR"),
        }
    }
}

/// A set of AOI corners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CornerSet(u8);

impl CornerSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn of(corners: &[Corner]) -> Self {
        corners.iter().fold(Self::empty(), |set, c| set.with(*c))
    }

    pub fn with(self, corner: Corner) -> Self {
        Self(self.0 | corner.bit())
    }

    pub fn contains(&self, corner: Corner) -> bool {
        self.0 & corner.bit() != 0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True when all four corners are present.
    pub fn is_complete(&self) -> bool {
        self.0 == 0b1111
    }
}

/// The analysis area of a hindcast run.
#[derive(Debug, Clone)]
pub struct Aoi {
    name: String,
    wkt: String,
    polygon: Polygon<f64>,
    min: Coord<f64>,
    max: Coord<f64>,
}

impl Aoi {
    /// Parses an AOI from a WKT `POLYGON`.
    pub fn from_wkt(name: impl Into<String>, wkt: &str) -> Result<Self, AoiError> {
        let wkt = wkt.trim();
        let polygon = Polygon::<f64>::try_from_wkt_str(wkt)
            .map_err(|e| AoiError::InvalidWkt(e.to_string()))?;
        let rect = polygon.bounding_rect().ok_or(AoiError::Empty)?;

        Ok(Self {
            name: name.into(),
            wkt: wkt.to_string(),
            polygon,
            min: rect.min(),
            max: rect.max(),
        })
    }

    /// Reads an AOI from a file holding a single WKT polygon.
    pub fn from_file(name: impl Into<String>, path: &Path) -> Result<Self, AoiError> {
        let wkt = std::fs::read_to_string(path).map_err(|source| AoiError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_wkt(name, &wkt)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wkt(&self) -> &str {
        &self.wkt
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// Bounding box as `[min_lon, min_lat, max_lon, max_lat]`.
    pub fn bbox(&self) -> [f64; 4] {
        [self.min.x, self.min.y, self.max.x, self.max.y]
    }

    /// Location of a bounding-box corner.
    pub fn corner(&self, corner: Corner) -> Point<f64> {
        match corner {
            Corner::UpperLeft => Point::new(self.min.x, self.max.y),
            Corner::UpperRight => Point::new(self.max.x, self.max.y),
            Corner::LowerLeft => Point::new(self.min.x, self.min.y),
            Corner::LowerRight => Point::new(self.max.x, self.min.y),
        }
    }

    /// Corners of this AOI that lie inside or on the edge of `footprint`.
    pub fn covered_corners(&self, footprint: &MultiPolygon<f64>) -> CornerSet {
        Corner::ALL
            .iter()
            .filter(|c| footprint.intersects(&self.corner(**c)))
            .fold(CornerSet::empty(), |set, c| set.with(*c))
    }
}

/// Parses a WKT `POLYGON` or `MULTIPOLYGON` footprint.
pub fn footprint_from_wkt(wkt: &str) -> Option<MultiPolygon<f64>> {
    match Geometry::<f64>::try_from_wkt_str(wkt.trim()).ok()? {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
        Geometry::MultiPolygon(mp) => Some(mp),
        _ => None,
    }
}

/// Parses a GeoJSON `Polygon` or `MultiPolygon` geometry object.
pub fn footprint_from_geojson(geometry: &serde_json::Value) -> Option<MultiPolygon<f64>> {
    let coordinates = geometry.get("coordinates")?;
    match geometry.get("type")?.as_str()? {
        "Polygon" => Some(MultiPolygon::new(vec![geojson_polygon(coordinates)?])),
        "MultiPolygon" => coordinates
            .as_array()?
            .iter()
            .map(geojson_polygon)
            .collect::<Option<Vec<_>>>()
            .map(MultiPolygon::new),
        _ => None,
    }
}

fn geojson_polygon(rings: &serde_json::Value) -> Option<Polygon<f64>> {
    let mut rings = rings.as_array()?.iter().map(geojson_ring);
    let exterior = rings.next()??;
    let interiors = rings.collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, interiors))
}

fn geojson_ring(ring: &serde_json::Value) -> Option<LineString<f64>> {
    ring.as_array()?
        .iter()
        .map(|position| {
            let position = position.as_array()?;
            Some(Coord {
                x: position.first()?.as_f64()?,
                y: position.get(1)?.as_f64()?,
            })
        })
        .collect::<Option<Vec<_>>>()
        .map(LineString::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAKE: &str = "POLYGON((6.0 46.0, 7.0 46.0, 7.0 46.5, 6.0 46.5, 6.0 46.0))";

    #[test]
    fn test_from_wkt_bbox_and_corners() {
        let aoi = Aoi::from_wkt("geneva", LAKE).unwrap();
        assert_eq!(aoi.name(), "geneva");
        assert_eq!(aoi.bbox(), [6.0, 46.0, 7.0, 46.5]);
        assert_eq!(aoi.corner(Corner::UpperLeft), Point::new(6.0, 46.5));
        assert_eq!(aoi.corner(Corner::LowerRight), Point::new(7.0, 46.0));
    }

    #[test]
    fn test_from_wkt_rejects_garbage() {
        assert!(matches!(
            Aoi::from_wkt("x", "POINT(1 2)"),
            Err(AoiError::InvalidWkt(_))
        ));
        assert!(Aoi::from_wkt("x", "not wkt").is_err());
    }

    #[test]
    fn test_covered_corners_northern_half() {
        let aoi = Aoi::from_wkt("geneva", LAKE).unwrap();
        let north = footprint_from_wkt("POLYGON((5.5 46.2, 7.5 46.2, 7.5 47.0, 5.5 47.0, 5.5 46.2))")
            .unwrap();
        let covered = aoi.covered_corners(&north);
        assert_eq!(covered, CornerSet::of(&[Corner::UpperLeft, Corner::UpperRight]));
        assert!(!covered.is_complete());
    }

    #[test]
    fn test_corner_on_edge_counts_as_covered() {
        let aoi = Aoi::from_wkt("geneva", LAKE).unwrap();
        let exact = footprint_from_wkt(LAKE).unwrap();
        assert!(aoi.covered_corners(&exact).is_complete());
    }

    #[test]
    fn test_corner_set_union() {
        let a = CornerSet::of(&[Corner::UpperLeft, Corner::UpperRight]);
        let b = CornerSet::of(&[Corner::LowerLeft, Corner::LowerRight]);
        assert_eq!(a.len(), 2);
        assert!(a.union(b).is_complete());
        assert!(CornerSet::empty().is_empty());
    }

    #[test]
    fn test_footprint_from_geojson_polygon() {
        let geometry = serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[6.0, 46.0], [7.0, 46.0], [7.0, 46.5], [6.0, 46.5], [6.0, 46.0]]]
        });
        let footprint = footprint_from_geojson(&geometry).unwrap();
        assert_eq!(footprint.0.len(), 1);

        let aoi = Aoi::from_wkt("geneva", LAKE).unwrap();
        assert!(aoi.covered_corners(&footprint).is_complete());
    }

    #[test]
    fn test_footprint_from_geojson_rejects_points() {
        let geometry = serde_json::json!({"type": "Point", "coordinates": [6.0, 46.0]});
        assert!(footprint_from_geojson(&geometry).is_none());
    }
}
