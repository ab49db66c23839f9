//! Decomposition of area geometry into closed boundary rings.
//!
//! Each input area yields zero or more rings; a ring keeps its vertex
//! sequence, its owning area index, and a derived bounding box. Multi-part
//! areas contribute one ring per part boundary (exterior and holes alike),
//! matching how shared borders can occur along any ring of either area.

use geo::{Coord, Geometry, LineString, Rect};

use crate::ContigError;
use crate::segment::{Segment, bounding_box};

/// One closed boundary ring of an area.
#[derive(Debug, Clone)]
pub(crate) struct Ring {
    /// Index of the owning area in the caller's input order.
    pub(crate) area: u32,
    pub(crate) points: Vec<Coord<f64>>,
    pub(crate) bbox: Rect<f64>,
}

impl Ring {
    fn from_points(area: u32, points: Vec<Coord<f64>>) -> Option<Self> {
        let bbox = bounding_box(&points)?;
        Some(Self { area, points, bbox })
    }

    fn from_line_string(area: u32, line: &LineString<f64>) -> Option<Self> {
        Self::from_points(area, line.coords().copied().collect())
    }

    /// Ordered boundary segments with precomputed line equations.
    pub(crate) fn segments(&self) -> Vec<Segment> {
        self.points.windows(2).map(|pair| Segment::new(pair[0], pair[1])).collect()
    }
}

/// Flatten every area into its boundary rings, preserving input order.
///
/// `Polygon` and `MultiPolygon` contribute all their rings; a `Point`
/// contributes a single degenerate one-vertex ring so that co-located point
/// features participate in point contiguity. Any other geometry type is
/// rejected rather than guessed at.
pub(crate) fn decompose(geometries: &[Geometry<f64>]) -> Result<Vec<Ring>, ContigError> {
    let mut rings = Vec::new();

    for (index, geometry) in geometries.iter().enumerate() {
        let area = index as u32;
        match geometry {
            Geometry::Polygon(polygon) => {
                rings.extend(Ring::from_line_string(area, polygon.exterior()));
                rings.extend(
                    polygon.interiors().iter().filter_map(|ring| Ring::from_line_string(area, ring)),
                );
            }
            Geometry::MultiPolygon(multi) => {
                for polygon in &multi.0 {
                    rings.extend(Ring::from_line_string(area, polygon.exterior()));
                    rings.extend(
                        polygon
                            .interiors()
                            .iter()
                            .filter_map(|ring| Ring::from_line_string(area, ring)),
                    );
                }
            }
            Geometry::Point(point) => {
                rings.extend(Ring::from_points(area, vec![point.0]));
            }
            other => return Err(ContigError::UnsupportedGeometry(geometry_name(other))),
        }
    }

    Ok(rings)
}

fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
