use anyhow::Result;
use contig::{AreaId, Method, NeighborPair, find_neighbors};
use geo::Geometry;
use serde_json::{Map, Value};

/// One decoded input feature: an optional explicit id, planar geometry, and
/// the feature's attribute bag.
///
/// Features without an explicit id are identified by their position in the
/// input slice, so the same collection always resolves to the same ids.
#[derive(Debug, Clone)]
pub struct Area {
    id: Option<AreaId>,
    geometry: Geometry<f64>,
    properties: Map<String, Value>,
}

impl Area {
    /// An area identified by its position in the collection.
    pub fn new(geometry: Geometry<f64>, properties: Map<String, Value>) -> Self {
        Self { id: None, geometry, properties }
    }

    /// An area with an explicit identifier.
    pub fn with_id(
        id: impl Into<AreaId>,
        geometry: Geometry<f64>,
        properties: Map<String, Value>,
    ) -> Self {
        Self { id: Some(id.into()), geometry, properties }
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry<f64> { &self.geometry }

    #[inline]
    pub fn properties(&self) -> &Map<String, Value> { &self.properties }

    /// The explicit id, or the positional fallback for `index`.
    pub(crate) fn effective_id(&self, index: usize) -> AreaId {
        self.id.clone().unwrap_or(AreaId::Index(index))
    }

    /// Numeric attribute value; null, missing, and non-numeric values are
    /// all absent, never coerced.
    pub(crate) fn numeric(&self, field: &str) -> Option<f64> {
        self.properties.get(field).and_then(Value::as_f64)
    }
}

/// Resolved id for every area, in input order.
pub(crate) fn resolve_ids(areas: &[Area]) -> Vec<AreaId> {
    areas.iter().enumerate().map(|(index, area)| area.effective_id(index)).collect()
}

/// Detect adjacent-area pairs under the given contiguity method.
pub fn compute_neighbors(areas: &[Area], method: Method) -> Result<Vec<NeighborPair>> {
    let ids = resolve_ids(areas);
    let geometries: Vec<Geometry<f64>> =
        areas.iter().map(|area| area.geometry().clone()).collect();
    Ok(find_neighbors(&ids, &geometries, method)?)
}
