use std::fmt;
use std::sync::Arc;

/// Identifies a single area (polygon, multi-polygon, or point location)
/// within an analysis.
///
/// Decoded feature collections carry either an explicit feature id or
/// nothing at all; an area without one is identified by its position in the
/// collection. The explicit form keeps the original id text (with leading
/// zeros) but avoids repeated owned Strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum AreaId {
    /// Explicit feature identifier, e.g. a FIPS code like "31001".
    Named(Arc<str>),
    /// Positional fallback for features without an explicit id.
    Index(usize),
}

impl AreaId {
    /// Build a named id from any string-like value.
    pub fn named(id: impl AsRef<str>) -> Self {
        Self::Named(Arc::from(id.as_ref()))
    }
}

impl From<&str> for AreaId {
    fn from(id: &str) -> Self { Self::named(id) }
}

impl From<String> for AreaId {
    fn from(id: String) -> Self { Self::Named(Arc::from(id)) }
}

impl From<usize> for AreaId {
    fn from(index: usize) -> Self { Self::Index(index) }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(id) => write!(f, "{id}"),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}
