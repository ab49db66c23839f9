//! Planar geometry primitives for the contiguity tests: bounding boxes,
//! two-point line equations, and collinear segment overlap.
//!
//! All tests operate on raw coordinate pairs with no CRS semantics.
//! Degenerate (vertical or zero-length) segments produce non-finite line
//! equations; every comparison involving a non-finite value evaluates to
//! "not collinear" rather than panicking.

use geo::{Coord, Rect};

/// Tolerance within which two line equations (slope and intercept) are
/// considered collinear.
pub(crate) const COLLINEAR_TOLERANCE: f64 = 1e-5;

/// Slope/intercept form of the line through a segment.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LineEquation {
    pub(crate) slope: f64,
    pub(crate) intercept: f64,
}

/// One directed boundary segment with its precomputed line equation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Segment {
    pub(crate) start: Coord<f64>,
    pub(crate) end: Coord<f64>,
    pub(crate) line: LineEquation,
}

impl Segment {
    pub(crate) fn new(start: Coord<f64>, end: Coord<f64>) -> Self {
        Self { start, end, line: line_equation(start, end) }
    }
}

/// Standard two-point line fit. Vertical segments yield an infinite (or NaN)
/// slope and intercept, which callers must tolerate.
pub(crate) fn line_equation(start: Coord<f64>, end: Coord<f64>) -> LineEquation {
    let slope = (end.y - start.y) / (end.x - start.x);
    LineEquation { slope, intercept: start.y - slope * start.x }
}

/// Axis-aligned bounding box of a point sequence, or `None` when empty.
pub(crate) fn bounding_box(points: &[Coord<f64>]) -> Option<Rect<f64>> {
    let first = *points.first()?;
    let (min, max) = points.iter().skip(1).fold((first, first), |(min, max), p| {
        (
            Coord { x: min.x.min(p.x), y: min.y.min(p.y) },
            Coord { x: max.x.max(p.x), y: max.y.max(p.y) },
        )
    });
    Some(Rect::new(min, max))
}

/// Axis-aligned overlap test with `a` expanded by `margin` on all sides.
/// Purely a cheap pre-filter, never a final adjacency decision.
pub(crate) fn rects_overlap(a: &Rect<f64>, b: &Rect<f64>, margin: f64) -> bool {
    if a.max().x + margin < b.min().x || b.max().x < a.min().x - margin {
        return false;
    }
    if a.max().y + margin < b.min().y || b.max().y < a.min().y - margin {
        return false;
    }
    true
}

/// Length of the collinear overlap between two segments, scaled onto `a`.
///
/// Returns 0 unless the two line equations agree within `tolerance` (slope
/// and intercept both). If they do, both endpoints of `b` are projected onto
/// `a`'s parametric range, clamped to [0, 1], and the clamped span is scaled
/// by `a`'s length. A positive result means a non-degenerate shared boundary
/// edge (true rook adjacency), not a mere intersection point.
pub(crate) fn segments_overlap(a: &Segment, b: &Segment, tolerance: f64) -> f64 {
    let collinear = (a.line.slope - b.line.slope).abs() < tolerance
        && (a.line.intercept - b.line.intercept).abs() < tolerance;
    if !collinear {
        return 0.0;
    }

    let t0 = distance_along(b.start, a).clamp(0.0, 1.0);
    let t1 = distance_along(b.end, a).clamp(0.0, 1.0);
    let span = (t0 - t1).abs();

    let length = ((a.start.x - a.end.x).powi(2) + (a.start.y - a.end.y).powi(2)).sqrt();
    span * length
}

/// Parametric position of `p` along `seg`, 0 at the start and 1 at the end.
fn distance_along(p: Coord<f64>, seg: &Segment) -> f64 {
    (seg.start.x - p.x) / (seg.start.x - seg.end.x)
}
