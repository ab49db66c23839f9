// Integration tests for neighbor detection over small synthetic maps:
// grids of unit squares, multi-part areas, point features, and input
// validation.

use contig::{AreaId, ContigError, Method, NeighborPair, find_neighbors};
use geo::{Geometry, MultiPolygon, Point, Polygon, line_string, polygon};

fn unit_square(x: f64, y: f64) -> Geometry<f64> {
    Geometry::Polygon(square(x, y))
}

fn square(x: f64, y: f64) -> Polygon<f64> {
    polygon![
        (x: x, y: y), (x: x + 1.0, y: y), (x: x + 1.0, y: y + 1.0),
        (x: x, y: y + 1.0), (x: x, y: y),
    ]
}

fn indexed(n: usize) -> Vec<AreaId> {
    (0..n).map(AreaId::Index).collect()
}

fn degree(pairs: &[NeighborPair], id: &AreaId) -> usize {
    pairs.iter().filter(|pair| pair.contains(id)).count()
}

#[test]
fn queen_grid_neighbor_counts() {
    // 3x3 grid: corners see 3 neighbors, edges 5, the center all 8.
    let mut geoms = Vec::new();
    for row in 0..3 {
        for col in 0..3 {
            geoms.push(unit_square(col as f64, row as f64));
        }
    }
    let ids = indexed(9);
    let pairs = find_neighbors(&ids, &geoms, Method::Queen).unwrap();

    assert_eq!(pairs.len(), 20);
    assert_eq!(degree(&pairs, &AreaId::Index(0)), 3); // corner
    assert_eq!(degree(&pairs, &AreaId::Index(1)), 5); // edge
    assert_eq!(degree(&pairs, &AreaId::Index(4)), 8); // center
}

#[test]
fn column_of_squares_is_rook_connected() {
    // Three collinear squares stacked in a column share horizontal edges.
    let geoms = vec![unit_square(0.0, 0.0), unit_square(0.0, 1.0), unit_square(0.0, 2.0)];
    let ids = indexed(3);

    let pairs = find_neighbors(&ids, &geoms, Method::Rook).unwrap();
    assert_eq!(
        pairs,
        vec![
            NeighborPair::new(AreaId::Index(0), AreaId::Index(1)).unwrap(),
            NeighborPair::new(AreaId::Index(1), AreaId::Index(2)).unwrap(),
        ]
    );

    // Queen finds the same relation here; the end squares never touch.
    let queen = find_neighbors(&ids, &geoms, Method::Queen).unwrap();
    assert_eq!(queen, pairs);
}

#[test]
fn queen_includes_corner_contacts_rook_misses() {
    let geoms = vec![unit_square(0.0, 0.0), unit_square(1.0, 1.0)];
    let ids = indexed(2);

    assert!(find_neighbors(&ids, &geoms, Method::Rook).unwrap().is_empty());
    let queen = find_neighbors(&ids, &geoms, Method::Queen).unwrap();
    assert_eq!(queen.len(), 1);
    assert!(queen[0].contains(&AreaId::Index(0)));
    assert!(queen[0].contains(&AreaId::Index(1)));
}

#[test]
fn multi_part_area_is_adjacent_through_any_part() {
    // Area 0 is two disjoint squares; only its remote part touches area 1.
    let multi = Geometry::MultiPolygon(MultiPolygon(vec![square(0.0, 0.0), square(10.0, 0.0)]));
    let geoms = vec![multi, unit_square(10.0, 1.0)];
    let ids = vec![AreaId::named("parts"), AreaId::named("solo")];

    let pairs = find_neighbors(&ids, &geoms, Method::Rook).unwrap();
    assert_eq!(pairs.len(), 1);
    assert!(pairs[0].contains(&AreaId::named("parts")));
}

#[test]
fn point_feature_joins_through_shared_vertex() {
    let geoms = vec![unit_square(0.0, 0.0), Geometry::Point(Point::new(1.0, 1.0))];
    let ids = vec![AreaId::named("square"), AreaId::named("site")];

    // A lone vertex can never share an edge...
    assert!(find_neighbors(&ids, &geoms, Method::Rook).unwrap().is_empty());
    // ...but it co-locates with the square's corner under queen.
    let queen = find_neighbors(&ids, &geoms, Method::Queen).unwrap();
    assert_eq!(queen.len(), 1);
}

#[test]
fn no_self_pairs_and_no_duplicates() {
    let mut geoms = Vec::new();
    for col in 0..4 {
        geoms.push(unit_square(col as f64, 0.0));
    }
    let ids = indexed(4);
    let pairs = find_neighbors(&ids, &geoms, Method::Queen).unwrap();

    for pair in &pairs {
        assert_ne!(pair.a(), pair.b());
    }
    let mut deduped = pairs.clone();
    deduped.dedup();
    assert_eq!(deduped.len(), pairs.len());
}

#[test]
fn output_is_deterministic() {
    let mut geoms = Vec::new();
    for row in 0..3 {
        for col in 0..3 {
            geoms.push(unit_square(col as f64, row as f64));
        }
    }
    let ids = indexed(9);

    let first = find_neighbors(&ids, &geoms, Method::Queen).unwrap();
    let second = find_neighbors(&ids, &geoms, Method::Queen).unwrap();
    assert_eq!(first, second);
}

#[test]
fn duplicate_ids_are_rejected() {
    let geoms = vec![unit_square(0.0, 0.0), unit_square(1.0, 0.0)];
    let ids = vec![AreaId::named("x"), AreaId::named("x")];
    let err = find_neighbors(&ids, &geoms, Method::Queen).unwrap_err();
    assert_eq!(err, ContigError::DuplicateId(AreaId::named("x")));
}

#[test]
fn mismatched_inputs_are_rejected() {
    let geoms = vec![unit_square(0.0, 0.0)];
    let err = find_neighbors(&indexed(2), &geoms, Method::Queen).unwrap_err();
    assert_eq!(err, ContigError::LengthMismatch { ids: 2, geometries: 1 });
}

#[test]
fn unsupported_geometry_is_fatal() {
    let geoms = vec![Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)])];
    let err = find_neighbors(&indexed(1), &geoms, Method::Queen).unwrap_err();
    assert_eq!(err, ContigError::UnsupportedGeometry("LineString"));
}
