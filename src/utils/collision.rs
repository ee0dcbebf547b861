//! Polygon collision primitives
//!
//! Polygons are slices of vertices in drawing order; the closing edge from the
//! last vertex back to the first is implicit.

use itertools::Itertools;

use crate::common::Point2D;

/// Cross products below this magnitude count as collinear
const COLLINEAR_EPS: f64 = 1e-10;

/// Turn direction of the ordered triple (p, q, r)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Collinear,
    Clockwise,
    CounterClockwise,
}

impl Orientation {
    fn is_opposite(self, other: Orientation) -> bool {
        matches!(
            (self, other),
            (Orientation::Clockwise, Orientation::CounterClockwise)
                | (Orientation::CounterClockwise, Orientation::Clockwise)
        )
    }
}

pub fn orientation(p: &Point2D, q: &Point2D, r: &Point2D) -> Orientation {
    let val = (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y);
    if val.abs() < COLLINEAR_EPS {
        Orientation::Collinear
    } else if val > 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::CounterClockwise
    }
}

/// `q` lies within the bounding box of segment `p`-`r`
fn on_segment(p: &Point2D, q: &Point2D, r: &Point2D) -> bool {
    q.x <= p.x.max(r.x) && q.x >= p.x.min(r.x) && q.y <= p.y.max(r.y) && q.y >= p.y.min(r.y)
}

/// Whether segments `p1`-`q1` and `p2`-`q2` intersect, touching included
pub fn segments_intersect(p1: &Point2D, q1: &Point2D, p2: &Point2D, q2: &Point2D) -> bool {
    let o1 = orientation(p1, q1, p2);
    let o2 = orientation(p1, q1, q2);
    let o3 = orientation(p2, q2, p1);
    let o4 = orientation(p2, q2, q1);

    if o1 != o2 && o3 != o4 {
        return true;
    }

    (o1 == Orientation::Collinear && on_segment(p1, p2, q1))
        || (o2 == Orientation::Collinear && on_segment(p1, q2, q1))
        || (o3 == Orientation::Collinear && on_segment(p2, p1, q2))
        || (o4 == Orientation::Collinear && on_segment(p2, q1, q2))
}

/// Point containment for a simple, consistently wound polygon.
///
/// The first non-collinear edge fixes the inside side; any edge seeing the
/// point on the opposite side means outside. Two consecutive collinear edges
/// (the point sits on a vertex) count as a hit, as do points on an edge.
/// Shapes whose edges wind both ways around the point can be misclassified.
pub fn point_in_concave_polygon(p: &Point2D, poly: &[Point2D]) -> bool {
    if poly.len() < 3 {
        return false;
    }
    let mut side: Option<Orientation> = None;
    let mut prev = Orientation::Collinear;
    for (i, (a, b)) in poly.iter().circular_tuple_windows().enumerate() {
        let ori = orientation(a, b, p);
        if side.is_none() && ori != Orientation::Collinear {
            side = Some(ori);
        }
        if i > 0 {
            if ori == Orientation::Collinear && prev == Orientation::Collinear {
                return true;
            }
            if side.map_or(false, |s| ori.is_opposite(s)) {
                return false;
            }
        }
        prev = ori;
    }
    true
}

/// Segment `a`-`b` touches the polygon: an endpoint inside or an edge crossing
pub fn segment_polygon_collision(a: &Point2D, b: &Point2D, poly: &[Point2D]) -> bool {
    if point_in_concave_polygon(a, poly) || point_in_concave_polygon(b, poly) {
        return true;
    }
    poly.iter()
        .circular_tuple_windows()
        .any(|(e1, e2)| segments_intersect(a, b, e1, e2))
}

/// Polygons overlap: a vertex of either inside the other or crossing edges
pub fn polygon_polygon_collision(poly1: &[Point2D], poly2: &[Point2D]) -> bool {
    if poly1.iter().any(|p| point_in_concave_polygon(p, poly2))
        || poly2.iter().any(|p| point_in_concave_polygon(p, poly1))
    {
        return true;
    }
    poly1.iter().circular_tuple_windows().any(|(a1, b1)| {
        poly2
            .iter()
            .circular_tuple_windows()
            .any(|(a2, b2)| segments_intersect(a1, b1, a2, b2))
    })
}
