use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Four board corners in frame coordinates, ordered TL, TR, BR, BL.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub corners: [Point2<f32>; 4],
}

impl Quad {
    /// Wrap corners that are already in TL, TR, BR, BL order.
    pub fn from_ordered(corners: [Point2<f32>; 4]) -> Self {
        Self { corners }
    }

    /// Order four unordered vertices by the sum/difference heuristic:
    ///
    /// - top-left has the smallest `x + y`, bottom-right the largest;
    /// - top-right has the smallest `y - x`, bottom-left the largest.
    ///
    /// Ties resolve to the first vertex. A strongly rotated quad (close to 45°)
    /// can map two roles onto the same vertex; the result is then degenerate
    /// and rejected later by the homography.
    pub fn order_corners(pts: [Point2<f32>; 4]) -> Self {
        let sum = |p: &Point2<f32>| p.x + p.y;
        let diff = |p: &Point2<f32>| p.y - p.x;

        let tl = argmin(&pts, sum);
        let br = argmin(&pts, |p| -sum(p));
        let tr = argmin(&pts, diff);
        let bl = argmin(&pts, |p| -diff(p));

        Self {
            corners: [pts[tl], pts[tr], pts[br], pts[bl]],
        }
    }

    #[inline]
    pub fn top_left(&self) -> Point2<f32> {
        self.corners[0]
    }

    #[inline]
    pub fn top_right(&self) -> Point2<f32> {
        self.corners[1]
    }

    #[inline]
    pub fn bottom_right(&self) -> Point2<f32> {
        self.corners[2]
    }

    #[inline]
    pub fn bottom_left(&self) -> Point2<f32> {
        self.corners[3]
    }

    /// Enclosed area (shoelace), independent of winding.
    pub fn area(&self) -> f64 {
        polygon_area(&self.corners)
    }
}

/// Absolute shoelace area of a closed polygon.
pub fn polygon_area(pts: &[Point2<f32>]) -> f64 {
    if pts.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0f64;
    for (i, a) in pts.iter().enumerate() {
        let b = pts[(i + 1) % pts.len()];
        twice += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
    }
    twice.abs() * 0.5
}

fn argmin(pts: &[Point2<f32>; 4], key: impl Fn(&Point2<f32>) -> f32) -> usize {
    let mut best = 0;
    for i in 1..pts.len() {
        if key(&pts[i]) < key(&pts[best]) {
            best = i;
        }
    }
    best
}
