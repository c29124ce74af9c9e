//! Sub-pixel refinement of a coarse board quadrilateral.
//!
//! Each side is sampled at evenly spaced stations; at every station the
//! intensity profile along the side normal is searched for its strongest
//! step, and a line is fitted through the steps. Adjacent lines are then
//! intersected to give the refined corners.

use chessclip_core::{sample_bilinear, GrayImageView, Quad};
use nalgebra::{Point2, Vector2};

/// Steps weaker than this (grey levels per pixel) are not edge evidence.
const MIN_STEP: f32 = 4.0;
const SEARCH_STEP: f32 = 0.25;
/// Portion of each side skipped at both ends, where the neighbouring side
/// bends the profile.
const END_MARGIN: f32 = 0.12;
const MAX_RESIDUAL: f32 = 1.5;

#[derive(Clone, Copy, Debug)]
struct EdgeSample {
    pos: Point2<f32>,
    weight: f32,
}

/// Infinite line through `point` along the unit vector `dir`.
#[derive(Clone, Copy, Debug)]
struct Line {
    point: Point2<f32>,
    dir: Vector2<f32>,
}

impl Line {
    fn distance(&self, p: &Point2<f32>) -> f32 {
        let normal = Vector2::new(-self.dir.y, self.dir.x);
        (*p - self.point).dot(&normal).abs()
    }

    fn intersect(&self, other: &Line) -> Option<Point2<f32>> {
        let cross = self.dir.x * other.dir.y - self.dir.y * other.dir.x;
        if cross.abs() < 1e-6 {
            return None;
        }
        let d = other.point - self.point;
        let t = (d.x * other.dir.y - d.y * other.dir.x) / cross;
        Some(self.point + self.dir * t)
    }
}

/// Refine `quad` (pixel-centre coordinates, as contours report them) against
/// the edges of `img`.
///
/// The result is in continuous image coordinates, where pixel `i` spans
/// `[i, i + 1)`, which is what the rectifying homography expects. `None` when
/// a side has too little edge support or the refined corners wander further
/// than the search window from the coarse ones.
pub(crate) fn refine_quad(
    img: &GrayImageView<'_>,
    quad: &Quad,
    search: f32,
    stations: usize,
) -> Option<Quad> {
    let c = &quad.corners;
    let mut lines = [None; 4];
    for (i, line) in lines.iter_mut().enumerate() {
        *line = fit_side(img, c[i], c[(i + 1) % 4], search, stations);
    }

    let mut refined = [Point2::origin(); 4];
    for i in 0..4 {
        let prev = lines[(i + 3) % 4].as_ref()?;
        let next = lines[i].as_ref()?;
        let corner = prev.intersect(next)?;
        if (corner - c[i]).norm() > 2.0 * search + 2.0 {
            log::debug!("refined corner {i} moved too far: {:?} -> {corner:?}", c[i]);
            return None;
        }
        refined[i] = corner + Vector2::new(0.5, 0.5);
    }
    Some(Quad::from_ordered(refined))
}

fn fit_side(
    img: &GrayImageView<'_>,
    a: Point2<f32>,
    b: Point2<f32>,
    search: f32,
    stations: usize,
) -> Option<Line> {
    let along = b - a;
    let len = along.norm();
    if len < 1.0 || stations < 2 {
        return None;
    }
    let dir = along / len;
    let normal = Vector2::new(-dir.y, dir.x);

    let samples: Vec<EdgeSample> = (0..stations)
        .filter_map(|k| {
            let s = END_MARGIN + (1.0 - 2.0 * END_MARGIN) * k as f32 / (stations - 1) as f32;
            strongest_step(img, a + along * s, normal, search)
        })
        .collect();
    if samples.len() < stations.div_ceil(3) {
        return None;
    }

    let first = fit_line(&samples)?;
    let inliers: Vec<EdgeSample> = samples
        .iter()
        .copied()
        .filter(|s| first.distance(&s.pos) <= MAX_RESIDUAL)
        .collect();
    if inliers.len() < 2 {
        return Some(first);
    }
    fit_line(&inliers)
}

/// Position of the largest intensity step along `normal` within `±search`
/// pixels of `center`, refined with a parabola through its neighbours.
fn strongest_step(
    img: &GrayImageView<'_>,
    center: Point2<f32>,
    normal: Vector2<f32>,
    search: f32,
) -> Option<EdgeSample> {
    let step_at = |t: f32| {
        let p = center + normal * (t + 0.5);
        let q = center + normal * (t - 0.5);
        (sample_bilinear(img, p.x, p.y) - sample_bilinear(img, q.x, q.y)).abs()
    };

    let mut best: Option<(f32, f32)> = None;
    let mut t = -search;
    while t <= search + 1e-3 {
        let g = step_at(t);
        if g >= MIN_STEP && best.is_none_or(|(_, bg)| g > bg) {
            best = Some((t, g));
        }
        t += SEARCH_STEP;
    }
    let (t_best, g_best) = best?;

    let (f0, f2) = (step_at(t_best - SEARCH_STEP), step_at(t_best + SEARCH_STEP));
    let denom = (f0 - 2.0 * g_best + f2).abs().max(1e-6);
    let shift = (0.5 * (f0 - f2) / denom).clamp(-1.0, 1.0);
    let t_refined = t_best + shift * SEARCH_STEP;

    Some(EdgeSample {
        pos: center + normal * t_refined,
        weight: g_best,
    })
}

/// Weighted total-least-squares line: the principal axis of the weighted
/// scatter of the samples.
fn fit_line(samples: &[EdgeSample]) -> Option<Line> {
    let total: f32 = samples.iter().map(|s| s.weight).sum();
    if total <= 1e-6 {
        return None;
    }
    let mean = samples
        .iter()
        .fold(Vector2::<f32>::zeros(), |acc, s| acc + s.pos.coords * s.weight)
        / total;

    let (mut sxx, mut sxy, mut syy) = (0.0f32, 0.0f32, 0.0f32);
    for s in samples {
        let d = s.pos.coords - mean;
        sxx += s.weight * d.x * d.x;
        sxy += s.weight * d.x * d.y;
        syy += s.weight * d.y * d.y;
    }

    let spread = ((sxx - syy) * (sxx - syy) + 4.0 * sxy * sxy).max(0.0).sqrt();
    let lambda = 0.5 * (sxx + syy + spread);
    // eigenvector of the larger eigenvalue; either form degenerates on one axis
    let candidate = if (lambda - syy).abs() >= (lambda - sxx).abs() {
        Vector2::new(lambda - syy, sxy)
    } else {
        Vector2::new(sxy, lambda - sxx)
    };
    let norm = candidate.norm();
    if norm <= 1e-9 {
        return None;
    }
    Some(Line {
        point: Point2::from(mean),
        dir: candidate / norm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chessclip_core::GrayImage;

    #[test]
    fn line_fit_recovers_a_slanted_line() {
        let samples: Vec<EdgeSample> = (0..10)
            .map(|i| EdgeSample {
                pos: Point2::new(i as f32, 2.0 * i as f32 + 1.0),
                weight: 1.0,
            })
            .collect();
        let line = fit_line(&samples).expect("line");
        assert_abs_diff_eq!(line.dir.y / line.dir.x, 2.0, epsilon = 1e-4);
        assert!(line.distance(&Point2::new(20.0, 41.0)) < 1e-3);
    }

    #[test]
    fn axis_aligned_lines_intersect() {
        let h = Line {
            point: Point2::new(0.0, 3.0),
            dir: Vector2::new(1.0, 0.0),
        };
        let v = Line {
            point: Point2::new(7.0, 0.0),
            dir: Vector2::new(0.0, 1.0),
        };
        let p = h.intersect(&v).expect("crossing");
        assert_abs_diff_eq!(p.x, 7.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p.y, 3.0, epsilon = 1e-5);
        assert!(h.intersect(&h).is_none());
    }

    #[test]
    fn coarse_quad_snaps_to_rectangle_edges() {
        // bright block covering pixels [20, 60) × [10, 50)
        let mut img = GrayImage::filled(80, 64, 40);
        img.fill_rect(20, 10, 40, 40, 200);
        let coarse = Quad::from_ordered([
            Point2::new(18.0, 8.0),
            Point2::new(61.0, 9.0),
            Point2::new(61.0, 51.0),
            Point2::new(18.0, 51.0),
        ]);
        let refined = refine_quad(&img.view(), &coarse, 4.0, 24).expect("refined");
        let expected = [(20.0, 10.0), (60.0, 10.0), (60.0, 50.0), (20.0, 50.0)];
        for (found, (x, y)) in refined.corners.iter().zip(expected) {
            assert_abs_diff_eq!(found.x, x, epsilon = 0.3);
            assert_abs_diff_eq!(found.y, y, epsilon = 0.3);
        }
    }

    #[test]
    fn flat_image_has_no_support() {
        let img = GrayImage::filled(40, 40, 120);
        let coarse = Quad::from_ordered([
            Point2::new(5.0, 5.0),
            Point2::new(35.0, 5.0),
            Point2::new(35.0, 35.0),
            Point2::new(5.0, 35.0),
        ]);
        assert!(refine_quad(&img.view(), &coarse, 4.0, 16).is_none());
    }
}
