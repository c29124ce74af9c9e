use crate::{sample_bilinear_u8, GrayImage, GrayImageView, Quad};
use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector2};

/// Projective map between two planes, `q ~ H · p` in homogeneous coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    /// Map from the square canvas `[0, size]²` into the frame, taking the
    /// canvas corners onto `quad` in TL, TR, BR, BL order.
    ///
    /// `None` when the quad is degenerate.
    pub fn canvas_to_quad(size: f32, quad: &Quad) -> Option<Self> {
        let canvas = [
            Point2::new(0.0, 0.0),
            Point2::new(size, 0.0),
            Point2::new(size, size),
            Point2::new(0.0, size),
        ];
        homography_from_4pt(&canvas, &quad.corners)
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let q = self.h.transform_point(&Point2::new(p.x as f64, p.y as f64));
        Point2::new(q.x as f32, q.y as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

/// Similarity that moves the centroid of `pts` to the origin and scales
/// their mean distance from it to √2.
fn conditioning(pts: &[Point2<f32>; 4]) -> Matrix3<f64> {
    let pts = pts.map(|p| Vector2::new(p.x as f64, p.y as f64));
    let centroid = pts.iter().sum::<Vector2<f64>>() / 4.0;
    let spread = pts.iter().map(|p| (p - centroid).norm()).sum::<f64>() / 4.0;
    let s = if spread > 1e-12 {
        std::f64::consts::SQRT_2 / spread
    } else {
        1.0
    };
    Matrix3::new(
        s, 0.0, -s * centroid.x, //
        0.0, s, -s * centroid.y, //
        0.0, 0.0, 1.0,
    )
}

/// Exact homography through four correspondences `src[i] → dst[i]`.
///
/// Both point sets are conditioned before solving the 8×8 system (with
/// `h33 = 1`). Returns `None` when three or more points are collinear or
/// coincide.
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    let t_src = conditioning(src);
    let t_dst = conditioning(dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for (k, (s, d)) in src.iter().zip(dst).enumerate() {
        let p = t_src.transform_point(&Point2::new(s.x as f64, s.y as f64));
        let q = t_dst.transform_point(&Point2::new(d.x as f64, d.y as f64));
        // u (h6 x + h7 y + 1) = h0 x + h1 y + h2, and likewise v with h3..h5
        a.row_mut(2 * k)
            .copy_from_slice(&[p.x, p.y, 1.0, 0.0, 0.0, 0.0, -q.x * p.x, -q.x * p.y]);
        a.row_mut(2 * k + 1)
            .copy_from_slice(&[0.0, 0.0, 0.0, p.x, p.y, 1.0, -q.y * p.x, -q.y * p.y]);
        b[2 * k] = q.x;
        b[2 * k + 1] = q.y;
    }

    let h = a.lu().solve(&b)?;
    if !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    let conditioned = Matrix3::new(
        h[0], h[1], h[2], //
        h[3], h[4], h[5], //
        h[6], h[7], 1.0,
    );
    if conditioned.determinant().abs() < 1e-9 {
        return None;
    }

    let full = t_dst.try_inverse()? * conditioned * t_src;
    let scale = full[(2, 2)];
    (scale.abs() > 1e-12).then(|| Homography::new(full / scale))
}

/// Resample `src` onto an `out_w × out_h` canvas. Every canvas pixel centre
/// is pushed through `h_img_from_rect` and read bilinearly; points outside
/// the frame come out black.
pub fn warp_perspective_gray(
    src: &GrayImageView<'_>,
    h_img_from_rect: Homography,
    out_w: usize,
    out_h: usize,
) -> GrayImage {
    let mut out = GrayImage::filled(out_w, out_h, 0);
    for y in 0..out_h {
        for x in 0..out_w {
            let p = h_img_from_rect.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
            out.set(x, y, sample_bilinear_u8(src, p.x - 0.5, p.y - 0.5));
        }
    }
    out
}
