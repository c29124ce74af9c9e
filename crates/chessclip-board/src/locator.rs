use chessclip_core::{polygon_area, warp_perspective_gray, GrayImage, GrayImageView, Homography, Quad};
use image::RgbImage;
use imageproc::contours::find_contours;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::morphology::dilate;
use imageproc::point::Point;
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::refine::refine_quad;
use crate::{LocatorParams, RectifiedBoard};

/// Anything that turns a raw frame into a rectified board, or reports that
/// no board is visible in it.
///
/// "Not found" is an ordinary per-frame outcome, not an error.
pub trait LocateBoard {
    fn locate(&self, frame: &RgbImage) -> Option<RectifiedBoard>;
}

/// Contour-based board locator: largest 4-vertex polygon wins.
#[derive(Clone, Debug, Default)]
pub struct BoardLocator {
    params: LocatorParams,
}

impl BoardLocator {
    pub fn new(params: LocatorParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &LocatorParams {
        &self.params
    }

    /// Find the board quadrilateral in a grayscale frame.
    ///
    /// Gray → blur → Canny → dilate → contours → polygon approximation; the
    /// 4-vertex approximation with the largest area wins. Its sides are then
    /// snapped to the intensity edges of the blurred frame, unless refinement
    /// is disabled or finds no support, in which case the contour corners are
    /// kept. Corners come out ordered TL, TR, BR, BL.
    pub fn find_quad(&self, gray: &image::GrayImage) -> Option<Quad> {
        let p = &self.params;
        let blurred;
        let src = if p.blur_sigma > 0.0 {
            blurred = gaussian_blur_f32(gray, p.blur_sigma);
            &blurred
        } else {
            gray
        };
        let mut edges = canny(src, p.canny_low, p.canny_high.max(p.canny_low));
        if p.edge_dilation > 0 {
            edges = dilate(&edges, Norm::LInf, p.edge_dilation);
        }
        let contours = find_contours::<i32>(&edges);

        let min_area = p.min_area_frac * gray.width() as f64 * gray.height() as f64;
        let mut best: Option<(f64, [Point2<f32>; 4])> = None;

        for contour in &contours {
            if contour.points.len() < 4 {
                continue;
            }
            let perimeter = arc_length(&contour.points, true);
            let epsilon = p.approx_epsilon_frac * perimeter;
            if epsilon <= 0.0 {
                continue;
            }
            let approx = approximate_closed_polygon(&contour.points, epsilon);
            let Some(pts) = as_quadrilateral(&approx) else {
                continue;
            };
            let area = polygon_area(&pts);
            if area < min_area {
                continue;
            }
            if best.as_ref().is_none_or(|(best_area, _)| area > *best_area) {
                best = Some((area, pts));
            }
        }

        log::trace!(
            "{} contours, best quad area {:?}",
            contours.len(),
            best.as_ref().map(|(a, _)| *a)
        );
        let coarse = Quad::order_corners(best?.1);
        if p.refine_search_px <= 0.0 {
            return Some(coarse);
        }
        match refine_quad(&gray_view(src), &coarse, p.refine_search_px, p.refine_stations) {
            Some(refined) => Some(refined),
            None => {
                log::debug!("corner refinement failed, keeping contour corners");
                Some(coarse)
            }
        }
    }

    /// Warp `gray` through `quad` onto the square canvas.
    pub fn rectify(&self, gray: &image::GrayImage, quad: Quad) -> Option<RectifiedBoard> {
        let size = self.params.canvas_size as usize;
        let h_img_from_rect = Homography::canvas_to_quad(size as f32, &quad)?;
        let canvas = warp_perspective_gray(&gray_view(gray), h_img_from_rect, size, size);
        Some(RectifiedBoard {
            canvas,
            quad,
            h_img_from_rect,
        })
    }
}

impl LocateBoard for BoardLocator {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(width = frame.width(), height = frame.height()))
    )]
    fn locate(&self, frame: &RgbImage) -> Option<RectifiedBoard> {
        let gray = image::imageops::grayscale(frame);
        let quad = self.find_quad(&gray)?;
        self.rectify(&gray, quad)
    }
}

/// Treats every frame as an already rectified, top-down board image (for
/// example an overhead camera cropped to the board).
///
/// Frames are converted to grayscale and resized to the canvas when needed.
#[derive(Clone, Copy, Debug)]
pub struct PrerectifiedInput {
    pub canvas_size: u32,
}

impl LocateBoard for PrerectifiedInput {
    fn locate(&self, frame: &RgbImage) -> Option<RectifiedBoard> {
        let (w, h) = frame.dimensions();
        if w == 0 || h == 0 || self.canvas_size == 0 {
            return None;
        }
        let mut gray = image::imageops::grayscale(frame);
        if w != self.canvas_size || h != self.canvas_size {
            gray = image::imageops::resize(
                &gray,
                self.canvas_size,
                self.canvas_size,
                image::imageops::FilterType::Triangle,
            );
        }

        let size = self.canvas_size as f32;
        let quad = Quad::from_ordered([
            Point2::new(0.0, 0.0),
            Point2::new(w as f32, 0.0),
            Point2::new(w as f32, h as f32),
            Point2::new(0.0, h as f32),
        ]);
        let h_img_from_rect = Homography::canvas_to_quad(size, &quad)?;
        let (cw, ch) = gray.dimensions();
        let canvas = GrayImage::from_raw(cw as usize, ch as usize, gray.into_raw()).ok()?;
        Some(RectifiedBoard {
            canvas,
            quad,
            h_img_from_rect,
        })
    }
}

/// Convert an `image::GrayImage` into the lightweight core view type.
pub(crate) fn gray_view(img: &image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Douglas–Peucker on a closed contour.
///
/// The curve is split at an approximately farthest pair of its points and
/// each half is simplified as an open polyline, so the result does not
/// depend on where contour tracing started.
fn approximate_closed_polygon(curve: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let farthest_from = |from: usize| {
        let o = curve[from];
        curve
            .iter()
            .enumerate()
            .max_by_key(|(_, q)| {
                let (dx, dy) = ((q.x - o.x) as i64, (q.y - o.y) as i64);
                dx * dx + dy * dy
            })
            .map_or(from, |(i, _)| i)
    };
    let a = farthest_from(0);
    let b = farthest_from(a);
    let (i, j) = (a.min(b), a.max(b));
    if i == j {
        return vec![curve[i]];
    }

    let mut wrapped = curve[j..].to_vec();
    wrapped.extend_from_slice(&curve[..=i]);

    let mut out = approximate_polygon_dp(&curve[i..=j], epsilon, false);
    let back = approximate_polygon_dp(&wrapped, epsilon, false);
    // both halves share their endpoints with the first one
    if back.len() > 2 {
        out.extend_from_slice(&back[1..back.len() - 1]);
    }
    out
}

/// Collapse a closed approximation to its distinct vertices; `Some` only for
/// exactly four.
fn as_quadrilateral(poly: &[Point<i32>]) -> Option<[Point2<f32>; 4]> {
    let mut verts: Vec<Point<i32>> = Vec::with_capacity(poly.len());
    for &p in poly {
        if verts.last() != Some(&p) {
            verts.push(p);
        }
    }
    if verts.len() > 1 && verts.first() == verts.last() {
        verts.pop();
    }
    if verts.len() != 4 {
        return None;
    }
    Some(std::array::from_fn(|i| {
        Point2::new(verts[i].x as f32, verts[i].y as f32)
    }))
}
