/// Errors raised when wrapping a raw pixel buffer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageBufferError {
    #[error("invalid grayscale buffer length (expected {expected} bytes, got {got})")]
    Length { expected: usize, got: usize },
    #[error("invalid grayscale dimensions (width={width}, height={height})")]
    Dimensions { width: usize, height: usize },
}

/// Borrowed 8-bit grayscale raster, rows top to bottom.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    /// `width * height` bytes.
    pub data: &'a [u8],
}

impl<'a> GrayImageView<'a> {
    /// Wrap a row-major buffer, checking that its length matches the dimensions.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ImageBufferError> {
        let expected = width
            .checked_mul(height)
            .ok_or(ImageBufferError::Dimensions { width, height })?;
        if data.len() != expected {
            return Err(ImageBufferError::Length {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

/// Owned row-major 8-bit grayscale raster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Uniformly filled image.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageBufferError> {
        GrayImageView::new(width, height, &data)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }

    /// Fill the axis-aligned rectangle `[x0, x0+w) × [y0, y0+h)`, clipped to the image.
    pub fn fill_rect(&mut self, x0: usize, y0: usize, w: usize, h: usize, value: u8) {
        let x1 = (x0 + w).min(self.width);
        let y1 = (y0 + h).min(self.height);
        for y in y0.min(y1)..y1 {
            let row = y * self.width;
            self.data[row + x0.min(x1)..row + x1].fill(value);
        }
    }
}

#[inline]
fn pixel_or_black(src: &GrayImageView<'_>, x: i64, y: i64) -> f32 {
    if (0..src.width as i64).contains(&x) && (0..src.height as i64).contains(&y) {
        src.data[y as usize * src.width + x as usize] as f32
    } else {
        0.0
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Bilinear sample at `(x, y)` in pixel coordinates (pixel `i` sits at `i`).
/// Neighbours outside the image read as 0.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let (xf, yf) = (x.floor(), y.floor());
    let (tx, ty) = (x - xf, y - yf);
    let (x0, y0) = (xf as i64, yf as i64);
    let top = lerp(pixel_or_black(src, x0, y0), pixel_or_black(src, x0 + 1, y0), tx);
    let bottom = lerp(
        pixel_or_black(src, x0, y0 + 1),
        pixel_or_black(src, x0 + 1, y0 + 1),
        tx,
    );
    lerp(top, bottom, ty)
}

/// [`sample_bilinear`] rounded to the nearest 8-bit value.
#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).round().clamp(0.0, 255.0) as u8
}
