// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: load, flatten transparency, grayscale, fit to the head
// width and binarize. Operates on in-memory images using the `image` and
// `imageproc` crates.

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::contrast::otsu_level;
use tillprint_core::error::TillprintError;
use tracing::{debug, info, instrument};

use super::bitmap::MonoBitmap;

/// Image pipeline operating on a single in-memory image.
///
/// Each transformation consumes `self` and returns a new `ImageProcessor`,
/// so a print preparation reads as one chain:
///
/// ```ignore
/// let bitmap = ImageProcessor::open("logo.png")?
///     .flatten_alpha()
///     .grayscale()
///     .fit_width(384)
///     .to_monochrome();
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, TillprintError> {
        let img = image::open(path.as_ref()).map_err(|err| {
            TillprintError::Image(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "image loaded");
        Ok(Self { image: img })
    }

    /// Create a processor from encoded bytes (PNG, JPEG, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, TillprintError> {
        let img = image::load_from_memory(data)
            .map_err(|err| TillprintError::Image(format!("failed to decode image: {err}")))?;
        debug!(width = img.width(), height = img.height(), "image decoded from bytes");
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Composite transparent pixels onto white paper.
    pub fn flatten_alpha(self) -> Self {
        if !self.image.color().has_alpha() {
            return self;
        }
        let rgba = self.image.to_rgba8();
        let flat = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let p = rgba.get_pixel(x, y);
            let alpha = p[3] as u16;
            let blend = |channel: u8| -> u8 {
                ((channel as u16 * alpha + 255 * (255 - alpha)) / 255) as u8
            };
            Rgb([blend(p[0]), blend(p[1]), blend(p[2])])
        });
        Self {
            image: DynamicImage::ImageRgb8(flat),
        }
    }

    /// Convert to single-channel luma.
    pub fn grayscale(self) -> Self {
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    /// Scale down so the image is at most `max_width` dots wide, keeping the
    /// aspect ratio. Narrower images are left alone.
    #[instrument(skip(self), fields(max_width))]
    pub fn fit_width(self, max_width: u32) -> Self {
        let (w, h) = (self.image.width(), self.image.height());
        if w <= max_width || max_width == 0 {
            return self;
        }
        let new_h = ((h as u64 * max_width as u64) / w as u64).max(1) as u32;
        debug!(from_w = w, from_h = h, to_w = max_width, to_h = new_h, "fitting to head width");
        Self {
            image: self
                .image
                .resize_exact(max_width, new_h, image::imageops::FilterType::Triangle),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Binarize with an Otsu threshold computed from the image histogram.
    ///
    /// Uniform images fall back to a mid-grey threshold so a blank page stays
    /// blank.
    pub fn to_monochrome(&self) -> MonoBitmap {
        let gray = self.image.to_luma8();
        let threshold = if is_uniform(&gray) {
            128
        } else {
            otsu_level(&gray).saturating_add(1)
        };
        debug!(threshold, "binarizing");
        MonoBitmap::from_luma(&gray, threshold)
    }

    /// Binarize with a fixed threshold.
    pub fn to_monochrome_with(&self, threshold: u8) -> MonoBitmap {
        MonoBitmap::from_luma(&self.image.to_luma8(), threshold)
    }
}

fn is_uniform(gray: &GrayImage) -> bool {
    let mut pixels = gray.pixels();
    match pixels.next() {
        Some(first) => pixels.all(|p| p[0] == first[0]),
        None => true,
    }
}
