// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Packed 1-bit bitmap in the row layout thermal printers expect.

use image::GrayImage;

/// A black/white bitmap, one bit per dot, rows padded to whole bytes.
///
/// Bit 7 of each byte is the leftmost dot; a set bit burns a dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoBitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl MonoBitmap {
    /// Pack a luma image: pixels darker than `threshold` become black.
    pub fn from_luma(gray: &GrayImage, threshold: u8) -> Self {
        let (width, height) = gray.dimensions();
        let bytes_per_row = width.div_ceil(8) as usize;
        let mut data = vec![0u8; bytes_per_row * height as usize];

        for (x, y, pixel) in gray.enumerate_pixels() {
            if pixel[0] < threshold {
                let idx = y as usize * bytes_per_row + (x / 8) as usize;
                data[idx] |= 0x80 >> (x % 8);
            }
        }

        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes_per_row(&self) -> usize {
        self.width.div_ceil(8) as usize
    }

    /// Packed rows, top to bottom.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_black(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = y as usize * self.bytes_per_row() + (x / 8) as usize;
        self.data[idx] & (0x80 >> (x % 8)) != 0
    }

    /// Number of black dots, handy for sanity checks.
    pub fn black_dots(&self) -> u32 {
        self.data.iter().map(|b| b.count_ones()).sum()
    }
}
