// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// tillprint-document: Image preparation for thermal heads.
//
// Thermal heads print single dots, so every image is flattened onto white,
// reduced to luma, scaled down to the head width and binarized before it is
// handed to the ESC/POS encoder.

pub mod image;

pub use self::image::bitmap::MonoBitmap;
pub use self::image::processor::ImageProcessor;
