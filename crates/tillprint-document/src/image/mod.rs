// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: loading, grayscale, fit-to-width and 1-bit packing.

pub mod bitmap;
pub mod processor;

pub use bitmap::MonoBitmap;
pub use processor::ImageProcessor;
