// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ESC/POS command builder.

use tillprint_document::MonoBitmap;

/// ESC @: reset the printer to power-on defaults.
pub const INIT: [u8; 2] = [0x1B, 0x40];

/// Lines fed before the cut so the last printed line clears the cutter.
pub const CUT_FEED_LINES: u8 = 3;

/// Rows per `GS v 0` block. Many firmwares choke on taller single blocks.
const RASTER_BAND_ROWS: u32 = 256;

/// Fluent builder for ESC/POS byte sequences.
///
/// The builder does not encode text; callers hand it bytes already in the
/// printer's active code page.
#[derive(Debug, Default)]
pub struct EscPosBuilder {
    buf: Vec<u8>,
}

impl EscPosBuilder {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(1024),
        }
    }

    /// ESC @
    pub fn init(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&INIT);
        self
    }

    /// ESC t n: select character code table `n`.
    pub fn code_page(&mut self, n: u8) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x74, n]);
        self
    }

    /// Append pre-encoded bytes.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(b'\n');
        self
    }

    /// ESC d n: print and feed `lines` lines.
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x64, lines]);
        self
    }

    /// GS V 66 n: feed `lines` and full cut.
    pub fn cut(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x56, 0x42, lines]);
        self
    }

    /// GS v 0: raster bit image, split into bands of at most 256 rows.
    pub fn raster(&mut self, bitmap: &MonoBitmap) -> &mut Self {
        let bytes_per_row = bitmap.bytes_per_row();
        let data = bitmap.data();
        let mut row = 0u32;
        while row < bitmap.height() {
            let rows = (bitmap.height() - row).min(RASTER_BAND_ROWS);
            let start = row as usize * bytes_per_row;
            let end = start + rows as usize * bytes_per_row;

            self.buf.extend_from_slice(&[
                0x1D,
                0x76,
                0x30,
                0x00,
                (bytes_per_row & 0xFF) as u8,
                (bytes_per_row >> 8) as u8,
                (rows & 0xFF) as u8,
                (rows >> 8) as u8,
            ]);
            self.buf.extend_from_slice(&data[start..end]);
            row += rows;
        }
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}
