// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device backends: one per connection mode, all behind `DeviceBackend`.
//
// The connection manager holds exactly one `Backend` value. Blocking device
// writes happen inside `spawn_blocking`; the render helpers below are the
// synchronous half shared by the USB and LAN backends.

pub mod dummy;
pub mod lan;
pub mod usb;

use std::path::Path;

use tillprint_core::config::ServiceConfig;
use tillprint_core::error::{Result, TillprintError};
use tillprint_core::types::{ConnectionMode, CosmeticCommand, PrintOutcome};
use tillprint_document::ImageProcessor;
use tracing::debug;

use crate::codepage;
use crate::escpos::{CUT_FEED_LINES, EscPosBuilder};

pub use dummy::DummyBackend;
pub use lan::{LanBackend, LanTarget};
pub use usb::{UsbBackend, UsbTarget};

/// Per-device print settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Thermal head width in dots; images are scaled down to fit.
    pub paper_width_dots: u32,
    /// Whether to send a cut after each job.
    pub cut: bool,
}

impl DeviceProfile {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            paper_width_dots: config.paper_width_dots,
            cut: config.cut_paper,
        }
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            paper_width_dots: 384,
            cut: true,
        }
    }
}

/// Capability shared by all backends.
///
/// Every print method fails with `NotConnected` while the backend is not
/// connected.
#[allow(async_fn_in_trait)]
pub trait DeviceBackend {
    fn mode(&self) -> ConnectionMode;

    fn is_connected(&self) -> bool;

    async fn connect(&mut self) -> Result<()>;

    /// Release the device. Calling it on a closed backend is a no-op.
    async fn disconnect(&mut self) -> Result<()>;

    async fn print_text(&mut self, text: &str, lang: &str) -> Result<PrintOutcome>;

    async fn print_image(&mut self, path: &Path) -> Result<PrintOutcome>;
}

/// The active backend. A closed set, so dispatch is a plain `match`.
pub enum Backend {
    Dummy(DummyBackend),
    Usb(UsbBackend),
    Lan(LanBackend),
}

impl DeviceBackend for Backend {
    fn mode(&self) -> ConnectionMode {
        match self {
            Self::Dummy(b) => b.mode(),
            Self::Usb(b) => b.mode(),
            Self::Lan(b) => b.mode(),
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            Self::Dummy(b) => b.is_connected(),
            Self::Usb(b) => b.is_connected(),
            Self::Lan(b) => b.is_connected(),
        }
    }

    async fn connect(&mut self) -> Result<()> {
        match self {
            Self::Dummy(b) => b.connect().await,
            Self::Usb(b) => b.connect().await,
            Self::Lan(b) => b.connect().await,
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        match self {
            Self::Dummy(b) => b.disconnect().await,
            Self::Usb(b) => b.disconnect().await,
            Self::Lan(b) => b.disconnect().await,
        }
    }

    async fn print_text(&mut self, text: &str, lang: &str) -> Result<PrintOutcome> {
        match self {
            Self::Dummy(b) => b.print_text(text, lang).await,
            Self::Usb(b) => b.print_text(text, lang).await,
            Self::Lan(b) => b.print_text(text, lang).await,
        }
    }

    async fn print_image(&mut self, path: &Path) -> Result<PrintOutcome> {
        match self {
            Self::Dummy(b) => b.print_image(path).await,
            Self::Usb(b) => b.print_image(path).await,
            Self::Lan(b) => b.print_image(path).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Blocking render path
// ---------------------------------------------------------------------------

/// An open, blocking byte channel to a printer.
pub trait RawSink: Send + 'static {
    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()>;
}

/// Write a text job: optional code page, body plus newline, then the cut.
///
/// Only the body write is fatal. A code page that cannot be selected or
/// cannot represent the text falls back to UTF-8 bytes on the default page.
pub fn render_text(
    sink: &mut dyn RawSink,
    text: &str,
    lang: &str,
    select_code_page: bool,
    profile: &DeviceProfile,
) -> Result<PrintOutcome> {
    let mut outcome = PrintOutcome::default();
    let mut body: Option<Vec<u8>> = None;

    if select_code_page {
        match codepage::for_language(lang) {
            Some(page) => match page.encode(text) {
                Some(encoded) => {
                    let mut cmd = EscPosBuilder::new();
                    cmd.code_page(page.table);
                    match sink.write_all(&cmd.build()) {
                        Ok(()) => {
                            debug!(code_page = page.name, "code page selected");
                            body = Some(encoded);
                        }
                        Err(e) => outcome.skip(
                            CosmeticCommand::CodePage,
                            format!("selecting {} failed: {e}", page.name),
                        ),
                    }
                }
                None => outcome.skip(
                    CosmeticCommand::CodePage,
                    format!("text not representable in {}", page.name),
                ),
            },
            None => outcome.skip(
                CosmeticCommand::CodePage,
                format!("no code page for language {lang:?}"),
            ),
        }
    }

    let mut job = EscPosBuilder::new();
    job.raw(body.as_deref().unwrap_or(text.as_bytes())).newline();
    sink.write_all(&job.build())?;

    finish_with_cut(sink, profile, &mut outcome);
    Ok(outcome)
}

/// Write an image job as a `GS v 0` raster, then the cut.
pub fn render_image(
    sink: &mut dyn RawSink,
    path: &Path,
    profile: &DeviceProfile,
) -> Result<PrintOutcome> {
    let bitmap = ImageProcessor::open(path)?
        .flatten_alpha()
        .grayscale()
        .fit_width(profile.paper_width_dots)
        .to_monochrome();
    debug!(
        width = bitmap.width(),
        height = bitmap.height(),
        black_dots = bitmap.black_dots(),
        "image rasterized"
    );

    let mut job = EscPosBuilder::new();
    job.raster(&bitmap).newline();
    sink.write_all(&job.build())?;

    let mut outcome = PrintOutcome::default();
    finish_with_cut(sink, profile, &mut outcome);
    Ok(outcome)
}

fn finish_with_cut(sink: &mut dyn RawSink, profile: &DeviceProfile, outcome: &mut PrintOutcome) {
    if !profile.cut {
        outcome.skip(CosmeticCommand::Cut, "disabled by device profile");
        return;
    }
    let mut cmd = EscPosBuilder::new();
    cmd.cut(CUT_FEED_LINES);
    if let Err(e) = sink.write_all(&cmd.build()) {
        outcome.skip(CosmeticCommand::Cut, format!("cut failed: {e}"));
    }
}

/// Run a render closure on the blocking pool, handing the sink back.
pub(crate) async fn run_blocking<S, F>(mut sink: S, render: F) -> (Option<S>, Result<PrintOutcome>)
where
    S: RawSink,
    F: FnOnce(&mut S) -> Result<PrintOutcome> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || {
        let result = render(&mut sink);
        (sink, result)
    })
    .await
    {
        Ok((sink, result)) => (Some(sink), result),
        Err(e) => (
            None,
            Err(TillprintError::Io(std::io::Error::other(format!(
                "device task aborted: {e}"
            )))),
        ),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tillprint_core::types::SkippedCommand;

    /// Records every write; fails writes whose first bytes match `fail_on`.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub writes: Vec<Vec<u8>>,
        pub fail_on: Option<Vec<u8>>,
    }

    impl RawSink for RecordingSink {
        fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
            if let Some(prefix) = &self.fail_on {
                if bytes.starts_with(prefix) {
                    return Err(std::io::Error::other("unsupported command"));
                }
            }
            self.writes.push(bytes.to_vec());
            Ok(())
        }
    }

    fn commands(outcome: &PrintOutcome) -> Vec<CosmeticCommand> {
        outcome.skipped.iter().map(|s: &SkippedCommand| s.command).collect()
    }

    #[test]
    fn turkish_text_selects_1254() {
        let mut sink = RecordingSink::default();
        let outcome =
            render_text(&mut sink, "Şişli", "tr", true, &DeviceProfile::default()).unwrap();
        assert!(outcome.is_clean());
        assert_eq!(sink.writes[0], vec![0x1B, 0x74, 48]);
        assert_eq!(sink.writes[1][0], 0xDE);
        assert_eq!(*sink.writes[1].last().unwrap(), b'\n');
        assert_eq!(sink.writes[2], vec![0x1D, 0x56, 0x42, 3]);
    }

    #[test]
    fn unknown_language_falls_back_to_utf8() {
        let mut sink = RecordingSink::default();
        let outcome =
            render_text(&mut sink, "こんにちは", "ja", true, &DeviceProfile::default()).unwrap();
        assert_eq!(commands(&outcome), vec![CosmeticCommand::CodePage]);
        assert_eq!(sink.writes[0], "こんにちは\n".as_bytes());
    }

    #[test]
    fn cut_failure_is_cosmetic() {
        let mut sink = RecordingSink {
            fail_on: Some(vec![0x1D, 0x56]),
            ..Default::default()
        };
        let outcome =
            render_text(&mut sink, "hello", "en", true, &DeviceProfile::default()).unwrap();
        assert_eq!(commands(&outcome), vec![CosmeticCommand::Cut]);
        assert_eq!(sink.writes.len(), 2);
    }

    #[test]
    fn code_page_failure_keeps_printing_utf8() {
        let mut sink = RecordingSink {
            fail_on: Some(vec![0x1B, 0x74]),
            ..Default::default()
        };
        let outcome =
            render_text(&mut sink, "Ğ", "tr", true, &DeviceProfile::default()).unwrap();
        assert_eq!(commands(&outcome), vec![CosmeticCommand::CodePage]);
        assert_eq!(sink.writes[0], "Ğ\n".as_bytes());
    }

    #[test]
    fn body_failure_is_fatal() {
        let mut sink = RecordingSink {
            fail_on: Some(b"boom".to_vec()),
            ..Default::default()
        };
        let err = render_text(&mut sink, "boom", "en", false, &DeviceProfile::default())
            .unwrap_err();
        assert!(matches!(err, TillprintError::Io(_)));
    }

    #[test]
    fn profile_can_disable_cut() {
        let mut sink = RecordingSink::default();
        let profile = DeviceProfile {
            paper_width_dots: 576,
            cut: false,
        };
        let outcome = render_text(&mut sink, "x", "en", false, &profile).unwrap();
        assert_eq!(commands(&outcome), vec![CosmeticCommand::Cut]);
        assert_eq!(sink.writes.len(), 1);
    }

    #[test]
    fn image_is_scaled_and_rastered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        image::GrayImage::from_pixel(768, 10, image::Luma([0u8]))
            .save(&path)
            .unwrap();

        let mut sink = RecordingSink::default();
        let outcome = render_image(&mut sink, &path, &DeviceProfile::default()).unwrap();
        assert!(outcome.is_clean());
        // 384 dots wide → 48 bytes per row, 5 rows after scaling.
        assert_eq!(&sink.writes[0][..8], &[0x1D, 0x76, 0x30, 0x00, 48, 0, 5, 0]);
    }

    #[test]
    fn missing_image_is_an_error() {
        let mut sink = RecordingSink::default();
        let err = render_image(&mut sink, Path::new("/nonexistent/x.png"), &DeviceProfile::default())
            .unwrap_err();
        assert!(matches!(err, TillprintError::Image(_)));
        assert!(sink.writes.is_empty());
    }
}
