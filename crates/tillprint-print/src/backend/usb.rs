// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// USB printer backend over a bulk OUT endpoint.
//
// Uses `nusb` when the `usb` feature is enabled (the default). Builds without
// it still know the mode but report it as unavailable.

use std::path::Path;
use std::time::Duration;

use tillprint_core::error::{Result, TillprintError};
use tillprint_core::types::{ConnectionMode, PrintOutcome};
use tracing::{info, instrument};

use super::{DeviceBackend, DeviceProfile, render_image, render_text, run_blocking};

/// Whether this build can talk to USB devices at all.
pub const AVAILABLE: bool = cfg!(feature = "usb");

/// Vendor/product id plus optional endpoint overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbTarget {
    pub vendor_id: u16,
    pub product_id: u16,
    pub out_ep: Option<u8>,
    pub in_ep: Option<u8>,
}

impl std::fmt::Display for UsbTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

#[cfg(feature = "usb")]
mod link {
    use futures_lite::future::block_on;
    use nusb::transfer::{Direction, EndpointType};

    use super::UsbTarget;
    use crate::backend::RawSink;
    use crate::escpos::INIT;

    /// USB Printer class code (bInterfaceClass).
    const USB_CLASS_PRINTER: u8 = 7;

    /// Claimed interface and the bulk OUT endpoint we write to.
    #[derive(Clone)]
    pub struct UsbLink {
        interface: nusb::Interface,
        ep_out: u8,
    }

    impl UsbLink {
        /// Find the device, claim its printer interface and send ESC @ to
        /// prove the link works. Blocking.
        pub fn open(target: &UsbTarget) -> Result<Self, String> {
            let dev_info = nusb::list_devices()
                .map_err(|e| format!("cannot enumerate USB devices: {e}"))?
                .find(|d| d.vendor_id() == target.vendor_id && d.product_id() == target.product_id)
                .ok_or_else(|| format!("no USB device {target}"))?;

            let iface_number = dev_info
                .interfaces()
                .find(|iface| iface.class() == USB_CLASS_PRINTER)
                .or_else(|| dev_info.interfaces().next())
                .map(|iface| iface.interface_number())
                .ok_or_else(|| format!("device {target} exposes no interfaces"))?;

            let device = dev_info
                .open()
                .map_err(|e| format!("failed to open {target}: {e}"))?;

            let ep_out = match target.out_ep {
                Some(ep) => ep,
                None => discover_bulk_out(&device, iface_number)?,
            };

            let interface = device
                .detach_and_claim_interface(iface_number)
                .map_err(|e| format!("failed to claim interface {iface_number}: {e}"))?;

            let mut link = Self { interface, ep_out };
            link.write_all(&INIT)
                .map_err(|e| format!("init command failed: {e}"))?;
            Ok(link)
        }
    }

    fn discover_bulk_out(device: &nusb::Device, iface_number: u8) -> Result<u8, String> {
        let config = device
            .active_configuration()
            .map_err(|e| format!("failed to read active configuration: {e}"))?;

        for alt in config.interface_alt_settings() {
            if alt.interface_number() != iface_number || alt.alternate_setting() != 0 {
                continue;
            }
            for ep in alt.endpoints() {
                if ep.transfer_type() == EndpointType::Bulk && ep.direction() == Direction::Out {
                    return Ok(ep.address());
                }
            }
        }
        Err("no bulk OUT endpoint on printer interface".to_owned())
    }

    impl RawSink for UsbLink {
        fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
            let completion = block_on(self.interface.bulk_out(self.ep_out, bytes.to_vec()));
            completion
                .status
                .map_err(|e| std::io::Error::other(format!("USB bulk OUT: {e}")))
        }
    }
}

#[cfg(not(feature = "usb"))]
mod link {
    use super::UsbTarget;
    use crate::backend::RawSink;

    #[derive(Clone)]
    pub struct UsbLink;

    impl UsbLink {
        pub fn open(_target: &UsbTarget) -> Result<Self, String> {
            Err("built without USB support".into())
        }
    }

    impl RawSink for UsbLink {
        fn write_all(&mut self, _bytes: &[u8]) -> std::io::Result<()> {
            Err(std::io::ErrorKind::Unsupported.into())
        }
    }
}

use link::UsbLink;

pub struct UsbBackend {
    target: UsbTarget,
    profile: DeviceProfile,
    /// Upper bound for enumerate + open + init.
    open_timeout: Duration,
    link: Option<UsbLink>,
}

impl std::fmt::Debug for UsbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsbBackend")
            .field("target", &self.target)
            .field("profile", &self.profile)
            .field("connected", &self.link.is_some())
            .finish()
    }
}

impl UsbBackend {
    pub fn new(target: UsbTarget, profile: DeviceProfile, open_timeout: Duration) -> Self {
        Self {
            target,
            profile,
            open_timeout,
            link: None,
        }
    }

    pub fn target(&self) -> &UsbTarget {
        &self.target
    }

    fn link(&self) -> Result<UsbLink> {
        self.link.clone().ok_or(TillprintError::NotConnected)
    }
}

impl DeviceBackend for UsbBackend {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::Usb
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    #[instrument(skip(self), fields(device = %self.target))]
    async fn connect(&mut self) -> Result<()> {
        if !AVAILABLE {
            return Err(TillprintError::BackendUnavailable(
                "built without USB support".into(),
            ));
        }
        self.link = None;

        let target = self.target;
        let open = tokio::task::spawn_blocking(move || UsbLink::open(&target));
        let link = tokio::time::timeout(self.open_timeout, open)
            .await
            .map_err(|_| {
                TillprintError::DeviceOpenFailed(format!(
                    "{target} did not open within {}ms",
                    self.open_timeout.as_millis()
                ))
            })?
            .map_err(|e| TillprintError::DeviceOpenFailed(format!("open task aborted: {e}")))?
            .map_err(TillprintError::DeviceOpenFailed)?;

        self.link = Some(link);
        info!("USB printer connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        // Dropping the last interface handle releases the claim.
        self.link = None;
        Ok(())
    }

    async fn print_text(&mut self, text: &str, lang: &str) -> Result<PrintOutcome> {
        let link = self.link()?;
        let (text, lang, profile) = (text.to_owned(), lang.to_owned(), self.profile);
        let (_, result) = run_blocking(link, move |sink| {
            render_text(sink, &text, &lang, true, &profile)
        })
        .await;
        result
    }

    async fn print_image(&mut self, path: &Path) -> Result<PrintOutcome> {
        let link = self.link()?;
        let (path, profile) = (path.to_path_buf(), self.profile);
        let (_, result) = run_blocking(link, move |sink| render_image(sink, &path, &profile)).await;
        result
    }
}
