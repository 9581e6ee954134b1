// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw TCP printer backend (JetDirect, port 9100).
//
// A quick async probe confirms the printer answers before a persistent
// blocking socket is opened. There is no protocol on top: ESC/POS bytes go
// straight down the socket, and no code page is selected.

use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use tillprint_core::error::{Result, TillprintError};
use tillprint_core::types::{ConnectionMode, PrintOutcome};
use tracing::{debug, info, instrument};

use super::{DeviceBackend, DeviceProfile, RawSink, render_image, render_text, run_blocking};

/// Default raw TCP port (HP JetDirect).
pub const RAW_PORT: u16 = 9100;

/// Where to find the printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanTarget {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl LanTarget {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

struct LanLink(TcpStream);

impl RawSink for LanLink {
    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.0.write_all(bytes)?;
        self.0.flush()
    }
}

pub struct LanBackend {
    target: LanTarget,
    profile: DeviceProfile,
    link: Option<LanLink>,
}

impl std::fmt::Debug for LanBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanBackend")
            .field("target", &self.target)
            .field("profile", &self.profile)
            .field("connected", &self.link.is_some())
            .finish()
    }
}

impl LanBackend {
    pub fn new(target: LanTarget, profile: DeviceProfile) -> Self {
        Self {
            target,
            profile,
            link: None,
        }
    }

    pub fn target(&self) -> &LanTarget {
        &self.target
    }

    fn take_link(&mut self) -> Result<LanLink> {
        self.link.take().ok_or(TillprintError::NotConnected)
    }
}

/// Bounded reachability check.
async fn probe_tcp(target: &LanTarget) -> Result<()> {
    let addr = target.addr();
    tokio::time::timeout(target.timeout, tokio::net::TcpStream::connect(&addr))
        .await
        .map_err(|_| {
            TillprintError::DeviceOpenFailed(format!(
                "{addr} did not answer within {}ms",
                target.timeout.as_millis()
            ))
        })?
        .map_err(|e| TillprintError::DeviceOpenFailed(format!("{addr}: {e}")))?;
    Ok(())
}

fn open_stream(target: &LanTarget) -> std::io::Result<TcpStream> {
    let addr = target
        .addr()
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no address"))?;
    let stream = TcpStream::connect_timeout(&addr, target.timeout)?;
    stream.set_write_timeout(Some(target.timeout))?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

impl DeviceBackend for LanBackend {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::Lan
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    #[instrument(skip(self), fields(addr = %self.target.addr()))]
    async fn connect(&mut self) -> Result<()> {
        self.link = None;
        probe_tcp(&self.target).await?;
        debug!("probe answered");

        let target = self.target.clone();
        let stream = tokio::task::spawn_blocking(move || open_stream(&target))
            .await
            .map_err(|e| TillprintError::DeviceOpenFailed(format!("open task aborted: {e}")))?
            .map_err(|e| {
                TillprintError::DeviceOpenFailed(format!("{}: {e}", self.target.addr()))
            })?;

        self.link = Some(LanLink(stream));
        info!("LAN printer connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(LanLink(stream)) = self.link.take() {
            stream.shutdown(std::net::Shutdown::Both)?;
        }
        Ok(())
    }

    async fn print_text(&mut self, text: &str, lang: &str) -> Result<PrintOutcome> {
        let link = self.take_link()?;
        let (text, lang, profile) = (text.to_owned(), lang.to_owned(), self.profile);
        let (link, result) = run_blocking(link, move |sink| {
            render_text(sink, &text, &lang, false, &profile)
        })
        .await;
        self.link = link;
        result
    }

    async fn print_image(&mut self, path: &Path) -> Result<PrintOutcome> {
        let link = self.take_link()?;
        let (path, profile) = (path.to_path_buf(), self.profile);
        let (link, result) =
            run_blocking(link, move |sink| render_image(sink, &path, &profile)).await;
        self.link = link;
        result
    }
}
