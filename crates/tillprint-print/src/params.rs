// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Connect parameter validation.
//
// Everything here is pure: a plan is built and checked before the connection
// manager touches the current device, so bad input never costs a working
// connection.

use std::time::Duration;

use serde_json::{Map, Value};
use tillprint_core::error::{Result, TillprintError};
use tillprint_core::types::{ConnectParams, ConnectionMode};

use crate::backend::lan::RAW_PORT;
use crate::backend::{DeviceProfile, LanTarget, UsbTarget};

/// Longest simulated latency or LAN timeout a request may ask for. Both are
/// spent under the device lock.
pub const MAX_WAIT_MS: u64 = 60_000;

/// A validated connection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectPlan {
    Dummy { latency: Duration },
    Usb { target: UsbTarget, profile: DeviceProfile },
    Lan { target: LanTarget, profile: DeviceProfile },
}

impl ConnectPlan {
    pub fn mode(&self) -> ConnectionMode {
        match self {
            Self::Dummy { .. } => ConnectionMode::Dummy,
            Self::Usb { .. } => ConnectionMode::Usb,
            Self::Lan { .. } => ConnectionMode::Lan,
        }
    }

    /// Diagnostic fields for the connect result.
    pub fn info(&self) -> Map<String, Value> {
        let mut info = Map::new();
        match self {
            Self::Dummy { .. } => {}
            Self::Usb { target, .. } => {
                info.insert("vid".into(), format!("{:#06x}", target.vendor_id).into());
                info.insert("pid".into(), format!("{:#06x}", target.product_id).into());
            }
            Self::Lan { target, .. } => {
                info.insert("host".into(), target.host.clone().into());
                info.insert("port".into(), target.port.into());
            }
        }
        info
    }

    pub fn from_params(
        mode: ConnectionMode,
        params: &ConnectParams,
        defaults: DeviceProfile,
        probe_timeout: Duration,
    ) -> Result<Self> {
        match mode {
            ConnectionMode::Dummy => Ok(Self::Dummy {
                latency: Duration::from_millis(optional_int(params, "latency_ms", MAX_WAIT_MS)?.unwrap_or(0)),
            }),
            ConnectionMode::Usb => {
                let target = UsbTarget {
                    vendor_id: required_u16(params, "vendor_id")?,
                    product_id: required_u16(params, "product_id")?,
                    out_ep: optional_int(params, "out_ep", u8::MAX as u64)?.map(|v| v as u8),
                    in_ep: optional_int(params, "in_ep", u8::MAX as u64)?.map(|v| v as u8),
                };
                Ok(Self::Usb {
                    target,
                    profile: profile(params, defaults)?,
                })
            }
            ConnectionMode::Lan => {
                let host = match params.get("host") {
                    None | Some(Value::Null) => {
                        return Err(TillprintError::MissingCredentials("host".into()));
                    }
                    Some(Value::String(s)) if s.trim().is_empty() => {
                        return Err(TillprintError::MissingCredentials("host".into()));
                    }
                    Some(Value::String(s)) => s.trim().to_owned(),
                    Some(other) => return Err(bad("host", other)),
                };
                let port = match optional_int(params, "port", u16::MAX as u64)? {
                    Some(0) => return Err(bad("port", &Value::from(0))),
                    Some(p) => p as u16,
                    None => RAW_PORT,
                };
                let timeout = optional_int(params, "timeout_ms", MAX_WAIT_MS)?
                    .map(Duration::from_millis)
                    .unwrap_or(probe_timeout);
                Ok(Self::Lan {
                    target: LanTarget {
                        host,
                        port,
                        timeout,
                    },
                    profile: profile(params, defaults)?,
                })
            }
            ConnectionMode::None => Err(TillprintError::InvalidMode(mode.to_string())),
        }
    }
}

fn bad(field: &str, value: &Value) -> TillprintError {
    TillprintError::BadCredentials {
        field: field.to_owned(),
        value: match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

/// Parse an integer given natively or as a decimal / `0x` hex string.
pub fn parse_int(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            }
        }
        _ => None,
    }
}

fn optional_int(params: &ConnectParams, field: &str, max: u64) -> Result<Option<u64>> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => match parse_int(value) {
            Some(n) if n <= max => Ok(Some(n)),
            _ => Err(bad(field, value)),
        },
    }
}

fn required_u16(params: &ConnectParams, field: &str) -> Result<u16> {
    optional_int(params, field, u16::MAX as u64)?
        .map(|v| v as u16)
        .ok_or_else(|| TillprintError::MissingCredentials(field.to_owned()))
}

fn profile(params: &ConnectParams, defaults: DeviceProfile) -> Result<DeviceProfile> {
    let paper_width_dots = match optional_int(params, "paper_width", u32::MAX as u64)? {
        Some(0) => return Err(bad("paper_width", &Value::from(0))),
        Some(w) => w as u32,
        None => defaults.paper_width_dots,
    };
    let cut = match params.get("cut") {
        None | Some(Value::Null) => defaults.cut,
        Some(Value::Bool(b)) => *b,
        Some(other) => return Err(bad("cut", other)),
    };
    Ok(DeviceProfile {
        paper_width_dots,
        cut,
    })
}
