// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// tillprint-print: Device backends, connection manager and the serialized
// job queue. `PrinterService` is the only type the HTTP layer talks to; every
// device access goes through the connection manager under one async lock.

pub mod backend;
pub mod codepage;
pub mod connection;
pub mod escpos;
pub mod journal;
pub mod params;
pub mod queue;
pub mod registry;
pub mod service;

pub use backend::{Backend, DeviceBackend, DeviceProfile};
pub use connection::ConnectionManager;
pub use escpos::EscPosBuilder;
pub use journal::{DeviceEvent, DeviceJournal};
pub use registry::JobRegistry;
pub use service::PrinterService;
