// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// tillprint-app: HTTP daemon around the printer service.

pub mod api;
pub mod services;

pub use api::{AppState, router};
