// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

pub mod config;
pub mod data_dir;
pub mod log_export;
pub mod logging;
pub mod uploads;
