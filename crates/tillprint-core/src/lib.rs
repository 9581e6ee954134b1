// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// tillprint: Core types and error definitions shared across all crates.

pub mod audit;
pub mod config;
pub mod error;
pub mod human_errors;
pub mod types;

pub use audit::AuditSink;
pub use config::ServiceConfig;
pub use error::TillprintError;
pub use types::*;
