// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content-addressed storage for uploaded images.

use std::path::{Path, PathBuf};

use tillprint_audit::hash_bytes;
use tillprint_core::error::Result;
use tracing::debug;

/// Store `data` as `<dir>/<sha256>[.<ext>]` and return the path.
///
/// The extension comes from the client's file name so the image decoder can
/// guess the format; anything that is not a short alphanumeric suffix is
/// dropped. Identical uploads share one file.
pub fn store(dir: &Path, data: &[u8], original_name: Option<&str>) -> Result<PathBuf> {
    let hash = hash_bytes(data);
    let file_name = match original_name.and_then(extension) {
        Some(ext) => format!("{hash}.{ext}"),
        None => hash,
    };
    let path = dir.join(file_name);

    if path.exists() {
        debug!(path = %path.display(), "upload already stored");
    } else {
        std::fs::create_dir_all(dir)?;
        std::fs::write(&path, data)?;
        debug!(path = %path.display(), bytes = data.len(), "upload stored");
    }
    Ok(path)
}

fn extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    (!ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .then(|| ext.to_ascii_lowercase())
}
