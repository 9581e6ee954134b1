// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content fingerprints for uploaded files.

use sha2::{Digest, Sha256};

/// SHA-256 of `data` as lowercase hex. Uploads are stored under this name, so
/// sending the same logo twice reuses one file.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
