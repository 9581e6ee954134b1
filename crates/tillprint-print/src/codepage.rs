// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Language tag → ESC/POS character code table.
//
// Table numbers follow the Epson TM series (`ESC t n`); most clones use the
// same numbering for the Windows pages.

use encoding_rs::{
    Encoding, WINDOWS_1250_INIT, WINDOWS_1251_INIT, WINDOWS_1252_INIT, WINDOWS_1253_INIT,
    WINDOWS_1254_INIT, WINDOWS_1255_INIT, WINDOWS_1256_INIT, WINDOWS_1257_INIT,
    WINDOWS_1258_INIT,
};

/// A printer code page and the matching host-side encoder.
#[derive(Debug)]
pub struct CodePage {
    pub name: &'static str,
    /// Argument for `ESC t n`.
    pub table: u8,
    encoding: &'static Encoding,
}

impl CodePage {
    /// Encode `text` for this page, or `None` if any character has no slot
    /// in it.
    pub fn encode(&self, text: &str) -> Option<Vec<u8>> {
        let (bytes, _, had_errors) = self.encoding.encode(text);
        if had_errors {
            None
        } else {
            Some(bytes.into_owned())
        }
    }
}

pub static WPC1252: CodePage = CodePage { name: "WPC1252", table: 16, encoding: &WINDOWS_1252_INIT };
pub static WPC1250: CodePage = CodePage { name: "WPC1250", table: 45, encoding: &WINDOWS_1250_INIT };
pub static WPC1251: CodePage = CodePage { name: "WPC1251", table: 46, encoding: &WINDOWS_1251_INIT };
pub static WPC1253: CodePage = CodePage { name: "WPC1253", table: 47, encoding: &WINDOWS_1253_INIT };
pub static WPC1254: CodePage = CodePage { name: "WPC1254", table: 48, encoding: &WINDOWS_1254_INIT };
pub static WPC1255: CodePage = CodePage { name: "WPC1255", table: 49, encoding: &WINDOWS_1255_INIT };
pub static WPC1256: CodePage = CodePage { name: "WPC1256", table: 50, encoding: &WINDOWS_1256_INIT };
pub static WPC1257: CodePage = CodePage { name: "WPC1257", table: 51, encoding: &WINDOWS_1257_INIT };
pub static WPC1258: CodePage = CodePage { name: "WPC1258", table: 52, encoding: &WINDOWS_1258_INIT };

/// Pick the code page for a BCP 47-ish tag (`tr`, `tr-TR`, `pt_BR`).
pub fn for_language(lang: &str) -> Option<&'static CodePage> {
    let primary = lang
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();

    let page = match primary.as_str() {
        "tr" | "az" => &WPC1254,
        "ru" | "uk" | "bg" | "be" | "sr" | "mk" => &WPC1251,
        "pl" | "cs" | "sk" | "hu" | "ro" | "hr" | "sl" | "bs" | "sq" => &WPC1250,
        "el" => &WPC1253,
        "he" | "yi" => &WPC1255,
        "ar" | "fa" | "ur" => &WPC1256,
        "lt" | "lv" | "et" => &WPC1257,
        "vi" => &WPC1258,
        "en" | "de" | "fr" | "es" | "it" | "pt" | "nl" | "da" | "sv" | "no" | "nb" | "nn"
        | "fi" | "is" | "ga" | "ca" | "eu" | "gl" | "af" | "id" | "ms" | "sw" => &WPC1252,
        _ => return None,
    };
    Some(page)
}
