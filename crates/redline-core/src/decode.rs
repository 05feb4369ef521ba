//! Evasion decoding.
//!
//! Finds spans of the input that look base64-, percent-, hex- or
//! unicode-escaped and emits their decoded form as extra candidate strings
//! for the scanner. Each sub-detector scans the whole input independently;
//! outputs are concatenated in detector order and not deduplicated.
//!
//! Decoding is single-level and never fails loudly: a span that does not
//! decode cleanly simply yields nothing.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::LazyLock;

static BASE64_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9+/]{20,}={0,2}").expect("base64 regex"));

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:%[0-9A-Fa-f]{2}){4,}").expect("percent regex"));

static HEX_ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\\x[0-9A-Fa-f]{2}){4,}").expect("hex escape regex"));

static UNICODE_ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\\u[0-9A-Fa-f]{4}){2,}").expect("unicode escape regex"));

/// Accepts padded and unpadded input alike.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Minimum run of printable ASCII a base64 decode must contain.
const MIN_PRINTABLE_RUN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Base64,
    Percent,
    HexEscape,
    UnicodeEscape,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Base64 => "base64",
            Self::Percent => "percent",
            Self::HexEscape => "hex_escape",
            Self::UnicodeEscape => "unicode_escape",
        }
    }
}

/// A decoded string plus the span of the input it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvasionCandidate {
    pub encoding: Encoding,
    pub span: Range<usize>,
    pub decoded: String,
}

/// Decoded candidates for every obfuscated span of `text`.
///
/// Never includes `text` itself.
pub fn decode_candidates(text: &str) -> Vec<EvasionCandidate> {
    let mut out = Vec::new();
    collect(text, &BASE64_RE, Encoding::Base64, decode_base64, &mut out);
    collect(text, &PERCENT_RE, Encoding::Percent, decode_percent, &mut out);
    collect(text, &HEX_ESCAPE_RE, Encoding::HexEscape, decode_hex_escapes, &mut out);
    collect(
        text,
        &UNICODE_ESCAPE_RE,
        Encoding::UnicodeEscape,
        decode_unicode_escapes,
        &mut out,
    );
    out
}

fn collect(
    text: &str,
    re: &Regex,
    encoding: Encoding,
    decode: fn(&str) -> Option<String>,
    out: &mut Vec<EvasionCandidate>,
) {
    for m in re.find_iter(text) {
        if let Some(decoded) = decode(m.as_str()) {
            if decoded != text {
                out.push(EvasionCandidate {
                    encoding,
                    span: m.range(),
                    decoded,
                });
            }
        }
    }
}

pub fn decode_base64(span: &str) -> Option<String> {
    let bytes = LENIENT_BASE64.decode(span).ok()?;
    has_printable_run(&bytes, MIN_PRINTABLE_RUN)
        .then(|| String::from_utf8_lossy(&bytes).into_owned())
}

pub fn decode_percent(span: &str) -> Option<String> {
    let decoded = urlencoding::decode(span).ok()?;
    (decoded != span).then(|| decoded.into_owned())
}

pub fn decode_hex_escapes(span: &str) -> Option<String> {
    let digits: String = span.split("\\x").collect();
    let bytes = hex::decode(digits).ok()?;
    let decoded = match String::from_utf8(bytes) {
        Ok(s) => s,
        // Not UTF-8: treat each byte as a Latin-1 code point.
        Err(err) => err.into_bytes().into_iter().map(char::from).collect(),
    };
    (decoded != span).then_some(decoded)
}

pub fn decode_unicode_escapes(span: &str) -> Option<String> {
    let units = span
        .split("\\u")
        .filter(|s| !s.is_empty())
        .map(|h| u16::from_str_radix(h, 16).ok())
        .collect::<Option<Vec<u16>>>()?;
    let decoded = String::from_utf16_lossy(&units);
    (decoded != span).then_some(decoded)
}

fn has_printable_run(bytes: &[u8], min: usize) -> bool {
    let mut run = 0;
    for &b in bytes {
        if (0x20..=0x7e).contains(&b) {
            run += 1;
            if run >= min {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}
