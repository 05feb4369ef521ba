//! Scanner: applies the catalog to a text and to its decoded evasion
//! candidates, producing masked, deduplicated matches.
//!
//! The scanner is pure. It performs no I/O and holds no state between
//! calls, so scanning the same text twice at the same instant yields equal
//! results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::ScanConfig;
use crate::decode::{Encoding, decode_candidates};
use crate::rules::catalog::{Catalog, Category, RuleId, Severity};
use crate::rules::classify::Action;
use crate::scan::mask::{MASK_CHAR, mask};

/// Where the matched text was found.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    /// The text as submitted.
    Raw,
    /// A decoded evasion candidate. `start..end` is the encoded span in the
    /// submitted text; the match offset is local to the decoded string.
    Decoded {
        encoding: Encoding,
        start: usize,
        end: usize,
    },
}

/// Which pass produced the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The submitted fragment on its own.
    Fragment,
    /// The accumulated session buffer; the fragment alone did not match.
    Session,
}

/// One confirmed, masked occurrence of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub rule: RuleId,
    pub category: Category,
    pub severity: Severity,
    pub action: Action,
    /// Masked matched text.
    pub matched: String,
    /// Masked context window around the match.
    pub context: String,
    /// Byte offset within the source string named by `origin`.
    pub offset: usize,
    pub origin: Origin,
    pub scope: Scope,
    pub detected_at: DateTime<Utc>,
}

/// Unmasked, pre-`Match` finding. Never leaves the crate.
#[derive(Debug, Clone)]
pub(crate) struct Detection {
    pub(crate) rule: usize,
    pub(crate) origin: Origin,
    pub(crate) offset: usize,
    pub(crate) matched: String,
    pub(crate) context: String,
}

pub struct Scanner<'c> {
    catalog: &'c Catalog,
    config: ScanConfig,
}

impl<'c> Scanner<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self::with_config(catalog, ScanConfig::default())
    }

    pub fn with_config(catalog: &'c Catalog, config: ScanConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    /// Scan `text`, stamping matches with the current wall clock.
    ///
    /// Repeated scans differ only in `detected_at`; [`Scanner::scan_at`]
    /// gives fully reproducible results.
    pub fn scan(&self, text: &str) -> Vec<Match> {
        self.scan_at(text, Utc::now())
    }

    /// Like [`Scanner::scan`], stamping matches with `at`.
    pub fn scan_at(&self, text: &str, at: DateTime<Utc>) -> Vec<Match> {
        self.detect(text)
            .into_iter()
            .map(|d| self.finalize(d, Scope::Fragment, at))
            .collect()
    }

    /// Raw detections over `text` and its decoded candidates.
    ///
    /// Deduplication key: (rule, source string, offset within that source).
    /// Identical decoded strings count as the same source. The matched text
    /// is kept as found; the context already has every CRITICAL value from
    /// the same source redacted.
    pub(crate) fn detect(&self, text: &str) -> Vec<Detection> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let started = Instant::now();
        let text = clamp_input(text, self.config.max_input_bytes);
        let candidates = if self.config.decode_evasions {
            decode_candidates(text)
        } else {
            Vec::new()
        };

        let sources = std::iter::once((text, Origin::Raw)).chain(candidates.iter().map(|c| {
            (
                c.decoded.as_str(),
                Origin::Decoded {
                    encoding: c.encoding,
                    start: c.span.start,
                    end: c.span.end,
                },
            )
        }));

        let mut seen: HashSet<(usize, &str, usize)> = HashSet::new();
        let mut detections = Vec::new();

        for (source, origin) in sources {
            let hits = self.catalog.match_all(source);
            let critical: Vec<Range<usize>> = hits
                .iter()
                .filter(|h| h.rule.severity == Severity::Critical)
                .map(|h| h.offset..h.offset + h.text.len())
                .collect();

            for hit in hits {
                if !seen.insert((hit.index, source, hit.offset)) {
                    continue;
                }
                let end = hit.offset + hit.text.len();
                let window = context_window(source, hit.offset, end, self.config.context_radius);
                detections.push(Detection {
                    rule: hit.index,
                    origin: origin.clone(),
                    offset: hit.offset,
                    matched: hit.text.to_string(),
                    context: redact_spans(source, window, &critical),
                });
            }
        }

        debug!(
            bytes = text.len(),
            candidates = candidates.len(),
            detections = detections.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "scan complete"
        );

        detections
    }

    /// Mask a detection into its public form.
    pub(crate) fn finalize(&self, d: Detection, scope: Scope, at: DateTime<Utc>) -> Match {
        let rule = &self.catalog.rules()[d.rule];
        Match {
            rule: rule.id.clone(),
            category: rule.category.clone(),
            severity: rule.severity,
            action: rule.severity.action(),
            matched: mask(&d.matched, rule.severity),
            context: mask(&d.context, rule.severity),
            offset: d.offset,
            origin: d.origin,
            scope,
            detected_at: at,
        }
    }
}

/// Cut `text` to at most `max` bytes on a char boundary.
fn clamp_input(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    warn!(bytes = text.len(), limit = max, "scan input truncated");
    &text[..cut]
}

/// `start..end` widened by up to `radius` characters on each side.
fn context_window(source: &str, start: usize, end: usize, radius: usize) -> Range<usize> {
    let begin = source[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map_or(start, |(i, _)| i);
    let finish = source[end..]
        .char_indices()
        .nth(radius)
        .map_or(source.len(), |(i, _)| end + i);
    begin..finish
}

/// `source[window]` with every span in `spans` masked as CRITICAL.
///
/// A span wholly inside the window is masked like a matched value; one cut
/// by the window edge is blanked out entirely. Overlapping spans merge.
fn redact_spans(source: &str, window: Range<usize>, spans: &[Range<usize>]) -> String {
    let mut inside: Vec<Range<usize>> = spans
        .iter()
        .filter(|s| s.start < window.end && s.end > window.start)
        .cloned()
        .collect();
    inside.sort_by_key(|s| (s.start, s.end));

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(inside.len());
    for span in inside {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }

    let mut out = String::with_capacity(window.len());
    let mut cursor = window.start;
    for span in merged {
        let start = span.start.max(window.start);
        let end = span.end.min(window.end);
        out.push_str(&source[cursor..start]);
        let value = &source[start..end];
        if start == span.start && end == span.end {
            out.push_str(&mask(value, Severity::Critical));
        } else {
            out.extend(std::iter::repeat_n(MASK_CHAR, value.chars().count()));
        }
        cursor = end;
    }
    out.push_str(&source[cursor..window.end]);
    out
}
