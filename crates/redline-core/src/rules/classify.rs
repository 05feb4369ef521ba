//! Severity → action policy.
//!
//! This module derives the enforcement decision from a set of matches.
//!
//! Responsibilities:
//! - Map every severity to exactly one action
//! - Reduce a match set to a single aggregate action
//! - Provide CI-compatible exit codes for the harness
//!
//! Non-responsibilities:
//! - Finding matches (handled in `scan`)
//! - Enforcing the action (the caller blocks, warns or logs)
//!
//! The policy is fixed and explainable:
//!
//!   - Any CRITICAL match → BLOCK_AND_ALERT
//!   - Else any HIGH      → BLOCK_AND_LOG
//!   - Else any MEDIUM    → WARN_AND_LOG
//!   - Else               → LOG_ONLY
//!
//! The result does not depend on the order of the input list.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rules::catalog::Severity;
use crate::scan::scanner::Match;

/// Graded response tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    LogOnly,
    WarnAndLog,
    BlockAndLog,
    BlockAndAlert,
}

impl Action {
    pub fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Self::BlockAndAlert,
            Severity::High => Self::BlockAndLog,
            Severity::Medium => Self::WarnAndLog,
            Severity::Low => Self::LogOnly,
        }
    }

    pub fn is_blocking(self) -> bool {
        matches!(self, Self::BlockAndLog | Self::BlockAndAlert)
    }

    /// Exit code mapping:
    /// - LOG_ONLY        → 0
    /// - WARN_AND_LOG    → 1
    /// - BLOCK_AND_LOG   → 2
    /// - BLOCK_AND_ALERT → 3
    pub fn exit_code(self) -> i32 {
        match self {
            Self::LogOnly => 0,
            Self::WarnAndLog => 1,
            Self::BlockAndLog => 2,
            Self::BlockAndAlert => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LogOnly => "LOG_ONLY",
            Self::WarnAndLog => "WARN_AND_LOG",
            Self::BlockAndLog => "BLOCK_AND_LOG",
            Self::BlockAndAlert => "BLOCK_AND_ALERT",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Severity {
    pub fn action(self) -> Action {
        Action::for_severity(self)
    }
}

/// Highest severity present in `matches`, if any.
pub fn highest_severity(matches: &[Match]) -> Option<Severity> {
    Severity::DESCENDING
        .into_iter()
        .find(|sev| matches.iter().any(|m| m.severity == *sev))
}

/// Aggregate action for a match set.
///
/// Walks the severity order from the top and returns the action of the
/// first severity with at least one match. An empty set is LOG_ONLY.
pub fn resolve(matches: &[Match]) -> Action {
    highest_severity(matches)
        .map(Action::for_severity)
        .unwrap_or(Action::LogOnly)
}
