//! Deterministic ordering helpers.
//!
//! Scanning yields matches in catalog order per source string. Callers that
//! present or persist matches want the most severe first and identical
//! inputs to produce identical output, which these helpers guarantee.

use std::cmp::Reverse;

use crate::rules::catalog::{RuleId, Severity};
use crate::scan::scanner::{Match, Origin, Scope};

/// Sort matches by `(severity desc, rule, scope, origin, offset)`.
///
/// Fragment matches come before session matches for the same rule; raw
/// matches before decoded ones. The sort is stable.
pub fn sort_matches(matches: &mut [Match]) {
    matches.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
}

fn sort_key(m: &Match) -> (Reverse<Severity>, &str, Scope, u8, usize, usize) {
    let (origin_rank, origin_start) = match m.origin {
        Origin::Raw => (0, 0),
        Origin::Decoded { start, .. } => (1, start),
    };
    (
        Reverse(m.severity),
        m.rule.as_str(),
        m.scope,
        origin_rank,
        origin_start,
        m.offset,
    )
}

/// Distinct rule ids in first-seen order.
pub fn distinct_rules(matches: &[Match]) -> Vec<RuleId> {
    let mut out: Vec<RuleId> = Vec::new();
    for m in matches {
        if !out.contains(&m.rule) {
            out.push(m.rule.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Encoding;
    use crate::rules::catalog::Category;
    use chrono::{TimeZone, Utc};

    fn m(rule: &str, severity: Severity, scope: Scope, origin: Origin, offset: usize) -> Match {
        Match {
            rule: RuleId::from(rule),
            category: Category::Credential,
            severity,
            action: severity.action(),
            matched: String::new(),
            context: String::new(),
            offset,
            origin,
            scope,
            detected_at: Utc.timestamp_opt(0, 0).unwrap(),
        }
    }

    fn order(matches: &[Match]) -> Vec<(&str, usize)> {
        matches.iter().map(|m| (m.rule.as_str(), m.offset)).collect()
    }

    #[test]
    fn most_severe_first_then_rule_id() {
        let mut matches = vec![
            m("email_address", Severity::Medium, Scope::Fragment, Origin::Raw, 0),
            m("stripe_key", Severity::Critical, Scope::Fragment, Origin::Raw, 9),
            m("aws_arn", Severity::High, Scope::Fragment, Origin::Raw, 3),
            m("jwt", Severity::Critical, Scope::Fragment, Origin::Raw, 1),
        ];

        sort_matches(&mut matches);

        assert_eq!(
            order(&matches),
            vec![
                ("jwt", 1),
                ("stripe_key", 9),
                ("aws_arn", 3),
                ("email_address", 0),
            ]
        );
    }

    #[test]
    fn fragment_before_session_and_raw_before_decoded() {
        let decoded = Origin::Decoded {
            encoding: Encoding::Base64,
            start: 4,
            end: 40,
        };
        let mut matches = vec![
            m("ssn", Severity::Critical, Scope::Session, Origin::Raw, 0),
            m("ssn", Severity::Critical, Scope::Fragment, decoded.clone(), 0),
            m("ssn", Severity::Critical, Scope::Fragment, Origin::Raw, 20),
            m("ssn", Severity::Critical, Scope::Fragment, Origin::Raw, 5),
        ];

        sort_matches(&mut matches);

        let scopes: Vec<_> = matches.iter().map(|m| (m.scope, m.origin.clone(), m.offset)).collect();
        assert_eq!(
            scopes,
            vec![
                (Scope::Fragment, Origin::Raw, 5),
                (Scope::Fragment, Origin::Raw, 20),
                (Scope::Fragment, decoded, 0),
                (Scope::Session, Origin::Raw, 0),
            ]
        );
    }

    #[test]
    fn sorting_is_deterministic_across_runs() {
        let make = || {
            vec![
                m("phone_number", Severity::Medium, Scope::Fragment, Origin::Raw, 7),
                m("ssn", Severity::Critical, Scope::Session, Origin::Raw, 2),
                m("private_ip", Severity::High, Scope::Fragment, Origin::Raw, 0),
            ]
        };
        let mut first = make();
        let mut second = make();
        second.reverse();

        sort_matches(&mut first);
        sort_matches(&mut second);

        assert_eq!(first, second);
    }

    #[test]
    fn distinct_rules_keeps_first_seen_order() {
        let matches = vec![
            m("jwt", Severity::Critical, Scope::Fragment, Origin::Raw, 0),
            m("ssn", Severity::Critical, Scope::Fragment, Origin::Raw, 4),
            m("jwt", Severity::Critical, Scope::Fragment, Origin::Raw, 9),
        ];
        let ids: Vec<String> = distinct_rules(&matches).iter().map(|r| r.to_string()).collect();
        assert_eq!(ids, vec!["jwt", "ssn"]);
    }
}
