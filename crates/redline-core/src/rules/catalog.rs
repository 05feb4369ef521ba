//! The pattern catalog: an ordered set of compiled detection rules.
//!
//! The catalog is built once (built-in definitions, optionally overridden or
//! extended by external policies) and is immutable afterwards. Matching is
//! stateless per call: every `match_all` starts from offset zero of the text
//! it is given, and the regex engine guarantees linear-time search.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{fmt, str::FromStr};
use tracing::{debug, trace, warn};

use crate::error::RuleError;
use crate::rules::builtin;
use crate::rules::policy::{Policy, PolicyRule, record_name};
use crate::rules::validate::Validator;

/// Upper bound on the compiled size of any one rule's automaton.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Name under which built-in rules are reported when rejected.
pub const BUILTIN_ORIGIN: &str = "builtin";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct RuleId(pub String);

impl RuleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Severity ordering is semantic: LOW < MEDIUM < HIGH < CRITICAL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Highest first.
    pub const DESCENDING: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" | "med" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(RuleError::UnknownSeverity(s.to_string())),
        }
    }
}

/// Family of sensitive data a rule looks for.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    PersonalIdentifier,
    Credential,
    Infrastructure,
    Health,
    Corporate,
    Legal,
    /// Categories introduced by external policies.
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Self::PersonalIdentifier => "personal_identifier",
            Self::Credential => "credential",
            Self::Infrastructure => "infrastructure",
            Self::Health => "health",
            Self::Corporate => "corporate",
            Self::Legal => "legal",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "personal_identifier" | "pii" => Self::PersonalIdentifier,
            "credential" | "credentials" | "secret" | "secrets" => Self::Credential,
            "infrastructure" => Self::Infrastructure,
            "health" | "phi" => Self::Health,
            "corporate" => Self::Corporate,
            "legal" => Self::Legal,
            _ => Self::Other(s),
        }
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.as_str().to_string()
    }
}

/// Uncompiled rule definition, shared by built-ins and external policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub id: String,
    pub category: Category,
    pub severity: Severity,
    pub pattern: String,
    pub description: String,
    pub enabled: bool,
    pub case_insensitive: bool,
    pub validator: Option<Validator>,
}

impl RuleSpec {
    pub fn compile(self) -> Result<DetectionRule, RuleError> {
        if self.id.trim().is_empty() {
            return Err(RuleError::EmptyName);
        }

        let regex = RegexBuilder::new(&self.pattern)
            .case_insensitive(self.case_insensitive)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()?;

        Ok(DetectionRule {
            id: RuleId(self.id),
            category: self.category,
            severity: self.severity,
            description: self.description,
            enabled: self.enabled,
            case_insensitive: self.case_insensitive,
            validator: self.validator,
            regex,
        })
    }
}

/// A compiled, immutable detection rule.
#[derive(Debug, Clone)]
pub struct DetectionRule {
    pub id: RuleId,
    pub category: Category,
    pub severity: Severity,
    pub description: String,
    pub enabled: bool,
    pub case_insensitive: bool,
    pub validator: Option<Validator>,
    regex: Regex,
}

impl DetectionRule {
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Non-overlapping occurrences of the rule in `text` that pass its
    /// validator, as `(offset, substring)` pairs.
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> impl Iterator<Item = (usize, &'t str)> + 'r
    where
        't: 'r,
    {
        self.regex
            .find_iter(text)
            .map(|m| (m.start(), m.as_str()))
            .filter(move |(_, candidate)| match self.validator {
                Some(v) if !v.check(candidate) => {
                    trace!(rule = %self.id, validator = %v, "candidate failed validation");
                    false
                }
                _ => true,
            })
    }
}

/// One validated rule occurrence in a source string.
#[derive(Debug, Clone, Copy)]
pub struct RuleHit<'c, 't> {
    /// Position of the rule in catalog order.
    pub index: usize,
    pub rule: &'c DetectionRule,
    /// Byte offset within the source string.
    pub offset: usize,
    pub text: &'t str,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    rules: Vec<DetectionRule>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// The default catalog with no external policies applied.
    pub fn builtin() -> Self {
        Self::builder().builtin().build().catalog
    }

    pub fn rules(&self) -> &[DetectionRule] {
        &self.rules
    }

    pub fn enabled_rules(&self) -> impl Iterator<Item = &DetectionRule> {
        self.rules.iter().filter(|r| r.enabled)
    }

    pub fn get(&self, id: &str) -> Option<&DetectionRule> {
        self.rules.iter().find(|r| r.id.as_str() == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every validated occurrence of every enabled rule, in catalog order
    /// and then by offset.
    pub fn match_all<'c, 't>(&'c self, text: &'t str) -> Vec<RuleHit<'c, 't>> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.enabled)
            .flat_map(|(index, rule)| {
                rule.find_iter(text).map(move |(offset, hit)| RuleHit {
                    index,
                    rule,
                    offset,
                    text: hit,
                })
            })
            .collect()
    }

    /// Hex SHA-256 over the identity of the enabled rules.
    ///
    /// Two catalogs with the same fingerprint produce the same matches for
    /// the same input.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for rule in self.enabled_rules() {
            hasher.update(rule.id.as_str());
            hasher.update([0u8]);
            hasher.update(rule.severity.as_str());
            hasher.update([0u8]);
            hasher.update([u8::from(rule.case_insensitive)]);
            hasher.update(rule.validator.map(Validator::as_str).unwrap_or("-"));
            hasher.update([0u8]);
            hasher.update(rule.pattern());
            hasher.update([b'\n']);
        }
        hex::encode(hasher.finalize())
    }
}

/// A rule definition that could not be added to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRule {
    /// Policy name, or [`BUILTIN_ORIGIN`].
    pub policy: String,
    pub rule: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: RuleError,
}

fn serialize_display<S: serde::Serializer>(err: &RuleError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

/// Result of catalog construction: the usable catalog plus every rule that
/// was skipped.
#[derive(Debug, Clone)]
pub struct CatalogBuild {
    pub catalog: Catalog,
    pub rejected: Vec<RejectedRule>,
}

#[derive(Debug, Default)]
pub struct CatalogBuilder {
    rules: Vec<DetectionRule>,
    rejected: Vec<RejectedRule>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin(mut self) -> Self {
        for spec in builtin::default_rules() {
            self.insert(BUILTIN_ORIGIN, Ok(spec));
        }
        self
    }

    /// Add one rule. A rule whose id already exists replaces it in place.
    pub fn rule(mut self, origin: &str, spec: RuleSpec) -> Self {
        self.insert(origin, Ok(spec));
        self
    }

    /// Apply an external policy. Disabled policies contribute nothing.
    pub fn policy(mut self, policy: &Policy) -> Self {
        if !policy.enabled {
            debug!(policy = %policy.name, "skipping disabled policy");
            return self;
        }
        for record in &policy.rules {
            let spec = PolicyRule::from_record(record)
                .and_then(|rule| rule.to_spec())
                .map_err(|error| (record_name(record), error));
            self.insert(&policy.name, spec);
        }
        self
    }

    pub fn build(self) -> CatalogBuild {
        debug!(
            rules = self.rules.len(),
            rejected = self.rejected.len(),
            "catalog built"
        );
        CatalogBuild {
            catalog: Catalog { rules: self.rules },
            rejected: self.rejected,
        }
    }

    fn insert(&mut self, origin: &str, spec: Result<RuleSpec, (String, RuleError)>) {
        let compiled = spec.and_then(|spec| {
            let name = spec.id.clone();
            spec.compile().map_err(|e| (name, e))
        });

        match compiled {
            Ok(rule) => match self.rules.iter_mut().find(|r| r.id == rule.id) {
                Some(slot) => {
                    debug!(rule = %rule.id, policy = origin, "rule overridden");
                    *slot = rule;
                }
                None => self.rules.push(rule),
            },
            Err((rule, error)) => {
                warn!(policy = origin, rule = %rule, error = %error, "rule rejected");
                self.rejected.push(RejectedRule {
                    policy: origin.to_string(),
                    rule,
                    error,
                });
            }
        }
    }
}
