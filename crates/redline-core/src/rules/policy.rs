//! Externally supplied rule sets.
//!
//! A policy is a named, switchable list of rule records. Records are parsed
//! leniently: only the policy envelope is checked when the document is read.
//! Each rule record, including its shape, is validated at catalog-build time,
//! so one bad record only costs that record.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fs, path::Path};

use crate::error::RuleError;
use crate::rules::catalog::{Category, RuleSpec, Severity};
use crate::rules::validate::Validator;

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Raw rule records, converted one at a time by [`PolicyRule::from_record`].
    #[serde(default)]
    pub rules: Vec<Value>,
}

/// Name reported for a record before it is known to be well formed.
pub fn record_name(record: &Value) -> String {
    record
        .get("type")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "<unnamed>".to_string())
}

/// One rule record as a policy service serves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Rule identity. Matching a built-in id overrides that rule.
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    pub severity: String,
    pub pattern: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default)]
    pub validator: Option<String>,
}

impl PolicyRule {
    pub fn from_record(record: &Value) -> Result<Self, RuleError> {
        Self::deserialize(record).map_err(|e| RuleError::MalformedRecord(e.to_string()))
    }

    pub fn to_spec(&self) -> Result<RuleSpec, RuleError> {
        if self.kind.trim().is_empty() {
            return Err(RuleError::EmptyName);
        }

        let severity: Severity = self.severity.parse()?;
        let validator = self
            .validator
            .as_deref()
            .map(str::parse::<Validator>)
            .transpose()?;

        Ok(RuleSpec {
            id: self.kind.trim().to_string(),
            category: Category::from(self.category.clone()),
            severity,
            pattern: self.pattern.clone(),
            description: self.description.clone(),
            enabled: self.enabled,
            case_insensitive: self.case_insensitive,
            validator,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PolicyFile {
    Many(Vec<Policy>),
    One(Policy),
}

/// Parse a JSON document holding one policy or an array of policies.
pub fn parse_policies(raw: &str) -> Result<Vec<Policy>> {
    let parsed: PolicyFile = serde_json::from_str(raw).context("invalid policy document")?;
    Ok(match parsed {
        PolicyFile::Many(policies) => policies,
        PolicyFile::One(policy) => vec![policy],
    })
}

pub fn load_policies(path: &Path) -> Result<Vec<Policy>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read policy: {}", path.display()))?;
    parse_policies(&raw).with_context(|| format!("failed to load policy: {}", path.display()))
}
