//! Default detection rules.
//!
//! Order is stable and is part of the catalog fingerprint. Case-insensitive
//! rules are flagged per rule; everything else matches case-sensitively.

use crate::rules::catalog::{Category, RuleSpec, Severity};
use crate::rules::validate::Validator;

fn rule(id: &str, category: Category, severity: Severity, pattern: &str, description: &str) -> RuleSpec {
    RuleSpec {
        id: id.to_string(),
        category,
        severity,
        pattern: pattern.to_string(),
        description: description.to_string(),
        enabled: true,
        case_insensitive: false,
        validator: None,
    }
}

trait SpecExt {
    fn ignore_case(self) -> Self;
    fn validated(self, validator: Validator) -> Self;
}

impl SpecExt for RuleSpec {
    fn ignore_case(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    fn validated(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }
}

pub fn default_rules() -> Vec<RuleSpec> {
    use Category::*;
    use Severity::*;

    vec![
        // Personal identifiers
        rule(
            "ssn",
            PersonalIdentifier,
            Critical,
            r"\b(?:\d{3}-\d{2}-\d{4}|\d{3} \d{2} \d{4})\b",
            "US social security number",
        )
        .validated(Validator::NationalId),
        rule(
            "payment_card",
            PersonalIdentifier,
            Critical,
            r"\b(?:4\d{12}(?:\d{3})?|5[1-5]\d{14}|3[47]\d{13}|6(?:011|5\d{2})\d{12}|(?:4\d{3}|5[1-5]\d{2}|6(?:011|5\d{2}))[- ]\d{4}[- ]\d{4}[- ]\d{4}|3[47]\d{2}[- ]\d{6}[- ]\d{5})\b",
            "Payment card number",
        )
        .validated(Validator::Luhn),
        rule(
            "passport_number",
            PersonalIdentifier,
            Critical,
            r"\bpassport(?:\s*(?:no\.?|number|num|#))?\s*[:#]?\s*[a-z]{0,2}\d{6,9}\b",
            "Passport number in context",
        )
        .ignore_case(),
        rule(
            "drivers_license",
            PersonalIdentifier,
            Critical,
            r"\bdriver'?s?\s+licen[cs]e(?:\s*(?:no\.?|number|#))?\s*[:#]?\s*[a-z0-9-]{5,15}\b",
            "Driver's license number in context",
        )
        .ignore_case(),
        rule(
            "date_of_birth",
            PersonalIdentifier,
            High,
            r"\b(?:dob|d\.o\.b\.|date\s+of\s+birth|birth\s*date|born(?:\s+on)?)\s*[:\-]?\s*(?:\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4}|\d{4}-\d{2}-\d{2})\b",
            "Date of birth in context",
        )
        .ignore_case(),
        rule(
            "phone_number",
            PersonalIdentifier,
            Medium,
            r"(?:\+?1[-.\s]?)?(?:\(\d{3}\)|\b\d{3})[-.\s]?\d{3}[-.\s]\d{4}\b",
            "North American phone number",
        ),
        rule(
            "email_address",
            PersonalIdentifier,
            Medium,
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
            "Email address",
        ),
        // Credentials and secrets
        rule(
            "aws_access_key",
            Credential,
            Critical,
            r"\b(?:AKIA|ASIA|ABIA|ACCA)[A-Z0-9]{16}\b",
            "AWS access key id",
        ),
        rule(
            "aws_secret_key",
            Credential,
            Critical,
            r#"\baws_?secret_?(?:access_?)?key\s*[:=]\s*["']?[A-Za-z0-9/+=]{40}"#,
            "AWS secret access key assignment",
        )
        .ignore_case(),
        rule(
            "gcp_api_key",
            Credential,
            Critical,
            r"\bAIza[0-9A-Za-z_\-]{35}",
            "Google Cloud API key",
        ),
        rule(
            "ai_service_key",
            Credential,
            Critical,
            r"\bsk-(?:proj-|ant-)?[A-Za-z0-9_\-]{20,}",
            "AI service API key",
        ),
        rule(
            "generic_api_key",
            Credential,
            Critical,
            r#"\b(?:api[_-]?key|apikey|access[_-]?token|auth[_-]?token|secret[_-]?key|client[_-]?secret)\b\s*[:=]\s*["']?[A-Za-z0-9_\-.]{16,}"#,
            "API key or token assignment",
        )
        .ignore_case(),
        rule(
            "github_token",
            Credential,
            Critical,
            r"\b(?:gh[pousr]_[A-Za-z0-9]{36,}|github_pat_[A-Za-z0-9_]{60,})\b",
            "GitHub token",
        ),
        rule(
            "private_key",
            Credential,
            Critical,
            r"-----BEGIN (?:[A-Z0-9]+ )*PRIVATE KEY-----",
            "PEM private key block",
        ),
        rule(
            "jwt",
            Credential,
            Critical,
            r"\beyJ[A-Za-z0-9_-]{10,}\.eyJ[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}",
            "Signed JSON web token",
        ),
        rule(
            "slack_token",
            Credential,
            Critical,
            r"\bxox[baprs]-[A-Za-z0-9-]{10,}",
            "Slack token",
        ),
        rule(
            "discord_bot_token",
            Credential,
            Critical,
            r"\b[MN][A-Za-z0-9]{23,25}\.[A-Za-z0-9_-]{6}\.[A-Za-z0-9_-]{27,}",
            "Discord bot token",
        ),
        rule(
            "telegram_bot_token",
            Credential,
            Critical,
            r"\b\d{8,10}:AA[A-Za-z0-9_-]{33}\b",
            "Telegram bot token",
        ),
        rule(
            "database_uri",
            Credential,
            Critical,
            r"\b(?:postgres(?:ql)?|mysql|mariadb|mongodb(?:\+srv)?|redis|rediss|mssql|sqlserver|amqps?)://[^\s:/@]+:[^\s/@]+@[^\s/]+",
            "Database connection URI with credentials",
        )
        .ignore_case(),
        rule(
            "stripe_key",
            Credential,
            Critical,
            r"\b(?:sk|rk)_(?:live|test)_[A-Za-z0-9]{16,}",
            "Payment processor secret key",
        ),
        rule(
            "password_in_context",
            Credential,
            Critical,
            r"\b(?:password|passwd|pwd|passphrase)\s*[:=]\s*\S{4,}",
            "Password assignment",
        )
        .ignore_case(),
        rule(
            "bearer_token",
            Credential,
            Critical,
            r"\bbearer\s+[A-Za-z0-9_\-.=+/]{20,}",
            "HTTP bearer token",
        )
        .ignore_case(),
        // Infrastructure
        rule(
            "private_ip",
            Infrastructure,
            High,
            r"\b(?:10\.\d{1,3}\.\d{1,3}\.\d{1,3}|172\.(?:1[6-9]|2\d|3[01])\.\d{1,3}\.\d{1,3}|192\.168\.\d{1,3}\.\d{1,3})\b",
            "RFC 1918 private address",
        )
        .validated(Validator::Ipv4),
        rule(
            "aws_arn",
            Infrastructure,
            High,
            r"\barn:aws[a-z-]*:[a-z0-9-]+:[a-z0-9-]*:\d{12}:[A-Za-z0-9/_+=.@:-]+",
            "AWS resource name",
        ),
        rule(
            "azure_resource_id",
            Infrastructure,
            High,
            r"/subscriptions/[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}/resourceGroups/[\w.()-]+",
            "Azure resource identifier",
        )
        .ignore_case(),
        // Health
        rule(
            "medical_record_number",
            Health,
            Critical,
            r"\b(?:mrn|medical\s+record(?:\s+(?:number|no\.?|#))?)\s*[:#]?\s*[a-z]{0,3}\d{5,10}\b",
            "Medical record number in context",
        )
        .ignore_case(),
        rule(
            "diagnosis_code",
            Health,
            High,
            r"\b(?:icd-?10(?:-cm)?|diagnosis|diagnosed|dx)(?:\s+code)?\s*[:#]?\s*[A-TV-Z]\d{2}(?:\.\d{1,4})?\b",
            "ICD-10 diagnosis code in context",
        )
        .ignore_case(),
        // Corporate
        rule(
            "confidential_banner",
            Corporate,
            High,
            r"\b(?:strictly\s+confidential|company\s+confidential|internal\s+use\s+only|proprietary\s+and\s+confidential|confidential\s*[-:]\s*do\s+not\s+(?:distribute|share|forward)|not\s+for\s+(?:external\s+)?distribution)\b",
            "Confidentiality marking",
        )
        .ignore_case(),
        rule(
            "source_code",
            Corporate,
            High,
            r#"(?m)^[ \t]*(?:(?:pub(?:\([a-z]+\))?\s+)?(?:async\s+)?fn\s+\w+\s*[<(]|def\s+\w+\s*\([^)]*\)\s*(?:->\s*[\w\[\], .]+)?:|(?:public|private|protected)\s+(?:static\s+)?(?:final\s+)?[\w<>\[\],]+\s+\w+\s*\(|(?:export\s+)?(?:async\s+)?function\s+\w+\s*\(|#include\s*[<"]|package\s+[\w.]+;|import\s+[\w.]+\.\*?\w*;)"#,
            "Source code structure",
        ),
        rule(
            "sql_query",
            Corporate,
            High,
            r"\b(?:select\s+(?:distinct\s+)?[\w*.,\s]+?\s+from\s+[\w.]+|insert\s+into\s+[\w.]+|update\s+[\w.]+\s+set\s+\w+\s*=|delete\s+from\s+[\w.]+|create\s+table\s+[\w.]+)",
            "SQL statement",
        )
        .ignore_case(),
        rule(
            "sql_credentials",
            Corporate,
            Critical,
            r"\b(?:create|alter)\s+(?:user|login|role)\s+\S+\s+(?:with\s+)?(?:encrypted\s+)?(?:password|identified\s+by)\s*=?\s*\S+",
            "SQL statement embedding credentials",
        )
        .ignore_case(),
        // Legal
        rule(
            "legal_privilege",
            Legal,
            Critical,
            r"\b(?:attorney[-\s]client\s+privileged?|privileged\s+(?:and|&)\s+confidential|attorney\s+work\s+product|legally\s+privileged|subject\s+to\s+legal\s+privilege)",
            "Legal privilege marking",
        )
        .ignore_case(),
    ]
}
