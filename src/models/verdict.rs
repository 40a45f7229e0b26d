// src/models/verdict.rs

use serde::{Deserialize, Serialize};

/// Precedence class for positive signals, highest evidentiary strength first.
/// Variant order matters: the derived `Ord` drives tier evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalTier {
    /// Explicit country code on the record.
    CountryCode,
    /// Known-entity registry lookup (canonical names and aliases).
    KnownEntity,
    /// Strong name pattern (region-specific corporate markers, city names).
    StrongName,
    /// Weak name pattern (romanized name fragments).
    WeakName,
    /// Locale hints in the address fields.
    AddressLocale,
}

impl SignalTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CountryCode => "country_code",
            Self::KnownEntity => "known_entity",
            Self::StrongName => "strong_name",
            Self::WeakName => "weak_name",
            Self::AddressLocale => "address_locale",
        }
    }

    /// All tiers in descending precedence.
    pub fn ordered() -> [SignalTier; 5] {
        [
            Self::CountryCode,
            Self::KnownEntity,
            Self::StrongName,
            Self::WeakName,
            Self::AddressLocale,
        ]
    }
}

/// Whether a fired rule was a positive signal or a forced-negative exclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    Signal { tier: SignalTier },
    Exclusion,
}

/// One rule that matched the record, kept for human audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiredRule {
    /// Stable rule id from the ruleset (e.g. `strong:city-beijing`,
    /// `registry:huawei`, `excl:china-lake`).
    pub rule_id: String,

    #[serde(flatten)]
    pub kind: RuleKind,

    /// Static confidence weight of the rule. Exclusions carry 0.0.
    pub weight: f64,
}

/// Diagnostics attached to a verdict. These never change the decision on their
/// own (except `ForeignCountryCode`, which records why the decision was forced
/// negative); they exist so batch audits can explain odd records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticFlag {
    /// Undecodable content (U+FFFD replacement characters) was stripped during
    /// normalization.
    ReplacementCharsStripped,
    /// A populated field normalized down to an empty string.
    EmptyAfterNormalization,
    /// The country code was present but not a plausible alphabetic code; it was
    /// treated as absent.
    MalformedCountryCode,
    /// A well-formed non-China country code forced the negative verdict.
    ForeignCountryCode,
}

/// Output of a single classification. Callers own storage; the classifier
/// never persists verdicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationVerdict {
    pub is_match: bool,

    /// Scalar confidence in [0,1]. Maximum weight among rules fired at the
    /// winning tier; 0.0 on the negative paths.
    pub confidence: f64,

    /// Rules that fired at the winning tier (or the matching exclusions), in
    /// ruleset declaration order.
    pub fired: Vec<FiredRule>,

    /// Sanitization and structured-metadata diagnostics.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<DiagnosticFlag>,

    /// SHA-256 fingerprint (hex) of the ruleset this verdict was produced
    /// under, for reproducible audits.
    pub ruleset_fingerprint: String,
}

impl ClassificationVerdict {
    /// The negative verdict shared by the empty-record, exclusion, and
    /// foreign-country-code paths.
    pub fn negative(fingerprint: &str) -> Self {
        Self {
            is_match: false,
            confidence: 0.0,
            fired: Vec::new(),
            flags: Vec::new(),
            ruleset_fingerprint: fingerprint.to_string(),
        }
    }

    /// Tier the verdict was decided at, if any positive signal fired.
    pub fn winning_tier(&self) -> Option<SignalTier> {
        self.fired.iter().find_map(|f| match f.kind {
            RuleKind::Signal { tier } => Some(tier),
            RuleKind::Exclusion => None,
        })
    }
}
