// src/ruleset/mod.rs - Declarative, versioned rulesets for nationality classification
//
// A ruleset is a human-editable JSON document of positive signals (grouped into
// precedence tiers), forced-negative exclusions, and a known-entity registry.
// Callers may swap rulesets per source domain (patents vs. corporate filings)
// without touching classifier logic.

pub mod builtin;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::verdict::SignalTier;
use crate::normalize::normalize_text;

fn default_registry_weight() -> f64 {
    0.95
}

/// Pattern attached to a positive signal. `*Contains` patterns match a token
/// phrase inside the normalized text; `*Regex` patterns run against the
/// normalized text unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SignalPattern {
    /// Set membership over the record's normalized country code.
    CountryCodeIn(Vec<String>),
    NameContains(String),
    NameRegex(String),
    AddressContains(String),
    AddressRegex(String),
}

/// One positive heuristic rule: immutable, declared once, evaluated
/// independently per record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Stable id surfaced in verdict traces (e.g. `strong:city-beijing`).
    pub id: String,
    pub tier: SignalTier,
    /// Static confidence weight in [0,1].
    pub weight: f64,
    pub pattern: SignalPattern,
}

/// Pattern attached to an exclusion rule. Exclusions only inspect the name:
/// they exist to kill known false positives like "China Lake".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ExclusionPattern {
    NameContains(String),
    NameRegex(String),
}

/// A named pattern that forces a negative classification regardless of any
/// positive signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionRule {
    pub id: String,
    pub pattern: ExclusionPattern,
}

/// Registry entry for an entity known to be Chinese-affiliated. Matched by
/// canonical name or alias against the normalized record name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownEntity {
    pub canonical: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// The full declarative rule table. Treated as an immutable input per
/// classification; hot-reloading is the caller's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Human-assigned version label, recorded in batch run reports.
    pub version: String,

    /// Weight assigned to known-entity registry hits.
    #[serde(default = "default_registry_weight")]
    pub registry_weight: f64,

    pub signals: Vec<Signal>,

    #[serde(default)]
    pub exclusions: Vec<ExclusionRule>,

    #[serde(default)]
    pub registry: Vec<KnownEntity>,
}

impl RuleSet {
    /// Parse a ruleset from a JSON document. Does not validate; call
    /// `validate` or `compile`.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse ruleset JSON")
    }

    /// Load a ruleset file from disk.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read ruleset file: {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Invalid ruleset file: {}", path.display()))
    }

    /// Fail-fast structural validation. A malformed or empty ruleset is a
    /// caller programming error, surfaced immediately rather than producing
    /// meaningless verdicts.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.version.trim().is_empty(), "Ruleset version must be non-empty");
        ensure!(!self.signals.is_empty(), "Ruleset must declare at least one signal");
        ensure!(
            (0.0..=1.0).contains(&self.registry_weight),
            "registry_weight {} is outside [0,1]",
            self.registry_weight
        );

        let mut seen_ids: HashSet<&str> = HashSet::new();
        for signal in &self.signals {
            ensure!(!signal.id.trim().is_empty(), "Signal with empty id");
            ensure!(
                seen_ids.insert(signal.id.as_str()),
                "Duplicate rule id: {}",
                signal.id
            );
            ensure!(
                (0.0..=1.0).contains(&signal.weight),
                "Signal '{}' weight {} is outside [0,1]",
                signal.id,
                signal.weight
            );
            match &signal.pattern {
                SignalPattern::CountryCodeIn(codes) => {
                    ensure!(
                        signal.tier == SignalTier::CountryCode,
                        "Signal '{}' uses a country-code pattern outside the country_code tier",
                        signal.id
                    );
                    ensure!(!codes.is_empty(), "Signal '{}' has an empty code list", signal.id);
                    for code in codes {
                        ensure!(
                            (2..=3).contains(&code.len())
                                && code.chars().all(|c| c.is_ascii_alphabetic()),
                            "Signal '{}' has malformed country code '{}'",
                            signal.id,
                            code
                        );
                    }
                }
                SignalPattern::NameContains(p) | SignalPattern::AddressContains(p) => {
                    ensure!(
                        !normalize_text(p).text.is_empty(),
                        "Signal '{}' has a pattern that normalizes to nothing",
                        signal.id
                    );
                }
                SignalPattern::NameRegex(p) | SignalPattern::AddressRegex(p) => {
                    Regex::new(p).with_context(|| {
                        format!("Signal '{}' has an invalid regex: {}", signal.id, p)
                    })?;
                }
            }
        }

        for exclusion in &self.exclusions {
            ensure!(!exclusion.id.trim().is_empty(), "Exclusion with empty id");
            ensure!(
                seen_ids.insert(exclusion.id.as_str()),
                "Duplicate rule id: {}",
                exclusion.id
            );
            match &exclusion.pattern {
                ExclusionPattern::NameContains(p) => {
                    ensure!(
                        !normalize_text(p).text.is_empty(),
                        "Exclusion '{}' has a pattern that normalizes to nothing",
                        exclusion.id
                    );
                }
                ExclusionPattern::NameRegex(p) => {
                    Regex::new(p).with_context(|| {
                        format!("Exclusion '{}' has an invalid regex: {}", exclusion.id, p)
                    })?;
                }
            }
        }

        for entry in &self.registry {
            ensure!(
                !normalize_text(&entry.canonical).text.is_empty(),
                "Registry entry with empty canonical name"
            );
        }

        Ok(())
    }

    /// SHA-256 over the canonical (re-serialized) form, so JSON key order and
    /// whitespace in the source file never change the fingerprint.
    pub fn fingerprint(&self) -> String {
        let canonical =
            serde_json::to_vec(self).unwrap_or_else(|_| format!("{:?}", self).into_bytes());
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        hex::encode(hasher.finalize())
    }

    /// Validate and compile into the form the classifier consumes: patterns
    /// normalized, regexes pre-compiled, fingerprint pinned.
    pub fn compile(&self) -> Result<CompiledRuleSet> {
        self.validate()?;

        let fingerprint = self.fingerprint();

        let mut signals = Vec::with_capacity(self.signals.len());
        for signal in &self.signals {
            signals.push(CompiledSignal {
                id: signal.id.clone(),
                tier: signal.tier,
                weight: signal.weight,
                matcher: CompiledPattern::from_signal(&signal.pattern)?,
            });
        }
        // Stable sort: tiers in precedence order, declaration order preserved
        // within each tier. Determinism of verdict traces depends on this.
        signals.sort_by_key(|s| s.tier);

        let mut exclusions = Vec::with_capacity(self.exclusions.len());
        for exclusion in &self.exclusions {
            exclusions.push(CompiledExclusion {
                id: exclusion.id.clone(),
                matcher: CompiledPattern::from_exclusion(&exclusion.pattern)?,
            });
        }

        let registry = self
            .registry
            .iter()
            .map(|entry| {
                let canonical_normalized = normalize_text(&entry.canonical).text;
                let rule_id = format!("registry:{}", canonical_normalized.replace(' ', "-"));
                let mut names = vec![canonical_normalized];
                names.extend(entry.aliases.iter().map(|a| normalize_text(a).text));
                names.retain(|n| !n.is_empty());
                CompiledKnownEntity { rule_id, names }
            })
            .collect();

        Ok(CompiledRuleSet {
            version: self.version.clone(),
            fingerprint,
            registry_weight: self.registry_weight,
            signals,
            exclusions,
            registry,
        })
    }
}

/// A compiled pattern, ready for repeated evaluation.
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    CountryCodeIn(HashSet<String>),
    NameContains(String),
    NameRegex(Regex),
    AddressContains(String),
    AddressRegex(Regex),
}

impl CompiledPattern {
    fn from_signal(pattern: &SignalPattern) -> Result<Self> {
        Ok(match pattern {
            SignalPattern::CountryCodeIn(codes) => Self::CountryCodeIn(
                codes.iter().map(|c| c.to_ascii_uppercase()).collect(),
            ),
            SignalPattern::NameContains(p) => Self::NameContains(normalize_text(p).text),
            SignalPattern::NameRegex(p) => Self::NameRegex(Regex::new(p)?),
            SignalPattern::AddressContains(p) => Self::AddressContains(normalize_text(p).text),
            SignalPattern::AddressRegex(p) => Self::AddressRegex(Regex::new(p)?),
        })
    }

    fn from_exclusion(pattern: &ExclusionPattern) -> Result<Self> {
        Ok(match pattern {
            ExclusionPattern::NameContains(p) => Self::NameContains(normalize_text(p).text),
            ExclusionPattern::NameRegex(p) => Self::NameRegex(Regex::new(p)?),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledSignal {
    pub id: String,
    pub tier: SignalTier,
    pub weight: f64,
    pub matcher: CompiledPattern,
}

#[derive(Debug, Clone)]
pub struct CompiledExclusion {
    pub id: String,
    pub matcher: CompiledPattern,
}

/// Registry entry with all names (canonical + aliases) pre-normalized.
#[derive(Debug, Clone)]
pub struct CompiledKnownEntity {
    pub rule_id: String,
    pub names: Vec<String>,
}

/// The immutable, validated form `classify` consumes. Safe to share across
/// worker tasks behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CompiledRuleSet {
    pub version: String,
    pub fingerprint: String,
    pub registry_weight: f64,
    /// Sorted by tier precedence; declaration order preserved within a tier.
    pub signals: Vec<CompiledSignal>,
    pub exclusions: Vec<CompiledExclusion>,
    pub registry: Vec<CompiledKnownEntity>,
}

impl CompiledRuleSet {
    /// Signals belonging to one tier, in declaration order.
    pub fn signals_in_tier(&self, tier: SignalTier) -> impl Iterator<Item = &CompiledSignal> {
        self.signals.iter().filter(move |s| s.tier == tier)
    }

    /// The union of codes accepted by the country-code tier.
    pub fn country_codes(&self) -> HashSet<&str> {
        let mut codes = HashSet::new();
        for signal in self.signals_in_tier(SignalTier::CountryCode) {
            if let CompiledPattern::CountryCodeIn(set) = &signal.matcher {
                codes.extend(set.iter().map(String::as_str));
            }
        }
        codes
    }
}

/// True when `needle` appears inside `haystack` as a contiguous token phrase.
/// Both must already be normalized. Plain substring search would let "zhong"
/// fire inside "azhongb", which is exactly the kind of false positive the
/// ruleset exists to avoid.
pub fn contains_token_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let needle_tokens: Vec<&str> = needle.split_whitespace().collect();
    let haystack_tokens: Vec<&str> = haystack.split_whitespace().collect();
    if needle_tokens.is_empty() || haystack_tokens.len() < needle_tokens.len() {
        return false;
    }
    haystack_tokens
        .windows(needle_tokens.len())
        .any(|window| window == needle_tokens.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_ruleset() -> RuleSet {
        RuleSet {
            version: "test-1".to_string(),
            registry_weight: 0.95,
            signals: vec![Signal {
                id: "strong:china-token".to_string(),
                tier: SignalTier::StrongName,
                weight: 0.8,
                pattern: SignalPattern::NameContains("china".to_string()),
            }],
            exclusions: Vec::new(),
            registry: Vec::new(),
        }
    }

    #[test]
    fn test_valid_ruleset_compiles() {
        let compiled = minimal_ruleset().compile().unwrap();
        assert_eq!(compiled.version, "test-1");
        assert_eq!(compiled.signals.len(), 1);
        assert_eq!(compiled.fingerprint.len(), 64);
    }

    #[test]
    fn test_empty_signal_list_rejected() {
        let mut ruleset = minimal_ruleset();
        ruleset.signals.clear();
        assert!(ruleset.validate().is_err());
    }

    #[test]
    fn test_out_of_range_weight_rejected() {
        let mut ruleset = minimal_ruleset();
        ruleset.signals[0].weight = 1.2;
        assert!(ruleset.validate().is_err());
        ruleset.signals[0].weight = -0.1;
        assert!(ruleset.validate().is_err());
    }

    #[test]
    fn test_bad_regex_rejected() {
        let mut ruleset = minimal_ruleset();
        ruleset.signals.push(Signal {
            id: "weak:bad".to_string(),
            tier: SignalTier::WeakName,
            weight: 0.3,
            pattern: SignalPattern::NameRegex("(unclosed".to_string()),
        });
        assert!(ruleset.validate().is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut ruleset = minimal_ruleset();
        let dup = ruleset.signals[0].clone();
        ruleset.signals.push(dup);
        assert!(ruleset.validate().is_err());

        let mut ruleset = minimal_ruleset();
        ruleset.exclusions.push(ExclusionRule {
            id: "strong:china-token".to_string(),
            pattern: ExclusionPattern::NameContains("china lake".to_string()),
        });
        assert!(ruleset.validate().is_err());
    }

    #[test]
    fn test_country_pattern_confined_to_country_tier() {
        let mut ruleset = minimal_ruleset();
        ruleset.signals.push(Signal {
            id: "weak:codes".to_string(),
            tier: SignalTier::WeakName,
            weight: 0.3,
            pattern: SignalPattern::CountryCodeIn(vec!["CN".to_string()]),
        });
        assert!(ruleset.validate().is_err());
    }

    #[test]
    fn test_fingerprint_independent_of_source_key_order() {
        let a = RuleSet::from_json(
            r#"{"version":"v1","signals":[{"id":"s1","tier":"strong_name","weight":0.8,
                "pattern":{"type":"name_contains","value":"china"}}]}"#,
        )
        .unwrap();
        let b = RuleSet::from_json(
            r#"{"signals":[{"pattern":{"value":"china","type":"name_contains"},
                "weight":0.8,"tier":"strong_name","id":"s1"}],"version":"v1"}"#,
        )
        .unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let a = minimal_ruleset();
        let mut b = minimal_ruleset();
        b.signals[0].weight = 0.81;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_json_load_round_trip() {
        let ruleset = minimal_ruleset();
        let json = serde_json::to_string(&ruleset).unwrap();
        let back = RuleSet::from_json(&json).unwrap();
        assert_eq!(ruleset, back);
    }

    #[test]
    fn test_signals_sorted_by_tier_on_compile() {
        let mut ruleset = minimal_ruleset();
        ruleset.signals.insert(
            0,
            Signal {
                id: "addr:china".to_string(),
                tier: SignalTier::AddressLocale,
                weight: 0.5,
                pattern: SignalPattern::AddressContains("china".to_string()),
            },
        );
        ruleset.signals.push(Signal {
            id: "cc:china".to_string(),
            tier: SignalTier::CountryCode,
            weight: 1.0,
            pattern: SignalPattern::CountryCodeIn(vec!["CN".to_string()]),
        });
        let compiled = ruleset.compile().unwrap();
        let tiers: Vec<SignalTier> = compiled.signals.iter().map(|s| s.tier).collect();
        assert_eq!(
            tiers,
            vec![SignalTier::CountryCode, SignalTier::StrongName, SignalTier::AddressLocale]
        );
        assert_eq!(compiled.country_codes(), ["CN"].iter().copied().collect());
    }

    #[test]
    fn test_shipped_sample_ruleset_compiles() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("rulesets/patent_assignees.json");
        let ruleset = RuleSet::load_from_path(&path).unwrap();
        let compiled = ruleset.compile().unwrap();
        assert_eq!(compiled.version, "patents-2026-08");
    }

    #[test]
    fn test_token_phrase_containment() {
        assert!(contains_token_phrase("beijing acme semiconductor", "beijing"));
        assert!(contains_token_phrase("naval station china lake ridgecrest", "china lake"));
        assert!(!contains_token_phrase("indochina trading", "china"));
        assert!(!contains_token_phrase("azhongb", "zhong"));
        assert!(!contains_token_phrase("", "china"));
        assert!(!contains_token_phrase("china", ""));
    }
}
