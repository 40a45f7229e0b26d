// src/matching/classifier.rs - The nationality classifier
//
// Pure function of (record, ruleset): no I/O, no hidden state, identical
// verdicts on identical inputs. Evaluation order is fixed: exclusions first,
// then positive tiers in descending precedence, stopping at the first tier
// with a match. Confidence is the maximum weight among rules fired at the
// winning tier, never a sum, so stacked weak correlated signals cannot
// inflate it.

use strsim::jaro_winkler;

use crate::models::core::EntityRecord;
use crate::models::verdict::{
    ClassificationVerdict, DiagnosticFlag, FiredRule, RuleKind, SignalTier,
};
use crate::normalize::{normalize_address_fields, normalize_country_code, normalize_text};
use crate::ruleset::{contains_token_phrase, CompiledPattern, CompiledRuleSet};
use crate::utils::constants::MIN_FUZZY_ALIAS_SIMILARITY;

/// Classify one record against a compiled ruleset.
pub fn classify(record: &EntityRecord, ruleset: &CompiledRuleSet) -> ClassificationVerdict {
    let mut flags: Vec<DiagnosticFlag> = Vec::new();

    let name = normalize_text(record.raw_name.as_deref().unwrap_or(""));
    push_flags(&mut flags, &name.flags);

    let address = normalize_address_fields(&record.address_fields);
    push_flags(&mut flags, &address.flags);

    let country_code = match record.country_code.as_deref() {
        Some(raw) => match normalize_country_code(raw) {
            Ok(code) => code,
            Err(flag) => {
                push_flags(&mut flags, &[flag]);
                None
            }
        },
        None => None,
    };

    // Exclusions always win over positive signals. Hits are recorded in the
    // trace so an audit can see why the record was forced negative.
    let excluded: Vec<FiredRule> = ruleset
        .exclusions
        .iter()
        .filter(|exclusion| pattern_matches(&exclusion.matcher, &name.text, &address.text, None))
        .map(|exclusion| FiredRule {
            rule_id: exclusion.id.clone(),
            kind: RuleKind::Exclusion,
            weight: 0.0,
        })
        .collect();
    if !excluded.is_empty() {
        let mut verdict = ClassificationVerdict::negative(&ruleset.fingerprint);
        verdict.fired = excluded;
        verdict.flags = flags;
        return verdict;
    }

    for tier in SignalTier::ordered() {
        let fired = match tier {
            SignalTier::KnownEntity => registry_hits(ruleset, &name.text),
            SignalTier::CountryCode => {
                let hits = tier_hits(ruleset, tier, &name.text, &address.text, country_code.as_deref());
                // A well-formed code the ruleset does not accept is structured
                // evidence of a foreign entity; name heuristics must not
                // override it.
                if hits.is_empty()
                    && country_code.is_some()
                    && !ruleset.country_codes().is_empty()
                {
                    push_flags(&mut flags, &[DiagnosticFlag::ForeignCountryCode]);
                    let mut verdict = ClassificationVerdict::negative(&ruleset.fingerprint);
                    verdict.flags = flags;
                    return verdict;
                }
                hits
            }
            _ => tier_hits(ruleset, tier, &name.text, &address.text, None),
        };

        if !fired.is_empty() {
            let confidence = fired.iter().map(|f| f.weight).fold(0.0, f64::max);
            return ClassificationVerdict {
                is_match: true,
                confidence,
                fired,
                flags,
                ruleset_fingerprint: ruleset.fingerprint.clone(),
            };
        }
    }

    let mut verdict = ClassificationVerdict::negative(&ruleset.fingerprint);
    verdict.flags = flags;
    verdict
}

fn push_flags(flags: &mut Vec<DiagnosticFlag>, new: &[DiagnosticFlag]) {
    for flag in new {
        if !flags.contains(flag) {
            flags.push(*flag);
        }
    }
}

fn tier_hits(
    ruleset: &CompiledRuleSet,
    tier: SignalTier,
    name: &str,
    address: &str,
    country_code: Option<&str>,
) -> Vec<FiredRule> {
    ruleset
        .signals_in_tier(tier)
        .filter(|signal| pattern_matches(&signal.matcher, name, address, country_code))
        .map(|signal| FiredRule {
            rule_id: signal.id.clone(),
            kind: RuleKind::Signal { tier: signal.tier },
            weight: signal.weight,
        })
        .collect()
}

fn pattern_matches(
    pattern: &CompiledPattern,
    name: &str,
    address: &str,
    country_code: Option<&str>,
) -> bool {
    match pattern {
        CompiledPattern::CountryCodeIn(codes) => {
            country_code.map_or(false, |code| codes.contains(code))
        }
        CompiledPattern::NameContains(phrase) => contains_token_phrase(name, phrase),
        CompiledPattern::NameRegex(re) => re.is_match(name),
        CompiledPattern::AddressContains(phrase) => contains_token_phrase(address, phrase),
        CompiledPattern::AddressRegex(re) => re.is_match(address),
    }
}

/// Registry lookup: exact token-phrase containment of a canonical name or
/// alias, with a Jaro-Winkler fallback over same-length token windows to
/// tolerate minor misspellings in dirty records.
fn registry_hits(ruleset: &CompiledRuleSet, name: &str) -> Vec<FiredRule> {
    if name.is_empty() {
        return Vec::new();
    }
    let name_tokens: Vec<&str> = name.split_whitespace().collect();

    ruleset
        .registry
        .iter()
        .filter(|entry| {
            entry.names.iter().any(|known| {
                contains_token_phrase(name, known)
                    || fuzzy_window_match(&name_tokens, known)
            })
        })
        .map(|entry| FiredRule {
            rule_id: entry.rule_id.clone(),
            kind: RuleKind::Signal {
                tier: SignalTier::KnownEntity,
            },
            weight: ruleset.registry_weight,
        })
        .collect()
}

fn fuzzy_window_match(name_tokens: &[&str], known: &str) -> bool {
    let known_len = known.split_whitespace().count();
    if known_len == 0 || name_tokens.len() < known_len {
        return false;
    }
    name_tokens.windows(known_len).any(|window| {
        jaro_winkler(&window.join(" "), known) >= MIN_FUZZY_ALIAS_SIMILARITY
    })
}
