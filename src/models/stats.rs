// src/models/stats.rs - Aggregate statistics for batch classification runs

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::verdict::{ClassificationVerdict, DiagnosticFlag, SignalTier};

/// Running counters aggregated across one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Input lines seen (including unparseable ones).
    pub records_total: usize,
    /// Records that produced a verdict.
    pub records_classified: usize,
    /// Lines that failed to parse and were skipped.
    pub parse_errors: usize,

    /// Positive verdicts.
    pub matches: usize,
    /// Negative verdicts forced by an exclusion rule.
    pub exclusion_hits: usize,
    /// Negative verdicts forced by a non-China country code.
    pub foreign_code_hits: usize,
    /// Verdicts carrying at least one sanitization flag.
    pub sanitize_flagged: usize,

    /// Positive verdicts per winning tier.
    pub matches_by_tier: HashMap<SignalTier, usize>,

    /// Sum of confidences over positive verdicts, for the average.
    confidence_sum: f64,
}

impl BatchStats {
    /// Fold one verdict into the counters.
    pub fn record_verdict(&mut self, verdict: &ClassificationVerdict) {
        self.records_classified += 1;

        if verdict
            .flags
            .iter()
            .any(|f| matches!(f, DiagnosticFlag::ReplacementCharsStripped | DiagnosticFlag::EmptyAfterNormalization))
        {
            self.sanitize_flagged += 1;
        }

        if verdict.flags.contains(&DiagnosticFlag::ForeignCountryCode) {
            self.foreign_code_hits += 1;
        }

        if verdict.is_match {
            self.matches += 1;
            self.confidence_sum += verdict.confidence;
            if let Some(tier) = verdict.winning_tier() {
                *self.matches_by_tier.entry(tier).or_insert(0) += 1;
            }
        } else if verdict.winning_tier().is_none() && !verdict.fired.is_empty() {
            // Fired rules on a negative verdict can only be exclusions.
            self.exclusion_hits += 1;
        }
    }

    pub fn record_parse_error(&mut self) {
        self.parse_errors += 1;
    }

    pub fn avg_confidence(&self) -> f64 {
        if self.matches > 0 {
            self.confidence_sum / self.matches as f64
        } else {
            0.0
        }
    }

    /// Merge counters from a worker task into the run totals.
    pub fn merge(&mut self, other: &BatchStats) {
        self.records_total += other.records_total;
        self.records_classified += other.records_classified;
        self.parse_errors += other.parse_errors;
        self.matches += other.matches;
        self.exclusion_hits += other.exclusion_hits;
        self.foreign_code_hits += other.foreign_code_hits;
        self.sanitize_flagged += other.sanitize_flagged;
        self.confidence_sum += other.confidence_sum;
        for (tier, count) in &other.matches_by_tier {
            *self.matches_by_tier.entry(*tier).or_insert(0) += count;
        }
    }
}

/// Summary written at the end of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRunReport {
    pub run_id: String,
    pub run_timestamp: NaiveDateTime,
    pub ruleset_fingerprint: String,
    pub ruleset_version: String,
    pub stats: BatchStats,
    pub elapsed_seconds: f64,
}
