// src/batch.rs - Batch classification driver
//
// The classifier is pure and imposes no ordering between records, so the
// driver is free to partition the input arbitrarily: lines are chunked and
// evaluated on spawned tasks sharing one compiled ruleset. One bad line never
// aborts the batch; it is logged, counted, and skipped.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::matching::classify;
use crate::models::core::EntityRecord;
use crate::models::stats::{BatchRunReport, BatchStats};
use crate::models::verdict::ClassificationVerdict;
use crate::ruleset::CompiledRuleSet;
use crate::utils::constants::BATCH_SIZE;
use crate::utils::progress_bars::progress_config::ProgressConfig;

/// One verdict written to the output file, keyed back to its input line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictLine {
    /// Zero-based line number in the input file.
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_source: Option<String>,
    pub verdict: ClassificationVerdict,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Concurrent chunk tasks. Defaults to the core count upstream.
    pub jobs: usize,
    pub progress: ProgressConfig,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            jobs: num_cpus::get(),
            progress: ProgressConfig::default(),
        }
    }
}

/// Parse and classify one input line. Returns `None` (after counting) for
/// lines that are not valid record JSON.
pub fn process_line(
    line_number: usize,
    line: &str,
    ruleset: &CompiledRuleSet,
    stats: &mut BatchStats,
) -> Option<VerdictLine> {
    stats.records_total += 1;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let record: EntityRecord = match serde_json::from_str(trimmed) {
        Ok(record) => record,
        Err(e) => {
            warn!("Line {}: skipping unparseable record: {}", line_number, e);
            stats.record_parse_error();
            return None;
        }
    };

    let verdict = classify(&record, ruleset);
    debug!(
        "Line {}: is_match={} confidence={:.2} fired={:?} flags={:?}",
        line_number,
        verdict.is_match,
        verdict.confidence,
        verdict.fired.iter().map(|f| f.rule_id.as_str()).collect::<Vec<_>>(),
        verdict.flags
    );
    stats.record_verdict(&verdict);

    Some(VerdictLine {
        line: line_number,
        record_source: record.record_source.clone(),
        verdict,
    })
}

/// Classify every JSONL record in `input`, writing one `VerdictLine` JSON
/// object per classified record to `output` in input order.
pub async fn run_batch_classification(
    input: &Path,
    output: &Path,
    ruleset: Arc<CompiledRuleSet>,
    options: &BatchOptions,
) -> Result<BatchRunReport> {
    let run_id = Uuid::new_v4().to_string();
    let run_timestamp = Utc::now().naive_utc();
    let started = Instant::now();

    info!(
        "🔍 Starting batch classification run {} (ruleset {} / {})",
        run_id,
        ruleset.version,
        &ruleset.fingerprint[..12.min(ruleset.fingerprint.len())]
    );

    let contents = fs::read_to_string(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;
    let lines: Vec<(usize, String)> = contents
        .lines()
        .enumerate()
        .map(|(i, l)| (i, l.to_string()))
        .collect();
    info!("📊 Loaded {} input lines from {}", lines.len(), input.display());

    let total_chunks = (lines.len() + BATCH_SIZE - 1) / BATCH_SIZE;
    let pb = options.progress.create_bar(lines.len() as u64);
    let stats_mutex = Arc::new(Mutex::new(BatchStats::default()));

    // Output lines per chunk, reassembled in order after the joins.
    let mut chunk_outputs: Vec<Vec<String>> = vec![Vec::new(); total_chunks];

    let chunks: Vec<Vec<(usize, String)>> = lines
        .chunks(BATCH_SIZE)
        .map(|c| c.to_vec())
        .collect();

    for (group_idx, group) in chunks.chunks(options.jobs.max(1)).enumerate() {
        let mut futures = Vec::new();
        for (offset, chunk) in group.iter().cloned().enumerate() {
            let chunk_idx = group_idx * options.jobs.max(1) + offset;
            let ruleset_clone = Arc::clone(&ruleset);
            let stats_clone = Arc::clone(&stats_mutex);
            let pb_clone = pb.clone();

            futures.push(tokio::spawn(async move {
                let mut local_stats = BatchStats::default();
                let mut out = Vec::with_capacity(chunk.len());
                for (line_number, line) in &chunk {
                    if let Some(verdict_line) =
                        process_line(*line_number, line, &ruleset_clone, &mut local_stats)
                    {
                        match serde_json::to_string(&verdict_line) {
                            Ok(json) => out.push(json),
                            Err(e) => warn!("Line {}: failed to serialize verdict: {}", line_number, e),
                        }
                    }
                    pb_clone.inc(1);
                }
                let mut stats_guard = stats_clone.lock().await;
                stats_guard.merge(&local_stats);
                (chunk_idx, out)
            }));
        }

        let results = futures::future::join_all(futures).await;
        for result in results {
            match result {
                Ok((chunk_idx, out)) => chunk_outputs[chunk_idx] = out,
                Err(e) => warn!("Batch task panicked: {}", e),
            }
        }
    }

    pb.finish_with_message("done");

    let mut writer = String::new();
    for chunk in &chunk_outputs {
        for line in chunk {
            writer.push_str(line);
            writer.push('\n');
        }
    }
    fs::write(output, writer)
        .with_context(|| format!("Failed to write verdicts to {}", output.display()))?;

    let stats = Arc::try_unwrap(stats_mutex)
        .map_err(|_| anyhow::anyhow!("Batch stats still shared after joins"))?
        .into_inner();

    let report = BatchRunReport {
        run_id,
        run_timestamp,
        ruleset_fingerprint: ruleset.fingerprint.clone(),
        ruleset_version: ruleset.version.clone(),
        elapsed_seconds: started.elapsed().as_secs_f64(),
        stats,
    };

    info!(
        "✅ Run {} complete: {} records, {} matches (avg confidence {:.2}), {} exclusion hits, {} parse errors [{:.1}s]",
        report.run_id,
        report.stats.records_classified,
        report.stats.matches,
        report.stats.avg_confidence(),
        report.stats.exclusion_hits,
        report.stats.parse_errors,
        report.elapsed_seconds
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruleset::builtin::compiled_builtin;
    use std::env;

    #[test]
    fn test_process_line_good_and_bad() {
        let ruleset = compiled_builtin();
        let mut stats = BatchStats::default();

        let verdict_line = process_line(
            0,
            r#"{"raw_name": "Beijing Acme Semiconductor Co., Ltd."}"#,
            ruleset,
            &mut stats,
        )
        .unwrap();
        assert!(verdict_line.verdict.is_match);
        assert_eq!(verdict_line.line, 0);

        // Bad JSON is skipped and counted, never an error.
        assert!(process_line(1, "not json at all {", ruleset, &mut stats).is_none());
        assert!(process_line(2, "", ruleset, &mut stats).is_none());

        assert_eq!(stats.records_total, 3);
        assert_eq!(stats.records_classified, 1);
        assert_eq!(stats.parse_errors, 1);
    }

    #[test]
    fn test_process_line_carries_record_source() {
        let ruleset = compiled_builtin();
        let mut stats = BatchStats::default();
        let verdict_line = process_line(
            0,
            r#"{"raw_name": "Huawei Technologies", "record_source": "uspto_assignees"}"#,
            ruleset,
            &mut stats,
        )
        .unwrap();
        assert_eq!(verdict_line.record_source.as_deref(), Some("uspto_assignees"));
    }

    #[tokio::test]
    async fn test_batch_run_end_to_end() {
        let ruleset = compiled_builtin();
        let dir = env::temp_dir();
        let tag = Uuid::new_v4().to_string();
        let input = dir.join(format!("records-{}.jsonl", tag));
        let output = dir.join(format!("verdicts-{}.jsonl", tag));

        let records = [
            r#"{"raw_name": "Beijing Acme Semiconductor Co., Ltd."}"#,
            r#"{"raw_name": "China Lake Naval Weapons Station", "country_code": "US"}"#,
            r#"this line is broken"#,
            r#"{"raw_name": "Springfield Bakery", "country_code": "US"}"#,
        ];
        fs::write(&input, records.join("\n")).unwrap();

        let options = BatchOptions {
            jobs: 2,
            progress: ProgressConfig {
                enabled: false,
                refresh_rate_ms: 100,
            },
        };
        let report = run_batch_classification(
            &input,
            &output,
            Arc::new(ruleset.clone()),
            &options,
        )
        .await
        .unwrap();

        assert_eq!(report.stats.records_total, 4);
        assert_eq!(report.stats.records_classified, 3);
        assert_eq!(report.stats.parse_errors, 1);
        assert_eq!(report.stats.matches, 1);
        assert_eq!(report.ruleset_fingerprint, ruleset.fingerprint);

        let written = fs::read_to_string(&output).unwrap();
        let verdict_lines: Vec<VerdictLine> = written
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(verdict_lines.len(), 3);
        // Input order preserved.
        assert_eq!(verdict_lines[0].line, 0);
        assert!(verdict_lines[0].verdict.is_match);
        assert_eq!(verdict_lines[1].line, 1);
        assert!(!verdict_lines[1].verdict.is_match);

        let _ = fs::remove_file(&input);
        let _ = fs::remove_file(&output);
    }
}
