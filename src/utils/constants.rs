// src/utils/constants.rs

/// Minimum Jaro-Winkler similarity for a registry alias to match a token
/// window of a record name. Tight on purpose: registry hits carry high weight,
/// so the fuzzy fallback only absorbs single-character damage, not lookalikes.
pub const MIN_FUZZY_ALIAS_SIMILARITY: f64 = 0.94;

/// Records evaluated per spawned batch task.
pub const BATCH_SIZE: usize = 500;
