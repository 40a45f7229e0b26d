// src/lib.rs
//
// Rule-driven nationality classifier for noisy OSINT entity records: a pure
// `classify` function over declarative, versioned rulesets, plus a batch
// driver for JSONL record files.

pub mod batch;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod ruleset;
pub mod utils;

pub use matching::classify;
pub use models::core::EntityRecord;
pub use models::verdict::{ClassificationVerdict, DiagnosticFlag, FiredRule, RuleKind, SignalTier};
pub use ruleset::builtin::{builtin_china_ruleset, compiled_builtin};
pub use ruleset::{CompiledRuleSet, RuleSet};
