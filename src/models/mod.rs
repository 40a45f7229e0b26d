pub mod core;
pub mod stats;
pub mod verdict;

pub use self::core::EntityRecord;
pub use self::stats::{BatchRunReport, BatchStats};
pub use self::verdict::{ClassificationVerdict, DiagnosticFlag, FiredRule, RuleKind, SignalTier};
