pub mod classifier;

pub use self::classifier::classify;
