pub mod fusion;
pub mod orchestrator;
pub mod router;
pub mod score;
pub mod stats;

/// Diagnostic method tags carried on every result.
pub const METHOD_LOCAL: &str = "local";
pub const METHOD_VERIFIED_AGREE: &str = "verified_agree";
pub const METHOD_VERIFIED_OVERRIDE: &str = "verified_override";
pub const METHOD_FILTERED: &str = "filtered";
