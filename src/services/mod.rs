pub mod artifact_writer;
pub mod failure_ledger;
pub mod insights;
pub mod language_resolver;

pub use artifact_writer::ArtifactWriter;
pub use failure_ledger::FailureLedger;
pub use insights::{collect_state_insight, generate_insights, Metrics, StateInsight};
pub use language_resolver::LanguageResolver;
