//! Offline evaluation harness for the review extraction prompt.
//!
//! Builds a dataset of transcript windows from cached transcripts, labels
//! them with a two-stage gold pass (extractor then critic) on a strong
//! model, runs every prompt variant against a cheaper model, and scores the
//! predictions against gold. Everything is written to disk so scoring can
//! be re-run without re-labeling.

pub mod dataset;
pub mod experiment;
pub mod gold;
pub mod report;
pub mod score;
pub mod variants;

pub use dataset::Dataset;
pub use experiment::{Experiment, VariantResult};
pub use gold::{GoldLabels, GoldWindowLabel};
pub use score::VariantMetrics;
pub use variants::PromptVariant;
